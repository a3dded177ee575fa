//! Link stage
//!
//! The linker resolves symbols left to right, so the argument order is fixed:
//!
//! 1. output designation
//! 2. user linker options
//! 3. objects and archives
//! 4. library search directories
//! 5. the embedding support library
//! 6. user libraries
//! 7. libraries that must come last
//!
//! On Windows the search directories travel through the `LIB` environment
//! variable instead of the argument list.

use crate::arglist::ArgList;
use crate::classify::replace_extension;
use crate::context::BuildContext;
use crate::error::BuildResult;
use crate::options::BuildOptions;
use crate::platform::Platform;
use tracing::debug;

/// Arguments and environment for one linker run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCommand {
    pub args: ArgList,
    /// Extra environment for the linker
    pub env: Vec<(String, String)>,
}

/// Assemble the linker command producing `output`.
///
/// `objects` are the link inputs in order, `libraries` any library files
/// named directly on the command line. `inherited_lib` is the caller's `LIB`
/// value (Windows only).
pub fn link_command(
    platform: Platform,
    options: &BuildOptions,
    objects: &[String],
    libraries: &[String],
    output: &str,
    inherited_lib: Option<&str>,
) -> LinkCommand {
    let mut args = options.ld_options.clone();
    let mut env = Vec::new();

    match platform {
        Platform::Unix => {
            args.prepend(output);
            args.prepend("-o");
        }
        Platform::Windows => args.prepend(format!("/out:{}", output)),
    }

    args.concat_with_prefix("", objects);

    match platform {
        Platform::Unix => args.concat_with_prefix("-L", &options.lib_dirs),
        Platform::Windows => {
            let mut value: String = options
                .lib_dirs
                .iter()
                .map(|dir| format!("{};", platform.native_path(dir)))
                .collect();
            if let Some(inherited) = inherited_lib {
                value.push_str(inherited);
            }
            env.push(("LIB".to_string(), value));
        }
    }

    args.append(platform.embedding_library());
    args.concat_with_prefix("", libraries);
    args.concat_with_prefix(platform.library_prefix(), &options.libs);
    args.concat_with_prefix(platform.library_prefix(), &options.last_libs);

    LinkCommand { args, env }
}

/// Link the objects into the base executable, or straight into the final
/// output when no program image follows.
///
/// Returns the path that was linked.
pub fn link_base_executable(ctx: &mut BuildContext) -> BuildResult<String> {
    let platform = ctx.toolchain.platform;
    let bundles = ctx.options.bundles();
    let output = if bundles {
        ctx.toolchain.base_executable.clone()
    } else {
        ctx.toolchain.output.clone()
    };

    let inherited_lib = match platform {
        Platform::Windows => std::env::var("LIB").ok(),
        Platform::Unix => None,
    };
    let command = link_command(
        platform,
        &ctx.options,
        &ctx.inputs.objects,
        &ctx.inputs.libraries,
        &output,
        inherited_lib.as_deref(),
    );

    if bundles {
        ctx.temp_files.register(&output);
        for ext in platform.link_side_artifacts() {
            ctx.temp_files.register(replace_extension(&output, ext, platform));
        }
    }

    let linker = ctx.toolchain.linker.clone();
    ctx.runner.run_with_env(&linker, &command.args, &command.env)?;
    debug!(output = %output, "linked");
    Ok(output)
}
