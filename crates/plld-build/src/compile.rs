//! Compile stage: one compiler run per source file

use crate::arglist::ArgList;
use crate::classify::replace_extension;
use crate::context::BuildContext;
use crate::error::BuildResult;
use crate::platform::Platform;
use tracing::debug;

/// Macros defined for every embedded compile
pub const EMBEDDING_DEFINES: [&str; 2] = ["-D__SWI_PROLOG__", "-D__SWI_EMBEDDED__"];

/// Object file produced for `source`
pub fn object_path(source: &str, platform: Platform) -> String {
    replace_extension(source, platform.object_extension(), platform)
}

/// Compiler arguments for one source file.
///
/// `shared_options` is copied, never modified.
pub fn compile_arguments(
    shared_options: &ArgList,
    include_dirs: &ArgList,
    source: &str,
    object: &str,
) -> ArgList {
    let mut args = shared_options.clone();
    args.prepend("-c");
    args.extend(EMBEDDING_DEFINES);
    args.concat_with_prefix("-I", include_dirs);
    args.append("-o");
    args.append(object);
    args.append(source);
    args
}

/// Compile `source` and record its object as a link input.
///
/// The object is registered for deletion only when a link stage will
/// consume it.
pub fn compile_file(
    ctx: &mut BuildContext,
    compiler: &str,
    shared_options: &ArgList,
    source: &str,
) -> BuildResult<String> {
    let object = object_path(source, ctx.toolchain.platform);
    let args = compile_arguments(shared_options, &ctx.options.include_dirs, source, &object);

    ctx.runner.run(compiler, &args)?;

    debug!(source, object = %object, "compiled");
    ctx.inputs.objects.push(object.clone());
    if ctx.options.links() {
        ctx.temp_files.register(&object);
    }
    Ok(object)
}

/// Compile all C sources, then all C++ sources, each in command-line order.
///
/// Returns the number of objects produced.
pub fn compile_sources(ctx: &mut BuildContext) -> BuildResult<usize> {
    let c_sources = ctx.inputs.c_sources.clone();
    let cpp_sources = ctx.inputs.cpp_sources.clone();
    let compiler = ctx.toolchain.compiler.clone();
    let cxx_compiler = ctx.toolchain.cxx_compiler.clone();
    let c_options = ctx.options.c_options.clone();
    let cpp_options = ctx.options.cpp_options.clone();

    for source in &c_sources {
        compile_file(ctx, &compiler, &c_options, source)?;
    }
    for source in &cpp_sources {
        compile_file(ctx, &cxx_compiler, &cpp_options, source)?;
    }
    Ok(c_sources.len() + cpp_sources.len())
}
