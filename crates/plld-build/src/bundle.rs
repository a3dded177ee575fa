//! Bundle stage
//!
//! The runtime consults the script inputs and saves a program image, which
//! is then appended to the base executable. The resulting file starts with
//! the native executable and ends with the image the runtime finds at
//! startup.

use crate::arglist::ArgList;
use crate::context::BuildContext;
use crate::error::{BuildError, BuildResult};
use crate::platform::Platform;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::debug;

/// Quote `name` as an atom for the runtime's reader.
///
/// A lowercase letter followed by letters, digits or `_` stays bare. Anything
/// else is wrapped in single quotes with embedded quotes doubled.
pub fn quote_atom(name: &str) -> Cow<'_, str> {
    let mut chars = name.chars();
    let bare = matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if bare {
        return Cow::Borrowed(name);
    }

    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('\'');
    for c in name.chars() {
        if c == '\'' {
            quoted.push('\'');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    Cow::Owned(quoted)
}

/// Entry points stored in the program image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoints<'a> {
    pub goal: &'a str,
    pub toplevel: &'a str,
    pub initfile: &'a str,
}

/// The goal that loads `files` and saves them into `image`
pub fn save_directive(files: &[String], image: &str, entry: EntryPoints<'_>) -> String {
    let consulted: Vec<Cow<'_, str>> = files.iter().map(|f| quote_atom(f)).collect();
    format!(
        "consult([{}]),qsave_program({},[goal={},toplevel={},initfile={}])",
        consulted.join(","),
        quote_atom(image),
        quote_atom(entry.goal),
        quote_atom(entry.toplevel),
        quote_atom(entry.initfile),
    )
}

/// Runtime arguments for saving the program image
pub fn program_image_arguments(pl_options: &ArgList, directive: String) -> ArgList {
    let mut args = pl_options.clone();
    args.extend(["-f", "none", "-F", "none", "-g", "true", "-t"]);
    args.append(directive);
    args
}

/// Run the runtime to save the program image.
///
/// Script sources are consulted first, then serialized scripts, each in
/// command-line order. The image is registered for deletion before the
/// runtime starts.
pub fn create_program_image(ctx: &mut BuildContext) -> BuildResult<()> {
    let tc = &ctx.toolchain;
    let files: Vec<String> = ctx
        .inputs
        .scripts
        .iter()
        .chain(&ctx.inputs.serialized_scripts)
        .cloned()
        .collect();
    let directive = save_directive(
        &files,
        &tc.program_image,
        EntryPoints {
            goal: &tc.goal,
            toplevel: &tc.toplevel,
            initfile: &tc.initfile,
        },
    );
    let args = program_image_arguments(&ctx.options.pl_options, directive);
    let runtime = tc.runtime.clone();
    let image = tc.program_image.clone();

    ctx.temp_files.register(&image);
    ctx.runner.run(&runtime, &args)?;
    debug!(image = %image, files = files.len(), "program image saved");
    Ok(())
}

/// Write `base` followed by `image` into `output`.
///
/// Returns the number of bytes written. On failure the partial output is
/// removed.
pub fn concatenate(base: &Path, image: &Path, output: &Path) -> BuildResult<u64> {
    let result = copy_parts(&[base, image], output);
    if result.is_err() {
        let _ = fs::remove_file(output);
    }
    result
}

fn copy_parts(parts: &[&Path], output: &Path) -> BuildResult<u64> {
    let mut out = File::create(output).map_err(|e| BuildError::io("could not open", output, e))?;
    let mut written = 0;
    for part in parts {
        let mut input = File::open(part).map_err(|e| BuildError::io("could not open", *part, e))?;
        written += io::copy(&mut input, &mut out)
            .map_err(|e| BuildError::io("write failed for", output, e))?;
    }
    out.sync_all()
        .map_err(|e| BuildError::io("write failed for", output, e))?;
    Ok(written)
}

/// Permission bits for new executables: everything the umask allows
#[cfg(unix)]
pub fn executable_mode() -> u32 {
    0o777 & !current_umask()
}

/// The process umask, read without modifying it where the OS allows
#[cfg(unix)]
fn current_umask() -> u32 {
    #[cfg(target_os = "linux")]
    {
        let status = fs::read_to_string("/proc/self/status").ok();
        if let Some(mask) = status.as_deref().and_then(parse_status_umask) {
            return mask;
        }
    }

    // SAFETY: umask cannot fail; the previous mask is restored immediately
    unsafe {
        let mask = libc::umask(0o777);
        libc::umask(mask);
        mask as u32
    }
}

#[cfg(unix)]
fn parse_status_umask(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Umask:"))
        .and_then(|value| u32::from_str_radix(value.trim(), 8).ok())
}

#[cfg(unix)]
fn make_executable(output: &Path, mode: u32) -> BuildResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(output, fs::Permissions::from_mode(mode))
        .map_err(|e| BuildError::io("could not make executable", output, e))
}

/// Concatenate base executable and program image into the final output
pub fn create_output(ctx: &mut BuildContext) -> BuildResult<()> {
    let tc = &ctx.toolchain;
    match tc.platform {
        Platform::Unix => ctx.runner.echo(format!(
            "cat {} {} > {}",
            tc.base_executable, tc.program_image, tc.output
        )),
        Platform::Windows => ctx.runner.echo(format!(
            "copy /b {}+{} {}",
            tc.base_executable, tc.program_image, tc.output
        )),
    }

    let output = Path::new(&tc.output);
    if !ctx.runner.is_dry_run() {
        let bytes = concatenate(
            Path::new(&tc.base_executable),
            Path::new(&tc.program_image),
            output,
        )?;
        debug!(output = %output.display(), bytes, "output written");
    }

    #[cfg(unix)]
    {
        let mode = executable_mode();
        ctx.runner.echo(format!("chmod {:03o} {}", mode, tc.output));
        if !ctx.runner.is_dry_run() {
            if let Err(e) = make_executable(output, mode) {
                let _ = fs::remove_file(output);
                return Err(e);
            }
        }
    }

    Ok(())
}
