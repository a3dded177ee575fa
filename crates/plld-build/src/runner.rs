//! External tool invocation
//!
//! Runs compiler, linker and runtime synchronously. Programs are spawned
//! directly with their argument vector; the shell-quoted rendering is only
//! used for the verbose echo and diagnostics, so it can be pasted into a
//! shell to reproduce a step.

use crate::arglist::ArgList;
use crate::error::{BuildError, BuildResult};
use crate::interrupt::Interrupt;
use std::borrow::Cow;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// How often a running child is checked against the interrupt flag
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Characters that make an argument unsafe to show unquoted
const NEEDS_QUOTE: &[char] = &[
    '#', '!', '|', '<', '>', '*', '?', '$', '\'', '"', '`', '&', ';', '(', ')', '\\',
];

/// Quote `arg` for display in a POSIX shell command line.
///
/// Arguments without special characters are returned verbatim. Others are
/// wrapped in double quotes with `"`, `\`, `$` and `` ` `` backslash-escaped.
pub fn shell_quote(arg: &str) -> Cow<'_, str> {
    let needs_quote =
        arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || NEEDS_QUOTE.contains(&c));
    if !needs_quote {
        return Cow::Borrowed(arg);
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Render `program args...` as a single shell command line
pub fn command_line(program: &str, args: &ArgList) -> String {
    let mut line = String::from(program);
    for arg in args {
        line.push(' ');
        line.push_str(&shell_quote(arg));
    }
    line
}

/// Runs external tools with the driver's verbosity and dry-run settings
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    verbose: bool,
    dry_run: bool,
    interrupt: Interrupt,
}

impl ToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Echo every command line before running it
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Echo only; never start a build step
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Observe `interrupt` after every subprocess
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Print a verbose echo line
    pub fn echo(&self, line: impl AsRef<str>) {
        if self.verbose {
            println!("\t{}", line.as_ref());
        }
    }

    /// Run `program` and require a zero exit status
    pub fn run(&self, program: &str, args: &ArgList) -> BuildResult<()> {
        self.run_with_env(program, args, &[])
    }

    /// Like [`run`](Self::run) with extra environment variables
    pub fn run_with_env(
        &self,
        program: &str,
        args: &ArgList,
        env: &[(String, String)],
    ) -> BuildResult<()> {
        let line = command_line(program, args);
        for (name, value) in env {
            self.echo(format!("{}={}", name, value));
        }
        self.echo(&line);

        if self.dry_run {
            debug!(command = %line, "dry run, not executing");
            return Ok(());
        }

        self.interrupt.check()?;
        debug!(command = %line, "running");
        let mut child = Command::new(program)
            .args(args)
            .env("PLLD", "true")
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .spawn()
            .map_err(|e| BuildError::Spawn {
                program: program.to_string(),
                error: e,
            })?;

        let status = self.wait(program, &mut child)?;

        if !status.success() {
            return Err(BuildError::tool_failed(program, exit_code(status)));
        }
        Ok(())
    }

    /// Run `program` and return its standard output.
    ///
    /// Used for queries, so it runs even in dry-run mode.
    pub fn capture(&self, program: &str, args: &ArgList) -> BuildResult<String> {
        let line = command_line(program, args);
        debug!(command = %line, "capturing output");

        self.interrupt.check()?;
        let mut child = Command::new(program)
            .args(args)
            .env("PLLD", "true")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| BuildError::Spawn {
                program: program.to_string(),
                error: e,
            })?;

        // Drain stdout on a separate thread so a chatty child never blocks
        // on a full pipe while we poll it
        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                stdout.read_to_end(&mut buf).map(|_| buf)
            })
        });

        let status = self.wait(program, &mut child);
        let stdout = match reader {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Ok(Vec::new()))
                .map_err(|e| BuildError::Spawn {
                    program: program.to_string(),
                    error: e,
                })?,
            None => Vec::new(),
        };
        let status = status?;

        if !status.success() {
            return Err(BuildError::tool_failed(program, exit_code(status)));
        }
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    /// Wait for `child`, killing it when an interruption is requested.
    ///
    /// The signal handler only records the request, so the kill and the
    /// cleanup that follows run here on the normal error path.
    fn wait(&self, program: &str, child: &mut Child) -> BuildResult<ExitStatus> {
        loop {
            let exited = child.try_wait().map_err(|e| BuildError::Spawn {
                program: program.to_string(),
                error: e,
            })?;
            if let Some(status) = exited {
                self.interrupt.check()?;
                return Ok(status);
            }

            if let Some(signal) = self.interrupt.raised() {
                debug!(program, signal, "interrupted, stopping child");
                if let Err(e) = child.kill() {
                    warn!(program, error = %e, "failed to stop child");
                }
                let _ = child.wait();
                return Err(BuildError::Interrupted { signal });
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Numeric status for diagnostics; signals map to 128 + signal number
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
