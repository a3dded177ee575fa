//! Toolchain resolution
//!
//! Tool identities, installation paths and embedded entry points are gathered
//! from several sources before any stage runs. Every source only fills what
//! is still unset, so sources are applied from the highest priority down:
//! command line, config files, runtime query, built-in defaults.

use crate::arglist::ArgList;
use crate::error::{BuildError, BuildResult};
use crate::options::BuildOptions;
use crate::platform::Platform;
use crate::runner::{command_line, ToolRunner};
use plld_config::{RuntimeVariables, ToolchainFile};
use std::path::PathBuf;
use tracing::debug;

/// Partially known toolchain; `None` means "not decided yet"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainSpec {
    pub compiler: Option<String>,
    pub cxx_compiler: Option<String>,
    pub linker: Option<String>,
    pub runtime: Option<String>,
    /// Runtime installation directory (PLBASE)
    pub base_dir: Option<String>,
    /// Architecture tag (PLARCH)
    pub arch: Option<String>,
    pub goal: Option<String>,
    pub toplevel: Option<String>,
    pub initfile: Option<String>,
    /// Final executable
    pub output: Option<String>,
    /// Directory for the temporary base executable and program image
    pub work_dir: Option<PathBuf>,
}

/// Fully resolved toolchain, immutable once the stages start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub platform: Platform,
    pub compiler: String,
    pub cxx_compiler: String,
    pub linker: String,
    pub runtime: String,
    pub base_dir: String,
    pub arch: String,
    pub goal: String,
    pub toplevel: String,
    pub initfile: String,
    pub output: String,
    /// Linker output when a program image follows
    pub base_executable: String,
    /// Program image written by the runtime
    pub program_image: String,
}

fn fill(slot: &mut Option<String>, value: Option<&str>) {
    if slot.is_none() {
        *slot = value.map(str::to_string);
    }
}

/// Strip terminating `/`s, keeping a lone root
fn strip_trailing_slashes(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && !path.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Prepend `front` to `list`, keeping the order of `front`
fn prepend_all(list: &mut ArgList, front: &[String]) {
    if front.is_empty() {
        return;
    }
    let mut merged: ArgList = front.iter().cloned().collect();
    merged.extend(list.iter().cloned());
    *list = merged;
}

impl ToolchainSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a merged toolchain file.
    ///
    /// Programs and entry points fill unset slots. Option lists go in front of
    /// the command-line options so that the command line has the last word.
    pub fn apply_file(&mut self, file: &ToolchainFile, options: &mut BuildOptions) {
        fill(&mut self.compiler, file.compiler());
        fill(&mut self.cxx_compiler, file.cxx_compiler());
        fill(&mut self.linker, file.linker());
        fill(&mut self.runtime, file.runtime());
        fill(&mut self.goal, file.goal());
        fill(&mut self.toplevel, file.toplevel());
        fill(&mut self.initfile, file.initfile());

        prepend_all(&mut options.c_options, file.compiler_options());
        prepend_all(&mut options.cpp_options, file.compiler_options());
        prepend_all(&mut options.ld_options, file.linker_options());
        prepend_all(&mut options.pl_options, file.runtime_options());
    }

    /// Runtime executable to query, falling back to the platform default
    pub fn runtime_program(&self, platform: Platform) -> String {
        self.runtime
            .clone()
            .unwrap_or_else(|| platform.default_runtime().to_string())
    }

    /// Consume the variables reported by the runtime.
    ///
    /// `CC`, `PLBASE` and `PLARCH` only fill unset slots. `PLLIBS` and
    /// `PLLDFLAGS` extend the library and linker option lists. Other names
    /// are ignored.
    pub fn apply_runtime_variables(
        &mut self,
        vars: &RuntimeVariables,
        options: &mut BuildOptions,
        runner: &ToolRunner,
    ) {
        for (name, value) in vars.iter() {
            match name {
                "CC" => fill(&mut self.compiler, Some(value)),
                "PLBASE" => fill(&mut self.base_dir, Some(strip_trailing_slashes(value))),
                "PLARCH" => fill(&mut self.arch, Some(strip_trailing_slashes(value))),
                "PLLIBS" => options.add_library_words(value),
                "PLLDFLAGS" => options.ld_options.extend_words(value),
                _ => continue,
            }
            runner.echo(format!("\t{}=\"{}\"", name, value));
        }
    }

    /// Fill every remaining slot with its default and finish the option
    /// groups. Fails when the runtime location is still unknown.
    pub fn resolve(self, platform: Platform, options: &mut BuildOptions) -> BuildResult<Toolchain> {
        let base_dir = self
            .base_dir
            .ok_or(BuildError::MissingSetting { setting: "PLBASE" })?;
        let arch = match self.arch {
            Some(arch) => arch,
            None if platform.needs_arch() => {
                return Err(BuildError::MissingSetting { setting: "PLARCH" })
            }
            None => String::new(),
        };

        let compiler = self.compiler.unwrap_or_else(|| "cc".to_string());
        let cxx_compiler = self.cxx_compiler.unwrap_or_else(|| {
            let default = if compiler == "gcc" { "g++" } else { "c++" };
            default.to_string()
        });
        let linker = self.linker.unwrap_or_else(|| {
            platform
                .default_linker()
                .map(str::to_string)
                .unwrap_or_else(|| compiler.clone())
        });
        let runtime = self
            .runtime
            .unwrap_or_else(|| platform.default_runtime().to_string());

        for option in platform.required_compiler_options() {
            options.c_options.ensure_present(option);
        }
        for option in platform.required_linker_options() {
            options.ld_options.ensure_present(option);
        }
        if options.debug {
            let flag = platform.debug_flag();
            options.c_options.append(flag);
            options.cpp_options.append(flag);
            options.ld_options.append(flag);
        }

        let pid = std::process::id();
        let work_path = |name: String| match &self.work_dir {
            Some(dir) => dir.join(name).to_string_lossy().into_owned(),
            None => name,
        };
        let base_executable = work_path(format!("ctmp-{}", pid));
        let program_image = work_path(format!("pltmp-{}", pid));

        options
            .lib_dirs
            .prepend(platform.runtime_library_dir(&base_dir, &arch));
        options
            .include_dirs
            .prepend(platform.runtime_include_dir(&base_dir));

        let toolchain = Toolchain {
            platform,
            compiler,
            cxx_compiler,
            linker,
            runtime,
            base_dir,
            arch,
            goal: self.goal.unwrap_or_else(|| "$welcome".to_string()),
            toplevel: self.toplevel.unwrap_or_else(|| "prolog".to_string()),
            initfile: self.initfile.unwrap_or_else(|| "none".to_string()),
            output: self
                .output
                .unwrap_or_else(|| platform.default_output().to_string()),
            base_executable,
            program_image,
        };
        debug!(?toolchain, "resolved toolchain");
        Ok(toolchain)
    }
}

/// Ask the runtime for its build variables.
///
/// The query runs even in dry-run mode since every later stage depends on it.
pub fn query_runtime(runtime: &str, runner: &ToolRunner) -> BuildResult<RuntimeVariables> {
    let mut args = ArgList::new();
    args.append("-dump-runtime-variables");
    runner.echo(format!("eval `{}`", command_line(runtime, &args)));

    let output = runner.capture(runtime, &args)?;
    let vars = RuntimeVariables::parse(&output);
    debug!(count = vars.len(), "runtime variables decoded");
    Ok(vars)
}
