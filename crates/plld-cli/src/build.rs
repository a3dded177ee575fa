//! Build command - turn command-line arguments into a pipeline run

use anyhow::{Context, Result};
use plld_build::{BuildOptions, BuildSummary, Builder, Interrupt, ToolchainSpec};
use plld_config::ConfigLoader;
use std::path::PathBuf;
use tracing::debug;

/// A compiler flag whose position relative to the others matters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerOption {
    /// `-D<macro>`
    Define(String),
    /// `-U<macro>`
    Undefine(String),
    /// `--cc-options` spec, first character is the separator
    Spec(String),
}

/// Build command arguments
#[derive(Debug, Default)]
pub struct BuildArgs {
    /// Input files in command-line order
    pub files: Vec<String>,
    pub output: Option<String>,
    pub verbose: bool,
    pub dry_run: bool,
    pub debug: bool,
    pub compile_only: bool,
    pub no_state: bool,

    pub compiler: Option<String>,
    pub cxx_compiler: Option<String>,
    pub linker: Option<String>,
    pub runtime: Option<String>,

    pub goal: Option<String>,
    pub toplevel: Option<String>,
    pub initfile: Option<String>,

    /// `-D`, `-U` and `--cc-options`, in command-line order
    pub compiler_options: Vec<CompilerOption>,
    /// `--ld-options` specs
    pub linker_options: Vec<String>,
    /// `--pl-options` specs
    pub runtime_options: Vec<String>,
    pub include_dirs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub libs: Vec<String>,
    pub last_libs: Vec<String>,

    /// Directory for the temporary base executable and program image
    pub work_dir: Option<PathBuf>,
    /// Explicit toolchain file instead of searching for plld.toml
    pub config: Option<PathBuf>,
}

impl BuildArgs {
    /// Option groups and mode switches for the pipeline
    pub fn options(&self) -> BuildOptions {
        let mut options = BuildOptions::new();

        for option in &self.compiler_options {
            match option {
                CompilerOption::Define(name) => options.add_compiler_option(format!("-D{}", name)),
                CompilerOption::Undefine(name) => {
                    options.add_compiler_option(format!("-U{}", name))
                }
                CompilerOption::Spec(spec) => options.add_compiler_options(spec),
            }
        }
        for spec in &self.linker_options {
            options.ld_options.extend_separated(spec);
        }
        for spec in &self.runtime_options {
            options.pl_options.extend_separated(spec);
        }

        options.include_dirs.extend(self.include_dirs.iter().cloned());
        options.lib_dirs.extend(self.lib_dirs.iter().cloned());
        options.libs.extend(self.libs.iter().cloned());
        options.last_libs.extend(self.last_libs.iter().cloned());

        options.verbose = self.verbose;
        options.dry_run = self.dry_run;
        options.debug = self.debug;
        options.compile_only = self.compile_only;
        options.no_state = self.no_state;
        options
    }

    /// Toolchain values chosen explicitly on the command line
    pub fn toolchain(&self) -> ToolchainSpec {
        ToolchainSpec {
            compiler: self.compiler.clone(),
            cxx_compiler: self.cxx_compiler.clone(),
            linker: self.linker.clone(),
            runtime: self.runtime.clone(),
            goal: self.goal.clone(),
            toplevel: self.toplevel.clone(),
            initfile: self.initfile.clone(),
            output: self.output.clone(),
            work_dir: self.work_dir.clone(),
            ..ToolchainSpec::default()
        }
    }
}

/// Run the build command
pub fn run(args: BuildArgs, interrupt: Interrupt) -> Result<BuildSummary> {
    let mut loader = ConfigLoader::new();
    let config = match &args.config {
        Some(path) => loader
            .load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to determine current directory")?;
            loader
                .load_from_directory(&cwd)
                .context("Failed to load toolchain configuration")?
        }
    };
    if let Some(root) = config.project_root() {
        debug!(root = %root.display(), "using project toolchain file");
    }

    let summary = Builder::new(args.files.iter().cloned())
        .with_options(args.options())
        .with_toolchain(args.toolchain())
        .with_config(config.file)
        .with_interrupt(interrupt)
        .run()?;

    Ok(summary)
}
