//! Build orchestration and pipeline management
//!
//! A [`Builder`] classifies the inputs, resolves the toolchain and then hands
//! a [`Pipeline`] the resulting [`BuildContext`]. The pipeline enforces the
//! stage order
//!
//! ```text
//! Classified -> Compiled -> Linked -> [Bundled] -> Cleaned
//! ```
//!
//! where `Cleaned` is reachable from every state and ends the pipeline.

use crate::bundle::{create_output, create_program_image};
use crate::classify::Inputs;
use crate::compile::compile_sources;
use crate::context::BuildContext;
use crate::error::{BuildError, BuildResult};
use crate::interrupt::Interrupt;
use crate::link::link_base_executable;
use crate::options::BuildOptions;
use crate::platform::Platform;
use crate::runner::ToolRunner;
use crate::toolchain::{query_runtime, Toolchain, ToolchainSpec};
use plld_config::ToolchainFile;
use std::fmt;
use tracing::{debug, info};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Inputs classified, toolchain resolved
    Classified,
    /// All sources compiled
    Compiled,
    /// Base executable (or final output) linked
    Linked,
    /// Program image appended
    Bundled,
    /// Temporary files removed; no further stage may run
    Cleaned,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Classified => "classified",
            Self::Compiled => "compiled",
            Self::Linked => "linked",
            Self::Bundled => "bundled",
            Self::Cleaned => "cleaned",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Final executable, if one was produced
    pub output: Option<String>,
    /// Objects produced by the compile stage
    pub compiled_objects: usize,
    /// Stages that ran, in order
    pub stages: Vec<Stage>,
    /// Temporary files removed during cleanup
    pub removed_temp_files: usize,
}

/// Stage state machine over one [`BuildContext`]
#[derive(Debug)]
pub struct Pipeline {
    ctx: BuildContext,
    state: Stage,
    stages: Vec<Stage>,
    compiled_objects: usize,
}

impl Pipeline {
    /// Start a pipeline on a classified context
    pub fn new(ctx: BuildContext) -> Self {
        Self {
            ctx,
            state: Stage::Classified,
            stages: vec![Stage::Classified],
            compiled_objects: 0,
        }
    }

    pub fn state(&self) -> Stage {
        self.state
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Check the transition into `stage` and any pending interruption
    fn enter(&self, stage: &'static str, from: Stage) -> BuildResult<()> {
        if self.state != from {
            return Err(BuildError::StageOrder {
                stage,
                state: self.state.name(),
            });
        }
        self.ctx.runner.interrupt().check()
    }

    fn advance(&mut self, to: Stage) {
        debug!(from = %self.state, to = %to, "stage complete");
        self.state = to;
        self.stages.push(to);
    }

    /// Compile every source file
    pub fn compile(&mut self) -> BuildResult<()> {
        self.enter("compile", Stage::Classified)?;
        self.compiled_objects = compile_sources(&mut self.ctx)?;
        self.advance(Stage::Compiled);
        Ok(())
    }

    /// Link the objects
    pub fn link(&mut self) -> BuildResult<()> {
        self.enter("link", Stage::Compiled)?;
        link_base_executable(&mut self.ctx)?;
        self.advance(Stage::Linked);
        Ok(())
    }

    /// Save the program image and append it to the base executable
    pub fn bundle(&mut self) -> BuildResult<()> {
        self.enter("bundle", Stage::Linked)?;
        create_program_image(&mut self.ctx)?;
        self.ctx.runner.interrupt().check()?;
        create_output(&mut self.ctx)?;

        // A signal that arrived while the output was written leaves a file
        // nobody asked to keep
        if let Err(e) = self.ctx.runner.interrupt().check() {
            if !self.ctx.runner.is_dry_run() {
                let output = &self.ctx.toolchain.output;
                debug!(output = %output, "interrupted, removing output");
                let _ = std::fs::remove_file(output);
            }
            return Err(e);
        }

        self.advance(Stage::Bundled);
        Ok(())
    }

    /// Remove all temporary files; allowed from every state
    pub fn cleanup(&mut self) -> usize {
        let removed = self.ctx.temp_files.cleanup();
        if self.state != Stage::Cleaned {
            self.advance(Stage::Cleaned);
        }
        removed
    }

    /// Run the stages selected by the build options
    pub fn execute(&mut self) -> BuildResult<()> {
        self.compile()?;
        if self.ctx.options.links() {
            self.link()?;
            if self.ctx.options.bundles() {
                self.bundle()?;
            }
        }
        Ok(())
    }

    fn summary(&self, removed_temp_files: usize) -> BuildSummary {
        let produced = self
            .stages
            .iter()
            .any(|s| matches!(s, Stage::Linked | Stage::Bundled));
        BuildSummary {
            output: produced.then(|| self.ctx.toolchain.output.clone()),
            compiled_objects: self.compiled_objects,
            stages: self.stages.clone(),
            removed_temp_files,
        }
    }
}

/// Main builder for producing an embedded executable
#[derive(Debug, Clone)]
pub struct Builder {
    /// Input files in command-line order
    files: Vec<String>,
    options: BuildOptions,
    spec: ToolchainSpec,
    config: Option<ToolchainFile>,
    platform: Platform,
    interrupt: Interrupt,
}

impl Builder {
    /// Create a builder for the given input files
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            options: BuildOptions::default(),
            spec: ToolchainSpec::default(),
            config: None,
            platform: Platform::host(),
            interrupt: Interrupt::default(),
        }
    }

    /// Set the build options
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the explicitly chosen toolchain values
    pub fn with_toolchain(mut self, spec: ToolchainSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Use a merged toolchain file for values the command line leaves open
    pub fn with_config(mut self, config: ToolchainFile) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the platform convention (defaults to the host)
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Observe `interrupt` between stages and after every subprocess
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Resolve the toolchain: config file, runtime query, defaults
    pub fn resolve_toolchain(
        &self,
        runner: &ToolRunner,
        options: &mut BuildOptions,
    ) -> BuildResult<Toolchain> {
        let mut spec = self.spec.clone();
        if let Some(config) = &self.config {
            spec.apply_file(config, options);
        }

        let runtime = spec.runtime_program(self.platform);
        let vars = query_runtime(&runtime, runner)?;
        spec.apply_runtime_variables(&vars, options, runner);

        spec.resolve(self.platform, options)
    }

    /// Run the whole pipeline.
    ///
    /// Unrecognized inputs are reported before any external tool runs.
    /// Temporary files are removed on every return path.
    pub fn run(self) -> BuildResult<BuildSummary> {
        let inputs = Inputs::classify_all(&self.files, self.platform)?;
        debug!(inputs = inputs.len(), "inputs classified");

        let runner = ToolRunner::new()
            .with_verbose(self.options.verbose)
            .with_interrupt(self.interrupt.clone());
        let mut options = self.options.clone();
        let toolchain = self.resolve_toolchain(&runner, &mut options)?;
        self.interrupt.check()?;

        let mut pipeline = Pipeline::new(BuildContext::new(inputs, options, toolchain, runner));
        let result = pipeline.execute();
        let removed = pipeline.cleanup();

        result?;
        self.interrupt.check()?;

        let summary = pipeline.summary(removed);
        info!(output = ?summary.output, "build finished");
        Ok(summary)
    }
}
