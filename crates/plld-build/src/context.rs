//! State shared by the pipeline stages

use crate::classify::Inputs;
use crate::options::BuildOptions;
use crate::runner::ToolRunner;
use crate::temp_files::TempFiles;
use crate::toolchain::Toolchain;

/// Everything a stage reads or writes, passed explicitly to each stage
#[derive(Debug)]
pub struct BuildContext {
    /// Classified inputs; compiled objects are appended to `inputs.objects`
    pub inputs: Inputs,
    pub options: BuildOptions,
    pub toolchain: Toolchain,
    pub temp_files: TempFiles,
    pub runner: ToolRunner,
}

impl BuildContext {
    /// The registry and runner inherit verbosity and dry-run mode from
    /// `options`
    pub fn new(
        inputs: Inputs,
        options: BuildOptions,
        toolchain: Toolchain,
        runner: ToolRunner,
    ) -> Self {
        let runner = runner
            .with_verbose(options.verbose)
            .with_dry_run(options.dry_run);
        let temp_files = TempFiles::new()
            .with_verbose(options.verbose)
            .with_dry_run(options.dry_run);
        Self {
            inputs,
            options,
            toolchain,
            temp_files,
            runner,
        }
    }
}
