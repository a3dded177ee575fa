//! plld build pipeline
//!
//! Drives an external C compiler, linker and Prolog runtime to produce a
//! single executable with an embedded program image:
//! - Input classification by extension
//! - Toolchain resolution (config files, runtime query, defaults)
//! - Compile, link and bundle stages with a fixed order
//! - Temporary file tracking with cleanup on every exit path
//! - Cooperative handling of termination signals
//!
//! # Example
//!
//! ```no_run
//! use plld_build::{BuildOptions, Builder};
//!
//! let mut options = BuildOptions::new();
//! options.verbose = true;
//! let summary = Builder::new(["main.c", "app.pl"])
//!     .with_options(options)
//!     .run()
//!     .unwrap();
//! println!("{:?}", summary.output);
//! ```

pub mod arglist;
pub mod builder;
pub mod bundle;
pub mod classify;
pub mod compile;
pub mod context;
pub mod error;
pub mod interrupt;
pub mod link;
pub mod options;
pub mod platform;
pub mod runner;
pub mod temp_files;
pub mod toolchain;

// Re-export main types
pub use arglist::ArgList;
pub use builder::{BuildSummary, Builder, Pipeline, Stage};
pub use classify::{classify, InputKind, Inputs};
pub use context::BuildContext;
pub use error::{BuildError, BuildResult};
pub use interrupt::{install_signal_handlers, Interrupt};
pub use options::BuildOptions;
pub use platform::Platform;
pub use runner::{command_line, shell_quote, ToolRunner};
pub use temp_files::TempFiles;
pub use toolchain::{query_runtime, Toolchain, ToolchainSpec};
