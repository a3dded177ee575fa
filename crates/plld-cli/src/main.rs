use anyhow::Result;
use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};
use colored::Colorize;
use plld_build::{install_signal_handlers, BuildError, Interrupt};
use std::path::PathBuf;
use std::process::ExitCode;

mod build;
mod config;

use build::{BuildArgs, CompilerOption};

/// Link C, C++ and Prolog sources into a single executable.
///
/// Sources are compiled with the C or C++ compiler, linked against the
/// embedding library, and the Prolog files are saved into a program image
/// that is appended to the linked executable.
///
/// Input files are recognized by extension: .o .a (objects), .c (C),
/// .cpp .cxx .cc .C (C++), .pl (Prolog) and .qlf (quick-load files).
/// On Windows .obj and .lib are recognized instead of .o and .a.
///
/// EXAMPLES:
///     plld -o app main.c app.pl       Build a stand-alone executable
///     plld -c util.c                  Only compile
///     plld -v -f -o app main.c app.pl Show the commands without running them
///     plld --nostate -o kernel ext.c  Relink the runtime kernel only
///
/// ENVIRONMENT VARIABLES:
///     PLLD_CC, PLLD_CXX, PLLD_LD, PLLD_PL  Override toolchain programs
///     PLLD_VERBOSE                         Set to '1' to always echo commands
///     PLLD_LOG                             Log filter (e.g. 'debug')
///     NO_COLOR                             Set to disable colored output
#[derive(Parser, Debug)]
#[command(name = "plld")]
#[command(version)]
#[command(after_help = "Toolchain defaults are read from plld.toml (searched upwards), \
~/.plld/config.toml and `<pl> -dump-runtime-variables`.")]
struct Cli {
    /// Input files
    #[arg(value_name = "FILE")]
    files: Vec<String>,

    /// Final executable
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<String>,

    /// Echo every command (twice for debug logging)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Show the commands but do not run them
    #[arg(short = 'f', long = "dry-run")]
    dry_run: bool,

    /// Compile and link with debug information
    #[arg(short = 'g')]
    debug: bool,

    /// Only compile, do not link
    #[arg(short = 'c')]
    compile_only: bool,

    /// Prolog runtime
    #[arg(long, value_name = "PROGRAM")]
    pl: Option<String>,

    /// Linker
    #[arg(long, value_name = "PROGRAM")]
    ld: Option<String>,

    /// C compiler
    #[arg(long, value_name = "PROGRAM")]
    cc: Option<String>,

    /// C++ compiler
    #[arg(long, value_name = "PROGRAM")]
    cxx: Option<String>,

    /// Link the executable without a program image
    #[arg(long)]
    nostate: bool,

    /// Runtime options; the first character separates them (",opt1,opt2")
    #[arg(long, value_name = "SPEC", allow_hyphen_values = true)]
    pl_options: Vec<String>,

    /// Linker options; the first character separates them
    #[arg(long, value_name = "SPEC", allow_hyphen_values = true)]
    ld_options: Vec<String>,

    /// Compiler options; the first character separates them
    #[arg(long, value_name = "SPEC", allow_hyphen_values = true)]
    cc_options: Vec<String>,

    /// Goal run at startup of the program image
    #[arg(long, value_name = "GOAL")]
    goal: Option<String>,

    /// Toplevel of the program image
    #[arg(long, value_name = "GOAL")]
    toplevel: Option<String>,

    /// Init file loaded by the program image
    #[arg(long, value_name = "FILE")]
    initfile: Option<String>,

    /// Define a preprocessor macro
    #[arg(short = 'D', value_name = "MACRO")]
    define: Vec<String>,

    /// Undefine a preprocessor macro
    #[arg(short = 'U', value_name = "MACRO")]
    undefine: Vec<String>,

    /// Add a header search directory
    #[arg(short = 'I', value_name = "DIR")]
    include_dir: Vec<String>,

    /// Add a library search directory
    #[arg(short = 'L', value_name = "DIR")]
    lib_dir: Vec<String>,

    /// Link a library
    #[arg(short = 'l', value_name = "LIB")]
    lib: Vec<String>,

    /// Link a library after all others
    #[arg(long = "last-lib", value_name = "LIB")]
    last_lib: Vec<String>,

    /// Directory for intermediate files
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Toolchain file to use instead of searching for plld.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level for diagnostics on stderr
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// `-D`, `-U` and `--cc-options` merged back into command-line order
fn ordered_compiler_options(matches: &ArgMatches) -> Vec<CompilerOption> {
    let mut ordered: Vec<(usize, CompilerOption)> = Vec::new();

    let mut collect = |id: &str, make: fn(String) -> CompilerOption| {
        let (Some(indices), Some(values)) =
            (matches.indices_of(id), matches.get_many::<String>(id))
        else {
            return;
        };
        for (index, value) in indices.zip(values) {
            ordered.push((index, make(value.clone())));
        }
    };
    collect("define", CompilerOption::Define);
    collect("undefine", CompilerOption::Undefine);
    collect("cc_options", CompilerOption::Spec);

    ordered.sort_by_key(|(index, _)| *index);
    ordered.into_iter().map(|(_, option)| option).collect()
}

fn build_args(cli: Cli, matches: &ArgMatches, env: &config::Config) -> BuildArgs {
    BuildArgs {
        files: cli.files,
        output: cli.output,
        verbose: cli.verbose > 0 || env.verbose,
        dry_run: cli.dry_run,
        debug: cli.debug,
        compile_only: cli.compile_only,
        no_state: cli.nostate,
        compiler: cli.cc,
        cxx_compiler: cli.cxx,
        linker: cli.ld,
        runtime: cli.pl,
        goal: cli.goal,
        toplevel: cli.toplevel,
        initfile: cli.initfile,
        compiler_options: ordered_compiler_options(matches),
        linker_options: cli.ld_options,
        runtime_options: cli.pl_options,
        include_dirs: cli.include_dir,
        lib_dirs: cli.lib_dir,
        libs: cli.lib,
        last_libs: cli.last_lib,
        work_dir: cli.work_dir,
        config: cli.config,
    }
}

fn setup_logging(level: Option<LogLevel>, verbose: u8, env_filter: Option<&str>) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = match (level, verbose, env_filter) {
        (Some(level), _, _) => EnvFilter::new(level.as_str()),
        (None, v, _) if v > 1 => EnvFilter::new("debug"),
        (None, _, Some(directive)) => EnvFilter::try_new(directive)?,
        (None, _, None) => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    };

    let formatter = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(formatter)
        .try_init()?;
    Ok(())
}

/// Process exit status for a failed run
fn exit_status(err: &anyhow::Error) -> u8 {
    let status = err
        .downcast_ref::<BuildError>()
        .map(BuildError::exit_status)
        .unwrap_or(1);
    u8::try_from(status).unwrap_or(1)
}

/// Parse the command line; `Err` carries the exit status, 1 for usage errors
fn parse_cli<I, T>(args: I) -> Result<(Cli, ArgMatches), u8>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let parsed = Cli::command()
        .try_get_matches_from(args)
        .and_then(|matches| Cli::from_arg_matches(&matches).map(|cli| (cli, matches)));
    parsed.map_err(|e| {
        let _ = e.print();
        // --help and --version are reported through the error path too
        if e.use_stderr() {
            1
        } else {
            0
        }
    })
}

fn main() -> ExitCode {
    let (cli, matches) = match parse_cli(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(status) => return ExitCode::from(status),
    };

    let env = config::Config::from_env();
    if env.no_color {
        colored::control::set_override(false);
    }
    if let Err(e) = setup_logging(cli.log_level, cli.verbose, env.log_filter.as_deref()) {
        eprintln!("{} {:#}", "warning:".yellow().bold(), e);
    }

    if cli.files.is_empty() {
        eprintln!("No input files.  Use plld --help.");
        return ExitCode::SUCCESS;
    }

    let interrupt = Interrupt::new();
    install_signal_handlers(&interrupt);

    let args = build_args(cli, &matches, &env);
    match build::run(args, interrupt) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            let status = exit_status(&e);
            eprintln!("{} {:#}", "error:".red().bold(), e);
            eprintln!("*** plld exit status {}", status);
            ExitCode::from(status)
        }
    }
}
