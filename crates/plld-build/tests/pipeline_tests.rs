//! End-to-end tests for the build pipeline
//!
//! Runs the pipeline against a fake toolchain of shell scripts that log their
//! arguments and write recognizable bytes to their outputs.
#![cfg(unix)]

use plld_build::{BuildError, BuildOptions, Builder, Interrupt, Stage, ToolchainSpec};
use pretty_assertions::assert_eq;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

/// A scratch directory with fake `cc` and `pl` scripts
struct FakeToolchain {
    dir: TempDir,
}

impl FakeToolchain {
    fn new() -> Self {
        Self::with_hooks("", "")
    }

    /// The compiler exits with status 2 for sources containing `pattern`
    fn with_compiler_failing_on(pattern: &str) -> Self {
        Self::with_hooks(&format!("case \"$args\" in *{}*) exit 2;; esac\n", pattern), "")
    }

    /// The linker writes a partial base executable and exits with status 1
    fn with_failing_linker() -> Self {
        Self::with_hooks(
            "case \"$args\" in *-lpl*) printf 'PART' > \"$out\"; exit 1;; esac\n",
            "",
        )
    }

    /// The runtime writes a partial program image and exits with status 3
    fn with_failing_runtime() -> Self {
        Self::with_hooks("", "printf 'PART' > \"$image\"\nexit 3\n")
    }

    /// The linker leaves the base executable as a FIFO. A background writer
    /// opens it, sends SIGTERM to the test process while the driver is
    /// reading it, and only then supplies the bytes.
    fn with_signal_during_output() -> Self {
        Self::with_hooks(
            "case \"$args\" in *-lpl*)\n\
               parent=$PPID\n\
               rm -f \"$out\"\n\
               mkfifo \"$out\"\n\
               ( exec 3>\"$out\"; kill -TERM \"$parent\"; sleep 1; printf 'NATIVE' >&3 ) &\n\
               exit 0;;\n\
             esac\n",
            "",
        )
    }

    /// `cc_hook` runs once `$args` and `$out` are known; `pl_hook` runs in
    /// the program-image branch once `$image` is known
    fn with_hooks(cc_hook: &str, pl_hook: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let log = format!("{}/log", root);

        let cc = format!(
            "#!/bin/sh\n\
             echo \"cc PLLD=$PLLD $*\" >> '{log}'\n\
             args=\"$*\"\n\
             out=\n\
             while [ $# -gt 0 ]; do\n\
               if [ \"$1\" = \"-o\" ]; then out=\"$2\"; shift; fi\n\
               shift\n\
             done\n\
             {cc_hook}\
             printf 'NATIVE' > \"$out\"\n"
        );
        let pl = format!(
            "#!/bin/sh\n\
             echo \"pl $*\" >> '{log}'\n\
             if [ \"$1\" = \"-dump-runtime-variables\" ]; then\n\
             cat <<'VARS'\n\
             CC=\"{root}/cc\";\n\
             PLBASE=\"{root}/base/\";\n\
             PLARCH=\"test-arch\";\n\
             PLLIBS=\"-lm\";\n\
             PLLDFLAGS=\"-rdynamic\";\n\
             VARS\n\
             exit 0\n\
             fi\n\
             for arg; do last=\"$arg\"; done\n\
             image=$(printf '%s' \"$last\" | sed -n \"s/.*qsave_program('\\([^']*\\)'.*/\\1/p\")\n\
             {pl_hook}\
             printf 'IMAGE' > \"$image\"\n"
        );

        write_script(&dir.path().join("cc"), &cc);
        write_script(&dir.path().join("pl"), &pl);
        Self { dir }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    fn exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    fn source(&self, name: &str) -> String {
        let path = self.path(name);
        fs::write(&path, "/* source */\n").unwrap();
        path
    }

    fn log(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn builder(&self, files: Vec<String>, options: BuildOptions) -> Builder {
        Builder::new(files)
            .with_options(options)
            .with_toolchain(ToolchainSpec {
                runtime: Some(self.path("pl")),
                output: Some(self.path("app")),
                work_dir: Some(self.dir.path().to_path_buf()),
                ..ToolchainSpec::default()
            })
    }

    /// Intermediate files still present in the scratch directory
    fn leftover_temporaries(&self) -> Vec<String> {
        fs::read_dir(self.dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| {
                name.starts_with("ctmp-") || name.starts_with("pltmp-") || name.ends_with(".o")
            })
            .collect()
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn test_compile_only_keeps_object() {
    let tools = FakeToolchain::new();
    let mut options = BuildOptions::new();
    options.compile_only = true;

    let summary = tools
        .builder(vec![tools.source("main.c")], options)
        .run()
        .unwrap();

    assert_eq!(summary.compiled_objects, 1);
    assert_eq!(summary.output, None);
    assert!(tools.exists("main.o"));
    assert!(!tools.exists("app"));
    assert!(!tools.log().iter().any(|line| line.contains("-lpl")));
}

#[test]
fn test_full_build_bundles_and_cleans_up() {
    let tools = FakeToolchain::new();
    let files = vec![tools.source("main.c"), tools.source("app.pl")];

    let summary = tools.builder(files, BuildOptions::new()).run().unwrap();

    assert_eq!(
        summary.stages,
        vec![
            Stage::Classified,
            Stage::Compiled,
            Stage::Linked,
            Stage::Bundled,
            Stage::Cleaned
        ]
    );
    assert_eq!(summary.removed_temp_files, 3);
    assert_eq!(summary.output, Some(tools.path("app")));
    assert_eq!(fs::read(tools.path("app")).unwrap(), b"NATIVEIMAGE");
    let mode = fs::metadata(tools.path("app")).unwrap().permissions().mode();
    assert_ne!(mode & 0o100, 0);
    assert!(tools.leftover_temporaries().is_empty());
}

#[test]
fn test_tools_see_plld_marker() {
    let tools = FakeToolchain::new();
    let mut options = BuildOptions::new();
    options.compile_only = true;

    tools
        .builder(vec![tools.source("main.c")], options)
        .run()
        .unwrap();

    let log = tools.log();
    assert!(log.iter().any(|line| line.starts_with("cc PLLD=true -c ")));
}

#[test]
fn test_link_places_libraries_after_search_dirs() {
    let tools = FakeToolchain::new();
    let mut options = BuildOptions::new();
    options.libs.append("foo");
    options.last_libs.append("last");
    options.lib_dirs.append("/usr/local/lib");

    tools
        .builder(vec![tools.source("main.c")], options)
        .run()
        .unwrap();

    let log = tools.log();
    let link_line = log.iter().find(|line| line.contains("-lpl")).unwrap();
    let args: Vec<&str> = link_line.split_whitespace().collect();
    let position = |arg: &str| args.iter().position(|a| *a == arg).unwrap();

    let last_search_dir = args.iter().rposition(|a| a.starts_with("-L")).unwrap();
    assert!(position("-lpl") > last_search_dir);
    assert!(position("-lfoo") > position("-lpl"));
    assert!(position("-lm") > position("-lfoo"));
    assert!(position("-llast") > position("-lm"));
    assert!(position("-rdynamic") < position(tools.path("main.o").as_str()));
    assert_eq!(
        args[position("-L/usr/local/lib") - 1],
        format!("-L{}/base/runtime/test-arch", tools.dir.path().display())
    );
}

#[test]
fn test_compiler_failure_cleans_up_and_stops() {
    let tools = FakeToolchain::with_compiler_failing_on("bad.c");
    let files = vec![
        tools.source("good.c"),
        tools.source("bad.c"),
        tools.source("app.pl"),
    ];

    let err = tools.builder(files, BuildOptions::new()).run().unwrap_err();

    assert!(matches!(err, BuildError::ToolFailed { code: 2, .. }));
    assert_eq!(err.exit_status(), 1);
    assert!(!tools.exists("good.o"));
    assert!(tools.leftover_temporaries().is_empty());
    let log = tools.log();
    assert!(!log.iter().any(|line| line.contains("-lpl")));
    assert!(!log.iter().any(|line| line.contains("qsave_program")));
}

#[test]
fn test_unrecognized_input_runs_no_tool() {
    let tools = FakeToolchain::new();
    let files = vec![tools.source("main.c"), tools.path("notes.xyz")];

    let err = tools.builder(files, BuildOptions::new()).run().unwrap_err();

    assert!(matches!(err, BuildError::UnrecognizedInput { ref path } if path.ends_with("notes.xyz")));
    assert!(tools.log().is_empty());
}

#[test]
fn test_nostate_links_output_directly() {
    let tools = FakeToolchain::new();
    let mut options = BuildOptions::new();
    options.no_state = true;

    let summary = tools
        .builder(vec![tools.source("main.c"), tools.source("app.pl")], options)
        .run()
        .unwrap();

    assert_eq!(summary.stages.last(), Some(&Stage::Cleaned));
    assert!(!summary.stages.contains(&Stage::Bundled));
    assert_eq!(fs::read(tools.path("app")).unwrap(), b"NATIVE");
    assert!(!tools.log().iter().any(|line| line.contains("qsave_program")));
    assert!(tools.leftover_temporaries().is_empty());
}

#[test]
fn test_dry_run_only_queries_runtime() {
    let tools = FakeToolchain::new();
    let mut options = BuildOptions::new();
    options.dry_run = true;

    let summary = tools
        .builder(vec![tools.source("main.c"), tools.source("app.pl")], options)
        .run()
        .unwrap();

    assert_eq!(summary.stages.len(), 5);
    assert_eq!(tools.log(), vec!["pl -dump-runtime-variables".to_string()]);
    assert!(!tools.exists("app"));
    assert!(!tools.exists("main.o"));
}

#[test]
fn test_pending_interrupt_aborts_with_signal_status() {
    let tools = FakeToolchain::new();
    let interrupt = Interrupt::new();
    interrupt.raise(15);

    let err = tools
        .builder(vec![tools.source("main.c")], BuildOptions::new())
        .with_interrupt(interrupt)
        .run()
        .unwrap_err();

    assert!(matches!(err, BuildError::Interrupted { signal: 15 }));
    assert_eq!(err.exit_status(), 15);
    assert!(!tools.log().iter().any(|line| line.starts_with("cc ")));
}

#[test]
fn test_missing_runtime_is_spawn_error() {
    let tools = FakeToolchain::new();
    let err = Builder::new([tools.source("main.c")])
        .with_toolchain(ToolchainSpec {
            runtime: Some(tools.path("no-such-runtime")),
            ..ToolchainSpec::default()
        })
        .run()
        .unwrap_err();

    assert!(matches!(err, BuildError::Spawn { .. }));
}

#[test]
fn test_dry_run_keeps_existing_files() {
    let tools = FakeToolchain::new();
    fs::write(tools.path("main.o"), "user object").unwrap();
    let mut options = BuildOptions::new();
    options.dry_run = true;

    let summary = tools
        .builder(vec![tools.source("main.c"), tools.source("app.pl")], options)
        .run()
        .unwrap();

    assert_eq!(summary.removed_temp_files, 0);
    assert_eq!(fs::read_to_string(tools.path("main.o")).unwrap(), "user object");
}

#[test]
fn test_linker_failure_cleans_up() {
    let tools = FakeToolchain::with_failing_linker();
    let files = vec![tools.source("main.c"), tools.source("app.pl")];

    let err = tools.builder(files, BuildOptions::new()).run().unwrap_err();

    assert!(matches!(err, BuildError::ToolFailed { code: 1, .. }));
    assert!(tools.leftover_temporaries().is_empty());
    assert!(!tools.exists("app"));
    assert!(!tools.log().iter().any(|line| line.contains("qsave_program")));
}

#[test]
fn test_runtime_failure_cleans_up() {
    let tools = FakeToolchain::with_failing_runtime();
    let files = vec![tools.source("main.c"), tools.source("app.pl")];

    let err = tools.builder(files, BuildOptions::new()).run().unwrap_err();

    assert!(matches!(err, BuildError::ToolFailed { code: 3, .. }));
    assert!(tools.leftover_temporaries().is_empty());
    assert!(!tools.exists("app"));
    assert!(tools.log().iter().any(|line| line.contains("qsave_program")));
}

// The only test in this binary that installs the process-wide handlers
#[test]
fn test_signal_while_writing_output_is_fatal() {
    let tools = FakeToolchain::with_signal_during_output();
    let interrupt = Interrupt::new();
    assert!(plld_build::install_signal_handlers(&interrupt));
    let files = vec![tools.source("main.c"), tools.source("app.pl")];

    let err = tools
        .builder(files, BuildOptions::new())
        .with_interrupt(interrupt.clone())
        .run()
        .unwrap_err();

    assert_eq!(interrupt.raised(), Some(15));
    assert!(matches!(err, BuildError::Interrupted { signal: 15 }));
    assert_eq!(err.exit_status(), 15);
    assert!(!tools.exists("app"));
    assert!(tools.leftover_temporaries().is_empty());
}
