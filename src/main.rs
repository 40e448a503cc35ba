//! goop-lit CLI
//!
//! Runs the Goop shell tests: `goop-lit [OPTIONS] [PATH]...`

use anyhow::{Context, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use goop_lit_runner::{RunSummary, Runner, TestOutcome, TestReporter};
use goop_lit_suite::{SITE_CONFIG_FILE, SiteConfig, SuiteDescriptor};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

fn cli() -> Command {
    Command::new("goop-lit")
        .version("0.1.0")
        .about("Run the Goop shell tests")
        .arg(
            Arg::new("site-config")
                .long("site-config")
                .value_name("FILE")
                .help("Site configuration written by the build (lit.site.json)")
                .num_args(1),
        )
        .arg(
            Arg::new("bin-root")
                .long("bin-root")
                .value_name("DIR")
                .help("Directory holding goop-tok and goop-ast")
                .num_args(1),
        )
        .arg(
            Arg::new("source-root")
                .long("source-root")
                .value_name("DIR")
                .help("Root of the test sources")
                .num_args(1),
        )
        .arg(
            Arg::new("exec-root")
                .long("exec-root")
                .value_name("DIR")
                .help("Root for per-test scratch output")
                .num_args(1),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Show commands and output of failing tests")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only report failures")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .arg(
            Arg::new("show-suite")
                .long("show-suite")
                .help("Print the resolved suite description as JSON and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("paths")
                .value_name("PATH")
                .help("Test files or directories (defaults to the source root)")
                .num_args(0..),
        )
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();

    let matches = cli().get_matches();
    match run(&matches) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("goop-lit: {e:#}");
            process::exit(2);
        }
    }
}

fn run(matches: &ArgMatches) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let paths: Vec<PathBuf> = matches
        .get_many::<String>("paths")
        .map(|values| values.map(PathBuf::from).collect())
        .unwrap_or_default();

    let config = site_config(matches, &paths, &cwd)?;
    let suite = SuiteDescriptor::goop(&config)?;

    if matches.get_flag("show-suite") {
        println!("{}", suite.to_json()?);
        return Ok(0);
    }

    let runner = Runner::load(suite)?;
    let tests = runner.discover(&paths)?;
    tracing::debug!(count = tests.len(), "running tests");

    let mut reporter = ConsoleReporter::new(
        std::io::stdout(),
        matches.get_flag("verbose"),
        matches.get_flag("quiet"),
    );
    let outcomes = runner.run(&tests, &mut reporter);

    let failed = outcomes.iter().any(|outcome| outcome.status.is_failure());
    Ok(i32::from(failed))
}

/// Build the site configuration from `--site-config`, a `lit.site.json`
/// next to the tests, or `--bin-root`, with command line roots on top
fn site_config(matches: &ArgMatches, paths: &[PathBuf], cwd: &Path) -> anyhow::Result<SiteConfig> {
    let absolute = |value: &String| {
        let path = PathBuf::from(value);
        if path.is_absolute() { path } else { cwd.join(path) }
    };
    let bin_root = matches.get_one::<String>("bin-root").map(absolute);
    let source_root = matches.get_one::<String>("source-root").map(absolute);
    let exec_root = matches.get_one::<String>("exec-root").map(absolute);

    let file = match matches.get_one::<String>("site-config") {
        Some(path) => Some(absolute(path)),
        None => find_site_config(paths, cwd),
    };

    let config = match (file, bin_root) {
        (Some(file), bin_root) => SiteConfig::load(&file)
            .with_context(|| format!("loading {}", file.display()))?
            .with_overrides(bin_root, source_root, exec_root),
        (None, Some(bin_root)) => SiteConfig::new(bin_root)
            .with_overrides(None, source_root, exec_root)
            .resolve_against(cwd),
        (None, None) => bail!("no {SITE_CONFIG_FILE} found; pass --site-config or --bin-root"),
    };
    Ok(config)
}

/// Look for the site configuration in the first directory given, then in
/// the working directory
fn find_site_config(paths: &[PathBuf], cwd: &Path) -> Option<PathBuf> {
    let first_dir = paths.first().map(|p| cwd.join(p)).filter(|p| p.is_dir());
    first_dir
        .into_iter()
        .chain(std::iter::once(cwd.to_path_buf()))
        .map(|dir| dir.join(SITE_CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// lit-style progress output
struct ConsoleReporter<W: Write> {
    out: W,
    suite_name: String,
    verbose: bool,
    quiet: bool,
}

impl<W: Write> ConsoleReporter<W> {
    const fn new(out: W, verbose: bool, quiet: bool) -> Self {
        Self {
            out,
            suite_name: String::new(),
            verbose,
            quiet,
        }
    }

    fn write_details(&mut self, outcome: &TestOutcome) -> std::io::Result<()> {
        let banner = "*".repeat(20);
        writeln!(
            self.out,
            "{banner} TEST '{} :: {}' {} {banner}",
            self.suite_name,
            outcome.test.display_name(),
            outcome.status.label()
        )?;
        if let Some(message) = &outcome.message {
            writeln!(self.out, "{message}")?;
        }
        if !outcome.commands.is_empty() {
            writeln!(self.out, "Script:\n--")?;
            for command in &outcome.commands {
                writeln!(self.out, "{command}")?;
            }
            writeln!(self.out, "--")?;
        }
        if let Some(exit) = &outcome.exit {
            match exit.code {
                Some(code) => writeln!(self.out, "Exit Code: {code}")?,
                None => writeln!(self.out, "Exit Code: terminated by signal")?,
            }
            if !exit.stdout.is_empty() {
                writeln!(self.out, "\nCommand Output (stdout):\n--\n{}--", exit.stdout)?;
            }
            if !exit.stderr.is_empty() {
                writeln!(self.out, "\nCommand Output (stderr):\n--\n{}--", exit.stderr)?;
            }
        }
        writeln!(self.out, "{banner}")
    }
}

impl<W: Write> TestReporter for ConsoleReporter<W> {
    fn on_suite_start(&mut self, suite: &SuiteDescriptor, test_count: usize) {
        self.suite_name = suite.name().to_string();
        if !self.quiet {
            let _ = writeln!(self.out, "-- Testing: {test_count} tests --");
        }
    }

    fn on_test_complete(&mut self, index: usize, total: usize, outcome: &TestOutcome) {
        if self.quiet && !outcome.status.is_failure() {
            return;
        }
        let _ = writeln!(
            self.out,
            "{}: {} :: {} ({index} of {total})",
            outcome.status.label(),
            self.suite_name,
            outcome.test.display_name()
        );
        if self.verbose && outcome.status.is_failure() {
            let _ = self.write_details(outcome);
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        let _ = writeln!(self.out, "\nTesting Time: {:.2}s", summary.duration.as_secs_f64());
        let rows = [
            ("Passed", summary.passed),
            ("Expectedly Failed", summary.xfailed),
            ("Unsupported", summary.unsupported),
            ("Unresolved", summary.unresolved),
            ("Unexpectedly Passed", summary.xpassed),
            ("Failed", summary.failed),
        ];
        for (label, count) in rows {
            if count > 0 {
                let _ = writeln!(self.out, "  {label}: {count}");
            }
        }
        let _ = self.out.flush();
    }
}
