//! Test execution engine for goop-lit
//!
//! Takes a [`SuiteDescriptor`], finds the tests it describes, and runs each
//! one: parse its directives, substitute `%` tokens in its `RUN:` lines,
//! hand the resulting script to an external shell, and judge the exit code.

use goop_lit_ast::{LitError, TestScript};
use goop_lit_parser::Parser;
use goop_lit_suite::{Substitution, SubstitutionTable, SuiteDescriptor};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub mod discovery;
pub mod executor;

pub use discovery::{OUTPUT_DIR, TestFile, discover};
pub use executor::{ExitStatus, ExternalShell, ScriptExecutor};

/// Outcome category of a single test
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TestStatus {
    Pass,
    Fail,
    /// Failed, and was expected to
    XFail,
    /// Passed, but was expected to fail
    XPass,
    /// A `REQUIRES:` feature is not available
    Unsupported,
    /// The test could not be run at all
    Unresolved,
}

impl TestStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::XFail => "XFAIL",
            Self::XPass => "XPASS",
            Self::Unsupported => "UNSUPPORTED",
            Self::Unresolved => "UNRESOLVED",
        }
    }

    /// Whether this status makes the whole run fail
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Fail | Self::XPass | Self::Unresolved)
    }
}

/// Everything recorded about one test run
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub test: TestFile,
    pub status: TestStatus,
    /// Commands after substitution, in execution order
    pub commands: Vec<String>,
    /// Exit status of the shell, when it ran
    pub exit: Option<ExitStatus>,
    /// Why the test was not run or not judged by its exit code
    pub message: Option<String>,
    pub duration: Duration,
}

/// Per-test locations derived from the suite roots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPaths {
    pub source: PathBuf,
    pub source_dir: PathBuf,
    /// Working directory for the test's commands
    pub exec_dir: PathBuf,
    /// `%t`
    pub temp_file: PathBuf,
    /// `%T`
    pub temp_dir: PathBuf,
    pub script: PathBuf,
}

impl TestPaths {
    #[must_use]
    pub fn new(suite: &SuiteDescriptor, test: &TestFile) -> Self {
        let source_dir = test.path.parent().map(Path::to_path_buf).unwrap_or_default();
        let exec_dir = match test.relative.parent() {
            Some(rel_dir) if !rel_dir.as_os_str().is_empty() => suite.exec_root().join(rel_dir),
            _ => suite.exec_root().to_path_buf(),
        };
        let temp_dir = exec_dir.join(OUTPUT_DIR);
        let file_name = test.path.file_name().unwrap_or_default().to_string_lossy();
        let temp_file = temp_dir.join(format!("{file_name}.tmp"));
        let script = temp_dir.join(format!("{file_name}.script"));

        Self {
            source: test.path.clone(),
            source_dir,
            exec_dir,
            temp_file,
            temp_dir,
            script,
        }
    }

    /// `%s`, `%S`, `%p`, `%t`, `%T` and `%%` for this test
    #[must_use]
    pub fn builtin_substitutions(&self) -> Vec<Substitution> {
        let lossy = |path: &Path| path.to_string_lossy().into_owned();
        vec![
            Substitution::new("%s", lossy(&self.source)),
            Substitution::new("%S", lossy(&self.source_dir)),
            Substitution::new("%p", lossy(&self.source_dir)),
            Substitution::new("%t", lossy(&self.temp_file)),
            Substitution::new("%T", lossy(&self.temp_dir)),
            Substitution::new("%%", "%"),
        ]
    }
}

/// Observer for test progress
pub trait TestReporter {
    /// Called once tests have been discovered
    fn on_suite_start(&mut self, _suite: &SuiteDescriptor, _test_count: usize) {}

    /// Called after each test with its 1-based position
    fn on_test_complete(&mut self, index: usize, total: usize, outcome: &TestOutcome);

    /// Called when all tests have completed
    fn on_run_complete(&mut self, _summary: &RunSummary) {}
}

/// Status counts for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub xfailed: usize,
    pub xpassed: usize,
    pub unsupported: usize,
    pub unresolved: usize,
    pub duration: Duration,
}

impl RunSummary {
    #[must_use]
    pub fn from_outcomes(outcomes: &[TestOutcome], duration: Duration) -> Self {
        let mut summary = Self {
            duration,
            ..Self::default()
        };
        for outcome in outcomes {
            let slot = match outcome.status {
                TestStatus::Pass => &mut summary.passed,
                TestStatus::Fail => &mut summary.failed,
                TestStatus::XFail => &mut summary.xfailed,
                TestStatus::XPass => &mut summary.xpassed,
                TestStatus::Unsupported => &mut summary.unsupported,
                TestStatus::Unresolved => &mut summary.unresolved,
            };
            *slot += 1;
        }
        summary
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.xfailed + self.xpassed + self.unsupported + self.unresolved
    }

    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.failed + self.xpassed + self.unresolved > 0
    }
}

/// Runs the tests of one suite, one after another
pub struct Runner<E = ExternalShell> {
    suite: SuiteDescriptor,
    executor: E,
}

impl Runner<ExternalShell> {
    /// Load a suite for execution with its configured external shell
    ///
    /// Fails before any test runs if the suite cannot be executed or one of
    /// its substituted tools is missing.
    ///
    /// # Errors
    ///
    /// Returns `LitError::UnsupportedFormat` for suites that ask for an
    /// in-process shell or for pipefail without a shell that supports it,
    /// and `LitError::MissingTool` for a missing executable
    pub fn load(suite: SuiteDescriptor) -> Result<Self, LitError> {
        let executor = ExternalShell::for_suite(&suite)?;
        Self::with_executor(suite, executor)
    }
}

impl<E: ScriptExecutor> Runner<E> {
    /// Load a suite with a custom script executor
    ///
    /// # Errors
    ///
    /// Same as [`Runner::load`]
    pub fn with_executor(suite: SuiteDescriptor, executor: E) -> Result<Self, LitError> {
        if !suite.use_external_shell() {
            return Err(LitError::UnsupportedFormat {
                message: format!(
                    "suite '{}' requests an in-process shell; only external shell execution is available",
                    suite.name()
                ),
            });
        }
        suite.verify_tools()?;
        tracing::info!(
            suite = suite.name(),
            source_root = %suite.source_root().display(),
            exec_root = %suite.exec_root().display(),
            "loaded suite"
        );
        Ok(Self { suite, executor })
    }

    #[must_use]
    pub const fn suite(&self) -> &SuiteDescriptor {
        &self.suite
    }

    /// Discover the tests under `paths` (the source root when empty)
    ///
    /// # Errors
    ///
    /// Returns `LitError::Io` if a path cannot be read
    pub fn discover(&self, paths: &[PathBuf]) -> Result<Vec<TestFile>, LitError> {
        if paths.is_empty() {
            discover(&self.suite, &[self.suite.source_root().to_path_buf()])
        } else {
            discover(&self.suite, paths)
        }
    }

    /// Run `tests` in order, reporting each outcome as it completes
    pub fn run(&self, tests: &[TestFile], reporter: &mut dyn TestReporter) -> Vec<TestOutcome> {
        let started = Instant::now();
        reporter.on_suite_start(&self.suite, tests.len());

        let mut outcomes = Vec::with_capacity(tests.len());
        for (index, test) in tests.iter().enumerate() {
            let outcome = self.run_test(test);
            reporter.on_test_complete(index + 1, tests.len(), &outcome);
            outcomes.push(outcome);
        }

        reporter.on_run_complete(&RunSummary::from_outcomes(&outcomes, started.elapsed()));
        outcomes
    }

    /// Run a single test
    #[tracing::instrument(skip_all, fields(test = %test.display_name()))]
    pub fn run_test(&self, test: &TestFile) -> TestOutcome {
        let started = Instant::now();
        let mut outcome = TestOutcome {
            test: test.clone(),
            status: TestStatus::Unresolved,
            commands: Vec::new(),
            exit: None,
            message: None,
            duration: Duration::ZERO,
        };

        match self.execute_test(test, &mut outcome) {
            Ok(status) => outcome.status = status,
            Err(err) => {
                outcome.status = TestStatus::Unresolved;
                outcome.message = Some(err.to_string());
            }
        }

        outcome.duration = started.elapsed();
        tracing::debug!(status = outcome.status.label(), "test finished");
        outcome
    }

    fn execute_test(&self, test: &TestFile, outcome: &mut TestOutcome) -> Result<TestStatus, LitError> {
        let script = Parser::parse_file(&test.path)?;

        let missing = self.missing_features(&script);
        if !missing.is_empty() {
            outcome.message = Some(format!("missing features: {}", missing.join(", ")));
            return Ok(TestStatus::Unsupported);
        }
        if script.is_empty() {
            outcome.message = Some("test has no 'RUN:' line".to_string());
            return Ok(TestStatus::Unresolved);
        }

        let paths = TestPaths::new(&self.suite, test);
        outcome.commands = self.substitute(&script, &paths)?;

        let body = executor::render_script(&outcome.commands, self.suite.pipefail());
        executor::write_script(&paths.script, &body)?;
        let exit = self.executor.execute(&paths.script, &paths.exec_dir)?;

        let expected_failure = self.is_expected_failure(&script);
        let status = match (exit.success(), expected_failure) {
            (true, false) => TestStatus::Pass,
            (true, true) => TestStatus::XPass,
            (false, false) => TestStatus::Fail,
            (false, true) => TestStatus::XFail,
        };
        outcome.exit = Some(exit);
        Ok(status)
    }

    /// Apply built-in and suite substitutions to every RUN line
    ///
    /// # Errors
    ///
    /// Returns `LitError::InvalidSubstitution` if the suite redefines a
    /// built-in token
    pub fn substitute(&self, script: &TestScript, paths: &TestPaths) -> Result<Vec<String>, LitError> {
        let table = SubstitutionTable::new(paths.builtin_substitutions())?
            .extended(self.suite.substitutions().iter().cloned())?;
        Ok(script.commands().map(|command| table.apply(command)).collect())
    }

    fn missing_features(&self, script: &TestScript) -> Vec<String> {
        script
            .requires
            .iter()
            .filter(|feature| !self.suite.available_features().contains(feature.as_str()))
            .cloned()
            .collect()
    }

    fn is_expected_failure(&self, script: &TestScript) -> bool {
        script
            .xfails
            .iter()
            .any(|feature| feature == "*" || self.suite.available_features().contains(feature.as_str()))
    }
}
