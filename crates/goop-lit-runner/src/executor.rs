//! Running a test's commands through a shell

use goop_lit_ast::LitError;
use goop_lit_suite::{DEFAULT_SHELL, SuiteDescriptor};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Result of running one test script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitStatus {
    /// `None` when the shell was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExitStatus {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Run a prepared script file
///
/// Split out from the runner so tests can observe exactly what would be
/// executed without spawning processes.
pub trait ScriptExecutor {
    /// # Errors
    ///
    /// Returns `LitError::Io` if the script cannot be started
    fn execute(&self, script: &Path, cwd: &Path) -> Result<ExitStatus, LitError>;
}

/// Runs scripts with an external shell program
#[derive(Debug, Clone)]
pub struct ExternalShell {
    shell: PathBuf,
}

impl ExternalShell {
    #[must_use]
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self { shell: shell.into() }
    }

    /// Pick the shell for a suite
    ///
    /// Without pipefail this is the suite's shell. With pipefail the shell
    /// must accept `set -o pipefail`; when the suite uses the default
    /// `/bin/sh`, `bash` from `PATH` is preferred, as lit does.
    ///
    /// # Errors
    ///
    /// Returns `LitError::UnsupportedFormat` if pipefail is requested and no
    /// candidate shell supports it
    pub fn for_suite(suite: &SuiteDescriptor) -> Result<Self, LitError> {
        if !suite.pipefail() {
            return Ok(Self::new(suite.shell()));
        }

        let mut candidates = Vec::new();
        if suite.shell() == Path::new(DEFAULT_SHELL) {
            candidates.extend(find_in_path("bash"));
        }
        candidates.push(suite.shell().to_path_buf());

        let shell = candidates
            .into_iter()
            .find(|shell| supports_pipefail(shell))
            .ok_or_else(|| LitError::UnsupportedFormat {
                message: format!(
                    "pipefail is enabled but shell {} does not support 'set -o pipefail'",
                    suite.shell().display()
                ),
            })?;
        tracing::debug!(shell = %shell.display(), "using pipefail shell");
        Ok(Self::new(shell))
    }

    #[must_use]
    pub fn shell(&self) -> &Path {
        &self.shell
    }
}

/// First executable file called `name` on `PATH`
fn find_in_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

fn supports_pipefail(shell: &Path) -> bool {
    Command::new(shell)
        .args(["-c", "set -o pipefail"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

impl ScriptExecutor for ExternalShell {
    fn execute(&self, script: &Path, cwd: &Path) -> Result<ExitStatus, LitError> {
        let output = Command::new(&self.shell)
            .arg(script)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| LitError::io(&self.shell, e))?;

        Ok(ExitStatus {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Join commands into one shell script; each command runs only if the
/// previous one succeeded
#[must_use]
pub fn render_script(commands: &[String], pipefail: bool) -> String {
    let mut script = String::new();
    if pipefail {
        script.push_str("set -o pipefail;\n");
    }
    if commands.is_empty() {
        return script;
    }
    script.push_str("{ ");
    script.push_str(&commands.join("; } &&\n{ "));
    script.push_str("; }\n");
    script
}

/// Write `contents` to `path`, creating parent directories
///
/// # Errors
///
/// Returns `LitError::Io` if the directory or file cannot be written
pub fn write_script(path: &Path, contents: &str) -> Result<(), LitError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| LitError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| LitError::io(path, e))
}
