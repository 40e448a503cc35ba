//! The suite descriptor: how to find and run the tests of one tree

use crate::site_config::SiteConfig;
use crate::substitution::{Substitution, SubstitutionTable};
use goop_lit_ast::LitError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const GOOP_SUITE_NAME: &str = "Goop Tests";
pub const GOOP_SUFFIXES: [&str; 2] = [".go", ".c"];
pub const GOOP_TOK_TOKEN: &str = "%goop-tok";
pub const GOOP_AST_TOKEN: &str = "%goop-ast";
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// How each test file is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutionFormat {
    /// RUN lines form a shell script; the test passes when it exits 0
    ShellTest,
}

/// Immutable description of a test suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteDescriptor {
    name: String,
    execution_format: ExecutionFormat,
    use_external_shell: bool,
    suffixes: BTreeSet<String>,
    source_root: PathBuf,
    exec_root: PathBuf,
    substitutions: SubstitutionTable,
    available_features: BTreeSet<String>,
    shell: PathBuf,
    pipefail: bool,
}

impl SuiteDescriptor {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SuiteBuilder {
        SuiteBuilder::new(name)
    }

    /// The Goop suite: `.go` and `.c` files, run through an external shell,
    /// with `%goop-tok` and `%goop-ast` pointing into the bin root
    ///
    /// Performs no I/O; `config` must already be resolved to absolute paths.
    ///
    /// # Errors
    ///
    /// Returns `LitError::RelativePath` if a root is not absolute
    pub fn goop(config: &SiteConfig) -> Result<Self, LitError> {
        let bin_root = &config.goop_bin_root;
        require_absolute("goop_bin_root", bin_root)?;

        let source_root = config
            .test_source_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let exec_root = config
            .test_exec_root
            .clone()
            .unwrap_or_else(|| bin_root.join("test"));

        Self::builder(GOOP_SUITE_NAME)
            .external_shell(true)
            .suffixes(GOOP_SUFFIXES)
            .source_root(source_root)
            .exec_root(exec_root)
            .tool(GOOP_TOK_TOKEN, bin_root.join("goop-tok"))
            .tool(GOOP_AST_TOKEN, bin_root.join("goop-ast"))
            .features(config.available_features.iter().cloned())
            .shell(config.shell.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_SHELL)))
            .pipefail(config.pipefail)
            .build()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn execution_format(&self) -> ExecutionFormat {
        self.execution_format
    }

    #[must_use]
    pub const fn use_external_shell(&self) -> bool {
        self.use_external_shell
    }

    #[must_use]
    pub const fn suffixes(&self) -> &BTreeSet<String> {
        &self.suffixes
    }

    #[must_use]
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    #[must_use]
    pub fn exec_root(&self) -> &Path {
        &self.exec_root
    }

    #[must_use]
    pub const fn substitutions(&self) -> &SubstitutionTable {
        &self.substitutions
    }

    #[must_use]
    pub const fn available_features(&self) -> &BTreeSet<String> {
        &self.available_features
    }

    #[must_use]
    pub fn shell(&self) -> &Path {
        &self.shell
    }

    #[must_use]
    pub const fn pipefail(&self) -> bool {
        self.pipefail
    }

    /// Whether `path` has one of the suite's suffixes
    #[must_use]
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.suffixes.contains(&format!(".{ext}")))
    }

    /// Check that every substituted executable exists
    ///
    /// # Errors
    ///
    /// Returns `LitError::MissingTool` for the first replacement path that
    /// is not a file
    pub fn verify_tools(&self) -> Result<(), LitError> {
        for entry in self.substitutions.iter() {
            let path = Path::new(entry.replacement());
            if !path.is_file() {
                return Err(LitError::MissingTool {
                    token: entry.pattern().to_string(),
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }

    /// Canonical JSON form; identical inputs give identical bytes
    ///
    /// # Errors
    ///
    /// Returns `LitError::Config` if a path is not valid UTF-8
    pub fn to_json(&self) -> Result<String, LitError> {
        serde_json::to_string_pretty(self).map_err(|e| LitError::Config {
            path: self.source_root.clone(),
            message: e.to_string(),
        })
    }
}

/// Step-by-step construction of a [`SuiteDescriptor`]
#[derive(Debug, Clone)]
pub struct SuiteBuilder {
    name: String,
    use_external_shell: bool,
    suffixes: BTreeSet<String>,
    source_root: PathBuf,
    exec_root: PathBuf,
    tools: Vec<(String, PathBuf)>,
    available_features: BTreeSet<String>,
    shell: PathBuf,
    pipefail: bool,
}

impl SuiteBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            use_external_shell: true,
            suffixes: BTreeSet::new(),
            source_root: PathBuf::new(),
            exec_root: PathBuf::new(),
            tools: Vec::new(),
            available_features: BTreeSet::new(),
            shell: PathBuf::from(DEFAULT_SHELL),
            pipefail: false,
        }
    }

    #[must_use]
    pub const fn external_shell(mut self, external: bool) -> Self {
        self.use_external_shell = external;
        self
    }

    #[must_use]
    pub fn suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suffixes.extend(suffixes.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = root.into();
        self
    }

    #[must_use]
    pub fn exec_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.exec_root = root.into();
        self
    }

    /// Declare a substitution whose replacement is an executable path
    #[must_use]
    pub fn tool(mut self, token: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.tools.push((token.into(), path.into()));
        self
    }

    #[must_use]
    pub fn features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_features.extend(features.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    #[must_use]
    pub const fn pipefail(mut self, pipefail: bool) -> Self {
        self.pipefail = pipefail;
        self
    }

    /// Validate and freeze the descriptor
    ///
    /// # Errors
    ///
    /// Returns `LitError::RelativePath` for a relative root or tool path, and
    /// `LitError::InvalidSubstitution` for bad or duplicate tokens or a
    /// suffix without a leading dot
    pub fn build(self) -> Result<SuiteDescriptor, LitError> {
        require_absolute("source root", &self.source_root)?;
        require_absolute("exec root", &self.exec_root)?;

        if let Some(bad) = self.suffixes.iter().find(|s| s.len() < 2 || !s.starts_with('.')) {
            return Err(LitError::InvalidSubstitution {
                message: format!("suffix {bad:?} must be '.' followed by an extension"),
            });
        }

        let mut entries = Vec::with_capacity(self.tools.len());
        for (token, path) in self.tools {
            require_absolute(&format!("replacement for {token}"), &path)?;
            entries.push(Substitution::new(token, path.to_string_lossy().into_owned()));
        }
        let substitutions = SubstitutionTable::new(entries)?;

        Ok(SuiteDescriptor {
            name: self.name,
            execution_format: ExecutionFormat::ShellTest,
            use_external_shell: self.use_external_shell,
            suffixes: self.suffixes,
            source_root: self.source_root,
            exec_root: self.exec_root,
            substitutions,
            available_features: self.available_features,
            shell: self.shell,
            pipefail: self.pipefail,
        })
    }
}

fn require_absolute(what: &str, path: &Path) -> Result<(), LitError> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(LitError::RelativePath {
            what: what.to_string(),
            path: path.to_path_buf(),
        })
    }
}
