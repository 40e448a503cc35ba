//! Build-system supplied site configuration
//!
//! The build writes a small JSON file (conventionally `lit.site.json`) next
//! to the test sources:
//!
//! ```json
//! { "goop_bin_root": "/build/bin" }
//! ```
//!
//! Relative paths in the file are taken relative to the file's directory,
//! and `test_source_root` defaults to that directory.

use goop_lit_ast::LitError;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Conventional file name looked up by the CLI
pub const SITE_CONFIG_FILE: &str = "lit.site.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory holding the built `goop-tok` and `goop-ast` binaries
    pub goop_bin_root: PathBuf,
    pub test_source_root: Option<PathBuf>,
    /// Defaults to `<goop_bin_root>/test`
    pub test_exec_root: Option<PathBuf>,
    /// External shell used to run test scripts, `/bin/sh` when unset
    pub shell: Option<PathBuf>,
    #[serde(default)]
    pub pipefail: bool,
    #[serde(default)]
    pub available_features: BTreeSet<String>,
}

impl SiteConfig {
    #[must_use]
    pub fn new(goop_bin_root: impl Into<PathBuf>) -> Self {
        Self {
            goop_bin_root: goop_bin_root.into(),
            ..Self::default()
        }
    }

    /// Parse a site configuration from JSON text
    ///
    /// # Errors
    ///
    /// Returns `LitError::Config` if the text is not a valid site configuration
    pub fn from_json(text: &str, origin: &Path) -> Result<Self, LitError> {
        serde_json::from_str(text).map_err(|e| LitError::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load and resolve a site configuration file
    ///
    /// # Errors
    ///
    /// Returns `LitError::Io` if the file cannot be read and
    /// `LitError::Config` if it cannot be parsed
    pub fn load(path: &Path) -> Result<Self, LitError> {
        let path = std::path::absolute(path).map_err(|e| LitError::io(path, e))?;
        let text = std::fs::read_to_string(&path).map_err(|e| LitError::io(&path, e))?;
        let config = Self::from_json(&text, &path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("/"));
        tracing::debug!(path = %path.display(), "loaded site config");
        Ok(config.resolve_against(base))
    }

    /// Make every path absolute by joining relative ones onto `base`, and
    /// default the source root to `base`
    #[must_use]
    pub fn resolve_against(mut self, base: &Path) -> Self {
        let anchor = |path: PathBuf| if path.is_absolute() { path } else { base.join(path) };

        self.goop_bin_root = anchor(self.goop_bin_root);
        self.test_source_root = Some(self.test_source_root.map_or_else(|| base.to_path_buf(), anchor));
        self.test_exec_root = self.test_exec_root.map(anchor);
        self
    }

    /// Override fields with values given on the command line
    #[must_use]
    pub fn with_overrides(
        mut self,
        bin_root: Option<PathBuf>,
        source_root: Option<PathBuf>,
        exec_root: Option<PathBuf>,
    ) -> Self {
        if let Some(bin_root) = bin_root {
            self.goop_bin_root = bin_root;
        }
        if source_root.is_some() {
            self.test_source_root = source_root;
        }
        if exec_root.is_some() {
            self.test_exec_root = exec_root;
        }
        self
    }
}
