//! Test file discovery
//!
//! Walks the given paths and keeps the files whose suffix the suite accepts.

use goop_lit_ast::LitError;
use goop_lit_suite::SuiteDescriptor;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name used for per-test scratch output; never scanned
pub const OUTPUT_DIR: &str = "Output";

/// A discovered test
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestFile {
    /// Absolute path to the test source
    pub path: PathBuf,
    /// Path relative to the suite source root (or the file name when the
    /// test lives outside it)
    pub relative: PathBuf,
}

impl TestFile {
    #[must_use]
    pub fn new(suite: &SuiteDescriptor, path: PathBuf) -> Self {
        let relative = path.strip_prefix(suite.source_root()).map_or_else(
            |_| path.file_name().map(PathBuf::from).unwrap_or_default(),
            Path::to_path_buf,
        );
        Self { path, relative }
    }

    /// Name used in status lines, always with `/` separators
    #[must_use]
    pub fn display_name(&self) -> String {
        self.relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Find all tests under `paths`
///
/// Directories are walked recursively, skipping hidden entries and
/// `Output` directories. Files named explicitly are kept if their suffix
/// matches. The result is sorted and free of duplicates.
///
/// # Errors
///
/// Returns `LitError::Io` if a path does not exist or a directory cannot be read
pub fn discover(suite: &SuiteDescriptor, paths: &[PathBuf]) -> Result<Vec<TestFile>, LitError> {
    let mut found = Vec::new();

    for path in paths {
        let path = std::path::absolute(path).map_err(|e| LitError::io(path, e))?;
        let metadata = fs::metadata(&path).map_err(|e| LitError::io(&path, e))?;
        if metadata.is_dir() {
            walk(suite, &path, &mut found)?;
        } else if suite.accepts(&path) {
            found.push(path);
        }
    }

    found.sort();
    found.dedup();
    tracing::debug!(count = found.len(), "discovered tests");
    Ok(found.into_iter().map(|path| TestFile::new(suite, path)).collect())
}

fn walk(suite: &SuiteDescriptor, dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), LitError> {
    let entries = fs::read_dir(dir).map_err(|e| LitError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| LitError::io(dir, e))?;
        let entry_path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') {
            continue;
        }

        let file_type = entry.file_type().map_err(|e| LitError::io(&entry_path, e))?;
        if file_type.is_dir() {
            if name != OUTPUT_DIR {
                walk(suite, &entry_path, found)?;
            }
        } else if file_type.is_symlink() && entry_path.is_dir() {
            // not followed: a link back to an ancestor would never terminate
            tracing::debug!(path = %entry_path.display(), "skipping symlinked directory");
        } else if suite.accepts(&entry_path) {
            found.push(entry_path);
        }
    }
    Ok(())
}
