//! Literal substitution of `%` tokens in RUN lines
//!
//! A table is an ordered list of `(pattern, replacement)` pairs. Applying it
//! is a single left-to-right scan: at every `%` the longest pattern that
//! matches there is replaced, and replacement text is never rescanned.

use goop_lit_ast::LitError;
use serde::Serialize;
use std::collections::HashSet;

/// One `(pattern, replacement)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Substitution {
    pattern: String,
    replacement: String,
}

impl Substitution {
    #[must_use]
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn replacement(&self) -> &str {
        &self.replacement
    }
}

/// Validated, ordered substitution list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubstitutionTable {
    entries: Vec<Substitution>,
}

impl SubstitutionTable {
    /// Build a table, rejecting empty, non-`%` and duplicate patterns
    ///
    /// # Errors
    ///
    /// Returns `LitError::InvalidSubstitution` naming the offending pattern
    pub fn new(entries: Vec<Substitution>) -> Result<Self, LitError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.pattern.len() < 2 || !entry.pattern.starts_with('%') {
                return Err(LitError::InvalidSubstitution {
                    message: format!(
                        "pattern {:?} must be '%' followed by at least one character",
                        entry.pattern
                    ),
                });
            }
            if !seen.insert(entry.pattern.as_str()) {
                return Err(LitError::InvalidSubstitution {
                    message: format!("pattern {} is declared more than once", entry.pattern),
                });
            }
        }
        Ok(Self { entries })
    }

    /// A new table with `extra` appended after the current entries
    ///
    /// # Errors
    ///
    /// Returns `LitError::InvalidSubstitution` if `extra` repeats a pattern
    pub fn extended(&self, extra: impl IntoIterator<Item = Substitution>) -> Result<Self, LitError> {
        let mut entries = self.entries.clone();
        entries.extend(extra);
        Self::new(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Substitution> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, pattern: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.pattern == pattern)
            .map(Substitution::replacement)
    }

    /// Longest pattern that `text` starts with
    fn longest_match(&self, text: &str) -> Option<&Substitution> {
        self.entries
            .iter()
            .filter(|entry| text.starts_with(entry.pattern.as_str()))
            .max_by_key(|entry| entry.pattern.len())
    }

    /// Replace every pattern occurrence in `line`
    #[must_use]
    pub fn apply(&self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut rest = line;

        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];
            match self.longest_match(rest) {
                Some(entry) => {
                    out.push_str(&entry.replacement);
                    rest = &rest[entry.pattern.len()..];
                }
                None => {
                    out.push('%');
                    rest = &rest[1..];
                }
            }
        }

        out.push_str(rest);
        out
    }
}
