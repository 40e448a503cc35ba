//! Shared vocabulary for goop-lit
//!
//! Source locations, the parsed form of a test file's directives, and the
//! error type every other crate returns.

use std::path::PathBuf;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Line and column position in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Convert byte span to line/column positions
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (pos, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(pos + 1);
            }
        }
        Self { line_starts }
    }

    #[must_use]
    pub fn position(&self, byte_offset: usize) -> Position {
        match self.line_starts.binary_search(&byte_offset) {
            Ok(line) => Position::new(line + 1, 1),
            Err(line) => {
                let line_start = self.line_starts[line - 1];
                Position::new(line, byte_offset - line_start + 1)
            }
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// Node with location information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    #[must_use]
    pub const fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A directive found in a test file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `RUN: <command>`, already joined across `\` continuations
    Run(String),
    /// `XFAIL: <feature>, ...` (`*` matches everything)
    XFail(Vec<String>),
    /// `REQUIRES: <feature>, ...`
    Requires(Vec<String>),
}

/// Everything the engine needs to know about one test file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestScript {
    pub run_lines: Vec<Spanned<String>>,
    pub xfails: Vec<String>,
    pub requires: Vec<String>,
}

impl TestScript {
    #[must_use]
    pub fn from_directives(directives: Vec<Spanned<Directive>>) -> Self {
        let mut script = Self::default();
        for directive in directives {
            match directive.node {
                Directive::Run(command) => script.run_lines.push(Spanned::new(command, directive.span)),
                Directive::XFail(features) => script.xfails.extend(features),
                Directive::Requires(features) => script.requires.extend(features),
            }
        }
        script
    }

    /// Commands in execution order
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.run_lines.iter().map(|line| line.node.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.run_lines.is_empty()
    }
}

/// Error types for suite loading and script parsing
#[derive(thiserror::Error, Debug)]
pub enum LitError {
    #[error("lit:{filename}:{line}:{column}: ERR_SYNTAX: {message}")]
    Syntax {
        message: String,
        span: Span,
        filename: String,
        line: usize,
        column: usize,
    },

    #[error("lit: ERR_MISSING_TOOL: substitution {token} expects an executable at {}", path.display())]
    MissingTool { token: String, path: PathBuf },

    #[error("lit: ERR_SUBSTITUTION: {message}")]
    InvalidSubstitution { message: String },

    #[error("lit: ERR_RELATIVE_PATH: {what} must be absolute, got {}", path.display())]
    RelativePath { what: String, path: PathBuf },

    #[error("lit: ERR_FORMAT: {message}")]
    UnsupportedFormat { message: String },

    #[error("lit: ERR_CONFIG: {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("lit: ERR_IO: {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LitError {
    #[must_use]
    pub fn syntax(message: String, span: Span, source_map: &SourceMap, filename: &str) -> Self {
        let pos = source_map.position(span.start);
        Self::Syntax {
            message,
            span,
            filename: filename.to_string(),
            line: pos.line,
            column: pos.column,
        }
    }

    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub const fn span(&self) -> Option<Span> {
        match self {
            Self::Syntax { span, .. } => Some(*span),
            _ => None,
        }
    }
}
