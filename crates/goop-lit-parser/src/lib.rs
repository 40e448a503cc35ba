//! Directive parser for goop-lit test files
//!
//! Consumes the token stream of `goop-lit-lexer` and produces a
//! [`TestScript`]: the `RUN:` commands in order (joined across `\`
//! continuations) plus the `XFAIL:` and `REQUIRES:` feature lists.

use goop_lit_ast::{Directive, LitError, SourceMap, Span, Spanned, TestScript};
use goop_lit_lexer::{Lexer, SpannedToken, Token};
use std::path::Path;

// Continuation and list handling
pub mod directive_utils;

pub struct Parser {
    input: String,
    source_map: SourceMap,
    filename: String,
    tokens: Vec<SpannedToken>,
}

/// A `RUN:` command still waiting for its continuation line
struct PendingRun {
    command: String,
    start: usize,
    end: usize,
}

impl Parser {
    /// Create a new parser for the given input
    #[must_use]
    pub fn new(input: &str) -> Self {
        Self::new_with_filename(input, "<input>")
    }

    /// Create a new parser for the given input with a filename
    ///
    /// Every byte of a test file lexes to some token, so construction
    /// cannot fail; errors surface from [`Parser::parse`].
    #[must_use]
    pub fn new_with_filename(input: &str, filename: &str) -> Self {
        Self {
            input: input.to_string(),
            source_map: SourceMap::new(input),
            filename: filename.to_string(),
            tokens: Lexer::new(input).tokenize(),
        }
    }

    /// Read and parse a test file from disk
    ///
    /// # Errors
    ///
    /// Returns `LitError::Io` if the file cannot be read, or any parse error
    pub fn parse_file(path: &Path) -> Result<TestScript, LitError> {
        let content = std::fs::read_to_string(path).map_err(|e| LitError::io(path, e))?;
        Self::new_with_filename(&content, &path.display().to_string()).parse()
    }

    /// Parse the input into a test script
    ///
    /// # Errors
    ///
    /// Returns `LitError::Syntax` for empty directives and dangling continuations
    pub fn parse(&self) -> Result<TestScript, LitError> {
        let directives = self.parse_directives()?;
        let script = TestScript::from_directives(directives);
        tracing::debug!(
            file = %self.filename,
            run_lines = script.run_lines.len(),
            "parsed test script"
        );
        Ok(script)
    }

    /// Parse the input into its directives, in source order
    ///
    /// # Errors
    ///
    /// Returns `LitError::Syntax` for empty directives and dangling continuations
    pub fn parse_directives(&self) -> Result<Vec<Spanned<Directive>>, LitError> {
        let mut directives = Vec::new();
        let mut pending: Option<PendingRun> = None;
        let mut index = 0;

        while index < self.tokens.len() {
            let token = &self.tokens[index];
            match token.token {
                Token::Run | Token::XFail | Token::Requires => {
                    let (line_end, next_index) = self.line_end(index);
                    let value = &self.input[token.span.end..line_end];

                    if token.token == Token::Run {
                        pending = self.push_run(&mut directives, pending, token, value, line_end)?;
                    } else {
                        if let Some(run) = pending.take() {
                            return Err(self.dangling(&run));
                        }
                        directives.push(self.feature_directive(token, value, line_end)?);
                    }
                    index = next_index;
                }
                Token::End => break,
                _ => index += 1,
            }
        }

        if let Some(run) = pending {
            return Err(self.dangling(&run));
        }
        Ok(directives)
    }

    fn push_run(
        &self,
        directives: &mut Vec<Spanned<Directive>>,
        pending: Option<PendingRun>,
        token: &SpannedToken,
        value: &str,
        line_end: usize,
    ) -> Result<Option<PendingRun>, LitError> {
        let (piece, continues) = directive_utils::split_continuation(value);

        let mut run = pending.unwrap_or(PendingRun {
            command: String::new(),
            start: token.span.start,
            end: line_end,
        });
        directive_utils::join_continued(&mut run.command, piece);
        run.end = line_end;

        if continues {
            return Ok(Some(run));
        }
        if run.command.is_empty() {
            return Err(LitError::syntax(
                "empty RUN: directive".to_string(),
                Span::new(run.start, run.end),
                &self.source_map,
                &self.filename,
            ));
        }
        directives.push(Spanned::new(Directive::Run(run.command), Span::new(run.start, run.end)));
        Ok(None)
    }

    fn feature_directive(
        &self,
        token: &SpannedToken,
        value: &str,
        line_end: usize,
    ) -> Result<Spanned<Directive>, LitError> {
        let span = Span::new(token.span.start, line_end);
        let features = directive_utils::parse_feature_list(value);
        if features.is_empty() {
            return Err(LitError::syntax(
                format!("{} needs at least one feature", token.text),
                span,
                &self.source_map,
                &self.filename,
            ));
        }
        let directive = if token.token == Token::XFail {
            Directive::XFail(features)
        } else {
            Directive::Requires(features)
        };
        Ok(Spanned::new(directive, span))
    }

    fn dangling(&self, run: &PendingRun) -> LitError {
        LitError::syntax(
            "RUN: line ends with '\\' but no RUN: line follows".to_string(),
            Span::new(run.start, run.end),
            &self.source_map,
            &self.filename,
        )
    }

    /// Byte offset where the line holding `tokens[index]` ends, and the index
    /// of the first token after that line's newline
    fn line_end(&self, index: usize) -> (usize, usize) {
        let mut cursor = index + 1;
        while let Some(token) = self.tokens.get(cursor) {
            match token.token {
                Token::Newline => return (token.span.start, cursor + 1),
                Token::Eof => return (token.span.start, cursor),
                _ => cursor += 1,
            }
        }
        (self.input.len(), cursor)
    }
}
