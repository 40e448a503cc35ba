//! Directive scanner for goop-lit test files
//!
//! Splits a test source into directive keywords, words, newlines and
//! opaque text using logos. Test files are arbitrary Go or C sources, so
//! anything that is not a keyword is carried through as `Word` or `Text`.

use goop_lit_ast::Span;
use logos::Logos;

/// Test-file tokens
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Token {
    /// Command line directive
    #[token("RUN:")]
    Run,

    /// Expected-failure directive
    #[token("XFAIL:")]
    XFail,

    /// Required-features directive
    #[token("REQUIRES:")]
    Requires,

    /// Stops directive scanning for the rest of the file
    #[token("END.")]
    End,

    #[token("\n")]
    Newline,

    /// Identifier-like run; keeps `FOORUN:` from being read as `RUN:`
    #[regex(r"[A-Za-z0-9_]+")]
    Word,

    /// Anything else up to the next word or newline
    #[regex(r"[^A-Za-z0-9_\n]+")]
    Text,

    /// End of input
    Eof,

    /// Lexer error
    Error,
}

impl Token {
    /// Keyword spelling for directive tokens
    #[must_use]
    pub const fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Run => Some("RUN:"),
            Self::XFail => Some("XFAIL:"),
            Self::Requires => Some("REQUIRES:"),
            Self::End => Some("END."),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_directive(self) -> bool {
        self.keyword().is_some()
    }
}

/// Token with location information
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
    pub text: String,
}

/// Lexer that produces tokens with spans
pub struct Lexer<'input> {
    lexer: logos::Lexer<'input, Token>,
    input: &'input str,
}

impl<'input> Lexer<'input> {
    #[must_use]
    pub fn new(input: &'input str) -> Self {
        Self {
            lexer: Token::lexer(input),
            input,
        }
    }

    /// Get the next token with span information
    pub fn next_token(&mut self) -> SpannedToken {
        match self.lexer.next() {
            Some(Ok(token)) => {
                let span = self.lexer.span();
                let text = self.input[span.clone()].to_string();
                SpannedToken {
                    token,
                    span: Span::new(span.start, span.end),
                    text,
                }
            }
            Some(Err(())) => {
                let span = self.lexer.span();
                let text = self.input[span.clone()].to_string();
                SpannedToken {
                    token: Token::Error,
                    span: Span::new(span.start, span.end),
                    text,
                }
            }
            None => SpannedToken {
                token: Token::Eof,
                span: Span::new(self.input.len(), self.input.len()),
                text: String::new(),
            },
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Vec<SpannedToken> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.token == Token::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
