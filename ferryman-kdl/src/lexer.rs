//! Lexer for the Ferron KDL subset
//!
//! Tokenizes the declarative config format:
//! - Newlines terminate nodes (whitespace otherwise insignificant)
//! - { } open and close child blocks
//! - "..." quoted strings with backslash escapes
//! - #true / #false keyword literals
//! - key=value properties (= is its own token)
//! - // line comments (skipped)

use logos::{Logos, Span};
use std::fmt;

/// Source location for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub start: usize,
    pub end: usize,
}

impl From<Span> for Location {
    fn from(span: Span) -> Self {
        Self {
            start: span.start,
            end: span.end,
        }
    }
}

/// A token with its location in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Location,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: impl Into<Location>) -> Self {
        Self {
            value,
            span: span.into(),
        }
    }
}

/// Token types for the KDL subset
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // Spaces and tabs are skipped; newlines are NOT, they terminate nodes.
    #[regex(r"[ \t\f]+", logos::skip)]
    Whitespace,

    // Line comments run to (but not through) the newline, so the newline
    // still terminates the node it belongs to.
    #[regex(r"//[^\n]*", logos::skip, priority = 10)]
    Comment,

    // ============================================================
    // Structural
    // ============================================================
    #[token("{")]
    BlockOpen,

    #[token("}")]
    BlockClose,

    #[regex(r"\r?\n")]
    Newline,

    #[token(";")]
    Semicolon,

    #[token("=")]
    Equals,

    // ============================================================
    // Values
    // ============================================================

    /// Keyword booleans: #true / #false
    #[token("#true", |_| true)]
    #[token("#false", |_| false)]
    Bool(bool),

    /// Quoted string literal: "..."
    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len()-1])
    })]
    QuotedString(String),

    /// Bare word (unquoted identifier, number, hostname, etc.)
    #[regex(r##"[^ \t\r\n\f{};="#]+"##, |lex| lex.slice().to_string())]
    Word(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::BlockOpen => write!(f, "{{"),
            Token::BlockClose => write!(f, "}}"),
            Token::Newline => write!(f, "\\n"),
            Token::Semicolon => write!(f, ";"),
            Token::Equals => write!(f, "="),
            Token::Bool(b) => write!(f, "#{}", b),
            Token::QuotedString(s) => write!(f, "\"{}\"", s),
            Token::Word(s) => write!(f, "{}", s),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Unescape a string literal
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(c) => {
                    result.push('\\');
                    result.push(c);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Lexer error
#[derive(Debug, Clone, thiserror::Error)]
pub enum LexError {
    #[error("unexpected character at position {position}")]
    UnexpectedChar { position: usize },
}

/// Tokenize source text into spanned tokens
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(Spanned::new(token, lexer.span())),
            Err(_) => {
                return Err(LexError::UnexpectedChar {
                    position: lexer.span().start,
                })
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|t| t.value).collect()
    }

    #[test]
    fn test_basic_node() {
        let tokens = words("proxy http://localhost:8080");
        assert_eq!(
            tokens,
            vec![
                Token::Word("proxy".into()),
                Token::Word("http://localhost:8080".into()),
            ]
        );
    }

    #[test]
    fn test_property_and_bool() {
        let tokens = words(r#"rewrite "^/.*" "/" last=#true"#);
        assert_eq!(
            tokens,
            vec![
                Token::Word("rewrite".into()),
                Token::QuotedString("^/.*".into()),
                Token::QuotedString("/".into()),
                Token::Word("last".into()),
                Token::Equals,
                Token::Bool(true),
            ]
        );
    }

    #[test]
    fn test_comments_skipped_newline_kept() {
        let tokens = words("cache // in-memory cache\nfile_cache_control");
        assert_eq!(
            tokens,
            vec![
                Token::Word("cache".into()),
                Token::Newline,
                Token::Word("file_cache_control".into()),
            ]
        );
    }

    #[test]
    fn test_escaped_quote() {
        let tokens = words(r#"header "a \"b\"""#);
        assert_eq!(
            tokens,
            vec![
                Token::Word("header".into()),
                Token::QuotedString(r#"a "b""#.into()),
            ]
        );
    }

    #[test]
    fn test_block_tokens() {
        let tokens = words("* {\n    timeout 300000\n}");
        assert_eq!(
            tokens,
            vec![
                Token::Word("*".into()),
                Token::BlockOpen,
                Token::Newline,
                Token::Word("timeout".into()),
                Token::Word("300000".into()),
                Token::Newline,
                Token::BlockClose,
            ]
        );
    }
}
