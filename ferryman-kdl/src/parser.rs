//! Recursive descent parser for the KDL subset
//!
//! Converts tokens into a [`Document`]. Bare words are classified into
//! scalars here: anything that reads as an integer or float becomes the
//! numeric value, everything else stays a string. Quoted strings are always
//! strings, so `protocols h1 h2` and `protocols "h1" "h2"` parse to
//! structurally equal nodes.

use crate::lexer::{tokenize, LexError, Spanned, Token};
use crate::node::{Document, Node, Value};
use thiserror::Error;

/// Parser error types
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("lexer error: {0}")]
    Lex(#[from] LexError),

    #[error("unexpected token at position {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },
}

type ParseResult<T> = Result<T, ParseError>;

/// Parse source text into a document
pub fn parse(source: &str) -> ParseResult<Document> {
    Parser::new(source)?.parse()
}

/// Parser state
pub struct Parser {
    tokens: Vec<Spanned<Token>>,
    pos: usize,
}

impl Parser {
    pub fn new(source: &str) -> ParseResult<Self> {
        let tokens = tokenize(source)?;
        Ok(Self { tokens, pos: 0 })
    }

    pub fn parse(&mut self) -> ParseResult<Document> {
        let mut doc = Document::new();

        self.skip_terminators();
        while !self.is_eof() {
            doc.nodes.push(self.parse_node()?);
            self.skip_terminators();
        }

        Ok(doc)
    }

    fn parse_node(&mut self) -> ParseResult<Node> {
        let mut node = Node::new(self.expect_identifier("node name")?);

        loop {
            match self.peek() {
                Some(Token::Word(_)) | Some(Token::QuotedString(_)) => {
                    let (text, quoted) = self.take_text();
                    if self.check(&Token::Equals) {
                        self.advance(); // =
                        let value = self.parse_value()?;
                        node.props.insert(text, value);
                    } else if quoted {
                        node.args.push(Value::String(text));
                    } else {
                        node.args.push(classify_word(text));
                    }
                }
                Some(Token::Bool(b)) => {
                    let b = *b;
                    self.advance();
                    node.args.push(Value::Bool(b));
                }
                Some(Token::BlockOpen) => {
                    node.children = self.parse_block()?;
                    break;
                }
                Some(Token::Newline) | Some(Token::Semicolon) => {
                    self.advance();
                    break;
                }
                Some(Token::BlockClose) | None => break,
                Some(tok) => {
                    return Err(ParseError::UnexpectedToken {
                        position: self.current_position(),
                        expected: "argument, property, or block".to_string(),
                        found: tok.to_string(),
                    });
                }
            }
        }

        Ok(node)
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Node>> {
        self.expect(Token::BlockOpen)?;
        let mut children = Vec::new();

        self.skip_terminators();
        while !self.check(&Token::BlockClose) {
            if self.is_eof() {
                return Err(ParseError::UnexpectedEof {
                    expected: "}".to_string(),
                });
            }
            children.push(self.parse_node()?);
            self.skip_terminators();
        }

        self.expect(Token::BlockClose)?;
        Ok(children)
    }

    fn parse_value(&mut self) -> ParseResult<Value> {
        match self.peek() {
            Some(Token::Word(_)) => {
                let (text, _) = self.take_text();
                Ok(classify_word(text))
            }
            Some(Token::QuotedString(_)) => {
                let (text, _) = self.take_text();
                Ok(Value::String(text))
            }
            Some(Token::Bool(b)) => {
                let b = *b;
                self.advance();
                Ok(Value::Bool(b))
            }
            Some(tok) => Err(ParseError::UnexpectedToken {
                position: self.current_position(),
                expected: "value".to_string(),
                found: tok.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof {
                expected: "value".to_string(),
            }),
        }
    }

    // ========================================
    // Token helpers
    // ========================================

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.value)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn current_position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.start)
            .unwrap_or_default()
    }

    fn skip_terminators(&mut self) {
        while matches!(self.peek(), Some(Token::Newline) | Some(Token::Semicolon)) {
            self.advance();
        }
    }

    /// Take the current Word or QuotedString; returns (text, was_quoted).
    /// Callers must have peeked one of the two first.
    fn take_text(&mut self) -> (String, bool) {
        let result = match &self.tokens[self.pos].value {
            Token::Word(s) => (s.clone(), false),
            Token::QuotedString(s) => (s.clone(), true),
            _ => unreachable!("take_text called without peeking a text token"),
        };
        self.advance();
        result
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        match self.peek() {
            Some(found) if *found == token => {
                self.advance();
                Ok(())
            }
            Some(found) => Err(ParseError::UnexpectedToken {
                position: self.current_position(),
                expected: token.to_string(),
                found: found.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof {
                expected: token.to_string(),
            }),
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Word(_)) | Some(Token::QuotedString(_)) => Ok(self.take_text().0),
            Some(found) => Err(ParseError::UnexpectedToken {
                position: self.current_position(),
                expected: expected.to_string(),
                found: found.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof {
                expected: expected.to_string(),
            }),
        }
    }
}

/// Classify a bare word into a scalar.
///
/// Only words that start numerically are even considered as numbers, so
/// identifiers like `inf` or `e10` stay strings.
fn classify_word(text: String) -> Value {
    if looks_numeric(&text) {
        if let Ok(i) = text.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            return Value::Float(f);
        }
    }
    Value::String(text)
}

fn looks_numeric(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('-') | Some('+') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::SNIPPET;

    #[test]
    fn test_parse_flat_node() {
        let doc = parse("proxy http://localhost:8080\n").unwrap();
        assert_eq!(doc.nodes.len(), 1);
        let node = &doc.nodes[0];
        assert_eq!(node.name, "proxy");
        assert_eq!(node.args, vec![Value::String("http://localhost:8080".into())]);
    }

    #[test]
    fn test_parse_block_with_children() {
        let doc = parse("* {\n    timeout 300000\n    protocols h1 h2\n}\n").unwrap();
        let global = doc.find("*", false).unwrap();
        assert_eq!(global.children.len(), 2);
        assert_eq!(global.children[0].args, vec![Value::Integer(300_000)]);
        assert_eq!(
            global.children[1].args,
            vec![Value::String("h1".into()), Value::String("h2".into())]
        );
    }

    #[test]
    fn test_parse_properties() {
        let doc = parse(r#"limit rate=50 burst=100 unix="/var/run/app.sock""#).unwrap();
        let node = &doc.nodes[0];
        assert_eq!(node.props.get("rate"), Some(&Value::Integer(50)));
        assert_eq!(node.props.get("burst"), Some(&Value::Integer(100)));
        assert_eq!(
            node.props.get("unix"),
            Some(&Value::String("/var/run/app.sock".into()))
        );
    }

    #[test]
    fn test_parse_bool_args_and_props() {
        let doc = parse(r#"rewrite "^/.*" "/" directory=#false file=#false last=#true"#).unwrap();
        let node = &doc.nodes[0];
        assert_eq!(node.args.len(), 2);
        assert_eq!(node.props.get("directory"), Some(&Value::Bool(false)));
        assert_eq!(node.props.get("last"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_quoting_is_structurally_invisible() {
        let bare = parse("protocols h1 h2\n").unwrap();
        let quoted = parse("\"protocols\" \"h1\" \"h2\"\n").unwrap();
        assert_eq!(bare, quoted);
    }

    #[test]
    fn test_numeric_classification() {
        let doc = parse("listen_ip \"0.0.0.0\"\nport 8080\nratio 1.5\n").unwrap();
        // Quoted dotted-quad stays a string even though it starts with a digit
        assert_eq!(doc.nodes[0].args[0], Value::String("0.0.0.0".into()));
        assert_eq!(doc.nodes[1].args[0], Value::Integer(8080));
        assert_eq!(doc.nodes[2].args[0], Value::Float(1.5));
    }

    #[test]
    fn test_parse_snippet() {
        let source = "snippet security_headers {\n    header X-Frame-Options DENY\n}\n";
        let doc = parse(source).unwrap();
        let snippet = doc.find("security_headers", true).unwrap();
        assert_eq!(snippet.name, SNIPPET);
        assert_eq!(snippet.children.len(), 1);
    }

    #[test]
    fn test_semicolon_terminators() {
        let doc = parse("cache; file_cache_control \"max-age=7200\";").unwrap();
        assert_eq!(doc.nodes.len(), 2);
    }

    #[test]
    fn test_childless_node_before_close_brace() {
        let doc = parse("host { directory_listing }").unwrap();
        assert_eq!(doc.nodes[0].children.len(), 1);
        assert_eq!(doc.nodes[0].children[0].name, "directory_listing");
    }

    #[test]
    fn test_unclosed_block_errors() {
        let err = parse("host {\n    root /var/www\n").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_empty_document() {
        let doc = parse("\n\n// nothing here\n").unwrap();
        assert!(doc.nodes.is_empty());
    }
}
