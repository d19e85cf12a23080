//! Minimal KDL document model for Ferryman
//!
//! Ferron reads a KDL-flavoured configuration tree. This crate implements only
//! the subset Ferryman needs: ordered top-level nodes with positional
//! arguments, named properties and nested children, plus the query and
//! mutation operations the sync engine performs on them.
//!
//! The core contract is round-trip structural equality: for any document `d`,
//! `parse(&d.to_text())` is structurally equal to `d`, regardless of how
//! identifiers were quoted in the original source.
//!
//! # Example
//!
//! ```rust
//! use ferryman_kdl::parse;
//!
//! let doc = parse(r#"
//!     example.com {
//!         proxy "http://localhost:8080"
//!     }
//! "#).unwrap();
//!
//! let block = doc.find("example.com", false).unwrap();
//! assert_eq!(block.children.len(), 1);
//! ```

pub mod lexer;
pub mod node;
pub mod parser;
pub mod serialize;

pub use lexer::{tokenize, LexError, Token};
pub use node::{Document, Node, Value};
pub use parser::{parse, ParseError};
