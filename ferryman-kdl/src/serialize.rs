//! Canonical serializer
//!
//! Re-renders a document as text the proxy can read back. The output is
//! canonical rather than source-preserving: identifiers are written bare
//! whenever they are identifier-safe and quoted otherwise, children are
//! indented four spaces, and properties appear in key order. The invariant
//! that matters is structural: `parse(serialize(doc))` equals `doc`.

use crate::node::{Document, Node, Value};
use std::fmt::Write;

const INDENT: &str = "    ";

/// Serialize a whole document
pub fn document_to_text(doc: &Document) -> String {
    let mut out = String::new();
    for node in &doc.nodes {
        write_node(&mut out, node, 0);
    }
    out
}

/// Serialize a single node (fragment rendering uses this)
pub fn node_to_text(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node, 0);
    out
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(&write_string_scalar(&node.name));

    for arg in &node.args {
        out.push(' ');
        out.push_str(&write_value(arg));
    }

    // BTreeMap iteration gives a stable key order
    for (key, value) in &node.props {
        out.push(' ');
        let _ = write!(out, "{}={}", write_string_scalar(key), write_value(value));
    }

    if node.children.is_empty() {
        out.push('\n');
    } else {
        out.push_str(" {\n");
        for child in &node.children {
            write_node(out, child, depth + 1);
        }
        for _ in 0..depth {
            out.push_str(INDENT);
        }
        out.push_str("}\n");
    }
}

fn write_value(value: &Value) -> String {
    match value {
        Value::String(s) => write_string_scalar(s),
        Value::Integer(i) => i.to_string(),
        // Debug formatting keeps the shortest representation that round-trips
        Value::Float(f) => format!("{:?}", f),
        Value::Bool(b) => format!("#{}", b),
    }
}

fn write_string_scalar(s: &str) -> String {
    if is_bare_safe(s) {
        s.to_string()
    } else {
        quote(s)
    }
}

/// A string can go bare only if re-lexing it yields the same string scalar:
/// nothing that would lex as a number, boolean, comment or structural token.
fn is_bare_safe(s: &str) -> bool {
    let mut chars = s.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if first.is_ascii_digit() || looks_numeric_start(s) {
        return false;
    }
    if s.contains("//") {
        return false;
    }
    std::iter::once(first)
        .chain(chars)
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '@' | '*' | '+'))
}

fn looks_numeric_start(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('-') | Some('+'), Some(c)) if c.is_ascii_digit()
    )
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
