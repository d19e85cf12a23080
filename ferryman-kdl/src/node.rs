//! Document model: nodes, scalar values, and query/mutation operations
//!
//! Equality over this model is structural: two nodes are equal iff name,
//! positional args (value-wise), properties (order-independent) and children
//! (order-sensitive, recursive) are equal. Surface details of the source
//! text, like whether an identifier was quoted, do not survive parsing and
//! therefore cannot affect equality.

use std::collections::BTreeMap;
use std::fmt;

/// A scalar value: positional argument or property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        // Values beyond i64 saturate rather than wrap negative
        Value::Integer(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Bool(b) => write!(f, "#{}", b),
        }
    }
}

/// Name of the reusable-fragment node type
pub const SNIPPET: &str = "snippet";

/// A single node of the configuration tree
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub name: String,
    pub args: Vec<Value>,
    /// Property keys are unique; BTreeMap makes equality order-independent.
    pub props: BTreeMap<String, Value>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Builder-style property
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Builder-style child node
    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }

    /// True if this is a `snippet` node labelled `label`
    pub fn is_snippet(&self, label: &str) -> bool {
        self.name == SNIPPET
            && self
                .args
                .first()
                .and_then(Value::as_str)
                .is_some_and(|first| first == label)
    }

    /// All direct children named `directive`, in document order
    pub fn directives(&self, directive: &str) -> Vec<&Node> {
        self.children
            .iter()
            .filter(|child| child.name == directive)
            .collect()
    }

    /// Render this node alone as canonical text
    pub fn to_text(&self) -> String {
        crate::serialize::node_to_text(self)
    }
}

/// An ordered sequence of top-level nodes, representing one physical file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the first top-level node matching `name`.
    ///
    /// With `as_snippet` set, matches `snippet` nodes whose first positional
    /// argument equals `name`; otherwise matches on the node name directly.
    pub fn find(&self, name: &str, as_snippet: bool) -> Option<&Node> {
        self.nodes.iter().find(|node| {
            if as_snippet {
                node.is_snippet(name)
            } else {
                node.name == name
            }
        })
    }

    fn find_index(&self, name: &str, as_snippet: bool) -> Option<usize> {
        self.nodes.iter().position(|node| {
            if as_snippet {
                node.is_snippet(name)
            } else {
                node.name == name
            }
        })
    }

    /// All children of the container named `directive`, in order.
    ///
    /// The format allows repeated directive names (e.g. several `header`
    /// lines), so this returns every match. Empty when the container itself
    /// is absent.
    pub fn directives(&self, container: &str, directive: &str, as_snippet: bool) -> Vec<&Node> {
        match self.find(container, as_snippet) {
            Some(node) => node.directives(directive),
            None => Vec::new(),
        }
    }

    /// Positional arguments of each matched directive, preserving order
    pub fn arguments(
        &self,
        container: &str,
        directive: &str,
        as_snippet: bool,
    ) -> Vec<&[Value]> {
        self.directives(container, directive, as_snippet)
            .into_iter()
            .map(|node| node.args.as_slice())
            .collect()
    }

    /// Properties of each matched directive, preserving order
    pub fn properties(
        &self,
        container: &str,
        directive: &str,
        as_snippet: bool,
    ) -> Vec<&BTreeMap<String, Value>> {
        self.directives(container, directive, as_snippet)
            .into_iter()
            .map(|node| &node.props)
            .collect()
    }

    /// Replace-or-append a top-level block.
    ///
    /// If a node matching `name` exists (same rule as [`Document::find`]) it
    /// is replaced in place, preserving its position; otherwise the new node
    /// is appended. This is the sole mutation primitive for top-level blocks.
    pub fn set_block(&mut self, name: &str, node: Node, as_snippet: bool) {
        match self.find_index(name, as_snippet) {
            Some(index) => self.nodes[index] = node,
            None => self.nodes.push(node),
        }
    }

    /// Serialize the whole document to canonical text
    pub fn to_text(&self) -> String {
        crate::serialize::document_to_text(self)
    }
}
