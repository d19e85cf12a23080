//! File-bound document store
//!
//! Binds a parsed [`Document`] to the path it came from, so callers can
//! query and mutate blocks and persist the result through the atomic
//! writer.

use crate::fs;
use ferryman_core::Result;
use ferryman_kdl::{parse, Document, Node};
use std::path::{Path, PathBuf};

/// A configuration document loaded from (and saved back to) one file
#[derive(Debug)]
pub struct ConfigDocument {
    path: PathBuf,
    doc: Document,
}

impl ConfigDocument {
    /// Load and parse the file at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let text = fs::read_to_string(&path)?;
        let doc = parse(&text)?;
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Re-read the file, discarding in-memory state
    pub fn reload(&mut self) -> Result<()> {
        let text = fs::read_to_string(&self.path)?;
        self.doc = parse(&text)?;
        Ok(())
    }

    pub fn find(&self, name: &str, as_snippet: bool) -> Option<&Node> {
        self.doc.find(name, as_snippet)
    }

    pub fn directives(&self, container: &str, directive: &str, as_snippet: bool) -> Vec<&Node> {
        self.doc.directives(container, directive, as_snippet)
    }

    pub fn set_block(&mut self, name: &str, node: Node, as_snippet: bool) {
        self.doc.set_block(name, node, as_snippet);
    }

    /// Serialize canonically and write atomically back to the source path
    pub fn save(&self) -> Result<()> {
        fs::atomic_write(&self.path, &self.doc.to_text())
    }
}
