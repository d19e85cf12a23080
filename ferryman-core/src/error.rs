//! Error types for Ferryman

use crate::entity::EntityKind;
use thiserror::Error;

/// Result type for Ferryman operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Ferryman
#[derive(Error, Debug)]
pub enum Error {
    /// A document, node, fragment file or stored row is missing
    #[error("{what} not found")]
    NotFound { what: String },

    /// A virtual host name (or the managed global singleton) already exists
    #[error("virtual host name '{name}' already exists")]
    NameConflict { name: String },

    /// Renderer invoked with a config that does not match the template kind
    #[error("config of kind {found:?} is not compatible with template {expected:?}")]
    TypeMismatch {
        expected: EntityKind,
        found: EntityKind,
    },

    /// Entity-level validation failure
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration document could not be parsed
    #[error("parse error: {0}")]
    Parse(#[from] ferryman_kdl::ParseError),

    /// File-system failure other than not-found
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The live proxy container is absent; rows and files are already updated
    #[error("proxy container '{container}' not found")]
    ReloadTargetNotFound { container: String },

    /// Reload signal could not be delivered for another reason
    #[error("reload signal failed: {0}")]
    ReloadTransport(String),

    /// Record-store failure other than not-found / conflict
    #[error("record store error: {0}")]
    Store(String),

    /// Settings file failure
    #[error("settings error: {0}")]
    Settings(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound { what: what.into() }
    }

    pub fn name_conflict(name: impl Into<String>) -> Self {
        Error::NameConflict { name: name.into() }
    }

    /// True for errors that only mean the live proxy was not refreshed;
    /// rows and files are correct and a later reload can recover.
    pub fn is_reload_failure(&self) -> bool {
        matches!(
            self,
            Error::ReloadTargetNotFound { .. } | Error::ReloadTransport(_)
        )
    }
}
