//! Core library for Ferryman
//!
//! Shared vocabulary for the workspace: the error taxonomy, runtime
//! settings (paths, container name), and the typed entity model for the
//! virtual-host kinds Ferryman manages.

pub mod entity;
pub mod error;
pub mod settings;

pub use entity::{
    EntityConfig, EntityKind, GlobalSettings, LoadBalancerConfig, ReverseProxyConfig,
    StaticFileConfig, VirtualHostConfig, VirtualHostKind, VirtualHostRecord,
};
pub use error::{Error, Result};
pub use settings::Settings;
