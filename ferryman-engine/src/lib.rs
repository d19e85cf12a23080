//! Configuration synchronization engine for Ferryman
//!
//! Keeps the record store and the on-disk KDL configuration tree in sync and
//! tells the live proxy to pick up changes. One entity change runs as a
//! single sequential task: row write, fragment write, master include update,
//! reload signal, in that order.

pub mod document;
pub mod fs;
pub mod include;
pub mod reload;
pub mod render;
pub mod store;
pub mod sync;

pub use document::ConfigDocument;
pub use reload::{DockerReloader, NoopReloader, ProxyReloader};
pub use render::render;
pub use store::{MemoryStore, RecordStore};
pub use sync::SyncEngine;
