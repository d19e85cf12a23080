//! Record store seam
//!
//! The relational persistence of entity rows is an external collaborator;
//! the engine only needs transactional CRUD keyed by integer id, with
//! unique-constraint violations on `virtual_host_name` translated into the
//! NameConflict condition. [`MemoryStore`] is the in-process implementation
//! used by tests and standalone runs.

use async_trait::async_trait;
use ferryman_core::{
    Error, GlobalSettings, Result, VirtualHostConfig, VirtualHostKind, VirtualHostRecord,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Transactional CRUD over entity rows
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new row, assigning its id. Fails with NameConflict when the
    /// virtual host name is taken by any of the three kinds.
    async fn insert_virtual_host(&self, config: VirtualHostConfig) -> Result<VirtualHostRecord>;

    async fn get_virtual_host(&self, kind: VirtualHostKind, id: i64) -> Result<VirtualHostRecord>;

    /// Full-replacement update of an existing row
    async fn update_virtual_host(&self, record: VirtualHostRecord) -> Result<VirtualHostRecord>;

    /// Delete and return the row; the row is durably gone when this returns
    async fn delete_virtual_host(
        &self,
        kind: VirtualHostKind,
        id: i64,
    ) -> Result<VirtualHostRecord>;

    async fn list_virtual_hosts(&self, kind: VirtualHostKind) -> Result<Vec<VirtualHostRecord>>;

    async fn get_global(&self) -> Result<Option<GlobalSettings>>;

    /// Create the singleton; fails with NameConflict when it already exists
    async fn insert_global(&self, settings: GlobalSettings) -> Result<GlobalSettings>;

    /// Replace the singleton; fails with NotFound when it is absent
    async fn update_global(&self, settings: GlobalSettings) -> Result<GlobalSettings>;
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    rows: BTreeMap<(VirtualHostKind, i64), VirtualHostConfig>,
    global: Option<GlobalSettings>,
}

/// In-memory record store
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryState {
    fn name_taken(&self, name: &str, exclude: Option<(VirtualHostKind, i64)>) -> bool {
        self.rows.iter().any(|(key, config)| {
            Some(*key) != exclude && config.virtual_host_name() == name
        })
    }
}

fn row_description(kind: VirtualHostKind, id: i64) -> String {
    format!("{kind} configuration {id}")
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_virtual_host(&self, config: VirtualHostConfig) -> Result<VirtualHostRecord> {
        let mut state = self.state.write();
        if state.name_taken(config.virtual_host_name(), None) {
            return Err(Error::name_conflict(config.virtual_host_name()));
        }
        state.next_id += 1;
        let id = state.next_id;
        state.rows.insert((config.kind(), id), config.clone());
        Ok(VirtualHostRecord { id, config })
    }

    async fn get_virtual_host(&self, kind: VirtualHostKind, id: i64) -> Result<VirtualHostRecord> {
        let state = self.state.read();
        state
            .rows
            .get(&(kind, id))
            .cloned()
            .map(|config| VirtualHostRecord { id, config })
            .ok_or_else(|| Error::not_found(row_description(kind, id)))
    }

    async fn update_virtual_host(&self, record: VirtualHostRecord) -> Result<VirtualHostRecord> {
        let key = (record.kind(), record.id);
        let mut state = self.state.write();
        if !state.rows.contains_key(&key) {
            return Err(Error::not_found(row_description(key.0, key.1)));
        }
        if state.name_taken(record.config.virtual_host_name(), Some(key)) {
            return Err(Error::name_conflict(record.config.virtual_host_name()));
        }
        state.rows.insert(key, record.config.clone());
        Ok(record)
    }

    async fn delete_virtual_host(
        &self,
        kind: VirtualHostKind,
        id: i64,
    ) -> Result<VirtualHostRecord> {
        let mut state = self.state.write();
        state
            .rows
            .remove(&(kind, id))
            .map(|config| VirtualHostRecord { id, config })
            .ok_or_else(|| Error::not_found(row_description(kind, id)))
    }

    async fn list_virtual_hosts(&self, kind: VirtualHostKind) -> Result<Vec<VirtualHostRecord>> {
        let state = self.state.read();
        Ok(state
            .rows
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, id), config)| VirtualHostRecord {
                id: *id,
                config: config.clone(),
            })
            .collect())
    }

    async fn get_global(&self) -> Result<Option<GlobalSettings>> {
        Ok(self.state.read().global.clone())
    }

    async fn insert_global(&self, settings: GlobalSettings) -> Result<GlobalSettings> {
        let mut state = self.state.write();
        if state.global.is_some() {
            return Err(Error::name_conflict("global configuration"));
        }
        state.global = Some(settings.clone());
        Ok(settings)
    }

    async fn update_global(&self, settings: GlobalSettings) -> Result<GlobalSettings> {
        let mut state = self.state.write();
        if state.global.is_none() {
            return Err(Error::not_found("global configuration"));
        }
        state.global = Some(settings.clone());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferryman_core::{ReverseProxyConfig, StaticFileConfig};

    fn proxy(name: &str) -> VirtualHostConfig {
        VirtualHostConfig::ReverseProxy(ReverseProxyConfig {
            virtual_host_name: name.into(),
            backend_url: "http://localhost:8080".into(),
            unix_socket_path: None,
            preserve_host_header: false,
            cache: false,
            cache_max_age: 3600,
        })
    }

    fn site(name: &str) -> VirtualHostConfig {
        VirtualHostConfig::StaticFile(StaticFileConfig {
            virtual_host_name: name.into(),
            root_dir: "/var/www".into(),
            spa: false,
            compressed: true,
            directory_listing: false,
            precompressed: false,
            cache: false,
            cache_max_age: 3600,
        })
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = store.insert_virtual_host(proxy("a.example.com")).await.unwrap();
        let b = store.insert_virtual_host(site("b.example.com")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn test_name_unique_across_kinds() {
        let store = MemoryStore::new();
        store.insert_virtual_host(proxy("same.example.com")).await.unwrap();
        // Same name through a different kind must still collide
        let err = store.insert_virtual_host(site("same.example.com")).await.unwrap_err();
        assert!(matches!(err, Error::NameConflict { name } if name == "same.example.com"));
    }

    #[tokio::test]
    async fn test_update_full_replacement() {
        let store = MemoryStore::new();
        let record = store.insert_virtual_host(proxy("a.example.com")).await.unwrap();

        let updated = VirtualHostRecord {
            id: record.id,
            config: VirtualHostConfig::ReverseProxy(ReverseProxyConfig {
                backend_url: "http://other:9090".into(),
                cache: true,
                ..match record.config {
                    VirtualHostConfig::ReverseProxy(c) => c,
                    _ => unreachable!(),
                }
            }),
        };
        store.update_virtual_host(updated.clone()).await.unwrap();

        let fetched = store
            .get_virtual_host(VirtualHostKind::ReverseProxy, record.id)
            .await
            .unwrap();
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_virtual_host(VirtualHostRecord {
                id: 99,
                config: proxy("ghost.example.com"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_rename_onto_taken_name_conflicts() {
        let store = MemoryStore::new();
        store.insert_virtual_host(proxy("a.example.com")).await.unwrap();
        let b = store.insert_virtual_host(site("b.example.com")).await.unwrap();

        let renamed = VirtualHostRecord {
            id: b.id,
            config: site("a.example.com"),
        };
        let err = store.update_virtual_host(renamed).await.unwrap_err();
        assert!(matches!(err, Error::NameConflict { .. }));
    }

    #[tokio::test]
    async fn test_update_keeping_own_name_is_fine() {
        let store = MemoryStore::new();
        let record = store.insert_virtual_host(proxy("keep.example.com")).await.unwrap();
        store.update_virtual_host(record).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_returns_row_then_not_found() {
        let store = MemoryStore::new();
        let record = store.insert_virtual_host(proxy("gone.example.com")).await.unwrap();
        let deleted = store
            .delete_virtual_host(VirtualHostKind::ReverseProxy, record.id)
            .await
            .unwrap();
        assert_eq!(deleted, record);

        let err = store
            .delete_virtual_host(VirtualHostKind::ReverseProxy, record.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_deleted_name_is_reusable() {
        let store = MemoryStore::new();
        let record = store.insert_virtual_host(proxy("cycle.example.com")).await.unwrap();
        store
            .delete_virtual_host(VirtualHostKind::ReverseProxy, record.id)
            .await
            .unwrap();
        store.insert_virtual_host(site("cycle.example.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_filters_by_kind() {
        let store = MemoryStore::new();
        store.insert_virtual_host(proxy("a.example.com")).await.unwrap();
        store.insert_virtual_host(site("b.example.com")).await.unwrap();

        let proxies = store.list_virtual_hosts(VirtualHostKind::ReverseProxy).await.unwrap();
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].config.virtual_host_name(), "a.example.com");
    }

    #[tokio::test]
    async fn test_global_singleton_lifecycle() {
        let store = MemoryStore::new();
        assert!(store.get_global().await.unwrap().is_none());

        let err = store.update_global(GlobalSettings::default()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        store.insert_global(GlobalSettings::default()).await.unwrap();
        let err = store.insert_global(GlobalSettings::default()).await.unwrap_err();
        assert!(matches!(err, Error::NameConflict { .. }));

        let updated = GlobalSettings {
            h3_enabled: true,
            ..Default::default()
        };
        store.update_global(updated.clone()).await.unwrap();
        assert_eq!(store.get_global().await.unwrap(), Some(updated));
    }
}
