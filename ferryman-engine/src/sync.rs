//! Synchronization orchestration
//!
//! One entity change is one sequential task with a fixed order:
//! row write, fragment write, master include update, reload signal.
//! A failure after the row commit is reported to the caller, but the row is
//! not rolled back; the record store is allowed to run ahead of the files
//! and [`SyncEngine::resync_all`] brings the tree back in line.
//!
//! The master document is shared by every create/delete, so all of its
//! read-modify-write sequences run behind one lock; two concurrent appends
//! must never both read the pre-change text.

use crate::document::ConfigDocument;
use crate::include;
use crate::reload::ProxyReloader;
use crate::render::render;
use crate::store::RecordStore;
use crate::fs;
use ferryman_core::{
    EntityConfig, EntityKind, Error, GlobalSettings, Result, Settings, VirtualHostConfig,
    VirtualHostKind, VirtualHostRecord,
};
use ferryman_kdl::Node;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The configuration synchronization engine
pub struct SyncEngine {
    settings: Settings,
    store: Arc<dyn RecordStore>,
    reloader: Arc<dyn ProxyReloader>,
    /// Serializes every master-file read-modify-write
    master_lock: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        settings: Settings,
        store: Arc<dyn RecordStore>,
        reloader: Arc<dyn ProxyReloader>,
    ) -> Self {
        Self {
            settings,
            store,
            reloader,
            master_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Ensure the config root and an (initially empty) master file exist
    pub async fn bootstrap(&self) -> Result<()> {
        let _guard = self.master_lock.lock().await;
        std::fs::create_dir_all(&self.settings.config_root)?;
        include::ensure_master_exists(&self.settings.master_path())
    }

    // ============================================================
    // Virtual hosts
    // ============================================================

    /// Create a virtual host: row, fragment, include line, reload
    pub async fn create_virtual_host(
        &self,
        config: VirtualHostConfig,
    ) -> Result<VirtualHostRecord> {
        config.validate()?;
        let record = self.store.insert_virtual_host(config).await?;
        tracing::info!(
            id = record.id,
            name = record.config.virtual_host_name(),
            kind = %record.kind(),
            "created virtual host"
        );

        self.write_virtual_host_files(&record).await?;
        self.reload_proxy().await?;
        Ok(record)
    }

    /// Full-replacement update: same id, same fragment path, re-rendered
    pub async fn update_virtual_host(
        &self,
        record: VirtualHostRecord,
    ) -> Result<VirtualHostRecord> {
        record.config.validate()?;
        let record = self.store.update_virtual_host(record).await?;
        tracing::info!(id = record.id, kind = %record.kind(), "updated virtual host");

        self.write_virtual_host_files(&record).await?;
        self.reload_proxy().await?;
        Ok(record)
    }

    pub async fn read_virtual_host(
        &self,
        kind: VirtualHostKind,
        id: i64,
    ) -> Result<VirtualHostRecord> {
        self.store.get_virtual_host(kind, id).await
    }

    pub async fn list_virtual_hosts(
        &self,
        kind: VirtualHostKind,
    ) -> Result<Vec<VirtualHostRecord>> {
        self.store.list_virtual_hosts(kind).await
    }

    /// Read the rendered block back from its on-disk fragment
    pub async fn read_fragment(&self, kind: VirtualHostKind, id: i64) -> Result<Node> {
        let record = self.store.get_virtual_host(kind, id).await?;
        let doc = ConfigDocument::open(self.settings.fragment_path(kind, id))?;
        doc.find(record.config.virtual_host_name(), false)
            .cloned()
            .ok_or_else(|| {
                Error::not_found(format!(
                    "block '{}' in fragment",
                    record.config.virtual_host_name()
                ))
            })
    }

    /// Delete a virtual host.
    ///
    /// The row goes first: only once its deletion is durably committed are
    /// the include line and the fragment file removed. A fragment that is
    /// already missing never fails the delete.
    pub async fn delete_virtual_host(
        &self,
        kind: VirtualHostKind,
        id: i64,
    ) -> Result<VirtualHostRecord> {
        let record = self.store.delete_virtual_host(kind, id).await?;
        tracing::info!(id, kind = %kind, "deleted virtual host");

        let fragment = self.settings.fragment_path(kind, id);
        {
            let _guard = self.master_lock.lock().await;
            include::ensure_excluded(&self.settings.master_path(), &fragment)?;
        }

        self.reload_proxy().await?;
        Ok(record)
    }

    // ============================================================
    // Global settings
    // ============================================================

    pub async fn get_global(&self) -> Result<GlobalSettings> {
        self.store
            .get_global()
            .await?
            .ok_or_else(|| Error::not_found("global configuration"))
    }

    pub async fn create_global(&self, settings: GlobalSettings) -> Result<GlobalSettings> {
        let stored = self.store.insert_global(settings).await?;
        tracing::info!("created global configuration");
        self.write_global_files(&stored).await?;
        self.reload_proxy().await?;
        Ok(stored)
    }

    pub async fn update_global(&self, settings: GlobalSettings) -> Result<GlobalSettings> {
        let stored = self.store.update_global(settings).await?;
        tracing::info!("updated global configuration");
        self.write_global_files(&stored).await?;
        self.reload_proxy().await?;
        Ok(stored)
    }

    // ============================================================
    // Reconciliation
    // ============================================================

    /// Regenerate every fragment and the master include list from the rows.
    ///
    /// The master body is rebuilt wholesale, so include lines without a
    /// backing row are dropped, not just missing ones re-added. Idempotent;
    /// safe to run against a tree containing orphan fragments left behind by
    /// a crash between master rewrite and fragment deletion.
    pub async fn resync_all(&self) -> Result<()> {
        self.bootstrap().await?;

        let mut fragments = Vec::new();

        if let Some(global) = self.store.get_global().await? {
            fragments.push(self.write_global_fragment(&global)?);
        }

        for kind in [
            VirtualHostKind::ReverseProxy,
            VirtualHostKind::LoadBalancer,
            VirtualHostKind::StaticFile,
        ] {
            for record in self.store.list_virtual_hosts(kind).await? {
                fragments.push(self.write_fragment(&record)?);
            }
        }

        let _guard = self.master_lock.lock().await;
        include::rebuild(&self.settings.master_path(), &fragments)?;

        tracing::info!(
            fragments = fragments.len(),
            "reconciled configuration tree from record store"
        );
        Ok(())
    }

    // ============================================================
    // Internals
    // ============================================================

    fn fragment_path_for(&self, record: &VirtualHostRecord) -> PathBuf {
        self.settings.fragment_path(record.kind(), record.id)
    }

    /// Render and atomically write one vhost fragment; returns its path
    fn write_fragment(&self, record: &VirtualHostRecord) -> Result<PathBuf> {
        let kind: EntityKind = record.kind().into();
        let entity: EntityConfig = record.config.clone().into();
        let text = render(kind, &entity)?;

        let fragment = self.fragment_path_for(record);
        fs::atomic_write(&fragment, &text)?;
        Ok(fragment)
    }

    fn write_global_fragment(&self, global: &GlobalSettings) -> Result<PathBuf> {
        let text = render(EntityKind::Global, &EntityConfig::Global(global.clone()))?;

        let fragment = self.settings.global_path();
        fs::atomic_write(&fragment, &text)?;
        Ok(fragment)
    }

    async fn write_virtual_host_files(&self, record: &VirtualHostRecord) -> Result<()> {
        let fragment = self.write_fragment(record)?;

        let _guard = self.master_lock.lock().await;
        include::ensure_included(&self.settings.master_path(), &fragment)?;
        Ok(())
    }

    async fn write_global_files(&self, global: &GlobalSettings) -> Result<()> {
        let fragment = self.write_global_fragment(global)?;

        let _guard = self.master_lock.lock().await;
        include::ensure_included(&self.settings.master_path(), &fragment)?;
        Ok(())
    }

    /// Rows and files are already correct here; a failed reload is reported
    /// but logged as a warning since only the live process is stale.
    async fn reload_proxy(&self) -> Result<()> {
        match self.reloader.reload().await {
            Ok(()) => Ok(()),
            Err(e) if e.is_reload_failure() => {
                tracing::warn!(error = %e, "proxy reload failed; configuration is persisted");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}
