//! Typed entity model
//!
//! Four entity kinds map to on-disk fragments: the global settings singleton
//! and three virtual-host kinds (reverse proxy, load balancer, static files).
//! A `virtual_host_name` is unique across all three virtual-host kinds
//! combined; the record store enforces this.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ============================================================
// Defaults
// ============================================================

pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_HTTPS_PORT: u16 = 443;
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 1024;
pub const DEFAULT_CACHE_MAX_AGE: u64 = 3600;
pub const DEFAULT_HEALTH_CHECK_MAX_FAILS: u32 = 3;
pub const DEFAULT_HEALTH_CHECK_WINDOW_MS: u64 = 5000;

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}
fn default_https_port() -> u16 {
    DEFAULT_HTTPS_PORT
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}
fn default_cache_max_entries() -> u64 {
    DEFAULT_CACHE_MAX_ENTRIES
}
fn default_cache_max_age() -> u64 {
    DEFAULT_CACHE_MAX_AGE
}
fn default_health_check_max_fails() -> u32 {
    DEFAULT_HEALTH_CHECK_MAX_FAILS
}
fn default_health_check_window() -> u64 {
    DEFAULT_HEALTH_CHECK_WINDOW_MS
}
fn default_true() -> bool {
    true
}

// ============================================================
// Entity kinds
// ============================================================

/// The three virtual-host kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VirtualHostKind {
    ReverseProxy,
    LoadBalancer,
    StaticFile,
}

impl VirtualHostKind {
    /// File-name stem used for fragment paths: `<id>_<stem>.kdl`
    pub fn file_stem(&self) -> &'static str {
        match self {
            VirtualHostKind::ReverseProxy => "reverse_proxy",
            VirtualHostKind::LoadBalancer => "load_balancer",
            VirtualHostKind::StaticFile => "static_file",
        }
    }
}

impl fmt::Display for VirtualHostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// All template kinds, including the global singleton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Global,
    ReverseProxy,
    LoadBalancer,
    StaticFile,
}

impl From<VirtualHostKind> for EntityKind {
    fn from(kind: VirtualHostKind) -> Self {
        match kind {
            VirtualHostKind::ReverseProxy => EntityKind::ReverseProxy,
            VirtualHostKind::LoadBalancer => EntityKind::LoadBalancer,
            VirtualHostKind::StaticFile => EntityKind::StaticFile,
        }
    }
}

// ============================================================
// Global settings (singleton)
// ============================================================

/// The wildcard `*` block: server-wide defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_https_port")]
    pub https_port: u16,
    #[serde(default = "default_true")]
    pub h1_enabled: bool,
    #[serde(default = "default_true")]
    pub h2_enabled: bool,
    #[serde(default)]
    pub h3_enabled: bool,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: u64,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            https_port: DEFAULT_HTTPS_PORT,
            h1_enabled: true,
            h2_enabled: true,
            h3_enabled: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

// ============================================================
// Virtual host configs
// ============================================================

/// A single-backend reverse proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseProxyConfig {
    pub virtual_host_name: String,
    pub backend_url: String,
    /// When set, the backend is reached over this unix socket
    #[serde(default)]
    pub unix_socket_path: Option<String>,
    #[serde(default)]
    pub preserve_host_header: bool,
    #[serde(default)]
    pub cache: bool,
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age: u64,
}

/// A multi-backend load balancer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancerConfig {
    pub virtual_host_name: String,
    pub backend_urls: Vec<String>,
    #[serde(default)]
    pub health_check: bool,
    #[serde(default = "default_health_check_max_fails")]
    pub health_check_max_fails: u32,
    #[serde(default = "default_health_check_window")]
    pub health_check_window_ms: u64,
    #[serde(default)]
    pub preserve_host_header: bool,
    #[serde(default)]
    pub cache: bool,
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age: u64,
}

/// A static-file site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticFileConfig {
    pub virtual_host_name: String,
    pub root_dir: String,
    /// Rewrite every path to / for single-page applications
    #[serde(default)]
    pub spa: bool,
    /// Compression is on by default; only an explicit off is emitted
    #[serde(default = "default_true")]
    pub compressed: bool,
    #[serde(default)]
    pub directory_listing: bool,
    #[serde(default)]
    pub precompressed: bool,
    #[serde(default)]
    pub cache: bool,
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age: u64,
}

// ============================================================
// Unions
// ============================================================

/// Tagged union over the three virtual-host kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VirtualHostConfig {
    ReverseProxy(ReverseProxyConfig),
    LoadBalancer(LoadBalancerConfig),
    StaticFile(StaticFileConfig),
}

impl VirtualHostConfig {
    pub fn kind(&self) -> VirtualHostKind {
        match self {
            VirtualHostConfig::ReverseProxy(_) => VirtualHostKind::ReverseProxy,
            VirtualHostConfig::LoadBalancer(_) => VirtualHostKind::LoadBalancer,
            VirtualHostConfig::StaticFile(_) => VirtualHostKind::StaticFile,
        }
    }

    pub fn virtual_host_name(&self) -> &str {
        match self {
            VirtualHostConfig::ReverseProxy(c) => &c.virtual_host_name,
            VirtualHostConfig::LoadBalancer(c) => &c.virtual_host_name,
            VirtualHostConfig::StaticFile(c) => &c.virtual_host_name,
        }
    }

    /// Validate field-level constraints before anything is persisted
    pub fn validate(&self) -> Result<()> {
        if self.virtual_host_name().trim().is_empty() {
            return Err(Error::InvalidConfig(
                "virtual_host_name must not be empty".into(),
            ));
        }
        match self {
            VirtualHostConfig::ReverseProxy(c) => {
                if c.backend_url.trim().is_empty() {
                    return Err(Error::InvalidConfig("backend_url must not be empty".into()));
                }
                if let Some(path) = &c.unix_socket_path {
                    require_absolute(path, "unix_socket_path")?;
                }
            }
            VirtualHostConfig::LoadBalancer(c) => {
                if c.backend_urls.is_empty() {
                    return Err(Error::InvalidConfig(
                        "backend_urls must contain at least one address".into(),
                    ));
                }
                if c.backend_urls.iter().any(|u| u.trim().is_empty()) {
                    return Err(Error::InvalidConfig(
                        "backend_urls must not contain empty addresses".into(),
                    ));
                }
            }
            VirtualHostConfig::StaticFile(c) => {
                require_absolute(&c.root_dir, "root_dir")?;
            }
        }
        Ok(())
    }
}

fn require_absolute(path: &str, field: &str) -> Result<()> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidConfig(format!("{field} must not be empty")));
    }
    if !Path::new(trimmed).is_absolute() {
        return Err(Error::InvalidConfig(format!(
            "{field} must be an absolute path"
        )));
    }
    Ok(())
}

/// A stored virtual-host row: id plus config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualHostRecord {
    pub id: i64,
    #[serde(flatten)]
    pub config: VirtualHostConfig,
}

impl VirtualHostRecord {
    pub fn kind(&self) -> VirtualHostKind {
        self.config.kind()
    }
}

/// Union over everything the template renderer accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityConfig {
    Global(GlobalSettings),
    ReverseProxy(ReverseProxyConfig),
    LoadBalancer(LoadBalancerConfig),
    StaticFile(StaticFileConfig),
}

impl EntityConfig {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityConfig::Global(_) => EntityKind::Global,
            EntityConfig::ReverseProxy(_) => EntityKind::ReverseProxy,
            EntityConfig::LoadBalancer(_) => EntityKind::LoadBalancer,
            EntityConfig::StaticFile(_) => EntityKind::StaticFile,
        }
    }
}

impl From<VirtualHostConfig> for EntityConfig {
    fn from(config: VirtualHostConfig) -> Self {
        match config {
            VirtualHostConfig::ReverseProxy(c) => EntityConfig::ReverseProxy(c),
            VirtualHostConfig::LoadBalancer(c) => EntityConfig::LoadBalancer(c),
            VirtualHostConfig::StaticFile(c) => EntityConfig::StaticFile(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy(name: &str) -> VirtualHostConfig {
        VirtualHostConfig::ReverseProxy(ReverseProxyConfig {
            virtual_host_name: name.into(),
            backend_url: "http://localhost:8080".into(),
            unix_socket_path: None,
            preserve_host_header: false,
            cache: false,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
        })
    }

    #[test]
    fn test_global_defaults() {
        let g = GlobalSettings::default();
        assert_eq!(g.http_port, 80);
        assert_eq!(g.https_port, 443);
        assert!(g.h1_enabled && g.h2_enabled && !g.h3_enabled);
        assert_eq!(g.timeout_ms, 300_000);
        assert_eq!(g.cache_max_entries, 1024);
    }

    #[test]
    fn test_serde_defaults_fill_optional_fields() {
        let c: StaticFileConfig = serde_json::from_str(
            r#"{"virtual_host_name": "a.example.com", "root_dir": "/var/www"}"#,
        )
        .unwrap();
        assert!(c.compressed, "compression defaults on");
        assert!(!c.spa);
        assert_eq!(c.cache_max_age, DEFAULT_CACHE_MAX_AGE);
    }

    #[test]
    fn test_validate_rejects_relative_socket_path() {
        let config = VirtualHostConfig::ReverseProxy(ReverseProxyConfig {
            virtual_host_name: "a.example.com".into(),
            backend_url: "http://localhost:8080".into(),
            unix_socket_path: Some("run/app.sock".into()),
            preserve_host_header: false,
            cache: false,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
        });
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig(msg)) if msg.contains("unix_socket_path")
        ));
    }

    #[test]
    fn test_validate_rejects_empty_backends() {
        let config = VirtualHostConfig::LoadBalancer(LoadBalancerConfig {
            virtual_host_name: "lb.example.com".into(),
            backend_urls: vec![],
            health_check: false,
            health_check_max_fails: DEFAULT_HEALTH_CHECK_MAX_FAILS,
            health_check_window_ms: DEFAULT_HEALTH_CHECK_WINDOW_MS,
            preserve_host_header: false,
            cache: false,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_ordinary_proxy() {
        assert!(proxy("ok.example.com").validate().is_ok());
    }

    #[test]
    fn test_kind_accessors() {
        let config = proxy("x.example.com");
        assert_eq!(config.kind(), VirtualHostKind::ReverseProxy);
        assert_eq!(config.virtual_host_name(), "x.example.com");
        let entity: EntityConfig = config.into();
        assert_eq!(entity.kind(), EntityKind::ReverseProxy);
    }

    #[test]
    fn test_record_json_round_trip() {
        let record = VirtualHostRecord {
            id: 7,
            config: proxy("json.example.com"),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: VirtualHostRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
