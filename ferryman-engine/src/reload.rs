//! Reload signaling
//!
//! After a successful write the live proxy must re-read its configuration.
//! The proxy runs in a Docker container; SIGHUP tells Ferron to reload
//! without dropping connections. By the time a reload runs, rows and files
//! are already correct, so reload failures report only that the live
//! process was not refreshed, never that the change was lost.

use async_trait::async_trait;
use ferryman_core::{Error, Result};
use tokio::process::Command;

/// Seam for signaling the live proxy
#[async_trait]
pub trait ProxyReloader: Send + Sync {
    /// Deliver a non-destructive "re-read configuration" signal
    async fn reload(&self) -> Result<()>;
}

/// Signals the proxy container through the Docker CLI
pub struct DockerReloader {
    container_name: String,
}

impl DockerReloader {
    pub fn new(container_name: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
        }
    }
}

#[async_trait]
impl ProxyReloader for DockerReloader {
    async fn reload(&self) -> Result<()> {
        let output = Command::new("docker")
            .args(["kill", "--signal=HUP", &self.container_name])
            .output()
            .await
            .map_err(|e| Error::ReloadTransport(format!("failed to run docker: {e}")))?;

        if output.status.success() {
            tracing::info!(container = %self.container_name, "sent reload signal");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("No such container") {
            return Err(Error::ReloadTargetNotFound {
                container: self.container_name.clone(),
            });
        }
        Err(Error::ReloadTransport(format!(
            "docker kill exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }
}

/// Reloader that does nothing; used by tests and dry runs
#[derive(Default)]
pub struct NoopReloader;

#[async_trait]
impl ProxyReloader for NoopReloader {
    async fn reload(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_reloader() {
        NoopReloader.reload().await.unwrap();
    }

    #[test]
    fn test_reload_errors_are_soft() {
        let target = Error::ReloadTargetNotFound {
            container: "ferron".into(),
        };
        let transport = Error::ReloadTransport("socket closed".into());
        assert!(target.is_reload_failure());
        assert!(transport.is_reload_failure());
        assert!(!Error::not_found("x").is_reload_failure());
    }
}
