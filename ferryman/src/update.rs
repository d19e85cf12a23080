//! Release update checks
//!
//! Asks the GitHub "latest release" endpoint whether a newer version exists.
//! The response is cached with an explicit timestamp so repeated checks
//! within the TTL never hit the network.

use anyhow::{anyhow, Context};
use semver::Version;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const FETCH_TIMEOUT: Duration = Duration::from_secs(2);
const CACHE_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: Version,
    pub release_url: Option<String>,
}

#[derive(Debug)]
pub struct UpdateStatus {
    pub update_available: bool,
    pub current_version: Version,
    pub latest: Release,
}

/// GitHub latest-release payload, reduced to the fields we read
#[derive(Deserialize)]
struct LatestReleasePayload {
    tag_name: String,
    html_url: Option<String>,
}

struct CachedRelease {
    fetched_at: Instant,
    release: Release,
}

pub struct UpdateChecker {
    endpoint: String,
    client: reqwest::Client,
    ttl: Duration,
    cache: Mutex<Option<CachedRelease>>,
}

impl UpdateChecker {
    /// Build a checker for a `https://github.com/<owner>/<repo>` URL
    pub fn for_repository(repository: &str) -> anyhow::Result<Self> {
        let path = repository
            .strip_prefix("https://github.com/")
            .ok_or_else(|| anyhow!("not a GitHub repository URL: {repository}"))?
            .trim_end_matches('/');
        Ok(Self::new(format!(
            "https://api.github.com/repos/{path}/releases/latest"
        )))
    }

    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
            ttl: CACHE_TTL,
            cache: Mutex::new(None),
        }
    }

    pub fn current_version() -> anyhow::Result<Version> {
        Version::parse(env!("CARGO_PKG_VERSION")).context("failed to parse own version")
    }

    pub async fn check(&self) -> anyhow::Result<UpdateStatus> {
        let current_version = Self::current_version()?;
        let latest = self.latest_release().await?;
        Ok(UpdateStatus {
            update_available: latest.version > current_version,
            current_version,
            latest,
        })
    }

    /// The latest published release, served from cache while fresh
    pub async fn latest_release(&self) -> anyhow::Result<Release> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.release.clone());
            }
        }

        let release = self.fetch_latest().await?;
        *cache = Some(CachedRelease {
            fetched_at: Instant::now(),
            release: release.clone(),
        });
        Ok(release)
    }

    async fn fetch_latest(&self) -> anyhow::Result<Release> {
        let payload: LatestReleasePayload = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .context("failed to reach the GitHub API")?
            .error_for_status()
            .context("GitHub API returned an error status")?
            .json()
            .await
            .context("failed to decode the GitHub API response")?;

        parse_release(&payload.tag_name, payload.html_url)
    }
}

fn parse_release(tag_name: &str, release_url: Option<String>) -> anyhow::Result<Release> {
    // Release tags carry a leading 'v' (e.g. "v1.2.0")
    let version = Version::parse(tag_name.trim_start_matches('v'))
        .with_context(|| format!("failed to parse release tag '{tag_name}'"))?;
    Ok(Release {
        version,
        release_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_repository_url() {
        let checker =
            UpdateChecker::for_repository("https://github.com/ferryman-proxy/ferryman").unwrap();
        assert_eq!(
            checker.endpoint,
            "https://api.github.com/repos/ferryman-proxy/ferryman/releases/latest"
        );
    }

    #[test]
    fn test_rejects_non_github_url() {
        assert!(UpdateChecker::for_repository("https://example.com/x/y").is_err());
    }

    #[test]
    fn test_tag_prefix_is_stripped() {
        let release = parse_release("v1.2.0", None).unwrap();
        assert_eq!(release.version, Version::new(1, 2, 0));

        let bare = parse_release("1.2.0", None).unwrap();
        assert_eq!(bare.version, release.version);
    }

    #[test]
    fn test_garbage_tag_is_an_error() {
        assert!(parse_release("nightly", None).is_err());
    }

    #[test]
    fn test_own_version_parses() {
        UpdateChecker::current_version().unwrap();
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_the_network() {
        // Endpoint is unreachable; a pre-warmed cache must still answer.
        let checker = UpdateChecker::new("http://127.0.0.1:1/releases/latest".into());
        let release = Release {
            version: Version::new(9, 9, 9),
            release_url: None,
        };
        *checker.cache.lock().await = Some(CachedRelease {
            fetched_at: Instant::now(),
            release: release.clone(),
        });

        assert_eq!(checker.latest_release().await.unwrap(), release);
    }
}
