//! Topology Sources
//!
//! A [`TopologySource`] produces the [`Topology`] of one client endpoint.
//! [`CachedSource`] keeps a JSON snapshot per endpoint on disk so later
//! sessions skip the expensive discovery step.

use super::model::Topology;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Provider of the object/instance/resource tree for an endpoint
#[async_trait]
pub trait TopologySource: Send + Sync {
    /// Fetch the topology of `endpoint`. `force_refresh` bypasses any
    /// cached copy. Implementations fail with `EmptyTopology` rather than
    /// return an empty tree.
    async fn fetch_topology(&self, endpoint: &str, force_refresh: bool) -> Result<Topology>;
}

/// Reject empty discovery results
pub(crate) fn ensure_not_empty(endpoint: &str, topology: Topology) -> Result<Topology> {
    if topology.is_empty() {
        return Err(Error::EmptyTopology {
            endpoint: endpoint.to_string(),
        });
    }
    Ok(topology)
}

/// Source returning a prebuilt topology for every endpoint
#[derive(Debug, Clone)]
pub struct StaticSource {
    topology: Topology,
}

impl StaticSource {
    pub fn new(topology: Topology) -> Self {
        Self { topology }
    }
}

#[async_trait]
impl TopologySource for StaticSource {
    async fn fetch_topology(&self, endpoint: &str, _force_refresh: bool) -> Result<Topology> {
        ensure_not_empty(endpoint, self.topology.clone())
    }
}

/// Default cache directory for topology snapshots
pub fn default_cache_dir() -> PathBuf {
    if let Some(cache_dir) = dirs::cache_dir() {
        return cache_dir.join("leshan-rest").join("clients");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".leshan-rest").join("clients");
    }
    PathBuf::from("cached_clients")
}

/// Wraps another source with a `<cache_dir>/<endpoint>.json` snapshot.
///
/// Not safe for concurrent writers to the same directory.
#[derive(Debug, Clone)]
pub struct CachedSource<S> {
    inner: S,
    cache_dir: PathBuf,
}

impl<S: TopologySource> CachedSource<S> {
    pub fn new(inner: S, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            cache_dir: cache_dir.into(),
        }
    }

    /// Cache in the per-user default location
    pub fn with_default_dir(inner: S) -> Self {
        Self::new(inner, default_cache_dir())
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Snapshot file for an endpoint. The name is percent-encoded so
    /// distinct endpoints never share a file.
    pub fn cache_path(&self, endpoint: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", urlencoding::encode(endpoint)))
    }

    /// Load a cached snapshot if one exists
    pub fn load(&self, endpoint: &str) -> Result<Option<Topology>> {
        let path = self.cache_path(endpoint);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|source| Error::Cache {
            path: path.clone(),
            source,
        })?;
        let topology = serde_json::from_str(&content)
            .map_err(|source| Error::CacheFormat { path, source })?;
        Ok(Some(topology))
    }

    /// Write a snapshot, creating the cache directory if needed
    pub fn store(&self, endpoint: &str, topology: &Topology) -> Result<()> {
        let path = self.cache_path(endpoint);
        std::fs::create_dir_all(&self.cache_dir).map_err(|source| Error::Cache {
            path: self.cache_dir.clone(),
            source,
        })?;

        let content = serde_json::to_string_pretty(topology)
            .map_err(|source| Error::CacheFormat {
                path: path.clone(),
                source,
            })?;
        std::fs::write(&path, content).map_err(|source| Error::Cache { path, source })
    }
}

#[async_trait]
impl<S: TopologySource> TopologySource for CachedSource<S> {
    async fn fetch_topology(&self, endpoint: &str, force_refresh: bool) -> Result<Topology> {
        if !force_refresh {
            match self.load(endpoint) {
                Ok(Some(topology)) if !topology.is_empty() => {
                    tracing::debug!("Using cached topology for {}", endpoint);
                    return Ok(topology);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Ignoring unreadable cache for {}: {}", endpoint, e),
            }
        }

        let topology = ensure_not_empty(endpoint, self.inner.fetch_topology(endpoint, true).await?)?;

        match self.store(endpoint, &topology) {
            Ok(()) => tracing::info!(
                "Cached topology for {} ({} objects) at {:?}",
                endpoint,
                topology.len(),
                self.cache_path(endpoint)
            ),
            Err(e) => tracing::warn!("Failed to cache topology for {}: {}", endpoint, e),
        }

        Ok(topology)
    }
}
