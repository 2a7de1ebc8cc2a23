//! Server API Source
//!
//! Builds a client's topology from the same REST data the server's web UI
//! renders: the client's registered object links (which instances exist)
//! and the object specifications (object and resource names).

use super::model::Topology;
use super::source::{ensure_not_empty, TopologySource};
use crate::error::{Error, Result};
use crate::leshan::http::Transport;
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientRecord {
    #[serde(default)]
    object_links: Vec<ObjectLink>,
    #[serde(default)]
    root_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ObjectLink {
    #[serde(alias = "uriReference")]
    url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ObjectSpec {
    id: u32,
    name: String,
    #[serde(default)]
    resourcedefs: Vec<ResourceSpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResourceSpec {
    id: u32,
    name: String,
}

/// Split an object link into `(object id, instance id)`; links to the
/// root or to a bare object carry no instance and yield `None`
fn parse_link(url: &str, root_path: Option<&str>) -> Option<(u32, String)> {
    let root = root_path.unwrap_or("/").trim_end_matches('/');
    let relative = url.strip_prefix(root).unwrap_or(url);

    let mut parts = relative.trim_matches('/').split('/');
    let object = parts.next()?.parse::<u32>().ok()?;
    let instance = parts.next()?.parse::<u32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((object, instance.to_string()))
}

/// Topology source querying `/api/clients/<ep>` and `/api/objectspecs/<ep>`
#[derive(Debug, Clone)]
pub struct ApiSource<T> {
    server_url: String,
    transport: T,
    timeout: Duration,
}

impl<T: Transport> ApiSource<T> {
    pub fn new(server_url: &str, transport: T, timeout: Duration) -> Self {
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            transport,
            timeout,
        }
    }

    async fn get<D: DeserializeOwned>(&self, url: String) -> Result<D> {
        let response = self
            .transport
            .request(Method::GET, &url, self.timeout, None)
            .await?;
        serde_json::from_value(response.json()?).map_err(|source| Error::Decode { url, source })
    }

    /// Build the topology of one endpoint from its links and object specs
    pub async fn discover(&self, endpoint: &str) -> Result<Topology> {
        let encoded = urlencoding::encode(endpoint);
        let record: ClientRecord = self
            .get(format!("{}/api/clients/{}", self.server_url, encoded))
            .await?;
        let specs: Vec<ObjectSpec> = self
            .get(format!("{}/api/objectspecs/{}", self.server_url, encoded))
            .await?;
        let specs: HashMap<u32, ObjectSpec> = specs.into_iter().map(|s| (s.id, s)).collect();

        let mut topology = Topology::new();
        for link in &record.object_links {
            let Some((object_id, instance)) = parse_link(&link.url, record.root_path.as_deref())
            else {
                continue;
            };
            let Some(spec) = specs.get(&object_id) else {
                tracing::warn!("No object spec for /{} on {}", object_id, endpoint);
                continue;
            };

            for resource in &spec.resourcedefs {
                let path = format!("/{}/{}/{}", object_id, instance, resource.id);
                topology.insert(&spec.name, &instance, &resource.name, path)?;
            }
        }

        tracing::info!(
            "Discovered {} objects ({} resources) for {}",
            topology.len(),
            topology.resource_count(),
            endpoint
        );
        Ok(topology)
    }
}

#[async_trait]
impl<T: Transport> TopologySource for ApiSource<T> {
    async fn fetch_topology(&self, endpoint: &str, _force_refresh: bool) -> Result<Topology> {
        ensure_not_empty(endpoint, self.discover(endpoint).await?)
    }
}
