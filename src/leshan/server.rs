//! Leshan Server
//!
//! Lists the clients registered on a server and opens sessions for them.

use super::client::{Client, ClientAddress};
use super::http::{HttpTransport, Transport};
use crate::error::{Error, Result};
use crate::topology::{ApiSource, TopologySource};
use reqwest::Method;
use serde::Deserialize;
use std::time::Duration;

/// Registration entry returned by `GET /api/clients`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub endpoint: String,
    #[serde(default)]
    pub registration_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Strip UI noise from a server URL: `http://h:8080/#/clients/` → `http://h:8080`
fn normalize_server_url(url: &str) -> String {
    let mut url = url.trim().trim_end_matches('/');
    for suffix in ["/#/clients", "/#", "/api/clients", "/api"] {
        if let Some(stripped) = url.strip_suffix(suffix) {
            url = stripped.trim_end_matches('/');
        }
    }
    url.to_string()
}

/// Handle on one Leshan server
#[derive(Clone)]
pub struct Server<T = HttpTransport> {
    url: String,
    transport: T,
}

impl Server<HttpTransport> {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self::with_transport(url, HttpTransport::new()?))
    }
}

impl<T: Transport + Clone> Server<T> {
    pub fn with_transport(url: &str, transport: T) -> Self {
        Self {
            url: normalize_server_url(url),
            transport,
        }
    }

    /// Base URL, e.g. `http://localhost:8080`
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Full registration records of every connected client
    pub async fn registrations(&self, timeout: Duration) -> Result<Vec<Registration>> {
        let url = format!("{}/api/clients", self.url);
        let response = self
            .transport
            .request(Method::GET, &url, timeout, None)
            .await?;
        let payload = response.json()?;
        serde_json::from_value(payload).map_err(|source| Error::Decode { url, source })
    }

    /// Endpoint names of every connected client
    pub async fn clients(&self, timeout: Duration) -> Result<Vec<String>> {
        let endpoints: Vec<String> = self
            .registrations(timeout)
            .await?
            .into_iter()
            .map(|r| r.endpoint)
            .collect();
        tracing::info!("{} clients registered on {}", endpoints.len(), self.url);
        Ok(endpoints)
    }

    pub fn client_address(&self, endpoint: &str) -> Result<ClientAddress> {
        ClientAddress::for_endpoint(&self.url, endpoint)
    }

    /// Topology source reading object links and specs from this server
    pub fn api_source(&self, timeout: Duration) -> ApiSource<T> {
        ApiSource::new(&self.url, self.transport.clone(), timeout)
    }

    /// Open a session for one registered client
    pub async fn connect<S>(&self, endpoint: &str, source: &S, refresh: bool) -> Result<Client<T>>
    where
        S: TopologySource + ?Sized,
    {
        let address = self.client_address(endpoint)?;
        let topology = source.fetch_topology(address.endpoint(), refresh).await?;
        Ok(Client::with_transport(address, topology, self.transport.clone()))
    }

    /// Open a session for every registered client, one after another
    pub async fn connect_all<S>(
        &self,
        source: &S,
        refresh: bool,
        timeout: Duration,
    ) -> Result<Vec<Client<T>>>
    where
        S: TopologySource + ?Sized,
    {
        let mut clients = Vec::new();
        for endpoint in self.clients(timeout).await? {
            clients.push(self.connect(&endpoint, source, refresh).await?);
        }
        Ok(clients)
    }
}
