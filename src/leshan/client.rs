//! Leshan Client
//!
//! Facade over one registered LWM2M client: resolves human-friendly
//! resource queries against the client's topology and issues the matching
//! REST call on the server.

use super::http::{HttpTransport, Response, Transport};
use crate::error::{Error, Result};
use crate::topology::{resolve, Query, ResourcePath, Topology, TopologySource};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// REST base address of one client endpoint on a Leshan server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddress {
    endpoint: String,
    rest_base: String,
}

impl ClientAddress {
    /// Parse either the web UI address (`http://host:8080/#/clients/dev1`)
    /// or the REST address (`http://host:8080/api/clients/dev1`).
    pub fn parse(address: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidAddress {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(address.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }

        let path_segments = url.path_segments().into_iter().flatten();
        let fragment_segments = url.fragment().unwrap_or("").split('/');
        let segments: Vec<String> = path_segments
            .chain(fragment_segments)
            .filter(|s| !s.is_empty())
            .map(|s| {
                urlencoding::decode(s)
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| s.to_string())
            })
            .collect();

        let Some(pos) = segments
            .iter()
            .position(|s| s == "clients" || s == "client")
        else {
            return Err(invalid("no clients/<endpoint> segment"));
        };
        let Some(endpoint) = segments.get(pos + 1) else {
            return Err(invalid("missing endpoint name"));
        };

        // the UI may sit under a `default` context; it is never part of the REST path
        let mut prefix: Vec<&String> = segments[..pos]
            .iter()
            .filter(|s| s.as_str() != "default")
            .collect();
        if prefix.last().is_some_and(|s| s.as_str() == "api") {
            prefix.pop();
        }

        let mut base = url.clone();
        base.set_fragment(None);
        base.set_query(None);
        base.path_segments_mut()
            .map_err(|_| invalid("address cannot carry a path"))?
            .clear()
            .extend(prefix)
            .extend(["api", "clients", endpoint.as_str()]);

        Ok(Self {
            endpoint: endpoint.clone(),
            rest_base: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Address of `endpoint` on the server rooted at `server_url`
    pub fn for_endpoint(server_url: &str, endpoint: &str) -> Result<Self> {
        Self::parse(&format!(
            "{}/api/clients/{}",
            server_url.trim_end_matches('/'),
            urlencoding::encode(endpoint)
        ))
    }

    /// Registered endpoint name
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `http://host:port/api/clients/<endpoint>`
    pub fn rest_base(&self) -> &str {
        &self.rest_base
    }

    /// Full request target for a resource path plus optional verb suffix
    pub fn target(&self, path: &ResourcePath, suffix: &str) -> String {
        let path = path.as_str();
        let separator = if path.starts_with('/') { "" } else { "/" };
        format!("{}{}{}{}", self.rest_base, separator, path, suffix)
    }
}

/// The six REST operations the server exposes per resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Read,
    Write,
    Observe,
    Discover,
    Execute,
    Delete,
}

impl Verb {
    fn method(self) -> Method {
        match self {
            Verb::Read | Verb::Discover => Method::GET,
            Verb::Write => Method::PUT,
            Verb::Observe | Verb::Execute => Method::POST,
            Verb::Delete => Method::DELETE,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Verb::Observe => "/observe",
            Verb::Discover => "/discover",
            _ => "",
        }
    }
}

/// Session bound to one client endpoint and its discovered topology
#[derive(Clone)]
pub struct Client<T = HttpTransport> {
    address: ClientAddress,
    topology: Arc<Topology>,
    transport: T,
}

impl Client<HttpTransport> {
    /// Connect to a client by address, discovering its topology through
    /// `source`. `refresh` forces rediscovery even if a cached copy exists.
    pub async fn connect<S>(address: &str, source: &S, refresh: bool) -> Result<Self>
    where
        S: TopologySource + ?Sized,
    {
        let address = ClientAddress::parse(address)?;
        let topology = source.fetch_topology(address.endpoint(), refresh).await?;
        tracing::info!(
            "Connected to {} ({} objects, {} resources)",
            address.endpoint(),
            topology.len(),
            topology.resource_count()
        );
        Ok(Self::with_transport(address, topology, HttpTransport::new()?))
    }
}

impl<T: Transport> Client<T> {
    /// Build a client from its parts
    pub fn with_transport(address: ClientAddress, topology: Topology, transport: T) -> Self {
        Self {
            address,
            topology: Arc::new(topology),
            transport,
        }
    }

    pub fn address(&self) -> &ClientAddress {
        &self.address
    }

    pub fn endpoint(&self) -> &str {
        self.address.endpoint()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Resolve a query without issuing a request
    pub fn resolve(&self, query: impl Into<Query>) -> Result<ResourcePath> {
        resolve(&self.topology, &query.into())
    }

    async fn send(
        &self,
        verb: Verb,
        path: &ResourcePath,
        timeout: Duration,
        body: Option<&Value>,
    ) -> Result<Response> {
        let url = self.address.target(path, verb.suffix());
        tracing::debug!("{:?} {}", verb, url);
        self.transport
            .request(verb.method(), &url, timeout, body)
            .await
    }

    async fn call(&self, verb: Verb, query: Query, timeout: Duration) -> Result<Response> {
        let path = resolve(&self.topology, &query)?;
        self.send(verb, &path, timeout, None).await
    }

    /// Read the current value of a resource (`content.value` of the reply)
    pub async fn read(&self, query: impl Into<Query>, timeout: Duration) -> Result<Value> {
        let query = query.into();
        let response = self.call(Verb::Read, query.clone(), timeout).await?;

        let mut payload = response.json()?;
        payload
            .get_mut("content")
            .and_then(|content| content.get_mut("value"))
            .map(Value::take)
            .ok_or(Error::MissingField {
                resource: query.resource,
                field: "content.value",
            })
    }

    /// Write a value to a resource.
    ///
    /// The body is `{"id": <resource id>, "value": <value>}`; a numeric
    /// resource id is sent as a JSON number, not as a string.
    pub async fn write(
        &self,
        query: impl Into<Query>,
        value: impl Into<Value>,
        timeout: Duration,
    ) -> Result<()> {
        let path = resolve(&self.topology, &query.into())?;
        let id = path.resource_id();
        let id = id
            .parse::<u32>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(id));
        let value: Value = value.into();
        let body = json!({ "id": id, "value": value });

        self.send(Verb::Write, &path, timeout, Some(&body)).await?;
        Ok(())
    }

    /// Start observing a resource
    pub async fn observe(&self, query: impl Into<Query>, timeout: Duration) -> Result<()> {
        self.call(Verb::Observe, query.into(), timeout).await?;
        Ok(())
    }

    /// Discover the attributes of a resource
    pub async fn discover(&self, query: impl Into<Query>, timeout: Duration) -> Result<()> {
        self.call(Verb::Discover, query.into(), timeout).await?;
        Ok(())
    }

    /// Execute an executable resource
    pub async fn execute(&self, query: impl Into<Query>, timeout: Duration) -> Result<()> {
        self.call(Verb::Execute, query.into(), timeout).await?;
        Ok(())
    }

    /// Delete a resource
    pub async fn delete(&self, query: impl Into<Query>, timeout: Duration) -> Result<()> {
        self.call(Verb::Delete, query.into(), timeout).await?;
        Ok(())
    }

    /// Read a resource and fail unless it equals `expected`
    pub async fn assert_read(
        &self,
        query: impl Into<Query>,
        expected: impl Into<Value>,
        timeout: Duration,
    ) -> Result<()> {
        let query = query.into();
        let expected = expected.into();
        let actual = self.read(query.clone(), timeout).await?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                resource: query.resource,
                expected,
                actual,
            });
        }
        Ok(())
    }
}
