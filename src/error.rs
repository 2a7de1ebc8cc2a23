//! Error types for resource lookup and REST calls

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving resources or talking to the server
#[derive(Debug, Error)]
pub enum Error {
    /// No resource in the reachable part of the topology has this name
    #[error("could not find a resource named '{resource}' that satisfies the given object and instance")]
    NotFound { resource: String },

    /// More than one resource matched; the caller must narrow the query
    #[error("multiple resources match '{resource}'; specify an object name or instance number")]
    AmbiguousMatch { resource: String },

    /// The request succeeded but the payload lacks the expected field
    #[error("resource '{resource}' is not available for reading: response has no '{field}' field")]
    MissingField {
        resource: String,
        field: &'static str,
    },

    /// The request did not complete within the caller's timeout
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// The server answered with a non-success status
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// Connection or protocol level failure
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not valid JSON
    #[error("failed to parse response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A topology source produced nothing for this endpoint
    #[error("topology for client '{endpoint}' is empty")]
    EmptyTopology { endpoint: String },

    /// Two resources of one instance share a name after case folding
    #[error("resource '{resource}' appears twice in {object}/{instance}")]
    DuplicateResource {
        object: String,
        instance: String,
        resource: String,
    },

    /// The client URL could not be turned into a REST base address
    #[error("invalid client address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Reading or writing the topology cache failed
    #[error("topology cache error at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The topology cache file holds malformed JSON
    #[error("malformed topology cache at {path}: {source}")]
    CacheFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An object model file could not be read or understood
    #[error("invalid object model {path}: {reason}")]
    Model { path: PathBuf, reason: String },

    /// `assert_read` observed a different value
    #[error("resource '{resource}' read {actual}, expected {expected}")]
    AssertionFailed {
        resource: String,
        expected: serde_json::Value,
        actual: serde_json::Value,
    },
}

impl Error {
    /// True for failures that come from the network call itself
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. }
                | Error::Status { .. }
                | Error::Request { .. }
                | Error::Decode { .. }
        )
    }

    /// True when the request hit the caller-supplied timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}
