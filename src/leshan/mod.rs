//! Leshan server interaction
//!
//! # Module Structure
//!
//! - [`client`] - Per-endpoint facade issuing read/write/observe/discover/execute/delete
//! - [`http`] - Transport contract and the reqwest implementation
//! - [`server`] - Client listing on a server
//!
//! # Example
//!
//! ```ignore
//! use leshan_rest::leshan::{Client, DEFAULT_TIMEOUT};
//! use leshan_rest::topology::{CachedSource, XmlModelSource};
//!
//! async fn example() -> leshan_rest::Result<()> {
//!     let source = CachedSource::with_default_dir(XmlModelSource::new("models"));
//!     let client = Client::connect("http://localhost:8080/#/clients/sensor-1", &source, false).await?;
//!     let value = client.read("Sensor Value", DEFAULT_TIMEOUT).await?;
//!     client.write("Sensor Units", "Cel", DEFAULT_TIMEOUT).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod server;

pub use client::{Client, ClientAddress};
pub use http::{HttpTransport, Response, Transport, DEFAULT_TIMEOUT};
pub use server::{Registration, Server};
