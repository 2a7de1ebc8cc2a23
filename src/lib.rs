//! Read and write LWM2M resources on a Leshan server by name.
//!
//! A [`Client`] holds the discovered topology of one registered endpoint and
//! maps queries such as `("Battery", "Device", 0)` onto REST paths like
//! `/3/0/9` before issuing the request.

pub mod config;
pub mod error;
pub mod leshan;
pub mod topology;

pub use error::{Error, Result};
pub use leshan::{Client, ClientAddress, HttpTransport, Server, Transport, DEFAULT_TIMEOUT};
pub use topology::{resolve, Query, ResourcePath, Topology, TopologySource};
