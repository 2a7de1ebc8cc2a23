//! Resource topology
//!
//! The object → instance → resource → path tree of one LWM2M client, the
//! resolver that turns a human-friendly query into a single path, and the
//! sources that discover or load the tree.
//!
//! # Module Structure
//!
//! - [`model`] - Typed topology containers
//! - [`resolver`] - Query disambiguation
//! - [`source`] - Source contract, static source and on-disk cache
//! - [`xml`] - Object definition folder source
//! - [`api`] - Server REST source
//!
//! # Example
//!
//! ```
//! use leshan_rest::topology::{resolve, Query, Topology};
//!
//! let mut topology = Topology::new();
//! topology.insert("Device", "0", "Battery", "/3/0/9").unwrap();
//! topology.insert("Connectivity", "0", "Battery", "/4/0/2").unwrap();
//!
//! assert!(resolve(&topology, &Query::new("battery")).is_err());
//! let path = resolve(&topology, &Query::new("battery").object("Device")).unwrap();
//! assert_eq!(path.as_str(), "/3/0/9");
//! ```

pub mod api;
pub mod model;
pub mod resolver;
pub mod source;
pub mod xml;

pub use api::ApiSource;
pub use model::{normalize_instance, InstanceMap, RawTopology, ResourceMap, ResourcePath, Topology};
pub use resolver::{resolve, Query};
pub use source::{default_cache_dir, CachedSource, StaticSource, TopologySource};
pub use xml::{parse_object_models, ObjectModel, XmlModelSource};
