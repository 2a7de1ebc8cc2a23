//! Resource Resolver
//!
//! Maps a human-friendly `(resource, object, instance)` query onto exactly
//! one [`ResourcePath`] of a [`Topology`], or fails with `NotFound` /
//! `AmbiguousMatch`.
//!
//! The scan scope is chosen from which parts of the query are present:
//!
//! | object            | instance | scope                                |
//! |-------------------|----------|--------------------------------------|
//! | none              | none     | every object, every instance         |
//! | none              | `i`      | instance `i` of every object         |
//! | integer `n`       | none     | instance `n` of every object         |
//! | integer `n`       | `name`   | instance `n` of object `name` (swap) |
//! | `name`            | none     | every instance of `name`             |
//! | `name`            | `i`      | instance `i` of `name` only          |
//!
//! An integer in the object slot is taken as an instance id, so callers
//! that pass the instance positionally still get a sensible answer.

use super::model::{normalize_instance, ResourceMap, ResourcePath, Topology};
use crate::error::{Error, Result};

/// A lookup request against a topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub resource: String,
    pub object: Option<String>,
    pub instance: Option<String>,
}

impl Query {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            object: None,
            instance: None,
        }
    }

    /// Restrict to one object (or, if numeric, one instance id)
    pub fn object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Restrict to one instance id; accepts integers or numeric strings
    pub fn instance(mut self, instance: impl ToString) -> Self {
        self.instance = Some(instance.to_string());
        self
    }
}

impl From<&str> for Query {
    fn from(resource: &str) -> Self {
        Self::new(resource)
    }
}

impl From<String> for Query {
    fn from(resource: String) -> Self {
        Self::new(resource)
    }
}

/// Which branches of the topology a query reaches
#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope<'q> {
    Everywhere,
    Instance(String),
    Object(&'q str),
    Exact(&'q str, String),
}

/// Integer check used to detect an instance id passed in the object slot
fn as_instance_id(value: &str) -> Option<String> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .map(|_| normalize_instance(value))
}

fn scope_of(query: &Query) -> Scope<'_> {
    match (query.object.as_deref(), query.instance.as_deref()) {
        (None, None) => Scope::Everywhere,
        (None, Some(instance)) => Scope::Instance(normalize_instance(instance)),
        (Some(object), instance) => match as_instance_id(object) {
            // object slot held the instance id; whatever sat in the
            // instance slot is the object name
            Some(id) => match instance {
                Some(name) => Scope::Exact(name, id),
                None => Scope::Instance(id),
            },
            None => match instance {
                Some(instance) => Scope::Exact(object, normalize_instance(instance)),
                None => Scope::Object(object),
            },
        },
    }
}

/// Running match list shared by the whole resolution; fails on the
/// second hit.
struct Matches<'a> {
    resource: &'a str,
    found: Option<&'a ResourcePath>,
}

impl<'a> Matches<'a> {
    fn scan(&mut self, resources: Option<&'a ResourceMap>) -> Result<()> {
        let Some(path) = resources.and_then(|r| r.get(self.resource)) else {
            return Ok(());
        };
        if self.found.is_some() {
            return Err(Error::AmbiguousMatch {
                resource: self.resource.to_string(),
            });
        }
        self.found = Some(path);
        Ok(())
    }
}

/// Resolve a query to the single resource path it names
pub fn resolve(topology: &Topology, query: &Query) -> Result<ResourcePath> {
    let scope = scope_of(query);
    tracing::debug!("resolve '{}' in {:?}", query.resource, scope);

    let mut matches = Matches {
        resource: &query.resource,
        found: None,
    };

    match &scope {
        Scope::Everywhere => {
            for (_, instances) in topology.objects() {
                for (_, resources) in instances.iter() {
                    matches.scan(Some(resources))?;
                }
            }
        }
        Scope::Instance(instance) => {
            for (_, instances) in topology.objects() {
                matches.scan(instances.get(instance))?;
            }
        }
        Scope::Object(object) => {
            if let Some(instances) = topology.get(object) {
                for (_, resources) in instances.iter() {
                    matches.scan(Some(resources))?;
                }
            }
        }
        Scope::Exact(object, instance) => {
            matches.scan(topology.instance(object, instance))?;
        }
    }

    matches.found.cloned().ok_or_else(|| Error::NotFound {
        resource: query.resource.clone(),
    })
}
