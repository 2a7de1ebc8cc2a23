//! Topology Model
//!
//! Typed containers for the object → instance → resource → path tree
//! discovered for one client. Object and resource names compare
//! case-insensitively; lookups return `None` for missing branches.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Nested plain-map form used for serialization and the on-disk cache
pub type RawTopology = BTreeMap<String, BTreeMap<String, BTreeMap<String, ResourcePath>>>;

/// REST address of a single resource, e.g. `/3303/0/5700`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourcePath(String);

impl ResourcePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, i.e. the resource id (`5700` for `/3303/0/5700`)
    pub fn resource_id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourcePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ResourcePath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

/// Case-folded lookup key for object and resource names
pub(crate) fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Canonical string form of an instance id: `" 03"` and `3` both become `"3"`
pub fn normalize_instance(instance: &str) -> String {
    let trimmed = instance.trim();
    match trimmed.parse::<u64>() {
        Ok(id) => id.to_string(),
        Err(_) => trimmed.to_string(),
    }
}

#[derive(Debug, Clone)]
struct ResourceEntry {
    name: String,
    path: ResourcePath,
}

/// Resources of one instance, keyed by case-insensitive name
#[derive(Debug, Clone, Default)]
pub struct ResourceMap {
    entries: BTreeMap<String, ResourceEntry>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource; returns false (and keeps the old entry) if the
    /// name is already taken after case folding
    pub(crate) fn insert(&mut self, name: &str, path: ResourcePath) -> bool {
        let key = fold(name);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(
            key,
            ResourceEntry {
                name: name.trim().to_string(),
                path,
            },
        );
        true
    }

    /// Look up a resource path by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&ResourcePath> {
        self.entries.get(&fold(name)).map(|e| &e.path)
    }

    /// Iterate `(name, path)` pairs with names as they were discovered
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourcePath)> {
        self.entries.values().map(|e| (e.name.as_str(), &e.path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Instances of one object, keyed by instance id
#[derive(Debug, Clone, Default)]
pub struct InstanceMap {
    instances: BTreeMap<String, ResourceMap>,
}

impl InstanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an instance; `"0"`, `" 0"` and `"00"` address the same one
    pub fn get(&self, instance: &str) -> Option<&ResourceMap> {
        self.instances.get(&normalize_instance(instance))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceMap)> {
        self.instances.iter().map(|(id, res)| (id.as_str(), res))
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn entry(&mut self, instance: &str) -> &mut ResourceMap {
        self.instances
            .entry(normalize_instance(instance))
            .or_default()
    }
}

#[derive(Debug, Clone)]
struct ObjectEntry {
    name: String,
    instances: InstanceMap,
}

/// Full object → instance → resource → path tree for one client.
///
/// Built once per session and never mutated afterwards; shared reads
/// need no locking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "RawTopology", into = "RawTopology")]
pub struct Topology {
    objects: BTreeMap<String, ObjectEntry>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one resource path. Fails if the instance already holds a
    /// resource with the same case-folded name.
    pub fn insert(
        &mut self,
        object: &str,
        instance: &str,
        resource: &str,
        path: impl Into<ResourcePath>,
    ) -> Result<()> {
        let entry = self
            .objects
            .entry(fold(object))
            .or_insert_with(|| ObjectEntry {
                name: object.trim().to_string(),
                instances: InstanceMap::new(),
            });

        if !entry.instances.entry(instance).insert(resource, path.into()) {
            return Err(Error::DuplicateResource {
                object: entry.name.clone(),
                instance: normalize_instance(instance),
                resource: resource.to_string(),
            });
        }
        Ok(())
    }

    /// Look up an object by name, ignoring case
    pub fn get(&self, object: &str) -> Option<&InstanceMap> {
        self.objects.get(&fold(object)).map(|e| &e.instances)
    }

    /// Look up the resources of an exact (object, instance) pair
    pub fn instance(&self, object: &str, instance: &str) -> Option<&ResourceMap> {
        self.get(object)?.get(instance)
    }

    /// Iterate `(object name, instances)` pairs
    pub fn objects(&self) -> impl Iterator<Item = (&str, &InstanceMap)> {
        self.objects
            .values()
            .map(|e| (e.name.as_str(), &e.instances))
    }

    /// Number of objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Total number of resources across every object and instance
    pub fn resource_count(&self) -> usize {
        self.objects()
            .flat_map(|(_, instances)| instances.iter())
            .map(|(_, resources)| resources.len())
            .sum()
    }

    /// Pretty JSON rendering, handy when writing test scripts
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&RawTopology::from(self.clone()))
            .unwrap_or_else(|_| "{}".to_string())
    }
}

impl TryFrom<RawTopology> for Topology {
    type Error = Error;

    fn try_from(raw: RawTopology) -> Result<Self> {
        let mut topology = Topology::new();
        for (object, instances) in raw {
            for (instance, resources) in instances {
                for (resource, path) in resources {
                    topology.insert(&object, &instance, &resource, path)?;
                }
            }
        }
        Ok(topology)
    }
}

impl From<Topology> for RawTopology {
    fn from(topology: Topology) -> Self {
        let mut raw = RawTopology::new();
        for object in topology.objects.into_values() {
            let instances = raw.entry(object.name).or_default();
            for (id, resources) in object.instances.instances {
                let resources: BTreeMap<String, ResourcePath> = resources
                    .entries
                    .into_values()
                    .map(|e| (e.name, e.path))
                    .collect();
                instances.insert(id, resources);
            }
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Topology {
        let mut topology = Topology::new();
        topology.insert("Device", "0", "Battery Level", "/3/0/9").unwrap();
        topology.insert("Device", "0", "Manufacturer", "/3/0/0").unwrap();
        topology
            .insert("Temperature", "1", "Sensor Value", "/3303/1/5700")
            .unwrap();
        topology
    }

    #[test]
    fn test_lookup_ignores_case() {
        let topology = sample();
        let resources = topology.instance("DEVICE", "0").unwrap();
        assert_eq!(
            resources.get("battery level"),
            Some(&ResourcePath::from("/3/0/9"))
        );
        assert!(topology.get("device").is_some());
    }

    #[test]
    fn test_missing_branches_are_none() {
        let topology = sample();
        assert!(topology.get("Firmware").is_none());
        assert!(topology.instance("Device", "7").is_none());
        assert!(topology.instance("Device", "0").unwrap().get("Nope").is_none());
    }

    #[test]
    fn test_instance_ids_normalized() {
        let topology = sample();
        assert!(topology.instance("Temperature", " 01").is_some());
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let mut topology = sample();
        let err = topology
            .insert("device", "0", "BATTERY LEVEL", "/3/0/99")
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateResource { .. }));
        // first entry kept
        assert_eq!(
            topology.instance("Device", "0").unwrap().get("Battery Level"),
            Some(&ResourcePath::from("/3/0/9"))
        );
    }

    #[test]
    fn test_resource_count() {
        assert_eq!(sample().resource_count(), 3);
        assert_eq!(sample().len(), 2);
    }

    #[test]
    fn test_resource_id_is_last_segment() {
        assert_eq!(ResourcePath::from("/3303/0/5700").resource_id(), "5700");
    }

    #[test]
    fn test_json_shape_matches_nested_maps() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["Device"]["0"]["Battery Level"], "/3/0/9");

        let back: Topology = serde_json::from_value(json).unwrap();
        assert_eq!(back.resource_count(), 3);
    }

    #[test]
    fn test_deserialize_rejects_case_duplicates() {
        let json = serde_json::json!({
            "Device": {"0": {"Battery": "/3/0/9", "battery": "/3/0/10"}}
        });
        assert!(serde_json::from_value::<Topology>(json).is_err());
    }
}
