//! XML Object Models
//!
//! Builds a topology from a folder of LWM2M object definition files, the
//! same models the server loads. Only instance `0` of each object is
//! produced since definitions say nothing about live instances.

use super::model::Topology;
use super::source::{ensure_not_empty, TopologySource};
use crate::error::{Error, Result};
use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::path::{Path, PathBuf};

/// Instance id assigned to every object loaded from a model file
const MODEL_INSTANCE: &str = "0";

/// One `<Object>` definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectModel {
    pub id: String,
    pub name: String,
    /// `(resource id, resource name)` pairs in file order
    pub resources: Vec<(String, String)>,
}

#[derive(Default)]
struct ItemState {
    id: Option<String>,
    name: Option<String>,
}

fn attribute(element: &BytesStart<'_>, key: &str) -> std::result::Result<Option<String>, String> {
    match element.try_get_attribute(key) {
        Ok(Some(attr)) => attr
            .unescape_value()
            .map(|v| Some(v.trim().to_string()))
            .map_err(|e| e.to_string()),
        Ok(None) => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}

/// Parse every `<Object>` in one XML document
pub fn parse_object_models(xml: &str) -> std::result::Result<Vec<ObjectModel>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut models = Vec::new();
    let mut current: Option<ObjectModel> = None;
    let mut item: Option<ItemState> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "Object" => current = Some(ObjectModel::default()),
                    "Item" if current.is_some() => {
                        item = Some(ItemState {
                            id: attribute(&e, "ID")?,
                            name: None,
                        })
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| e.to_string())?.trim().to_string();
                let parent = stack.len().checked_sub(2).map(|i| stack[i].as_str());
                let tag = stack.last().map(String::as_str);

                match (parent, tag) {
                    (Some("Item"), Some("Name")) => {
                        if let Some(item) = item.as_mut() {
                            item.name = Some(text);
                        }
                    }
                    (Some("Object"), Some("Name")) => {
                        if let Some(model) = current.as_mut() {
                            model.name = text;
                        }
                    }
                    (Some("Object"), Some("ObjectID")) => {
                        if let Some(model) = current.as_mut() {
                            model.id = text;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                match e.name().as_ref() {
                    b"Item" => {
                        if let (Some(state), Some(model)) = (item.take(), current.as_mut()) {
                            let id = state.id.ok_or("resource item without ID attribute")?;
                            let name = state
                                .name
                                .ok_or_else(|| format!("resource {} has no Name", id))?;
                            model.resources.push((id, name));
                        }
                    }
                    b"Object" => {
                        if let Some(model) = current.take() {
                            if model.id.is_empty() || model.name.is_empty() {
                                return Err("object without Name or ObjectID".to_string());
                            }
                            models.push(model);
                        }
                    }
                    _ => {}
                }
                stack.pop();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
        }
    }

    Ok(models)
}

/// Topology source backed by a folder of `*.xml` object definitions
#[derive(Debug, Clone)]
pub struct XmlModelSource {
    models_dir: PathBuf,
}

impl XmlModelSource {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Read and merge every model file; non-XML files are skipped
    pub fn load(&self) -> Result<Topology> {
        let entries = std::fs::read_dir(&self.models_dir).map_err(|e| Error::Model {
            path: self.models_dir.clone(),
            reason: e.to_string(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("xml")))
            .collect();
        files.sort();

        let mut topology = Topology::new();
        for file in files {
            let content = std::fs::read_to_string(&file).map_err(|e| Error::Model {
                path: file.clone(),
                reason: e.to_string(),
            })?;
            let models = parse_object_models(&content).map_err(|reason| Error::Model {
                path: file.clone(),
                reason,
            })?;

            for model in models {
                tracing::debug!(
                    "Loaded object model {} ({}) from {:?}",
                    model.name,
                    model.id,
                    file
                );
                for (resource_id, resource_name) in &model.resources {
                    let path = format!("/{}/{}/{}", model.id, MODEL_INSTANCE, resource_id);
                    topology.insert(&model.name, MODEL_INSTANCE, resource_name, path)?;
                }
            }
        }

        Ok(topology)
    }
}

#[async_trait]
impl TopologySource for XmlModelSource {
    async fn fetch_topology(&self, endpoint: &str, _force_refresh: bool) -> Result<Topology> {
        ensure_not_empty(endpoint, self.load()?)
    }
}
