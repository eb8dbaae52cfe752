//! State document model
//!
//! Only the fields the engine reads are typed; everything else is kept in
//! `extra` maps and written back unchanged. Keys are written in the order
//! the source document used.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StateError};

/// State format version this engine was written against
pub const SUPPORTED_FORMAT_VERSION: u64 = 4;

/// Top-level state document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terraform_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<String>,
    #[serde(default)]
    pub resources: Vec<StateResource>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    layout: Layout,
}

impl StateDocument {
    /// Decode a document from JSON text
    ///
    /// # Errors
    /// Returns [`StateError::Decode`] if the text is not a state document.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text).map_err(StateError::Decode)?;
        let layout = Layout::capture(&raw);
        let mut document: Self = serde_json::from_value(raw).map_err(StateError::Decode)?;
        document.layout = layout;
        tracing::debug!(
            version = document.version,
            resources = document.resources.len(),
            "decoded state document"
        );
        Ok(document)
    }

    /// Encode as pretty-printed JSON with a trailing newline
    ///
    /// # Errors
    /// Returns [`StateError::Encode`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let mut value = serde_json::to_value(self).map_err(StateError::Encode)?;
        self.layout.apply(&mut value);
        let mut text = serde_json::to_string_pretty(&value).map_err(StateError::Encode)?;
        text.push('\n');
        Ok(text)
    }

    #[inline]
    #[must_use]
    pub fn is_supported_format(&self) -> bool {
        self.version == SUPPORTED_FORMAT_VERSION
    }

    /// Resources of a given type
    pub fn resources_of<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a StateResource> + 'a {
        self.resources
            .iter()
            .filter(move |r| r.resource_type == resource_type)
    }

    /// Total number of instances across all resources
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.resources.iter().map(|r| r.instances.len()).sum()
    }
}

/// Key order of the source document at each level
///
/// Keys a level never used in the source are written after the known ones.
#[derive(Debug, Clone, Default)]
struct Layout {
    document: Vec<String>,
    resource: Vec<String>,
    instance: Vec<String>,
}

// Key order is presentation, not content.
impl PartialEq for Layout {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Layout {
    fn capture(raw: &Value) -> Self {
        let mut layout = Self::default();
        let Some(document) = raw.as_object() else {
            return layout;
        };
        remember(&mut layout.document, document);
        for resource in objects(document.get("resources")) {
            remember(&mut layout.resource, resource);
            for instance in objects(resource.get("instances")) {
                remember(&mut layout.instance, instance);
            }
        }
        layout
    }

    /// Reorder a serialized document; a zero `schema_version` is left out
    /// when no source instance declared one
    fn apply(&self, value: &mut Value) {
        let Some(document) = value.as_object_mut() else {
            return;
        };
        arrange(document, &self.document);
        let implicit_version = !self.instance.is_empty() && !self.instance.iter().any(|k| k == "schema_version");
        for resource in objects_mut(document.get_mut("resources")) {
            arrange(resource, &self.resource);
            for instance in objects_mut(resource.get_mut("instances")) {
                if implicit_version && instance.get("schema_version").and_then(Value::as_u64) == Some(0) {
                    instance.shift_remove("schema_version");
                }
                arrange(instance, &self.instance);
            }
        }
    }
}

fn objects(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn objects_mut(value: Option<&mut Value>) -> impl Iterator<Item = &mut Map<String, Value>> {
    value
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

fn remember(order: &mut Vec<String>, object: &Map<String, Value>) {
    for key in object.keys() {
        if !order.contains(key) {
            order.push(key.clone());
        }
    }
}

fn arrange(object: &mut Map<String, Value>, order: &[String]) {
    if order.is_empty() {
        return;
    }
    let mut rest = std::mem::take(object);
    for key in order {
        if let Some((key, value)) = rest.shift_remove_entry(key) {
            object.insert(key, value);
        }
    }
    object.append(&mut rest);
}

/// One resource entry (all instances of one declaration)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub mode: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default)]
    pub instances: Vec<StateInstance>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StateResource {
    #[must_use]
    pub fn new(mode: impl Into<String>, resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: None,
            mode: mode.into(),
            resource_type: resource_type.into(),
            name: name.into(),
            provider: None,
            instances: Vec::new(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_instance(mut self, instance: StateInstance) -> Self {
        self.instances.push(instance);
        self
    }

    #[inline]
    #[must_use]
    pub fn is_data(&self) -> bool {
        self.mode == "data"
    }

    /// Address as written in configuration, e.g. `module.dns.data.acme_zones.all`
    #[must_use]
    pub fn address(&self) -> String {
        let local = if self.is_data() {
            format!("data.{}.{}", self.resource_type, self.name)
        } else {
            format!("{}.{}", self.resource_type, self.name)
        };
        match &self.module {
            Some(module) => format!("{module}.{local}"),
            None => local,
        }
    }
}

/// One instance of a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateInstance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_key: Option<Value>,
    #[serde(default)]
    pub schema_version: u64,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub attributes: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StateInstance {
    /// Instance with the given attributes and schema version
    #[must_use]
    pub fn new(schema_version: u64, attributes: Value) -> Self {
        Self {
            index_key: None,
            schema_version,
            attributes,
            extra: Map::new(),
        }
    }

    /// Address suffix for this instance (`[0]`, `["a"]` or empty)
    #[must_use]
    pub fn key_suffix(&self) -> String {
        match &self.index_key {
            Some(Value::String(key)) => format!("[{key:?}]"),
            Some(key) => format!("[{key}]"),
            None => String::new(),
        }
    }

    /// Attribute object, if the attributes are an object
    #[must_use]
    pub fn attribute_map(&self) -> Option<&Map<String, Value>> {
        self.attributes.as_object()
    }
}
