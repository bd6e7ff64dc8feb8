use crate::ResourceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One discovered entity, normalized from a single provider API page item.
///
/// Records are created once per discovery run and never mutated; the next
/// run supersedes them wholesale. `attributes` is an open map: known fields
/// are normalized into stable names by the collectors, unknown provider
/// fields are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub resource_type: ResourceType,
    pub region: String,
    pub name: Option<String>,
    pub attributes: Map<String, Value>,
    pub discovered_at: DateTime<Utc>,
}

impl ResourceRecord {
    pub fn new(id: impl Into<String>, resource_type: ResourceType, region: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type,
            region: region.into(),
            name: None,
            attributes: Map::new(),
            discovered_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.name = Some(name);
        }
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }

    /// String attribute, if present and a string.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// List-of-strings attribute; non-string elements are skipped.
    pub fn attr_str_list(&self, key: &str) -> Vec<&str> {
        self.attributes
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(Value::as_bool)
    }

    pub fn attr_f64(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(Value::as_f64)
    }

    /// Human label for reporting: name when present, id otherwise.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
