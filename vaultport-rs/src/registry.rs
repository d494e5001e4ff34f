//! Lookup registries built once per conversion run.
//!
//! The export reader builds these from the full object set; resolution and
//! compilation only ever read them.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// How a relation's values are stored and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    PlainText,
    Number,
    Date,
    Status,
    Tag,
    ObjectRef,
    File,
    Other,
}

impl ValueFormat {
    /// Parse a textual format tag. Unknown tags map to `Other`.
    pub fn parse(tag: &str) -> Self {
        let normalized: String = tag
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "plaintext" | "text" | "longtext" | "shorttext" => ValueFormat::PlainText,
            "number" => ValueFormat::Number,
            "date" => ValueFormat::Date,
            "status" => ValueFormat::Status,
            "tag" => ValueFormat::Tag,
            "objectref" | "object" => ValueFormat::ObjectRef,
            "file" => ValueFormat::File,
            _ => match normalized.parse::<i64>() {
                Ok(code) => Self::from_code(code),
                Err(_) => ValueFormat::Other,
            },
        }
    }

    /// Map the source's numeric relation-format codes.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 | 1 => ValueFormat::PlainText,
            2 => ValueFormat::Number,
            3 => ValueFormat::Status,
            4 => ValueFormat::Date,
            5 => ValueFormat::File,
            11 => ValueFormat::Tag,
            100 => ValueFormat::ObjectRef,
            // checkbox, url, email, phone, emoji, relations
            _ => ValueFormat::Other,
        }
    }

    /// Formats whose values are identifiers of other records.
    pub fn holds_ids(self) -> bool {
        matches!(
            self,
            ValueFormat::ObjectRef | ValueFormat::Status | ValueFormat::Tag | ValueFormat::File
        )
    }
}

impl<'de> Deserialize<'de> for ValueFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match &raw {
            serde_json::Value::Number(n) => Self::from_code(n.as_i64().unwrap_or(-1)),
            serde_json::Value::String(s) => Self::parse(s),
            _ => ValueFormat::Other,
        })
    }
}

/// A typed property definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDefinition {
    pub id: String,
    pub key: String,
    #[serde(default, alias = "name")]
    pub display_name: String,
    #[serde(default = "default_format", alias = "format")]
    pub value_format: ValueFormat,
    /// Zero means unbounded.
    #[serde(default)]
    pub max_count: u32,
}

fn default_format() -> ValueFormat {
    ValueFormat::Other
}

/// How a relation is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelationRef {
    ById(String),
    ByKey(String),
}

/// Relation definitions, reachable by key or by id.
#[derive(Debug, Clone, Default)]
pub struct RelationRegistry {
    definitions: Vec<RelationDefinition>,
    index: HashMap<RelationRef, usize>,
}

impl RelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under both its key and its id.
    pub fn insert(&mut self, definition: RelationDefinition) {
        let slot = self.definitions.len();
        if !definition.key.is_empty() {
            self.index
                .insert(RelationRef::ByKey(definition.key.clone()), slot);
        }
        if !definition.id.is_empty() {
            self.index.insert(RelationRef::ById(definition.id.clone()), slot);
        }
        self.definitions.push(definition);
    }

    pub fn get(&self, reference: &RelationRef) -> Option<&RelationDefinition> {
        self.index.get(reference).map(|&slot| &self.definitions[slot])
    }

    /// Look up a raw property key, trying the key form before the id form.
    pub fn lookup(&self, raw: &str) -> Option<&RelationDefinition> {
        self.get(&RelationRef::ByKey(raw.to_string()))
            .or_else(|| self.get(&RelationRef::ById(raw.to_string())))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl FromIterator<RelationDefinition> for RelationRegistry {
    fn from_iter<I: IntoIterator<Item = RelationDefinition>>(iter: I) -> Self {
        let mut registry = Self::new();
        for definition in iter {
            registry.insert(definition);
        }
        registry
    }
}

/// The document (or query file) that represents an entity in the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTarget {
    /// A markdown note, addressed with a reference marker.
    Document(String),
    /// A `.base` query file, addressed with an embed marker.
    #[serde(alias = "query")]
    QueryFile(String),
}

impl LinkTarget {
    pub fn path(&self) -> &str {
        match self {
            LinkTarget::Document(path) | LinkTarget::QueryFile(path) => path,
        }
    }

    pub fn is_query_file(&self) -> bool {
        matches!(self, LinkTarget::QueryFile(_))
    }
}

/// All lookup tables for one conversion run.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub relations: RelationRegistry,
    /// Option id → label for Status/Tag values.
    pub options: HashMap<String, String>,
    /// Any entity id → display name.
    pub names: HashMap<String, String>,
    /// Entity id → vault path of the representing document.
    pub links: HashMap<String, LinkTarget>,
    /// File id → vault path of the copied file.
    pub files: HashMap<String, String>,
}

impl Registries {
    pub fn relation(&self, raw_key: &str) -> Option<&RelationDefinition> {
        self.relations.lookup(raw_key)
    }

    pub fn option_label(&self, id: &str) -> Option<&str> {
        self.options.get(id).map(String::as_str).filter(|s| !s.is_empty())
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str).filter(|s| !s.is_empty())
    }

    pub fn link(&self, id: &str) -> Option<&LinkTarget> {
        self.links.get(id)
    }

    pub fn file_path(&self, id: &str) -> Option<&str> {
        self.files.get(id).map(String::as_str)
    }
}
