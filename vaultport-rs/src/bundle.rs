//! The JSON export bundle consumed by the CLI and bindings.
//!
//! A bundle carries the run's registries and the objects to convert:
//! ```json
//! {
//!   "relations": [{"id": "rel-status", "key": "status", "name": "Status", "format": "status"}],
//!   "options": {"opt-open": "Open"},
//!   "names": {"obj-ada": "Ada"},
//!   "links": {"obj-ada": {"document": "People/Ada.md"}},
//!   "files": {"file-1": "files/report.pdf"},
//!   "objects": [{"id": "obj-ada", "name": "Ada", "details": {"status": "opt-open"}}]
//! }
//! ```

use crate::error::{Result, VaultportError};
use crate::query::types::ViewOwner;
use crate::registry::{LinkTarget, RelationDefinition, Registries};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Bundle {
    pub relations: Vec<RelationDefinition>,
    pub options: HashMap<String, String>,
    pub names: HashMap<String, String>,
    pub links: HashMap<String, LinkTarget>,
    pub files: HashMap<String, String>,
    pub objects: Vec<ObjectRecord>,
}

/// One exported object: a note, or a query/collection with views.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectRecord {
    pub id: String,
    pub name: String,
    #[serde(alias = "collection")]
    pub is_collection: bool,
    /// Type ids a query is restricted to.
    #[serde(alias = "setOf")]
    pub allowed_types: Vec<String>,
    /// Untyped properties of this object that hold dates.
    pub date_keys: BTreeSet<String>,
    pub details: Map<String, Value>,
    pub views: Vec<Value>,
}

impl ObjectRecord {
    pub fn owner(&self) -> ViewOwner {
        ViewOwner {
            id: self.id.clone(),
            is_collection: self.is_collection,
            allowed_types: self.allowed_types.clone(),
        }
    }

    /// Whether the object is written as a query file.
    pub fn is_query(&self) -> bool {
        self.is_collection || !self.views.is_empty()
    }
}

impl Bundle {
    /// Read and parse a bundle file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text).map_err(|e| VaultportError::InvalidBundle {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the run's registries.
    ///
    /// Objects contribute their names, and objects without an explicit link
    /// target get one derived from their name. Derived targets never reuse
    /// a path already taken, compared case-insensitively.
    pub fn registries(&self) -> Registries {
        let mut names = self.names.clone();
        let mut links = self.links.clone();
        let mut taken: HashSet<String> = links
            .values()
            .map(|target| target.path().to_lowercase())
            .collect();
        for object in &self.objects {
            if !object.name.is_empty() {
                names
                    .entry(object.id.clone())
                    .or_insert_with(|| object.name.clone());
            }
            links
                .entry(object.id.clone())
                .or_insert_with(|| default_target(object, &mut taken));
        }

        tracing::debug!(
            relations = self.relations.len(),
            objects = self.objects.len(),
            "built registries"
        );

        Registries {
            relations: self.relations.iter().cloned().collect(),
            options: self.options.clone(),
            names,
            links,
            files: self.files.clone(),
        }
    }

    pub fn object(&self, id: &str) -> Result<&ObjectRecord> {
        self.objects
            .iter()
            .find(|o| o.id == id)
            .ok_or_else(|| VaultportError::ObjectNotFound(id.to_string()))
    }
}

/// A path named after the object, numbered `Name (2)`, `Name (3)`... when
/// the plain name is taken.
fn default_target(object: &ObjectRecord, taken: &mut HashSet<String>) -> LinkTarget {
    let stem = file_name(&object.name).unwrap_or_else(|| object.id.clone());
    let extension = if object.is_query() { "base" } else { "md" };

    let mut path = format!("{}.{}", stem, extension);
    let mut n = 1;
    while !taken.insert(path.to_lowercase()) {
        n += 1;
        path = format!("{} ({}).{}", stem, n, extension);
    }

    if object.is_query() {
        LinkTarget::QueryFile(path)
    } else {
        LinkTarget::Document(path)
    }
}

/// A name made safe for use as a single path component.
pub fn file_name(name: &str) -> Option<String> {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ValueFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BUNDLE: &str = r#"{
        "relations": [
            {"id": "rel-status", "key": "status", "name": "Status", "format": 3}
        ],
        "options": {"opt-open": "Open"},
        "links": {"obj-ada": {"document": "People/Ada.md"}},
        "objects": [
            {"id": "obj-ada", "name": "Ada", "details": {"status": "opt-open"}},
            {"id": "obj-tasks", "name": "Tasks: open", "collection": true, "views": [{"name": "All"}]}
        ]
    }"#;

    #[test]
    fn test_parse_bundle() {
        let bundle = Bundle::from_json(BUNDLE).unwrap();
        assert_eq!(bundle.objects.len(), 2);
        assert_eq!(bundle.relations[0].value_format, ValueFormat::Status);
        assert!(bundle.objects[1].is_collection);
        assert!(bundle.objects[1].is_query());
        assert!(!bundle.objects[0].is_query());
    }

    #[test]
    fn test_registries_fill_names_and_links() {
        let bundle = Bundle::from_json(BUNDLE).unwrap();
        let registries = bundle.registries();
        assert_eq!(registries.name("obj-tasks"), Some("Tasks: open"));
        assert_eq!(
            registries.link("obj-ada"),
            Some(&LinkTarget::Document("People/Ada.md".into()))
        );
        assert_eq!(
            registries.link("obj-tasks"),
            Some(&LinkTarget::QueryFile("Tasks- open.base".into()))
        );
        assert!(registries.relation("rel-status").is_some());
    }

    #[test]
    fn test_same_named_objects_get_distinct_targets() {
        let bundle = Bundle::from_json(
            r#"{
                "links": {"obj-x": {"document": "Meeting (2).md"}},
                "objects": [
                    {"id": "m-1", "name": "Meeting"},
                    {"id": "m-2", "name": "Meeting"},
                    {"id": "m-3", "name": "meeting"},
                    {"id": "m-4", "name": "Meeting", "views": [{"name": "All"}]}
                ]
            }"#,
        )
        .unwrap();
        let registries = bundle.registries();
        let path = |id: &str| registries.link(id).map(|t| t.path().to_string());

        assert_eq!(path("m-1").as_deref(), Some("Meeting.md"));
        assert_eq!(path("m-2").as_deref(), Some("Meeting (3).md"));
        assert_eq!(path("m-3").as_deref(), Some("meeting (4).md"));
        assert_eq!(path("m-4").as_deref(), Some("Meeting.base"));
    }

    #[test]
    fn test_object_not_found() {
        let bundle = Bundle::from_json(BUNDLE).unwrap();
        let err = bundle.object("missing").unwrap_err();
        assert!(matches!(err, VaultportError::ObjectNotFound(_)));
    }

    #[test]
    fn test_load_invalid_bundle() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = Bundle::load(file.path()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::exit_code::INVALID_BUNDLE);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("a/b: c").as_deref(), Some("a-b- c"));
        assert_eq!(file_name("  ").as_deref(), None);
        assert_eq!(file_name(".hidden").as_deref(), Some("hidden"));
    }
}
