//! Configuration for value resolution and query compilation.
//!
//! Loaded from `<config_dir>/vaultport/config.toml` unless a path is given:
//! ```toml
//! [resolver]
//! link_style = "wikilink"
//! link_as_reference = ["Status"]
//! date_keys = ["deadline"]
//!
//! [query]
//! kanban_as_board = true
//! ```

use crate::error::{Result, VaultportError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// How link references are rendered into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStyle {
    /// `[[Folder/Note]]`, `![[Sets/Query.base]]`
    #[default]
    Wikilink,
    /// `[Note](../Folder/Note.md)`
    Markdown,
}

/// Static key sets and policies for the value resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Internal properties that are never exported.
    pub hidden_keys: BTreeSet<String>,
    /// Properties that change on every sync; exported only when
    /// `include_dynamic` is set.
    pub dynamic_keys: BTreeSet<String>,
    pub include_dynamic: bool,
    /// Untyped properties whose values should render as dates.
    pub date_keys: BTreeSet<String>,
    /// Status/Tag properties (by key or display name) whose values prefer
    /// a link to the option's own document over its label.
    pub link_as_reference: BTreeSet<String>,
    /// Properties whose ObjectRef ids are exported verbatim.
    pub raw_id_keys: BTreeSet<String>,
    pub link_style: LinkStyle,
}

fn key_set(keys: &[&str]) -> BTreeSet<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            hidden_keys: key_set(&[
                "id",
                "spaceId",
                "layout",
                "layoutAlign",
                "internalFlags",
                "restrictions",
                "featuredRelations",
                "snippet",
                "iconEmoji",
                "iconImage",
                "coverId",
                "coverType",
                "coverX",
                "coverY",
                "coverScale",
                "sourceObject",
                "uniqueKey",
                "setOf",
            ]),
            dynamic_keys: key_set(&[
                "lastOpenedDate",
                "lastModifiedBy",
                "lastUsedDate",
                "syncStatus",
                "syncDate",
                "syncError",
                "backlinks",
                "links",
                "revision",
            ]),
            include_dynamic: false,
            date_keys: BTreeSet::new(),
            link_as_reference: BTreeSet::new(),
            raw_id_keys: key_set(&[DEFAULT_PROVENANCE_KEY]),
            link_style: LinkStyle::default(),
        }
    }
}

impl ResolverConfig {
    /// Whether a raw key is excluded from front matter.
    pub fn is_suppressed(&self, key: &str) -> bool {
        self.hidden_keys.contains(key) || (!self.include_dynamic && self.dynamic_keys.contains(key))
    }
}

pub const DEFAULT_PROVENANCE_KEY: &str = "createdInContext";
pub const DEFAULT_TYPE_KEY: &str = "type";

/// Policies for the query compiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Compile source board views as kanban instead of table.
    pub kanban_as_board: bool,
    /// Property recording which collection a record was created inside.
    pub provenance_key: String,
    /// Property holding a record's type reference.
    pub type_key: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            kanban_as_board: false,
            provenance_key: DEFAULT_PROVENANCE_KEY.to_string(),
            type_key: DEFAULT_TYPE_KEY.to_string(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub resolver: ResolverConfig,
    pub query: QueryConfig,
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vaultport").join("config.toml"))
    }

    /// Load from an explicit path, or from the default location when it
    /// exists. Falls back to defaults when no file is present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load from a specific TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            VaultportError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.resolver.hidden_keys.contains("id"));
        assert!(config.resolver.is_suppressed("syncStatus"));
        assert!(!config.resolver.is_suppressed("status"));
        assert_eq!(config.query.provenance_key, "createdInContext");
        assert!(config.resolver.raw_id_keys.contains("createdInContext"));
        assert_eq!(config.resolver.link_style, LinkStyle::Wikilink);
    }

    #[test]
    fn test_include_dynamic() {
        let mut config = ResolverConfig::default();
        config.include_dynamic = true;
        assert!(!config.is_suppressed("syncStatus"));
        assert!(config.is_suppressed("id"));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = Config::from_toml(
            r#"
[resolver]
link_style = "markdown"
link_as_reference = ["Status"]

[query]
kanban_as_board = true
"#,
        )
        .unwrap();
        assert_eq!(config.resolver.link_style, LinkStyle::Markdown);
        assert!(config.resolver.link_as_reference.contains("Status"));
        // Unspecified fields keep their defaults.
        assert!(config.resolver.hidden_keys.contains("layout"));
        assert!(config.query.kanban_as_board);
        assert_eq!(config.query.type_key, "type");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed.query.provenance_key, config.query.provenance_key);
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = Config::load(Some(Path::new("/nonexistent/vaultport.toml"))).unwrap_err();
        assert!(matches!(err, VaultportError::ConfigError(_)));
    }
}
