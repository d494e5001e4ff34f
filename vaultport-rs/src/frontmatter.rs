//! Building front matter for one exported document.

use crate::error::Result;
use crate::resolve::path::{resolve_external_name, NameAllocator};
use crate::resolve::value::ValueResolver;
use crate::value::is_list;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Turns an object's raw property map into named, display-ready entries.
#[derive(Debug, Clone, Copy)]
pub struct FrontmatterBuilder<'a> {
    resolver: ValueResolver<'a>,
}

impl<'a> FrontmatterBuilder<'a> {
    pub fn new(resolver: ValueResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Resolve every exported property, in source order.
    ///
    /// `date_hints` lists raw keys the caller knows hold dates even though
    /// their relation is untyped.
    pub fn build(&self, details: &Map<String, Value>, date_hints: &BTreeSet<String>) -> Vec<(String, Value)> {
        let config = self.resolver.config();
        let registries = self.resolver.registries();
        let mut names = NameAllocator::new();
        let mut entries = Vec::with_capacity(details.len());

        for (raw_key, raw_value) in details {
            if config.is_suppressed(raw_key) {
                continue;
            }
            let relation = registries.relation(raw_key);
            let name = names.allocate(raw_key, resolve_external_name(raw_key, relation));
            let value = self
                .resolver
                .resolve_value_with(raw_key, raw_value, is_list(raw_value), date_hints.contains(raw_key))
                .into_value();
            entries.push((name, value));
        }

        tracing::debug!(properties = entries.len(), "built front matter");
        entries
    }

    /// Like [`build`](Self::build), collected into an ordered map.
    pub fn build_map(&self, details: &Map<String, Value>, date_hints: &BTreeSet<String>) -> Map<String, Value> {
        self.build(details, date_hints).into_iter().collect()
    }
}

/// Serialize entries as a YAML front matter block.
pub fn serialize_frontmatter(entries: &[(String, Value)]) -> Result<String> {
    if entries.is_empty() {
        return Ok(String::new());
    }
    let map: Map<String, Value> = entries.iter().cloned().collect();
    let yaml = serde_yaml::to_string(&Value::Object(map))?;
    Ok(format!("---\n{}---\n", yaml))
}
