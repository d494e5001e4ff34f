//! Converting bundle objects into vault files.

use crate::bundle::ObjectRecord;
use crate::config::Config;
use crate::error::Result;
use crate::frontmatter::{serialize_frontmatter, FrontmatterBuilder};
use crate::query::base::BaseFile;
use crate::query::compiler::QueryCompiler;
use crate::query::parser::parse_view;
use crate::query::types::CompiledView;
use crate::registry::{LinkTarget, Registries};
use crate::resolve::value::ValueResolver;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Renders objects against one run's configuration and registries.
#[derive(Debug, Clone, Copy)]
pub struct Converter<'a> {
    config: &'a Config,
    registries: &'a Registries,
    now: DateTime<Utc>,
}

/// Summary of a `convert_all` run.
#[derive(Debug, Default, Serialize)]
pub struct ConvertReport {
    pub documents: usize,
    pub queries: usize,
    pub written: Vec<String>,
}

impl<'a> Converter<'a> {
    pub fn new(config: &'a Config, registries: &'a Registries) -> Self {
        Self {
            config,
            registries,
            now: Utc::now(),
        }
    }

    /// Evaluate relative date filters against `now`.
    pub fn with_now(self, now: DateTime<Utc>) -> Self {
        Self { now, ..self }
    }

    fn resolver(&self) -> ValueResolver<'a> {
        ValueResolver::new(self.registries, &self.config.resolver)
    }

    pub fn frontmatter(&self, object: &ObjectRecord) -> Vec<(String, Value)> {
        let resolver = match self.registries.link(&object.id) {
            Some(target) => self.resolver().for_document(target.path()),
            None => self.resolver(),
        };
        FrontmatterBuilder::new(resolver).build(&object.details, &object.date_keys)
    }

    /// Compile every parseable view of `object`, scoped to the object.
    pub fn compile_views(&self, object: &ObjectRecord) -> Vec<CompiledView> {
        let compiler = QueryCompiler::new(self.resolver(), &self.config.query).with_now(self.now);
        let owner = object.owner();
        object
            .views
            .iter()
            .filter_map(|raw| parse_view(raw, self.config.query.kanban_as_board))
            .map(|view| compiler.compile_view(&view, Some(&owner)))
            .collect()
    }

    pub fn base_file(&self, object: &ObjectRecord) -> BaseFile {
        BaseFile::from_views(&self.compile_views(object))
    }

    /// Front matter followed by a title heading.
    pub fn render_document(&self, object: &ObjectRecord) -> Result<String> {
        let mut text = serialize_frontmatter(&self.frontmatter(object))?;
        if !object.name.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&format!("# {}\n", object.name));
        }
        Ok(text)
    }

    pub fn render_base(&self, object: &ObjectRecord) -> Result<String> {
        self.base_file(object).to_yaml()
    }

    /// Vault-relative path the object is written to.
    pub fn output_path(&self, object: &ObjectRecord) -> PathBuf {
        let target = match self.registries.link(&object.id) {
            Some(target) => vault_relative(target.path()),
            None => PathBuf::from(&object.id),
        };
        let wanted = if object.is_query() { "base" } else { "md" };
        match self.registries.link(&object.id) {
            Some(LinkTarget::QueryFile(_)) if object.is_query() => target,
            Some(LinkTarget::Document(_)) if !object.is_query() => target,
            _ => target.with_extension(wanted),
        }
    }

    /// Write one object beneath `out_dir`, returning the relative path.
    pub fn write_object(&self, object: &ObjectRecord, out_dir: &Path) -> Result<PathBuf> {
        let relative = self.output_path(object);
        let content = if object.is_query() {
            self.render_base(object)?
        } else {
            self.render_document(object)?
        };

        let path = out_dir.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        tracing::debug!(id = %object.id, path = %relative.display(), "wrote object");
        Ok(relative)
    }

    /// Write every object in parallel. Registries are read-only for the
    /// whole run, so objects are independent.
    pub fn convert_all(&self, objects: &[ObjectRecord], out_dir: &Path) -> Result<ConvertReport> {
        fs::create_dir_all(out_dir)?;
        let written = objects
            .par_iter()
            .map(|object| self.write_object(object, out_dir))
            .collect::<Result<Vec<_>>>()?;

        let queries = objects.iter().filter(|o| o.is_query()).count();
        let mut written: Vec<String> = written
            .iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect();
        written.sort();

        tracing::info!(documents = objects.len() - queries, queries, "conversion finished");
        Ok(ConvertReport {
            documents: objects.len() - queries,
            queries,
            written,
        })
    }
}

/// Keep only the normal components of a link path.
fn vault_relative(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}
