//! Relation-typed value resolution.
//!
//! Turns a raw property value into what the vault shows: links for object
//! references, labels for options, paths for files, `YYYY-MM-DD` for dates.
//! Nothing here fails. Anything that cannot be resolved stays visible as
//! its raw literal so missing metadata can be spotted in the output.

use crate::config::ResolverConfig;
use crate::error::Degradation;
use crate::link::render_link;
use crate::registry::{RelationDefinition, Registries, ValueFormat};
use crate::resolve::date::normalize_date;
use crate::resolve::path::BuiltinField;
use crate::value::{as_string, as_string_list};
use serde_json::Value;

/// A resolved property value: one scalar or an ordered sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayValue {
    Scalar(Value),
    List(Vec<Value>),
}

impl DisplayValue {
    pub fn into_value(self) -> Value {
        match self {
            DisplayValue::Scalar(value) => value,
            DisplayValue::List(items) => Value::Array(items),
        }
    }

    /// Every element rendered as text.
    pub fn texts(&self) -> Vec<String> {
        match self {
            DisplayValue::Scalar(value) => vec![as_string(value)],
            DisplayValue::List(items) => items.iter().map(as_string).collect(),
        }
    }

    /// A single line of text, list elements joined with `, `.
    pub fn to_text(&self) -> String {
        self.texts().join(", ")
    }

    pub fn is_list(&self) -> bool {
        matches!(self, DisplayValue::List(_))
    }
}

/// Keep the source's single-vs-multi shape: a lone item collapses to a
/// scalar unless the source stored a list.
fn collapse(mut items: Vec<Value>, is_list_hint: bool) -> DisplayValue {
    if !is_list_hint && items.len() == 1 {
        DisplayValue::Scalar(items.remove(0))
    } else {
        DisplayValue::List(items)
    }
}

fn passthrough(raw: &Value) -> DisplayValue {
    match raw {
        Value::Array(items) => DisplayValue::List(items.clone()),
        other => DisplayValue::Scalar(other.clone()),
    }
}

/// Resolves raw property values against the run's registries.
#[derive(Debug, Clone, Copy)]
pub struct ValueResolver<'a> {
    registries: &'a Registries,
    config: &'a ResolverConfig,
    /// Vault path of the document being rendered, for relative links.
    document: Option<&'a str>,
}

impl<'a> ValueResolver<'a> {
    pub fn new(registries: &'a Registries, config: &'a ResolverConfig) -> Self {
        Self {
            registries,
            config,
            document: None,
        }
    }

    /// Resolve links relative to the document at `path`.
    pub fn for_document(self, path: &'a str) -> Self {
        Self {
            document: Some(path),
            ..self
        }
    }

    pub fn registries(&self) -> &'a Registries {
        self.registries
    }

    pub fn config(&self) -> &'a ResolverConfig {
        self.config
    }

    /// Resolve a raw value for display.
    ///
    /// `is_list_hint` says whether the source stored the value as a
    /// sequence; it decides whether a single resolved item stays a list.
    pub fn resolve_value(&self, raw_key: &str, raw_value: &Value, is_list_hint: bool) -> DisplayValue {
        self.resolve_value_with(raw_key, raw_value, is_list_hint, false)
    }

    /// Like [`resolve_value`](Self::resolve_value), with an external hint
    /// that an otherwise untyped property holds dates.
    pub fn resolve_value_with(
        &self,
        raw_key: &str,
        raw_value: &Value,
        is_list_hint: bool,
        treat_as_date: bool,
    ) -> DisplayValue {
        let relation = self.registries.relation(raw_key);
        let format = relation
            .map(|r| r.value_format)
            .unwrap_or(ValueFormat::Other);

        match format {
            ValueFormat::ObjectRef if self.config.raw_id_keys.contains(raw_key) => {
                let ids = as_string_list(raw_value);
                if ids.is_empty() {
                    return passthrough(raw_value);
                }
                collapse(ids.into_iter().map(Value::String).collect(), is_list_hint)
            }
            ValueFormat::ObjectRef | ValueFormat::Status | ValueFormat::Tag => {
                let ids = as_string_list(raw_value);
                if ids.is_empty() {
                    return passthrough(raw_value);
                }
                let items = ids
                    .iter()
                    .map(|id| Value::String(self.resolve_id(raw_key, relation, format, id)))
                    .collect();
                collapse(items, is_list_hint)
            }
            ValueFormat::File => self.resolve_files(raw_key, raw_value, is_list_hint),
            ValueFormat::Date => self.resolve_date(raw_key, raw_value),
            ValueFormat::Number => self.resolve_number(raw_key, raw_value),
            ValueFormat::PlainText | ValueFormat::Other => {
                let date_hinted = treat_as_date
                    || self.config.date_keys.contains(raw_key)
                    || BuiltinField::from_key(raw_key).is_some_and(BuiltinField::is_date);
                if date_hinted {
                    self.resolve_date(raw_key, raw_value)
                } else {
                    passthrough(raw_value)
                }
            }
        }
    }

    /// Resolve one identifier held by an ObjectRef, Status or Tag property.
    ///
    /// Falls back to the display name, then to the id itself.
    pub fn resolve_id(
        &self,
        raw_key: &str,
        relation: Option<&RelationDefinition>,
        format: ValueFormat,
        id: &str,
    ) -> String {
        let resolved = match format {
            ValueFormat::ObjectRef => self.link_to(id),
            ValueFormat::Status | ValueFormat::Tag => {
                if self.links_as_reference(raw_key, relation) {
                    self.link_to(id)
                        .or_else(|| self.registries.option_label(id).map(str::to_string))
                } else {
                    self.registries.option_label(id).map(str::to_string)
                }
            }
            _ => None,
        };

        resolved
            .or_else(|| self.registries.name(id).map(str::to_string))
            .unwrap_or_else(|| {
                Degradation::UnresolvedReference {
                    key: raw_key.to_string(),
                    id: id.to_string(),
                }
                .emit();
                id.to_string()
            })
    }

    /// Resolve an id the way the property `raw_key` would resolve it.
    pub fn resolve_id_for_key(&self, raw_key: &str, id: &str) -> String {
        let relation = self.registries.relation(raw_key);
        match relation.map(|r| r.value_format) {
            Some(format) if format.holds_ids() && format != ValueFormat::File => {
                if format == ValueFormat::ObjectRef && self.config.raw_id_keys.contains(raw_key) {
                    return id.to_string();
                }
                self.resolve_id(raw_key, relation, format, id)
            }
            Some(ValueFormat::File) => self
                .registries
                .file_path(id)
                .map(str::to_string)
                .unwrap_or_else(|| id.to_string()),
            _ => id.to_string(),
        }
    }

    fn links_as_reference(&self, raw_key: &str, relation: Option<&RelationDefinition>) -> bool {
        let policy = &self.config.link_as_reference;
        policy.contains(raw_key) || relation.is_some_and(|r| policy.contains(&r.display_name))
    }

    fn link_to(&self, id: &str) -> Option<String> {
        let target = self.registries.link(id)?;
        Some(render_link(
            target,
            self.registries.name(id),
            self.document,
            self.config.link_style,
        ))
    }

    fn resolve_files(&self, raw_key: &str, raw_value: &Value, is_list_hint: bool) -> DisplayValue {
        let resolved: Vec<Value> = as_string_list(raw_value)
            .into_iter()
            .map(|id| match self.registries.file_path(&id) {
                Some(path) => Value::String(path.to_string()),
                None => {
                    Degradation::UnresolvedReference {
                        key: raw_key.to_string(),
                        id: id.clone(),
                    }
                    .emit();
                    Value::String(id)
                }
            })
            .collect();

        if resolved.is_empty() {
            // Format known, nothing to resolve: hand back the original.
            return DisplayValue::Scalar(raw_value.clone());
        }
        collapse(resolved, is_list_hint)
    }

    fn resolve_date(&self, raw_key: &str, raw_value: &Value) -> DisplayValue {
        let convert = |value: &Value| -> Value {
            if value.is_null() {
                return Value::Null;
            }
            match normalize_date(value) {
                Some(date) => Value::String(date),
                None => {
                    Degradation::UnparseableValue {
                        key: raw_key.to_string(),
                        expected: "date",
                        value: as_string(value),
                    }
                    .emit();
                    value.clone()
                }
            }
        };

        match raw_value {
            Value::Array(items) => DisplayValue::List(items.iter().map(convert).collect()),
            other => DisplayValue::Scalar(convert(other)),
        }
    }

    fn resolve_number(&self, raw_key: &str, raw_value: &Value) -> DisplayValue {
        let convert = |value: &Value| -> Value {
            let Value::String(text) = value else {
                return value.clone();
            };
            let text = text.trim();
            if let Ok(n) = text.parse::<i64>() {
                return Value::from(n);
            }
            match text.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                Some(n) => Value::Number(n),
                None => {
                    if !text.is_empty() {
                        Degradation::UnparseableValue {
                            key: raw_key.to_string(),
                            expected: "number",
                            value: text.to_string(),
                        }
                        .emit();
                    }
                    value.clone()
                }
            }
        };

        match raw_value {
            Value::Array(items) => DisplayValue::List(items.iter().map(convert).collect()),
            other => DisplayValue::Scalar(convert(other)),
        }
    }
}
