//! Property naming and filter addressing.
//!
//! A raw property key becomes two things downstream: the name it is
//! written under in front matter, and the path a compiled filter uses to
//! reach it (`note.status`, `note["Due date"]`, `file.ctime`).

use crate::registry::RelationDefinition;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

static HEX_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9a-f]{16,}$").unwrap());

static CID_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^bafy[a-z2-7]{16,}$").unwrap());

static BARE_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Structural fields that are first-class file attributes in the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinField {
    Title,
    Created,
    Modified,
}

impl BuiltinField {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "name" => Some(BuiltinField::Title),
            "createdDate" | "addedDate" => Some(BuiltinField::Created),
            "lastModifiedDate" | "modifiedDate" | "changedDate" => Some(BuiltinField::Modified),
            _ => None,
        }
    }

    pub fn address(self) -> &'static str {
        match self {
            BuiltinField::Title => "file.basename",
            BuiltinField::Created => "file.ctime",
            BuiltinField::Modified => "file.mtime",
        }
    }

    /// Creation and modification times hold dates.
    pub fn is_date(self) -> bool {
        !matches!(self, BuiltinField::Title)
    }
}

/// Where a compiled expression finds a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyAddress {
    /// A file attribute, e.g. `file.mtime`.
    File(BuiltinField),
    /// A front matter property, by its external name.
    Note(String),
}

impl PropertyAddress {
    pub fn builtin(&self) -> Option<BuiltinField> {
        match self {
            PropertyAddress::File(field) => Some(*field),
            PropertyAddress::Note(_) => None,
        }
    }
}

impl fmt::Display for PropertyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyAddress::File(field) => f.write_str(field.address()),
            PropertyAddress::Note(name) if is_bare_identifier(name) => write!(f, "note.{}", name),
            PropertyAddress::Note(name) => write!(f, "note[{}]", quote(name)),
        }
    }
}

/// Whether a key looks like a generated identifier rather than a
/// human-chosen one.
pub fn is_opaque_id(key: &str) -> bool {
    HEX_ID.is_match(key) || CID_ID.is_match(key)
}

pub fn is_bare_identifier(name: &str) -> bool {
    BARE_IDENT.is_match(name)
}

/// Double-quote a string for use inside an expression.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// The name a property is written under in front matter.
///
/// Renames to the relation's display name only when the raw key is not
/// already the relation's stable key, or when it looks generated.
pub fn resolve_external_name(raw_key: &str, relation: Option<&RelationDefinition>) -> String {
    if BuiltinField::from_key(raw_key).is_some() {
        return raw_key.to_string();
    }

    match relation {
        Some(relation)
            if !relation.display_name.is_empty()
                && (raw_key != relation.key || is_opaque_id(raw_key)) =>
        {
            relation.display_name.clone()
        }
        _ => raw_key.to_string(),
    }
}

/// The path a compiled filter, sort or column uses for a property.
///
/// Returns `None` when no usable name can be formed.
pub fn resolve_filter_address(
    raw_key: &str,
    relation: Option<&RelationDefinition>,
) -> Option<PropertyAddress> {
    let raw_key = raw_key.trim();
    if let Some(field) = BuiltinField::from_key(raw_key) {
        return Some(PropertyAddress::File(field));
    }

    let name = resolve_external_name(raw_key, relation);
    if name.trim().is_empty() {
        return None;
    }
    Some(PropertyAddress::Note(name))
}

/// Hands out front matter names for one document, never reusing one.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `resolved` for `raw_key`. If another property already holds
    /// that name, fall back to the raw key, then to numbered variants.
    pub fn allocate(&mut self, raw_key: &str, resolved: String) -> String {
        if self.used.insert(resolved.clone()) {
            return resolved;
        }
        if self.used.insert(raw_key.to_string()) {
            return raw_key.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", raw_key, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
