//! Writing compiled views as `.base` query files.
//!
//! ```yaml
//! formulas:
//!   sort_note_status: if(note.status == "Open", 0, if(note.status == "Done", 1, 2))
//! views:
//!   - type: table
//!     name: Tasks
//!     limit: 50
//!     filters:
//!       and:
//!         - note.status != null
//!     order:
//!       - file.basename
//!     sort:
//!       - property: formula.sort_note_status
//!         direction: ASC
//! ```

use crate::error::Result;
use crate::query::compiler::text_literal;
use crate::query::types::{CompiledGroup, CompiledSort, CompiledView, Expr, ViewKind};
use serde::Serialize;
use std::collections::BTreeMap;

/// A whole `.base` document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Expr>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub formulas: BTreeMap<String, String>,
    pub views: Vec<BaseView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseView {
    #[serde(rename = "type")]
    pub kind: ViewKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Expr>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<BaseSort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<CompiledGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseSort {
    pub property: String,
    pub direction: String,
}

impl BaseFile {
    /// Assemble a query file from the compiled views of one object.
    ///
    /// Custom-ordered sorts have no direct counterpart, so each becomes a
    /// rank formula sorted ascending.
    pub fn from_views(views: &[CompiledView]) -> Self {
        let mut formulas = BTreeMap::new();
        let views = views
            .iter()
            .map(|view| BaseView {
                kind: view.kind,
                name: view.name.clone(),
                limit: view.page_limit,
                filters: view.filters.clone(),
                order: view.columns.clone(),
                sort: view
                    .sort
                    .iter()
                    .map(|sort| base_sort(sort, &mut formulas))
                    .collect(),
                group_by: view.group_by.clone(),
            })
            .collect();

        Self {
            filters: None,
            formulas,
            views,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn base_sort(sort: &CompiledSort, formulas: &mut BTreeMap<String, String>) -> BaseSort {
    if sort.custom_order.is_empty() {
        let direction = if sort.direction == "DESC" { "DESC" } else { "ASC" };
        return BaseSort {
            property: sort.property.clone(),
            direction: direction.to_string(),
        };
    }

    let name = format!("sort_{}", formula_suffix(&sort.property));
    formulas.insert(name.clone(), rank_formula(&sort.property, &sort.custom_order));
    BaseSort {
        property: format!("formula.{}", name),
        direction: "ASC".to_string(),
    }
}

/// `if(p == a, 0, if(p == b, 1, 2))`: unranked values sort last.
fn rank_formula(property: &str, order: &[String]) -> String {
    let mut formula = order.len().to_string();
    for (rank, value) in order.iter().enumerate().rev() {
        formula = format!(
            "if({} == {}, {}, {})",
            property,
            text_literal(value),
            rank,
            formula
        );
    }
    formula
}

fn formula_suffix(property: &str) -> String {
    let mut out = String::with_capacity(property.len());
    for ch in property.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled() -> CompiledView {
        CompiledView {
            kind: ViewKind::Table,
            name: "Tasks".into(),
            page_limit: Some(50),
            columns: vec!["file.basename".into(), "note.status".into()],
            filters: Some(Expr::And(vec![
                Expr::leaf("note.status != null"),
                Expr::leaf(r#"note["Due date"] >= date("2024-03-15")"#),
            ])),
            sort: vec![
                CompiledSort {
                    property: "note.status".into(),
                    direction: "CUSTOM".into(),
                    custom_order: vec!["Open".into(), "[[Status/Done]]".into()],
                },
                CompiledSort {
                    property: "file.mtime".into(),
                    direction: "DESC".into(),
                    custom_order: vec![],
                },
            ],
            group_by: Some(CompiledGroup {
                property: "note.status".into(),
                direction: "ASC".into(),
            }),
        }
    }

    #[test]
    fn test_custom_sort_becomes_formula() {
        let base = BaseFile::from_views(&[compiled()]);
        assert_eq!(
            base.formulas.get("sort_note_status").map(String::as_str),
            Some(r#"if(note.status == "Open", 0, if(note.status == link("Status/Done"), 1, 2))"#)
        );
        assert_eq!(
            base.views[0].sort,
            vec![
                BaseSort {
                    property: "formula.sort_note_status".into(),
                    direction: "ASC".into(),
                },
                BaseSort {
                    property: "file.mtime".into(),
                    direction: "DESC".into(),
                },
            ]
        );
    }

    #[test]
    fn test_yaml_shape() {
        let base = BaseFile::from_views(&[compiled()]);
        let yaml = base.to_yaml().unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        let view = &parsed["views"][0];
        assert_eq!(view["type"].as_str(), Some("table"));
        assert_eq!(view["limit"].as_u64(), Some(50));
        assert_eq!(view["groupBy"]["property"].as_str(), Some("note.status"));
        assert_eq!(
            view["filters"]["and"][1].as_str(),
            Some(r#"note["Due date"] >= date("2024-03-15")"#)
        );
        assert_eq!(view["order"][0].as_str(), Some("file.basename"));
        assert!(parsed.get("filters").is_none());
    }

    #[test]
    fn test_formula_suffix() {
        assert_eq!(formula_suffix(r#"note["Due date"]"#), "note_due_date");
        assert_eq!(formula_suffix("file.mtime"), "file_mtime");
    }
}
