//! Compiling [`ViewSpec`]s into the target filter/sort/group language.
//!
//! Compilation is a pure tree transform over read-only registries. The one
//! time-dependent input is the evaluation instant used to expand relative
//! date filters; pin it with [`QueryCompiler::with_now`] for reproducible
//! output.

use crate::config::QueryConfig;
use crate::error::Degradation;
use crate::link::link_destination;
use crate::query::types::*;
use crate::query::window::{quick_window, DateWindow};
use crate::registry::{RelationDefinition, ValueFormat};
use crate::resolve::date::{format_instant, parse_datetime};
use crate::resolve::path::{quote, resolve_filter_address, PropertyAddress};
use crate::resolve::value::ValueResolver;
use crate::value::{as_string, is_empty};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Translates views, borrowing the run's registries through a resolver.
#[derive(Debug, Clone, Copy)]
pub struct QueryCompiler<'a> {
    resolver: ValueResolver<'a>,
    config: &'a QueryConfig,
    now: DateTime<Utc>,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(resolver: ValueResolver<'a>, config: &'a QueryConfig) -> Self {
        Self {
            resolver,
            config,
            now: Utc::now(),
        }
    }

    /// Evaluate relative dates against `now` instead of the wall clock.
    pub fn with_now(self, now: DateTime<Utc>) -> Self {
        Self { now, ..self }
    }

    /// Compile one view. `owner` is the object the view belongs to; a
    /// collection owner scopes the view to its own members.
    pub fn compile_view(&self, view: &ViewSpec, owner: Option<&ViewOwner>) -> CompiledView {
        tracing::debug!(view = %view.name, id = %view.id, "compiling view");

        let sort = self.compile_sorts(&view.sorts);
        let group_by = view
            .group_key
            .as_deref()
            .and_then(|key| self.compile_group(key, &view.sorts));

        let mut clauses: Vec<Expr> = Vec::new();
        if let Some(filter) = view.filter.as_ref().and_then(|node| self.compile_node(node)) {
            clauses.push(filter);
        }
        if let Some(owner) = owner {
            clauses.extend(self.scope_clauses(owner));
        }

        CompiledView {
            kind: view.kind,
            name: view.name.clone(),
            page_limit: view.page_limit,
            columns: self.compile_columns(&view.columns),
            filters: Expr::all(clauses),
            sort,
            group_by,
        }
    }

    /// Compile a filter tree. `None` means the node imposes no filter.
    pub fn compile_node(&self, node: &FilterNode) -> Option<Expr> {
        match node {
            FilterNode::Leaf(leaf) => self.compile_leaf(leaf),
            FilterNode::And(children) => {
                Expr::all(children.iter().filter_map(|c| self.compile_node(c)).collect())
            }
            FilterNode::Or(children) => {
                Expr::any(children.iter().filter_map(|c| self.compile_node(c)).collect())
            }
        }
    }

    // ========================================================================
    // Addressing
    // ========================================================================

    fn relation(&self, key: &str) -> Option<&'a RelationDefinition> {
        self.resolver.registries().relation(key)
    }

    fn address(&self, key: &str) -> Option<PropertyAddress> {
        let address = resolve_filter_address(key, self.relation(key));
        if address.is_none() {
            Degradation::UnaddressableProperty {
                key: key.to_string(),
            }
            .emit();
        }
        address
    }

    fn compile_columns(&self, columns: &[ViewColumn]) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        columns
            .iter()
            .filter(|column| column.visible)
            .filter_map(|column| self.address(&column.key))
            .map(|address| address.to_string())
            .filter(|address| seen.insert(address.clone()))
            .collect()
    }

    fn compile_sorts(&self, sorts: &[SortTerm]) -> Vec<CompiledSort> {
        sorts
            .iter()
            .filter_map(|term| {
                let address = self.address(&term.property_key)?;
                let custom_order = if term.direction == SortDirection::Custom {
                    term.custom_order
                        .iter()
                        .map(|id| self.resolver.resolve_id_for_key(&term.property_key, id))
                        .collect()
                } else {
                    Vec::new()
                };
                Some(CompiledSort {
                    property: address.to_string(),
                    direction: term.direction.token().to_string(),
                    custom_order,
                })
            })
            .collect()
    }

    /// Group direction follows the first sort when it targets the same
    /// property with an explicit direction.
    fn compile_group(&self, key: &str, sorts: &[SortTerm]) -> Option<CompiledGroup> {
        let address = self.address(key)?;
        let direction = sorts
            .first()
            .filter(|term| {
                resolve_filter_address(&term.property_key, self.relation(&term.property_key))
                    .as_ref()
                    == Some(&address)
            })
            .map(|term| term.direction)
            .filter(|direction| *direction != SortDirection::Custom)
            .unwrap_or(SortDirection::Asc);
        Some(CompiledGroup {
            property: address.to_string(),
            direction: direction.token().to_string(),
        })
    }

    // ========================================================================
    // Leaves
    // ========================================================================

    fn compile_leaf(&self, leaf: &FilterLeaf) -> Option<Expr> {
        let address = self.address(&leaf.property_key)?;
        let relation = self.relation(&leaf.property_key);
        let format = leaf
            .format
            .or(relation.map(|r| r.value_format))
            .unwrap_or(ValueFormat::Other);
        let addr = address.to_string();

        let is_date = format == ValueFormat::Date
            || address.builtin().is_some_and(|field| field.is_date())
            || self
                .resolver
                .config()
                .date_keys
                .contains(&leaf.property_key);

        if is_date {
            if let Some(compiled) = self.compile_date_leaf(leaf, &addr) {
                return compiled;
            }
        }

        if leaf.condition.needs_value() && is_empty(&leaf.value) {
            return None;
        }

        let literals = self.literals(&leaf.property_key, format, &leaf.value);
        let list_shaped = matches!(leaf.value, Value::Array(_));
        let first = literals.first().cloned().unwrap_or_else(|| "null".to_string());
        let joined = literals.join(", ");
        let n = literals.len();

        let expr = match leaf.condition {
            Condition::Equal if list_shaped => contains_any(&addr, &joined),
            Condition::Equal => Expr::leaf(format!("{} == {}", addr, first)),
            Condition::NotEqual if list_shaped => negate(&contains_any(&addr, &joined)),
            Condition::NotEqual => Expr::leaf(format!("{} != {}", addr, first)),
            Condition::Greater => Expr::leaf(format!("{} > {}", addr, first)),
            Condition::Less => Expr::leaf(format!("{} < {}", addr, first)),
            Condition::GreaterOrEqual => Expr::leaf(format!("{} >= {}", addr, first)),
            Condition::LessOrEqual => Expr::leaf(format!("{} <= {}", addr, first)),
            Condition::Like | Condition::NotLike => {
                let needle = like_text(&leaf.value);
                if needle.is_empty() {
                    return None;
                }
                let test = format!("{}.toString().contains({})", addr, quote(&needle));
                if leaf.condition == Condition::Like {
                    Expr::leaf(test)
                } else {
                    Expr::leaf(format!("!{}", test))
                }
            }
            Condition::In => contains_any(&addr, &joined),
            Condition::NotIn => negate(&contains_any(&addr, &joined)),
            Condition::AllIn => contains_all(&addr, &joined),
            Condition::NotAllIn => negate(&contains_all(&addr, &joined)),
            Condition::ExactIn => Expr::And(vec![
                contains_all(&addr, &joined),
                Expr::leaf(format!("list({}).length == {}", addr, n)),
            ]),
            Condition::NotExactIn => Expr::Or(vec![
                negate(&contains_all(&addr, &joined)),
                Expr::leaf(format!("list({}).length != {}", addr, n)),
            ]),
            Condition::Empty => Expr::Or(vec![
                Expr::leaf(format!("{} == null", addr)),
                Expr::leaf(format!("{} == \"\"", addr)),
            ]),
            Condition::NotEmpty => Expr::And(vec![
                Expr::leaf(format!("{} != null", addr)),
                Expr::leaf(format!("{} != \"\"", addr)),
            ]),
            Condition::Exists => Expr::leaf(format!("{} != null", addr)),
        };
        Some(expr)
    }

    /// Date comparisons. Relative quick options and day-granular filters
    /// become explicit `[from, to)` windows; timed exact dates compare
    /// against the instant. `None` hands the leaf to the generic path;
    /// `Some(None)` drops a leaf whose window leaves the calendar range.
    fn compile_date_leaf(&self, leaf: &FilterLeaf, addr: &str) -> Option<Option<Expr>> {
        if !matches!(
            leaf.condition,
            Condition::Equal
                | Condition::NotEqual
                | Condition::In
                | Condition::NotIn
                | Condition::Greater
                | Condition::Less
                | Condition::GreaterOrEqual
                | Condition::LessOrEqual
        ) {
            return None;
        }

        let window = if leaf.quick_option.is_exact() {
            let instant = self.exact_instant(leaf)?;
            if leaf.include_time {
                let literal = date_literal(&instant);
                let op = match leaf.condition {
                    Condition::Equal | Condition::In => "==",
                    Condition::NotEqual | Condition::NotIn => "!=",
                    Condition::Greater => ">",
                    Condition::Less => "<",
                    Condition::GreaterOrEqual => ">=",
                    _ => "<=",
                };
                return Some(Some(Expr::leaf(format!("{} {} {}", addr, op, literal))));
            }
            DateWindow::day(instant.date_naive())
        } else {
            quick_window(leaf.quick_option, self.now)
        };
        let Some(window) = window else {
            Degradation::UnparseableValue {
                key: leaf.property_key.clone(),
                expected: "date window",
                value: if leaf.quick_option.is_exact() {
                    as_string(&leaf.value)
                } else {
                    format!("{:?}", leaf.quick_option)
                },
            }
            .emit();
            return Some(None);
        };

        let lower = date_literal(&window.from);
        let upper = date_literal(&window.last_second());
        let expr = match leaf.condition {
            Condition::Equal | Condition::In => Expr::And(vec![
                Expr::leaf(format!("{} >= {}", addr, lower)),
                Expr::leaf(format!("{} <= {}", addr, upper)),
            ]),
            Condition::NotEqual | Condition::NotIn => Expr::Or(vec![
                Expr::leaf(format!("{} < {}", addr, lower)),
                Expr::leaf(format!("{} > {}", addr, upper)),
            ]),
            Condition::Greater => Expr::leaf(format!("{} > {}", addr, upper)),
            Condition::GreaterOrEqual => Expr::leaf(format!("{} >= {}", addr, lower)),
            Condition::Less => Expr::leaf(format!("{} < {}", addr, lower)),
            _ => Expr::leaf(format!("{} <= {}", addr, upper)),
        };
        Some(Some(expr))
    }

    fn exact_instant(&self, leaf: &FilterLeaf) -> Option<DateTime<Utc>> {
        let raw = match &leaf.value {
            Value::Array(items) => items.first()?,
            other => other,
        };
        if raw.is_null() {
            return None;
        }
        let instant = parse_datetime(raw);
        if instant.is_none() {
            Degradation::UnparseableValue {
                key: leaf.property_key.clone(),
                expected: "date",
                value: as_string(raw),
            }
            .emit();
        }
        instant
    }

    /// Render filter values as expression literals, resolving ids the same
    /// way the property's own values are resolved.
    fn literals(&self, key: &str, format: ValueFormat, value: &Value) -> Vec<String> {
        let items: Vec<&Value> = match value {
            Value::Array(items) => items.iter().filter(|v| !is_empty(v)).collect(),
            other => vec![other],
        };
        items
            .into_iter()
            .map(|item| self.literal(key, format, item))
            .collect()
    }

    fn literal(&self, key: &str, format: ValueFormat, value: &Value) -> String {
        if format.holds_ids() {
            let text = self.resolver.resolve_id_for_key(key, &as_string(value));
            return text_literal(&text);
        }
        match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) if format == ValueFormat::Number && s.trim().parse::<f64>().is_ok() => {
                s.trim().to_string()
            }
            Value::String(s) => text_literal(s),
            other => quote(&other.to_string()),
        }
    }

    // ========================================================================
    // Collection scoping
    // ========================================================================

    fn scope_clauses(&self, owner: &ViewOwner) -> Vec<Expr> {
        let mut clauses = Vec::new();

        if owner.is_collection && !owner.id.is_empty() {
            if let Some(address) = self.address(&self.config.provenance_key) {
                let addr = address.to_string();
                let id = quote(&owner.id);
                clauses.push(Expr::Or(vec![
                    Expr::leaf(format!("{} == {}", addr, id)),
                    Expr::leaf(format!("list({}).contains({})", addr, id)),
                ]));
            }
        }

        if !owner.allowed_types.is_empty() {
            let key = self.config.type_key.as_str();
            if let Some(address) = self.address(key) {
                let addr = address.to_string();
                let relation = self.relation(key);
                let format = relation
                    .map(|r| r.value_format)
                    .filter(|f| f.holds_ids())
                    .unwrap_or(ValueFormat::ObjectRef);
                let literals: Vec<String> = owner
                    .allowed_types
                    .iter()
                    .map(|id| text_literal(&self.resolver.resolve_id(key, relation, format, id)))
                    .collect();
                let mut alternatives: Vec<Expr> = literals
                    .iter()
                    .map(|literal| Expr::leaf(format!("{} == {}", addr, literal)))
                    .collect();
                alternatives.push(contains_any(&addr, &literals.join(", ")));
                clauses.extend(Expr::any(alternatives));
            }
        }

        clauses
    }
}

fn contains_any(addr: &str, literals: &str) -> Expr {
    Expr::leaf(format!("list({}).containsAny({})", addr, literals))
}

fn contains_all(addr: &str, literals: &str) -> Expr {
    Expr::leaf(format!("list({}).containsAll({})", addr, literals))
}

/// Negate a single leaf in place. Branches are never wrapped.
fn negate(expr: &Expr) -> Expr {
    match expr {
        Expr::Leaf(text) => Expr::leaf(format!("!{}", text)),
        other => other.clone(),
    }
}

fn date_literal(instant: &DateTime<Utc>) -> String {
    format!("date({})", quote(&format_instant(instant)))
}

/// Rendered link text becomes a link literal, anything else a string.
pub(crate) fn text_literal(text: &str) -> String {
    match link_destination(text) {
        Some(target) => format!("link({})", quote(&target)),
        None => quote(text),
    }
}

fn like_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items.first().map(as_string).unwrap_or_default(),
        other => as_string(other),
    }
    .trim()
    .to_string()
}
