//! Parsing raw dataview JSON into [`ViewSpec`]s.
//!
//! Views arrive as the decoded source records:
//! ```text
//! view    = { id, type, name, pageLimit, relations[], sorts[], filters[], groupRelationKey }
//! filter  = branch | leaf
//! branch  = { operator: and|or|not, nestedFilters[] }
//! leaf    = { relationKey, condition, value, format, includeTime, quickOption }
//! ```
//! A negated branch is normalised here: the source already pushed the
//! negation into its leaves, so one child stands alone and several children
//! become a conjunction.

use crate::error::Degradation;
use crate::query::types::*;
use crate::registry::ValueFormat;
use crate::value::{as_bool, as_int, as_string, as_string_list, field};
use serde_json::{Map, Value};

// ============================================================================
// Views
// ============================================================================

/// Parse one view. Returns `None` (and logs) when the record is not a view.
pub fn parse_view(raw: &Value, kanban_as_board: bool) -> Option<ViewSpec> {
    let Some(map) = raw.as_object() else {
        Degradation::MalformedViewSpec {
            reason: "view is not an object".to_string(),
        }
        .emit();
        return None;
    };

    let kind = field(map, &["type", "kind"])
        .map(|t| parse_kind(t, kanban_as_board))
        .unwrap_or(ViewKind::Table);

    let page_limit = field(map, &["pageLimit", "limit"])
        .and_then(as_int)
        .filter(|&n| n > 0)
        .and_then(|n| u32::try_from(n).ok());

    let columns = field(map, &["relations", "columns"])
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_column).collect())
        .unwrap_or_default();

    let sorts = field(map, &["sorts"])
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_sort).collect())
        .unwrap_or_default();

    let filter = field(map, &["filters", "filter"]).and_then(parse_filters);

    let group_key = field(map, &["groupRelationKey", "groupKey"])
        .map(as_string)
        .filter(|k| !k.trim().is_empty());

    Some(ViewSpec {
        id: field(map, &["id"]).map(as_string).unwrap_or_default(),
        kind,
        name: field(map, &["name"]).map(as_string).unwrap_or_default(),
        page_limit,
        columns,
        sorts,
        filter,
        group_key,
    })
}

/// Map a source view type onto a target layout.
///
/// Boards become kanban views only when the caller opts in.
pub fn parse_kind(raw: &Value, kanban_as_board: bool) -> ViewKind {
    let board = if kanban_as_board {
        ViewKind::Kanban
    } else {
        ViewKind::Table
    };
    let token = match raw {
        Value::Number(n) => match n.as_i64() {
            Some(1) => "list",
            Some(2) => "gallery",
            Some(3) => "kanban",
            _ => "table",
        },
        Value::String(s) => s.as_str(),
        _ => "table",
    };
    match token.trim().to_ascii_lowercase().as_str() {
        "list" => ViewKind::List,
        "gallery" | "cards" => ViewKind::Cards,
        "kanban" | "board" => board,
        _ => ViewKind::Table,
    }
}

fn parse_column(raw: &Value) -> Option<ViewColumn> {
    match raw {
        Value::String(key) if !key.is_empty() => Some(ViewColumn {
            key: key.clone(),
            visible: true,
        }),
        Value::Object(map) => {
            let key = field(map, &["key", "relationKey", "RelationKey"]).map(as_string)?;
            if key.is_empty() {
                return None;
            }
            let visible = field(map, &["isVisible", "visible"])
                .map(as_bool)
                .unwrap_or(true);
            Some(ViewColumn { key, visible })
        }
        _ => None,
    }
}

/// Parse a sort term. Terms without a property key are skipped.
pub fn parse_sort(raw: &Value) -> Option<SortTerm> {
    let map = raw.as_object()?;
    let property_key = field(map, &["relationKey", "RelationKey", "key"])
        .map(as_string)
        .filter(|k| !k.trim().is_empty());
    let Some(property_key) = property_key else {
        Degradation::MalformedViewSpec {
            reason: "sort without relation key".to_string(),
        }
        .emit();
        return None;
    };

    Some(SortTerm {
        property_key,
        direction: field(map, &["type", "direction"])
            .map(|d| SortDirection::parse(&as_string(d)))
            .unwrap_or_default(),
        empty_placement: field(map, &["emptyPlacement", "empty"])
            .map(|p| EmptyPlacement::parse(&as_string(p)))
            .unwrap_or_default(),
        include_time: field(map, &["includeTime"]).is_some_and(as_bool),
        collate: !field(map, &["noCollate"]).is_some_and(as_bool),
        custom_order: field(map, &["customOrder"])
            .map(as_string_list)
            .unwrap_or_default(),
    })
}

// ============================================================================
// Filters
// ============================================================================

/// Parse the `filters` field of a view: a list is an implicit conjunction.
pub fn parse_filters(raw: &Value) -> Option<FilterNode> {
    match raw {
        Value::Array(items) => {
            let children: Vec<FilterNode> = items.iter().filter_map(parse_filter).collect();
            simplify(children, true)
        }
        Value::Object(_) => parse_filter(raw),
        _ => None,
    }
}

/// Parse one filter node. Malformed nodes are skipped.
pub fn parse_filter(raw: &Value) -> Option<FilterNode> {
    let Some(map) = raw.as_object() else {
        Degradation::MalformedViewSpec {
            reason: "filter is not an object".to_string(),
        }
        .emit();
        return None;
    };

    let nested = field(map, &["nestedFilters", "filters", "children"]).and_then(Value::as_array);
    match nested {
        Some(items) if !items.is_empty() => parse_branch(map, items),
        _ => parse_leaf(map).map(FilterNode::Leaf),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    And,
    Or,
    Not,
}

fn parse_operator(raw: Option<&Value>) -> Operator {
    let token = match raw {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => "not",
            Some(1) => "or",
            _ => "and",
        },
        Some(Value::String(s)) => s.as_str(),
        _ => "and",
    };
    match token.trim().to_ascii_lowercase().as_str() {
        "or" => Operator::Or,
        "not" | "no" => Operator::Not,
        _ => Operator::And,
    }
}

fn parse_branch(map: &Map<String, Value>, items: &[Value]) -> Option<FilterNode> {
    let children: Vec<FilterNode> = items.iter().filter_map(parse_filter).collect();
    match parse_operator(field(map, &["operator"])) {
        Operator::Or => simplify(children, false),
        // Leaves already carry the negation.
        Operator::And | Operator::Not => simplify(children, true),
    }
}

fn simplify(mut children: Vec<FilterNode>, conjunction: bool) -> Option<FilterNode> {
    match children.len() {
        0 => None,
        1 => children.pop(),
        _ if conjunction => Some(FilterNode::And(children)),
        _ => Some(FilterNode::Or(children)),
    }
}

fn parse_leaf(map: &Map<String, Value>) -> Option<FilterLeaf> {
    let property_key = field(map, &["relationKey", "RelationKey", "key"])
        .map(as_string)
        .filter(|k| !k.trim().is_empty());
    let Some(property_key) = property_key else {
        Degradation::MalformedViewSpec {
            reason: "filter without relation key".to_string(),
        }
        .emit();
        return None;
    };

    let condition = match field(map, &["condition"]) {
        Some(Value::Number(n)) => n.as_i64().and_then(Condition::from_code),
        Some(Value::String(s)) => Condition::parse(s),
        _ => None,
    };
    let Some(condition) = condition else {
        Degradation::MalformedViewSpec {
            reason: format!("filter on '{}' has no usable condition", property_key),
        }
        .emit();
        return None;
    };

    let value = field(map, &["value"]).cloned().unwrap_or(Value::Null);
    let days = as_int(&value);
    let quick_option = match field(map, &["quickOption"]) {
        Some(Value::Number(n)) => n.as_i64().and_then(|c| QuickOption::from_code(c, days)),
        Some(Value::String(s)) => QuickOption::parse(s, days),
        _ => Some(QuickOption::ExactDate),
    };
    let quick_option = quick_option.unwrap_or_else(|| {
        Degradation::MalformedViewSpec {
            reason: format!("unknown quick option on '{}'", property_key),
        }
        .emit();
        QuickOption::ExactDate
    });

    let format = field(map, &["format"]).and_then(|f| match f {
        Value::Number(n) => n.as_i64().map(ValueFormat::from_code),
        Value::String(s) if !s.is_empty() => Some(ValueFormat::parse(s)),
        _ => None,
    });

    Some(FilterLeaf {
        property_key,
        condition,
        value,
        format,
        include_time: field(map, &["includeTime"]).is_some_and(as_bool),
        quick_option,
    })
}
