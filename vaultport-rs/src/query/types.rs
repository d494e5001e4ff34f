//! View specifications and compiled query types.

use crate::registry::ValueFormat;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// Source views
// ============================================================================

/// Layout of a compiled view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Table,
    List,
    Cards,
    Kanban,
}

/// A saved view over the record set.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSpec {
    pub id: String,
    pub kind: ViewKind,
    pub name: String,
    pub page_limit: Option<u32>,
    pub columns: Vec<ViewColumn>,
    pub sorts: Vec<SortTerm>,
    pub filter: Option<FilterNode>,
    pub group_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewColumn {
    pub key: String,
    pub visible: bool,
}

/// A filter tree. Negation only ever appears inside leaf conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Leaf(FilterLeaf),
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterLeaf {
    pub property_key: String,
    pub condition: Condition,
    pub value: Value,
    /// Format recorded on the filter itself, if any.
    pub format: Option<ValueFormat>,
    pub include_time: bool,
    pub quick_option: QuickOption,
}

/// Filter conditions understood by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Like,
    NotLike,
    In,
    NotIn,
    AllIn,
    NotAllIn,
    ExactIn,
    NotExactIn,
    Empty,
    NotEmpty,
    Exists,
}

impl Condition {
    pub const ALL: [Condition; 17] = [
        Condition::Equal,
        Condition::NotEqual,
        Condition::Greater,
        Condition::Less,
        Condition::GreaterOrEqual,
        Condition::LessOrEqual,
        Condition::Like,
        Condition::NotLike,
        Condition::In,
        Condition::NotIn,
        Condition::AllIn,
        Condition::NotAllIn,
        Condition::ExactIn,
        Condition::NotExactIn,
        Condition::Empty,
        Condition::NotEmpty,
        Condition::Exists,
    ];

    /// Parse a condition name (case-insensitive). `None` and unknown
    /// names are not conditions.
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.name().to_ascii_lowercase() == lower)
    }

    /// Map the source's numeric condition codes.
    pub fn from_code(code: i64) -> Option<Self> {
        let condition = match code {
            1 => Condition::Equal,
            2 => Condition::NotEqual,
            3 => Condition::Greater,
            4 => Condition::Less,
            5 => Condition::GreaterOrEqual,
            6 => Condition::LessOrEqual,
            7 => Condition::Like,
            8 => Condition::NotLike,
            9 => Condition::In,
            10 => Condition::NotIn,
            11 => Condition::Empty,
            12 => Condition::NotEmpty,
            13 => Condition::AllIn,
            14 => Condition::NotAllIn,
            15 => Condition::ExactIn,
            16 => Condition::NotExactIn,
            17 => Condition::Exists,
            _ => return None,
        };
        Some(condition)
    }

    pub fn name(self) -> &'static str {
        match self {
            Condition::Equal => "Equal",
            Condition::NotEqual => "NotEqual",
            Condition::Greater => "Greater",
            Condition::Less => "Less",
            Condition::GreaterOrEqual => "GreaterOrEqual",
            Condition::LessOrEqual => "LessOrEqual",
            Condition::Like => "Like",
            Condition::NotLike => "NotLike",
            Condition::In => "In",
            Condition::NotIn => "NotIn",
            Condition::AllIn => "AllIn",
            Condition::NotAllIn => "NotAllIn",
            Condition::ExactIn => "ExactIn",
            Condition::NotExactIn => "NotExactIn",
            Condition::Empty => "Empty",
            Condition::NotEmpty => "NotEmpty",
            Condition::Exists => "Exists",
        }
    }

    /// Conditions that compare against the filter value.
    pub fn needs_value(self) -> bool {
        !matches!(
            self,
            Condition::Empty | Condition::NotEmpty | Condition::Exists
        )
    }
}

/// Symbolic relative-date shorthands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuickOption {
    /// The filter value is an explicit date.
    #[default]
    ExactDate,
    Yesterday,
    Today,
    Tomorrow,
    LastWeek,
    CurrentWeek,
    NextWeek,
    LastMonth,
    CurrentMonth,
    NextMonth,
    LastYear,
    CurrentYear,
    NextYear,
    /// The single day N days before today.
    NumberOfDaysAgo(i64),
    /// The single day N days after today.
    NumberOfDaysNow(i64),
}

impl QuickOption {
    /// Parse a quick option name. Day-offset options take their count
    /// from a `Name:N` suffix or, failing that, from `days`.
    pub fn parse(name: &str, days: Option<i64>) -> Option<Self> {
        let (name, suffix) = match name.split_once(':') {
            Some((name, n)) => (name, n.trim().parse::<i64>().ok()),
            None => (name, None),
        };
        let n = suffix.or(days).unwrap_or(0);
        let option = match name.trim().to_ascii_lowercase().as_str() {
            "" | "exactdate" => QuickOption::ExactDate,
            "yesterday" => QuickOption::Yesterday,
            "today" => QuickOption::Today,
            "tomorrow" => QuickOption::Tomorrow,
            "lastweek" => QuickOption::LastWeek,
            "currentweek" => QuickOption::CurrentWeek,
            "nextweek" => QuickOption::NextWeek,
            "lastmonth" => QuickOption::LastMonth,
            "currentmonth" => QuickOption::CurrentMonth,
            "nextmonth" => QuickOption::NextMonth,
            "lastyear" => QuickOption::LastYear,
            "currentyear" => QuickOption::CurrentYear,
            "nextyear" => QuickOption::NextYear,
            "numberofdaysago" => QuickOption::NumberOfDaysAgo(n),
            "numberofdaysnow" => QuickOption::NumberOfDaysNow(n),
            _ => return None,
        };
        Some(option)
    }

    /// Map the source's numeric quick-option codes.
    pub fn from_code(code: i64, days: Option<i64>) -> Option<Self> {
        let n = days.unwrap_or(0);
        let option = match code {
            0 => QuickOption::ExactDate,
            1 => QuickOption::Yesterday,
            2 => QuickOption::Today,
            3 => QuickOption::Tomorrow,
            4 => QuickOption::LastWeek,
            5 => QuickOption::CurrentWeek,
            6 => QuickOption::NextWeek,
            7 => QuickOption::LastMonth,
            8 => QuickOption::CurrentMonth,
            9 => QuickOption::NextMonth,
            10 => QuickOption::NumberOfDaysAgo(n),
            11 => QuickOption::NumberOfDaysNow(n),
            12 => QuickOption::LastYear,
            13 => QuickOption::CurrentYear,
            14 => QuickOption::NextYear,
            _ => return None,
        };
        Some(option)
    }

    pub fn is_exact(self) -> bool {
        self == QuickOption::ExactDate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
    Custom,
}

impl SortDirection {
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "desc" | "1" => SortDirection::Desc,
            "custom" | "2" => SortDirection::Custom,
            _ => SortDirection::Asc,
        }
    }

    /// Target direction token.
    pub fn token(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
            SortDirection::Custom => "CUSTOM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPlacement {
    #[default]
    NotSpecified,
    Start,
    End,
}

impl EmptyPlacement {
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "start" | "1" => EmptyPlacement::Start,
            "end" | "2" => EmptyPlacement::End,
            _ => EmptyPlacement::NotSpecified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortTerm {
    pub property_key: String,
    pub direction: SortDirection,
    pub empty_placement: EmptyPlacement,
    pub include_time: bool,
    pub collate: bool,
    /// Option or object ids, in the order the source ranks them.
    pub custom_order: Vec<String>,
}

/// The object a view belongs to, for collection scoping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewOwner {
    pub id: String,
    pub is_collection: bool,
    /// Type ids members must have; empty means unconstrained.
    pub allowed_types: Vec<String>,
}

// ============================================================================
// Compiled views
// ============================================================================

/// A boolean filter expression in the target query language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Leaf(String),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    pub fn leaf(text: impl Into<String>) -> Self {
        Expr::Leaf(text.into())
    }

    /// Conjunction of `children`. Nested conjunctions are flattened, an
    /// empty set is no filter, a single child stands alone.
    pub fn all(children: Vec<Expr>) -> Option<Expr> {
        Self::join(children, true)
    }

    /// Disjunction of `children`, simplified like [`Expr::all`].
    pub fn any(children: Vec<Expr>) -> Option<Expr> {
        Self::join(children, false)
    }

    fn join(children: Vec<Expr>, conjunction: bool) -> Option<Expr> {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Expr::And(grand) if conjunction => flat.extend(grand),
                Expr::Or(grand) if !conjunction => flat.extend(grand),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ if conjunction => Some(Expr::And(flat)),
            _ => Some(Expr::Or(flat)),
        }
    }

    /// Inline expression text, e.g. `a && (b || c)`.
    pub fn render(&self) -> String {
        match self {
            Expr::Leaf(text) => text.clone(),
            Expr::And(children) => Self::render_joined(children, " && "),
            Expr::Or(children) => Self::render_joined(children, " || "),
        }
    }

    fn render_joined(children: &[Expr], separator: &str) -> String {
        children
            .iter()
            .map(|child| match child {
                Expr::Leaf(text) => text.clone(),
                nested => format!("({})", nested.render()),
            })
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Expr::Leaf(text) => serializer.serialize_str(text),
            Expr::And(children) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("and", children)?;
                map.end()
            }
            Expr::Or(children) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("or", children)?;
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledSort {
    pub property: String,
    pub direction: String,
    /// Display values in rank order, for `CUSTOM` sorts.
    #[serde(rename = "customOrder", skip_serializing_if = "Vec::is_empty")]
    pub custom_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledGroup {
    pub property: String,
    pub direction: String,
}

/// A view translated into the target query language.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledView {
    pub kind: ViewKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_limit: Option<u32>,
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Expr>,
    pub sort: Vec<CompiledSort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<CompiledGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_parse() {
        assert_eq!(Condition::parse("notallin"), Some(Condition::NotAllIn));
        assert_eq!(Condition::parse("Equal"), Some(Condition::Equal));
        assert_eq!(Condition::parse("None"), None);
        assert_eq!(Condition::from_code(15), Some(Condition::ExactIn));
        assert_eq!(Condition::from_code(0), None);
    }

    #[test]
    fn test_quick_option_parse() {
        assert_eq!(QuickOption::parse("Today", None), Some(QuickOption::Today));
        assert_eq!(
            QuickOption::parse("NumberOfDaysAgo:3", None),
            Some(QuickOption::NumberOfDaysAgo(3))
        );
        assert_eq!(
            QuickOption::parse("NumberOfDaysNow", Some(5)),
            Some(QuickOption::NumberOfDaysNow(5))
        );
        assert_eq!(QuickOption::parse("Fortnight", None), None);
        assert_eq!(QuickOption::from_code(2, None), Some(QuickOption::Today));
    }

    #[test]
    fn test_sort_direction() {
        assert_eq!(SortDirection::parse("Desc").token(), "DESC");
        assert_eq!(SortDirection::parse("custom").token(), "CUSTOM");
        assert_eq!(SortDirection::parse("whatever").token(), "ASC");
    }

    #[test]
    fn test_expr_join_simplifies() {
        assert_eq!(Expr::all(vec![]), None);
        assert_eq!(Expr::all(vec![Expr::leaf("a")]), Some(Expr::leaf("a")));
        let nested = Expr::all(vec![
            Expr::leaf("a"),
            Expr::And(vec![Expr::leaf("b"), Expr::leaf("c")]),
        ]);
        assert_eq!(
            nested,
            Some(Expr::And(vec![Expr::leaf("a"), Expr::leaf("b"), Expr::leaf("c")]))
        );
    }

    #[test]
    fn test_expr_render() {
        let expr = Expr::And(vec![
            Expr::leaf("a"),
            Expr::Or(vec![Expr::leaf("b"), Expr::leaf("c")]),
        ]);
        assert_eq!(expr.render(), "a && (b || c)");
    }

    #[test]
    fn test_expr_serialize() {
        let expr = Expr::Or(vec![
            Expr::leaf("a"),
            Expr::And(vec![Expr::leaf("b"), Expr::leaf("c")]),
        ]);
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(json, serde_json::json!({"or": ["a", {"and": ["b", "c"]}]}));
    }
}
