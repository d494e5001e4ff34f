//! Total coercion helpers over the dynamic payload value.
//!
//! Raw property values and view specs arrive as decoded JSON. These helpers
//! never fail: a value of the wrong shape coerces to an empty or absent
//! result instead.

pub use serde_json::Value;

/// Stringify a scalar. Strings come back verbatim, numbers and booleans in
/// their JSON text form, `null` as the empty string. Lists and maps render
/// as compact JSON.
pub fn as_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Integer view of a number or numeric string. Floats are truncated.
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Flatten a value into a list of non-empty strings.
///
/// A scalar becomes a one-element list, `null` and empty strings vanish,
/// nested lists are flattened one level.
pub fn as_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .flat_map(|item| match item {
                Value::Array(_) => as_string_list(item),
                other => {
                    let s = as_string(other);
                    if s.is_empty() { Vec::new() } else { vec![s] }
                }
            })
            .collect(),
        other => {
            let s = as_string(other);
            if s.is_empty() { Vec::new() } else { vec![s] }
        }
    }
}

/// Whether the source stored this value as a sequence.
pub fn is_list(value: &Value) -> bool {
    matches!(value, Value::Array(_))
}

/// Null, the empty string, an empty list or an empty map.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_empty),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Look up the first present field among several spellings.
pub fn field<'a>(map: &'a serde_json::Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| map.get(*name))
}

/// Boolean view of a value; numbers are truthy when non-zero.
pub fn as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}
