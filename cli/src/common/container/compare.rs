//! # Facet Comparison
//!
//! File: cli/src/common/container/compare.rs
//!
//! ## Overview
//!
//! Decides whether a desired facet value matches what a live container has.
//! The outcome depends on the facet's comparison type and the comparison mode
//! the user selected for it.
//!
//! | type        | strict                 | allow-more-present                        |
//! |-------------|------------------------|-------------------------------------------|
//! | value       | equality               | (not allowed)                             |
//! | list        | sequence equality      | expected is an ordered subsequence        |
//! | set         | set equality           | actual is a superset                      |
//! | dict        | map equality           | expected keys present with equal values   |
//! | set-of-dict | both directions match  | every expected dict has a compatible peer |
//!
//! A missing value on one side matches only an empty container on the other
//! side; under allow-more-present a missing *expected* value always matches.
//!
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonType {
    Value,
    List,
    Set,
    Dict,
    SetOfDict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    Strict,
    AllowMorePresent,
    Ignore,
}

impl ComparisonType {
    pub fn default_mode(&self) -> ComparisonMode {
        match self {
            Self::Value | Self::List => ComparisonMode::Strict,
            Self::Set | Self::Dict | Self::SetOfDict => ComparisonMode::AllowMorePresent,
        }
    }
}

impl ComparisonMode {
    /// Accepts both `allow_more_present` and `allow-more-present`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "strict" => Some(Self::Strict),
            "allow_more_present" | "allow-more-present" => Some(Self::AllowMorePresent),
            "ignore" => Some(Self::Ignore),
            _ => None,
        }
    }
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Null => true,
        _ => false,
    }
}

fn as_items(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or_default()
}

/// Every key of `expected` is present in `actual` with an equal value.
pub fn dict_allows_more_present(expected: &Map<String, Value>, actual: &Map<String, Value>) -> bool {
    expected
        .iter()
        .all(|(key, value)| actual.get(key).is_some_and(|a| a == value))
}

fn dict_compatible(expected: &Value, actual: &Value) -> bool {
    match (expected.as_object(), actual.as_object()) {
        (Some(e), Some(a)) => dict_allows_more_present(e, a),
        _ => expected == actual,
    }
}

fn ordered_subsequence(expected: &[Value], actual: &[Value]) -> bool {
    let mut remaining = actual.iter();
    expected
        .iter()
        .all(|wanted| remaining.by_ref().any(|candidate| candidate == wanted))
}

fn is_superset(actual: &[Value], expected: &[Value]) -> bool {
    expected.iter().all(|e| actual.contains(e))
}

/// Compares a desired value with the live one.
///
/// # Arguments
///
/// * `expected` - the desired value (`None` when the parameter was not given).
/// * `actual` - the container's value (`None` when absent from the inspection).
pub fn compare(
    comparison_type: ComparisonType,
    mode: ComparisonMode,
    expected: Option<&Value>,
    actual: Option<&Value>,
) -> bool {
    if mode == ComparisonMode::Ignore {
        return true;
    }
    let expected = expected.filter(|v| !v.is_null());
    let actual = actual.filter(|v| !v.is_null());

    let (expected, actual) = match (expected, actual) {
        (None, None) => return true,
        (Some(e), Some(a)) => (e, a),
        (e, a) => {
            if comparison_type == ComparisonType::Value {
                return false;
            }
            if mode == ComparisonMode::AllowMorePresent && e.is_none() {
                return true;
            }
            return e.or(a).is_some_and(is_empty_container);
        }
    };

    let strict = mode == ComparisonMode::Strict;
    match comparison_type {
        ComparisonType::Value => expected == actual,
        ComparisonType::List if strict => expected == actual,
        ComparisonType::List => ordered_subsequence(as_items(expected), as_items(actual)),
        ComparisonType::Set => {
            let (e, a) = (as_items(expected), as_items(actual));
            if strict {
                is_superset(a, e) && is_superset(e, a)
            } else {
                is_superset(a, e)
            }
        }
        ComparisonType::Dict if strict => expected == actual,
        ComparisonType::Dict => dict_compatible(expected, actual),
        ComparisonType::SetOfDict => {
            let (e, a) = (as_items(expected), as_items(actual));
            let covered = e.iter().all(|ev| a.iter().any(|av| dict_compatible(ev, av)));
            if !strict {
                return covered;
            }
            covered && a.iter().all(|av| e.iter().any(|ev| dict_compatible(ev, av)))
        }
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use super::ComparisonMode::{AllowMorePresent as More, Ignore, Strict};
    use super::ComparisonType::{Dict, List, Set, SetOfDict, Value as Scalar};

    fn cmp(t: ComparisonType, m: ComparisonMode, e: Value, a: Value) -> bool {
        compare(t, m, Some(&e), Some(&a))
    }

    #[test]
    fn test_value() {
        assert!(cmp(Scalar, Strict, json!(5), json!(5)));
        assert!(!cmp(Scalar, Strict, json!(5), json!(6)));
        assert!(!compare(Scalar, Strict, Some(&json!("")), None));
        assert!(compare(Scalar, Strict, None, None));
        assert!(cmp(Scalar, Ignore, json!(1), json!(2)));
    }

    #[test]
    fn test_list_subsequence() {
        assert!(cmp(List, Strict, json!(["a", "b"]), json!(["a", "b"])));
        assert!(!cmp(List, Strict, json!(["a", "b"]), json!(["b", "a"])));
        assert!(cmp(List, More, json!(["a", "c"]), json!(["a", "b", "c"])));
        assert!(!cmp(List, More, json!(["c", "a"]), json!(["a", "b", "c"])));
        assert!(!cmp(List, More, json!(["a", "a"]), json!(["a", "b"])));
    }

    #[test]
    fn test_set() {
        assert!(cmp(Set, Strict, json!(["a", "b"]), json!(["b", "a"])));
        assert!(!cmp(Set, Strict, json!(["a"]), json!(["a", "b"])));
        assert!(cmp(Set, More, json!(["a"]), json!(["a", "b"])));
        assert!(!cmp(Set, More, json!(["c"]), json!(["a", "b"])));
    }

    #[test]
    fn test_dict() {
        assert!(cmp(Dict, More, json!({"a": "1"}), json!({"a": "1", "b": "2"})));
        assert!(!cmp(Dict, More, json!({"a": "2"}), json!({"a": "1"})));
        assert!(!cmp(Dict, Strict, json!({"a": "1"}), json!({"a": "1", "b": "2"})));
    }

    #[test]
    fn test_set_of_dict() {
        let expected = json!([{"target": "/data", "type": "volume"}]);
        let actual = json!([
            {"target": "/data", "type": "volume", "read_only": false},
            {"target": "/cache", "type": "tmpfs"}
        ]);
        assert!(cmp(SetOfDict, More, expected.clone(), actual.clone()));
        assert!(!cmp(SetOfDict, Strict, expected, actual));
    }

    #[test]
    fn test_missing_sides() {
        assert!(compare(Set, More, None, Some(&json!(["x"]))));
        assert!(!compare(Set, Strict, None, Some(&json!(["x"]))));
        assert!(compare(Set, Strict, None, Some(&json!([]))));
        assert!(compare(Dict, Strict, Some(&json!({})), None));
        assert!(!compare(Dict, Strict, Some(&json!({"a": "b"})), None));
    }

    #[test]
    fn test_parse_and_defaults() {
        assert_eq!(ComparisonMode::parse("allow_more_present"), Some(More));
        assert_eq!(ComparisonMode::parse("loose"), None);
        assert_eq!(List.default_mode(), Strict);
        assert_eq!(SetOfDict.default_mode(), More);
    }
}
