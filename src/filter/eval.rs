//! In-process evaluation of the filter predicate language.
//!
//! The memory-backed store interprets the same operator tree the SQL builder
//! compiles, so both stores answer a given `FilterData` identically. Scope
//! checks live here too: a record is visible only if it passes the scope AND
//! the caller predicate, mirroring the SQL composition.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{FilterOrderInfo, SortDirection, TenantScope, TENANT_COLUMN};

/// Does the record fall inside the tenant scope?
pub fn in_scope(record: &Map<String, Value>, scope: &TenantScope) -> bool {
    match scope {
        TenantScope::Unscoped => true,
        TenantScope::Tenant(id) => {
            matches!(record.get(TENANT_COLUMN), Some(Value::String(s)) if s == id)
        }
        TenantScope::NullOnly => {
            matches!(record.get(TENANT_COLUMN), None | Some(Value::Null))
        }
    }
}

/// Evaluate a WHERE tree against a record. `None` matches everything.
pub fn matches_where(
    record: &Map<String, Value>,
    where_data: Option<&Value>,
) -> Result<bool, FilterError> {
    match where_data {
        None => Ok(true),
        Some(data) => eval_group(record, data),
    }
}

fn eval_group(record: &Map<String, Value>, data: &Value) -> Result<bool, FilterError> {
    let obj = match data {
        Value::Object(obj) => obj,
        _ => {
            return Err(FilterError::InvalidWhereClause("WHERE must be a JSON object".to_string()))
        }
    };

    for (key, value) in obj {
        let matched = if key.starts_with('$') {
            eval_logical(record, key, value)?
        } else {
            eval_field(record, key, value)?
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn eval_logical(record: &Map<String, Value>, op: &str, value: &Value) -> Result<bool, FilterError> {
    match op {
        "$and" | "$or" => {
            let arr = value.as_array().ok_or_else(|| {
                FilterError::InvalidOperatorData(format!("{} requires an array", op))
            })?;
            if op == "$and" {
                for item in arr {
                    if !eval_group(record, item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            } else {
                for item in arr {
                    if eval_group(record, item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
        "$not" => Ok(!eval_group(record, value)?),
        other => Err(FilterError::UnsupportedOperator(other.to_string())),
    }
}

fn eval_field(record: &Map<String, Value>, field: &str, cond: &Value) -> Result<bool, FilterError> {
    let actual = record.get(field).unwrap_or(&Value::Null);

    if let Value::Object(ops) = cond {
        if ops.is_empty() {
            return Err(FilterError::InvalidOperatorData(format!(
                "field '{}' condition requires an operator",
                field
            )));
        }
        for (op_key, op_val) in ops {
            if !eval_operator(actual, op_key, op_val)? {
                return Ok(false);
            }
        }
        Ok(true)
    } else {
        // Implicit equality; null matches absent-or-null like SQL IS NULL
        if cond.is_null() {
            Ok(actual.is_null())
        } else {
            Ok(actual == cond)
        }
    }
}

fn eval_operator(actual: &Value, op_key: &str, data: &Value) -> Result<bool, FilterError> {
    match op_key {
        "$eq" => Ok(if data.is_null() { actual.is_null() } else { actual == data }),
        "$ne" | "$neq" => Ok(if data.is_null() { !actual.is_null() } else { actual != data }),
        "$gt" => Ok(compare(actual, data) == Some(Ordering::Greater)),
        "$gte" => Ok(matches!(compare(actual, data), Some(Ordering::Greater | Ordering::Equal))),
        "$lt" => Ok(compare(actual, data) == Some(Ordering::Less)),
        "$lte" => Ok(matches!(compare(actual, data), Some(Ordering::Less | Ordering::Equal))),
        "$like" => Ok(like_match(actual, data, false)),
        "$ilike" => Ok(like_match(actual, data, true)),
        "$in" => match data {
            Value::Array(values) => Ok(values.contains(actual)),
            _ => Ok(actual == data),
        },
        "$between" => match data {
            Value::Array(values) if values.len() == 2 => Ok(matches!(
                compare(actual, &values[0]),
                Some(Ordering::Greater | Ordering::Equal)
            ) && matches!(
                compare(actual, &values[1]),
                Some(Ordering::Less | Ordering::Equal)
            )),
            _ => Err(FilterError::InvalidOperatorData(
                "$between requires array with 2 values".to_string(),
            )),
        },
        other => Err(FilterError::UnsupportedOperator(other.to_string())),
    }
}

/// Total order over comparable JSON values; None for mixed/incomparable types.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64().partial_cmp(&y.as_f64()),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// SQL LIKE semantics: `%` any run, `_` one character.
fn like_match(actual: &Value, pattern: &Value, case_insensitive: bool) -> bool {
    let (Some(text), Some(pat)) = (actual.as_str(), pattern.as_str()) else {
        return false;
    };
    let (text, pat) = if case_insensitive {
        (text.to_lowercase(), pat.to_lowercase())
    } else {
        (text.to_string(), pat.to_string())
    };
    like_inner(&text.chars().collect::<Vec<_>>(), &pat.chars().collect::<Vec<_>>())
}

fn like_inner(text: &[char], pat: &[char]) -> bool {
    match pat.first() {
        None => text.is_empty(),
        Some('%') => {
            // Greedily try every split point
            (0..=text.len()).any(|i| like_inner(&text[i..], &pat[1..]))
        }
        Some('_') => !text.is_empty() && like_inner(&text[1..], &pat[1..]),
        Some(c) => text.first() == Some(c) && like_inner(&text[1..], &pat[1..]),
    }
}

/// Sort records in place per the parsed order spec.
pub fn sort_records(records: &mut [Map<String, Value>], order: &[FilterOrderInfo]) {
    records.sort_by(|a, b| {
        for info in order {
            let av = a.get(&info.column).unwrap_or(&Value::Null);
            let bv = b.get(&info.column).unwrap_or(&Value::Null);
            let ord = compare(av, bv).unwrap_or(Ordering::Equal);
            let ord = match info.sort {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}
