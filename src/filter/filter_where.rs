use serde_json::Value;

use super::error::FilterError;
use super::types::{TenantScope, TENANT_COLUMN};

/// Compiles a JSON predicate tree into a parameterized SQL WHERE clause.
///
/// The tenant scope condition is appended after all caller conditions, at the
/// top level only - nested groups are built unscoped so the predicate appears
/// exactly once and cannot be disjoined away by `$or`.
pub struct FilterWhere {
    params: Vec<Value>,
    start_index: usize,
    max_depth: u32,
}

impl FilterWhere {
    pub fn generate(
        where_data: Option<&Value>,
        starting_param_index: usize,
        scope: &TenantScope,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut builder = Self {
            params: vec![],
            start_index: starting_param_index,
            max_depth: crate::config::CONFIG.filter.max_nested_depth,
        };

        let mut parts: Vec<String> = vec![];
        if let Some(data) = where_data {
            let sql = builder.build_group(data, 0)?;
            if !sql.is_empty() {
                parts.push(sql);
            }
        }

        match scope {
            TenantScope::Unscoped => {}
            TenantScope::Tenant(id) => {
                let placeholder = builder.param(Value::String(id.clone()));
                parts.push(format!("\"{}\" = {}", TENANT_COLUMN, placeholder));
            }
            TenantScope::NullOnly => {
                parts.push(format!("\"{}\" IS NULL", TENANT_COLUMN));
            }
        }

        Ok((parts.join(" AND "), builder.params))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            // Raw SQL strings are not a predicate form here: they would sit
            // outside the parameterized path the scope condition rides on.
            _ => Err(FilterError::InvalidWhereClause("WHERE must be a JSON object".to_string())),
        }
    }

    fn build_group(&mut self, data: &Value, depth: u32) -> Result<String, FilterError> {
        if depth > self.max_depth {
            return Err(FilterError::NestingTooDeep(self.max_depth));
        }

        let obj = match data {
            Value::Object(obj) => obj,
            _ => {
                return Err(FilterError::InvalidWhereClause(
                    "WHERE must be a JSON object".to_string(),
                ))
            }
        };

        let mut conditions = Vec::with_capacity(obj.len());
        for (key, value) in obj {
            if key.starts_with('$') {
                conditions.push(self.build_logical(key, value, depth)?);
            } else {
                conditions.push(self.build_field(key, value)?);
            }
        }
        Ok(conditions.join(" AND "))
    }

    fn build_logical(&mut self, op: &str, value: &Value, depth: u32) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData(format!("{} requires an array", op))
                })?;
                if arr.is_empty() {
                    return Err(FilterError::InvalidOperatorData(format!(
                        "{} requires a non-empty array",
                        op
                    )));
                }
                let mut parts = Vec::with_capacity(arr.len());
                for item in arr {
                    let sql = self.build_group(item, depth + 1)?;
                    parts.push(format!("({})", if sql.is_empty() { "1=1".to_string() } else { sql }));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", parts.join(joiner)))
            }
            "$not" => {
                let sql = self.build_group(value, depth + 1)?;
                Ok(format!("NOT ({})", if sql.is_empty() { "1=1".to_string() } else { sql }))
            }
            other => Err(FilterError::UnsupportedOperator(other.to_string())),
        }
    }

    fn build_field(&mut self, field: &str, value: &Value) -> Result<String, FilterError> {
        Self::validate_column(field)?;
        let quoted = format!("\"{}\"", field);

        if let Value::Object(ops) = value {
            if ops.is_empty() {
                return Err(FilterError::InvalidOperatorData(format!(
                    "field '{}' condition requires an operator",
                    field
                )));
            }
            let mut parts = Vec::with_capacity(ops.len());
            for (op_key, op_val) in ops {
                parts.push(self.build_operator(&quoted, op_key, op_val)?);
            }
            Ok(parts.join(" AND "))
        } else {
            // Implicit equality: { field: value }
            if value.is_null() {
                Ok(format!("{} IS NULL", quoted))
            } else {
                let placeholder = self.param(value.clone());
                Ok(format!("{} = {}", quoted, placeholder))
            }
        }
    }

    fn build_operator(
        &mut self,
        column: &str,
        op_key: &str,
        data: &Value,
    ) -> Result<String, FilterError> {
        match op_key {
            "$eq" => {
                if data.is_null() {
                    Ok(format!("{} IS NULL", column))
                } else {
                    let p = self.param(data.clone());
                    Ok(format!("{} = {}", column, p))
                }
            }
            "$ne" | "$neq" => {
                if data.is_null() {
                    Ok(format!("{} IS NOT NULL", column))
                } else {
                    let p = self.param(data.clone());
                    Ok(format!("{} <> {}", column, p))
                }
            }
            "$gt" => {
                let p = self.param(data.clone());
                Ok(format!("{} > {}", column, p))
            }
            "$gte" => {
                let p = self.param(data.clone());
                Ok(format!("{} >= {}", column, p))
            }
            "$lt" => {
                let p = self.param(data.clone());
                Ok(format!("{} < {}", column, p))
            }
            "$lte" => {
                let p = self.param(data.clone());
                Ok(format!("{} <= {}", column, p))
            }
            "$like" => {
                let p = self.param(data.clone());
                Ok(format!("{} LIKE {}", column, p))
            }
            "$ilike" => {
                let p = self.param(data.clone());
                Ok(format!("{} ILIKE {}", column, p))
            }
            "$in" => {
                if let Value::Array(values) = data {
                    if values.is_empty() {
                        return Ok("1=0".to_string());
                    }
                    let placeholders: Vec<String> =
                        values.iter().map(|v| self.param(v.clone())).collect();
                    Ok(format!("{} IN ({})", column, placeholders.join(", ")))
                } else {
                    let p = self.param(data.clone());
                    Ok(format!("{} = {}", column, p))
                }
            }
            "$between" => {
                if let Value::Array(values) = data {
                    if values.len() != 2 {
                        return Err(FilterError::InvalidOperatorData(
                            "$between requires exactly 2 values".to_string(),
                        ));
                    }
                    let low = self.param(values[0].clone());
                    let high = self.param(values[1].clone());
                    Ok(format!("{} BETWEEN {} AND {}", column, low, high))
                } else {
                    Err(FilterError::InvalidOperatorData(
                        "$between requires array with 2 values".to_string(),
                    ))
                }
            }
            other => Err(FilterError::UnsupportedOperator(other.to_string())),
        }
    }

    fn validate_column(name: &str) -> Result<(), FilterError> {
        super::filter::Filter::validate_column_name(name)
    }

    fn param(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.start_index + self.params.len())
    }
}
