use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use super::error::FilterError;
use super::types::FilterOp;
use crate::database::Column;

const MAX_DEPTH: usize = 8;

/// Compiles the JSON filter language into a parameterized WHERE clause.
///
/// Field names are resolved against a fixed column list; every value becomes a
/// positional parameter bound as text and cast to the column's type. Values are
/// checked against that type first so a malformed literal is a filter error.
pub struct FilterWhere<'a> {
    columns: &'a [Column],
    param_values: Vec<String>,
}

impl<'a> FilterWhere<'a> {
    /// `existing` are parameters already claimed by the caller; numbering continues after them.
    pub fn new(columns: &'a [Column], existing: Vec<String>) -> Self {
        Self { columns, param_values: existing }
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            Value::String(_) => Err(FilterError::InvalidWhereClause(
                "raw SQL predicates are not accepted".to_string(),
            )),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    /// Build the clause for `where_data`; an empty filter yields `None`.
    pub fn build(&mut self, where_data: &Value) -> Result<Option<String>, FilterError> {
        Self::validate(where_data)?;
        let parts = self.parse_object(where_data, 0)?;
        Ok(join(parts, " AND "))
    }

    pub fn into_params(self) -> Vec<String> {
        self.param_values
    }

    fn parse_object(&mut self, data: &Value, depth: usize) -> Result<Vec<String>, FilterError> {
        if depth > MAX_DEPTH {
            return Err(FilterError::TooDeep(MAX_DEPTH));
        }
        let obj = match data {
            Value::Null => return Ok(vec![]),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("expected an object".to_string())),
        };

        let mut parts = Vec::new();
        for (key, value) in obj {
            if key.starts_with('$') {
                if let Some(sql) = self.parse_logical_operator(key, value, depth)? {
                    parts.push(sql);
                }
            } else {
                parts.extend(self.parse_field_condition(key, value)?);
            }
        }
        Ok(parts)
    }

    fn parse_logical_operator(&mut self, op: &str, value: &Value, depth: usize) -> Result<Option<String>, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut sql_parts = Vec::new();
                for v in arr {
                    if let Some(sql) = join(self.parse_object(v, depth + 1)?, " AND ") {
                        sql_parts.push(format!("({})", sql));
                    }
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(join(sql_parts, joiner).map(|s| format!("({})", s)))
            }
            "$not" => {
                let inner = join(self.parse_object(value, depth + 1)?, " AND ");
                Ok(inner.map(|s| format!("NOT ({})", s)))
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<Vec<String>, FilterError> {
        let column = *self
            .columns
            .iter()
            .find(|c| c.name == field)
            .ok_or_else(|| FilterError::InvalidColumn(field.to_string()))?;

        match value {
            Value::Object(obj) => {
                let mut out = Vec::new();
                for (op_key, op_val) in obj {
                    let operator = FilterOp::from_key(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    out.push(self.build_sql_condition(column, operator, op_val)?);
                }
                Ok(out)
            }
            // Implicit equality: { field: value }
            _ => Ok(vec![self.build_sql_condition(column, FilterOp::Eq, value)?]),
        }
    }

    fn build_sql_condition(&mut self, column: Column, operator: FilterOp, data: &Value) -> Result<String, FilterError> {
        let quoted = column.sql();

        if let Some(cmp) = operator.comparison() {
            if data.is_null() {
                return match operator {
                    FilterOp::Eq => Ok(format!("{} IS NULL", quoted)),
                    FilterOp::Neq => Ok(format!("{} IS NOT NULL", quoted)),
                    _ => Err(FilterError::InvalidOperatorData(format!("{} cannot compare with null", column.name))),
                };
            }
            let p = self.param(column, data)?;
            return Ok(format!("{} {} {}", quoted, cmp, p));
        }

        match operator {
            FilterOp::Like | FilterOp::ILike => {
                let keyword = if operator == FilterOp::Like { "LIKE" } else { "ILIKE" };
                let p = self.text_param(data)?;
                Ok(format!("{}::text {} {}::text", quoted, keyword, p))
            }
            FilterOp::In | FilterOp::NIn => {
                let values = data
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$in/$nin require an array".to_string()))?;
                if values.is_empty() {
                    // Empty IN matches nothing; empty NOT IN matches everything
                    return Ok(if operator == FilterOp::In { "1=0".to_string() } else { "1=1".to_string() });
                }
                let params = values
                    .iter()
                    .map(|v| self.param(column, v))
                    .collect::<Result<Vec<_>, _>>()?;
                let keyword = if operator == FilterOp::In { "IN" } else { "NOT IN" };
                Ok(format!("{} {} ({})", quoted, keyword, params.join(", ")))
            }
            FilterOp::Between => match data.as_array().map(|a| a.as_slice()) {
                Some([low, high]) => {
                    let low = self.param(column, low)?;
                    let high = self.param(column, high)?;
                    Ok(format!("{} BETWEEN {} AND {}", quoted, low, high))
                }
                _ => Err(FilterError::InvalidOperatorData("$between requires exactly 2 values".to_string())),
            },
            FilterOp::Null => match data {
                Value::Bool(true) => Ok(format!("{} IS NULL", quoted)),
                Value::Bool(false) => Ok(format!("{} IS NOT NULL", quoted)),
                _ => Err(FilterError::InvalidOperatorData("$null requires true or false".to_string())),
            },
            _ => Err(FilterError::UnsupportedOperator(format!("{:?}", operator))),
        }
    }

    /// Push `value` as a text parameter and return its placeholder cast to the column type.
    fn param(&mut self, column: Column, value: &Value) -> Result<String, FilterError> {
        let text = literal(value)?;
        check_literal(column, &text)?;
        Ok(format!("{}::{}", self.push(text), column.pg_type))
    }

    fn text_param(&mut self, value: &Value) -> Result<String, FilterError> {
        let text = literal(value)?;
        Ok(self.push(text))
    }

    fn push(&mut self, text: String) -> String {
        self.param_values.push(text);
        format!("${}", self.param_values.len())
    }
}

fn literal(value: &Value) -> Result<String, FilterError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => {
            Err(FilterError::InvalidOperatorData(format!("unsupported value: {}", value)))
        }
    }
}

/// Reject text the `::pg_type` cast would fail on
fn check_literal(column: Column, text: &str) -> Result<(), FilterError> {
    let valid = match column.pg_type {
        "uuid" => Uuid::parse_str(text).is_ok(),
        "date" => NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok(),
        "timestamptz" => {
            DateTime::parse_from_rfc3339(text).is_ok() || NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        }
        "numeric" => Decimal::from_str(text).is_ok(),
        "integer" => text.parse::<i32>().is_ok(),
        "boolean" => matches!(text, "true" | "false"),
        _ => true,
    };
    if !valid {
        return Err(FilterError::InvalidOperatorData(format!(
            "{} expects a {} value, got '{}'",
            column.name, column.pg_type, text
        )));
    }
    Ok(())
}

fn join(parts: Vec<String>, joiner: &str) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(joiner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[Column] = &[
        Column::new("id", "uuid"),
        Column::new("name", "text"),
        Column::new("amount", "numeric"),
        Column::new("due_date", "date"),
    ];

    fn build(data: Value) -> Result<(Option<String>, Vec<String>), FilterError> {
        let mut fw = FilterWhere::new(COLUMNS, vec![]);
        let sql = fw.build(&data)?;
        Ok((sql, fw.into_params()))
    }

    #[test]
    fn implicit_equality_casts_to_column_type() {
        let (sql, params) = build(json!({"amount": 10})).unwrap();
        assert_eq!(sql.unwrap(), "\"amount\" = $1::numeric");
        assert_eq!(params, vec!["10".to_string()]);
    }

    #[test]
    fn nested_logic_numbers_parameters_continuously() {
        let (sql, params) = build(json!({
            "$or": [
                {"name": {"$ilike": "%silva%"}},
                {"due_date": {"$between": ["2024-01-01", "2024-12-31"]}}
            ]
        }))
        .unwrap();
        assert_eq!(
            sql.unwrap(),
            "((\"name\"::text ILIKE $1::text) OR (\"due_date\" BETWEEN $2::date AND $3::date))"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn continues_after_existing_params() {
        let mut fw = FilterWhere::new(COLUMNS, vec!["scope".to_string()]);
        let sql = fw.build(&json!({"name": "x"})).unwrap().unwrap();
        assert_eq!(sql, "\"name\" = $2::text");
    }

    #[test]
    fn unknown_columns_are_rejected() {
        assert!(matches!(
            build(json!({"password_hash": "x"})),
            Err(FilterError::InvalidColumn(_))
        ));
        assert!(matches!(
            build(json!({"name\" OR 1=1 --": "x"})),
            Err(FilterError::InvalidColumn(_))
        ));
    }

    #[test]
    fn raw_sql_is_rejected() {
        assert!(build(json!("1=1")).is_err());
    }

    #[test]
    fn in_and_null_forms() {
        let (sql, _) = build(json!({"id": {"$in": []}})).unwrap();
        assert_eq!(sql.unwrap(), "1=0");
        let (sql, _) = build(json!({"due_date": {"$null": false}, "name": null})).unwrap();
        assert_eq!(sql.unwrap(), "\"due_date\" IS NOT NULL AND \"name\" IS NULL");
    }

    #[test]
    fn not_wraps_inner() {
        let (sql, _) = build(json!({"$not": {"name": "a"}})).unwrap();
        assert_eq!(sql.unwrap(), "NOT (\"name\" = $1::text)");
    }

    #[test]
    fn malformed_typed_values_are_rejected() {
        for data in [
            json!({"id": "abc"}),
            json!({"due_date": "31/12/2024"}),
            json!({"due_date": {"$between": ["2024-01-01", "2024-13-01"]}}),
            json!({"amount": {"$gt": "ten"}}),
            json!({"id": {"$in": [Uuid::new_v4().to_string(), "nope"]}}),
        ] {
            assert!(matches!(build(data), Err(FilterError::InvalidOperatorData(_))));
        }
        // pattern operators compare as text
        assert!(build(json!({"id": {"$ilike": "abc%"}})).is_ok());
        assert!(build(json!({"amount": "10.50", "due_date": "2024-02-29"})).is_ok());
    }

    #[test]
    fn computed_columns_filter_on_their_expression() {
        const STATUS: &[Column] = &[Column::computed("status", "text", "lower(status)")];
        let mut fw = FilterWhere::new(STATUS, vec![]);
        let sql = fw.build(&json!({"status": "overdue"})).unwrap().unwrap();
        assert_eq!(sql, "(lower(status)) = $1::text");
    }

    #[test]
    fn empty_filter_is_none() {
        let (sql, params) = build(json!({})).unwrap();
        assert!(sql.is_none());
        assert!(params.is_empty());
    }
}
