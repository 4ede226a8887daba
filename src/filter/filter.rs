use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOrderInfo, SqlResult};
use crate::database::{column_list, Column};

/// A SELECT over one tenant table built from [`FilterData`].
///
/// `table` must already be schema-qualified (see `TenantSchema::table`). Scope
/// conditions are mandatory equality predicates that the caller cannot override;
/// they are ANDed in front of whatever the request asked for.
pub struct Filter {
    table: String,
    columns: &'static [Column],
    scope: Vec<(Column, String)>,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: i64,
    offset: i64,
}

impl Filter {
    pub fn new(table: impl Into<String>, columns: &'static [Column]) -> Self {
        let filter = &crate::config::config().filter;
        Self {
            table: table.into(),
            columns,
            scope: vec![],
            where_data: None,
            order_data: vec![],
            limit: filter.default_limit,
            offset: 0,
        }
    }

    /// Add a mandatory `column = value` predicate
    pub fn scope(mut self, column: &str, value: impl Into<String>) -> Result<Self, FilterError> {
        let column = *self
            .columns
            .iter()
            .find(|c| c.name == column)
            .ok_or_else(|| FilterError::InvalidColumn(column.to_string()))?;
        self.scope.push((column, value.into()));
        Ok(self)
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause {
            self.where_clause(where_clause)?;
        }
        if let Some(order) = data.order {
            self.order(order)?;
        }
        self.limit(data.limit, data.offset)?;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec, self.columns)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: Option<i64>, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        let config = &crate::config::config().filter;
        if let Some(l) = limit {
            if l < 0 {
                return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
            }
            // Apply max limit from config
            self.limit = if l > config.max_limit {
                if config.debug_logging {
                    tracing::warn!("Limit {} exceeds max {}, capping to max", l, config.max_limit);
                }
                config.max_limit
            } else {
                l
            };
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
            self.offset = off;
        }
        Ok(self)
    }

    fn where_sql(&self) -> Result<(Option<String>, Vec<String>), FilterError> {
        let mut clauses = Vec::new();
        let mut params = Vec::new();
        for (column, value) in &self.scope {
            params.push(value.clone());
            clauses.push(format!("{} = ${}::{}", column.sql(), params.len(), column.pg_type));
        }

        let mut fw = FilterWhere::new(self.columns, params);
        if let Some(ref where_data) = self.where_data {
            if let Some(sql) = fw.build(where_data)? {
                clauses.push(format!("({})", sql));
            }
        }
        let params = fw.into_params();

        let clause = if clauses.is_empty() { None } else { Some(clauses.join(" AND ")) };
        Ok((clause, params))
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = self.where_sql()?;
        let query = [
            format!("SELECT {}", column_list(self.columns)),
            format!("FROM {}", self.table),
            where_clause.map(|w| format!("WHERE {}", w)).unwrap_or_default(),
            FilterOrder::generate(&self.order_data),
            format!("LIMIT {} OFFSET {}", self.limit, self.offset),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = self.where_sql()?;
        let query = match where_clause {
            Some(w) => format!("SELECT COUNT(*) AS count FROM {} WHERE {}", self.table, w),
            None => format!("SELECT COUNT(*) AS count FROM {}", self.table),
        };
        Ok(SqlResult { query, params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static COLUMNS: &[Column] = &[
        Column::new("id", "uuid"),
        Column::new("user_id", "uuid"),
        Column::new("title", "text"),
    ];

    #[test]
    fn scope_precedes_request_conditions() {
        let mut filter = Filter::new("\"tenant_x\".\"publications\"", COLUMNS)
            .scope("user_id", "11111111-1111-1111-1111-111111111111")
            .unwrap();
        filter
            .assign(FilterData {
                where_clause: Some(json!({"$or": [{"user_id": "22222222-2222-2222-2222-222222222222"}, {"title": "x"}]})),
                order: Some(json!("title")),
                limit: Some(10),
                offset: None,
            })
            .unwrap();
        let sql = filter.to_sql().unwrap();
        assert!(sql.query.contains(
            "WHERE \"user_id\" = $1::uuid AND (((\"user_id\" = $2::uuid) OR (\"title\" = $3::text)))"
        ));
        assert!(sql.query.ends_with("ORDER BY \"title\" ASC LIMIT 10 OFFSET 0"));
        assert_eq!(sql.params[0], "11111111-1111-1111-1111-111111111111");
    }

    #[test]
    fn caps_limit_and_rejects_negative() {
        let mut filter = Filter::new("t", COLUMNS);
        filter.limit(Some(i64::MAX), Some(5)).unwrap();
        let sql = filter.to_sql().unwrap();
        let max = crate::config::config().filter.max_limit;
        assert!(sql.query.ends_with(&format!("LIMIT {} OFFSET 5", max)));
        assert!(filter.limit(Some(-1), None).is_err());
    }

    #[test]
    fn count_uses_same_predicates() {
        let filter = Filter::new("t", COLUMNS).scope("user_id", "u").unwrap();
        let sql = filter.to_count_sql().unwrap();
        assert_eq!(sql.query, "SELECT COUNT(*) AS count FROM t WHERE \"user_id\" = $1::uuid");
    }

    #[test]
    fn scope_requires_known_column() {
        assert!(Filter::new("t", COLUMNS).scope("tenant_id", "x").is_err());
    }
}
