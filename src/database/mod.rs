pub mod manager;
pub mod migrations;
pub mod models;
pub mod tenant_schema;

pub use manager::{DatabaseError, DatabaseManager};
pub use tenant_schema::{SchemaError, TenantSchema};

/// A tenant table column and its PostgreSQL type, used to cast bound filter values.
///
/// A computed column reads through an SQL expression over the row instead of a stored
/// column; it is selected under its own name and filters compare against the expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub pg_type: &'static str,
    pub expr: Option<&'static str>,
}

impl Column {
    pub const fn new(name: &'static str, pg_type: &'static str) -> Self {
        Self { name, pg_type, expr: None }
    }

    pub const fn computed(name: &'static str, pg_type: &'static str, expr: &'static str) -> Self {
        Self { name, pg_type, expr: Some(expr) }
    }

    /// The column as it appears in a predicate
    pub fn sql(&self) -> String {
        match self.expr {
            Some(expr) => format!("({})", expr),
            None => format!("\"{}\"", self.name),
        }
    }
}

/// Comma-separated, quoted column list for SELECT / RETURNING clauses
pub fn column_list(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| match c.expr {
            Some(expr) => format!("{} AS \"{}\"", expr, c.name),
            None => format!("\"{}\"", c.name),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
