pub mod auth_service;
pub mod cash_flow_service;
pub mod client_service;
pub mod dashboard_service;
pub mod find_service;
pub mod invoice_service;
pub mod project_service;
pub mod publication_service;
pub mod task_service;
pub mod tenant_service;
pub mod user_service;
pub mod validation;

use crate::database::{column_list, Column, TenantSchema};

/// Render a tenant SQL template, expanding `{columns}` to the quoted column list
pub(crate) fn tenant_sql(schema: &TenantSchema, template: &str, columns: &[Column]) -> String {
    schema.render(&template.replace("{columns}", &column_list(columns)))
}

/// `%term%` for ILIKE with the wildcard characters of `term` escaped
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn expands_columns_and_schema() {
        let schema = TenantSchema::for_tenant(Uuid::nil());
        let sql = tenant_sql(
            &schema,
            "SELECT {columns} FROM ${schema}.clients",
            &[Column::new("id", "uuid"), Column::new("name", "text")],
        );
        assert_eq!(
            sql,
            "SELECT \"id\", \"name\" FROM \"tenant_00000000000000000000000000000000\".clients"
        );
    }

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(like_pattern(" silva "), "%silva%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
