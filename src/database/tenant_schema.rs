//! Tenant schema naming and SQL rendering.
//!
//! Every tenant owns one PostgreSQL schema named `tenant_<32 hex>`. Tenant-scoped
//! SQL is written once against a `${schema}` placeholder and rendered per request
//! with the schema of the authenticated tenant. The schema name is the only text
//! ever spliced into SQL, and only after it has passed [`TenantSchema::parse`].

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Placeholder rewritten by [`TenantSchema::render`].
pub const SCHEMA_PLACEHOLDER: &str = "${schema}";

const PREFIX: &str = "tenant_";
const HEX_LEN: usize = 32;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema name must start with 'tenant_': {0}")]
    MissingPrefix(String),

    #[error("schema name must end in 32 lowercase hex characters: {0}")]
    InvalidSuffix(String),
}

/// A validated tenant schema name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantSchema(String);

impl TenantSchema {
    /// Schema owned by the tenant with the given id.
    pub fn for_tenant(tenant_id: Uuid) -> Self {
        Self(format!("{}{}", PREFIX, tenant_id.simple()))
    }

    /// Validate a stored schema name.
    pub fn parse(name: &str) -> Result<Self, SchemaError> {
        let suffix = name
            .strip_prefix(PREFIX)
            .ok_or_else(|| SchemaError::MissingPrefix(name.to_string()))?;

        let valid = suffix.len() == HEX_LEN
            && suffix.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(SchemaError::InvalidSuffix(name.to_string()));
        }

        Ok(Self(name.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Double-quoted identifier, safe to place in SQL text.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Rewrite every `${schema}` in `sql` to this schema's quoted identifier.
    pub fn render(&self, sql: &str) -> String {
        debug_assert!(
            sql.contains(SCHEMA_PLACEHOLDER),
            "tenant SQL without a schema placeholder: {sql}"
        );
        sql.replace(SCHEMA_PLACEHOLDER, &self.quoted())
    }

    /// Schema-qualified table reference.
    pub fn table(&self, table: &str) -> String {
        format!("{}.\"{}\"", self.quoted(), table)
    }
}

impl fmt::Display for TenantSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_name_from_tenant_id() {
        let id = Uuid::parse_str("0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9").unwrap();
        let schema = TenantSchema::for_tenant(id);
        assert_eq!(schema.name(), "tenant_0a1b2c3d4e5f60718293a4b5c6d7e8f9");
        assert_eq!(TenantSchema::parse(schema.name()).unwrap(), schema);
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(matches!(TenantSchema::parse("public"), Err(SchemaError::MissingPrefix(_))));
        assert!(TenantSchema::parse("tenant_abc").is_err());
        assert!(TenantSchema::parse("tenant_0A1B2C3D4E5F60718293A4B5C6D7E8F9").is_err());
        assert!(TenantSchema::parse("tenant_0a1b2c3d4e5f60718293a4b5c6d7e8f\"").is_err());
        assert!(TenantSchema::parse("tenant_0a1b2c3d4e5f60718293a4b5c6d7e8f9; DROP SCHEMA public").is_err());
        assert!(TenantSchema::parse("tenant_0a1b2c3d-4e5f-6071-8293-a4b5c6d7").is_err());
    }

    #[test]
    fn renders_every_placeholder() {
        let schema = TenantSchema::for_tenant(Uuid::nil());
        let sql = schema.render("SELECT * FROM ${schema}.tasks t JOIN ${schema}.projects p ON p.id = t.project_id");
        assert!(!sql.contains(SCHEMA_PLACEHOLDER));
        assert_eq!(sql.matches("\"tenant_00000000000000000000000000000000\"").count(), 2);
    }

    #[test]
    fn different_tenants_render_different_sql() {
        let a = TenantSchema::for_tenant(Uuid::new_v4());
        let b = TenantSchema::for_tenant(Uuid::new_v4());
        let sql = "SELECT id FROM ${schema}.clients";
        assert_ne!(a.render(sql), b.render(sql));
        assert!(a.render(sql).contains(a.name()));
        assert!(!a.render(sql).contains(b.name()));
    }

    #[test]
    fn qualifies_tables() {
        let schema = TenantSchema::for_tenant(Uuid::nil());
        assert_eq!(
            schema.table("clients"),
            "\"tenant_00000000000000000000000000000000\".\"clients\""
        );
    }
}
