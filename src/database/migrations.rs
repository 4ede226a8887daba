//! Schema migrations.
//!
//! The platform registry (`public.tenants`, `public.users`, `public.refresh_tokens`) is
//! created by one idempotent script. Tenant schemas are built from an ordered list of
//! versioned templates; `tenants.schema_version` records how far each tenant has got.

use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

use crate::database::tenant_schema::TenantSchema;
use crate::database::DatabaseError;

const MAIN_SQL: &str = include_str!("../../migrations/main.sql");

/// A versioned tenant schema template.
#[derive(Debug, Clone, Copy)]
pub struct TenantMigration {
    pub version: i32,
    pub name: &'static str,
    pub sql: &'static str,
}

pub const TENANT_MIGRATIONS: &[TenantMigration] = &[
    TenantMigration {
        version: 1,
        name: "practice",
        sql: include_str!("../../migrations/tenant/0001_practice.sql"),
    },
    TenantMigration {
        version: 2,
        name: "finance",
        sql: include_str!("../../migrations/tenant/0002_finance.sql"),
    },
    TenantMigration {
        version: 3,
        name: "publications",
        sql: include_str!("../../migrations/tenant/0003_publications.sql"),
    },
];

/// Highest version in [`TENANT_MIGRATIONS`].
pub fn latest_tenant_version() -> i32 {
    TENANT_MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Migrations newer than `current`, in order.
pub fn pending_after(current: i32) -> impl Iterator<Item = &'static TenantMigration> {
    TENANT_MIGRATIONS.iter().filter(move |m| m.version > current)
}

/// Create or update the public registry tables.
pub async fn run_main(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::raw_sql(MAIN_SQL)
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::Migration(format!("main: {}", e)))?;
    info!("Main schema migration applied");
    Ok(())
}

/// Apply every migration newer than `current` to `schema` inside `tx`.
///
/// Returns the resulting version. The caller owns the transaction and is responsible
/// for persisting the version onto the tenant row before committing.
pub async fn apply_tenant_migrations(
    tx: &mut Transaction<'_, Postgres>,
    schema: &TenantSchema,
    current: i32,
) -> Result<i32, DatabaseError> {
    let mut version = current;
    for migration in pending_after(current) {
        let sql = schema.render(migration.sql);
        sqlx::Executor::execute(&mut **tx, sqlx::raw_sql(&sql)).await.map_err(|e| {
            DatabaseError::Migration(format!(
                "{} v{} ({}): {}",
                schema, migration.version, migration.name, e
            ))
        })?;
        info!("Applied tenant migration v{} ({}) to {}", migration.version, migration.name, schema);
        version = migration.version;
    }
    Ok(version)
}
