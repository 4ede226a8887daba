//! Tenant registry and schema lifecycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::{password, AuthError};
use crate::database::migrations::{self, latest_tenant_version};
use crate::database::models::tenant::Tenant;
use crate::database::models::user::User;
use crate::database::{DatabaseError, DatabaseManager, TenantSchema};
use crate::error::ApiError;
use crate::services::user_service::{self, NewUser};
use crate::types::{AccountTier, Role};

/// Tables whose row counts are reported by [`TenantService::health`]
const HEALTH_TABLES: &[&str] = &[
    "clients",
    "projects",
    "tasks",
    "invoices",
    "invoice_items",
    "cash_flow_entries",
    "publications",
];

const MAX_NAME_LENGTH: usize = 120;

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("Tenant already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid tenant name: {0}")]
    InvalidName(String),
    #[error("Tenant not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(ApiError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for TenantError {
    fn from(err: sqlx::Error) -> Self {
        TenantError::Database(DatabaseError::Sqlx(err))
    }
}

impl From<ApiError> for TenantError {
    fn from(err: ApiError) -> Self {
        TenantError::Validation(err)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTenant {
    pub name: String,
    pub tier: AccountTier,
    pub admin: NewUser,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub tier: Option<AccountTier>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantDetails {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub active_users: i64,
    pub features: Vec<crate::types::Feature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantHealth {
    pub tenant_id: Uuid,
    pub schema: String,
    pub schema_exists: bool,
    pub schema_version: i32,
    pub latest_version: i32,
    pub up_to_date: bool,
    pub tables: BTreeMap<String, i64>,
    pub healthy: bool,
}

pub struct TenantService {
    pool: PgPool,
}

impl TenantService {
    pub async fn new() -> Result<Self, TenantError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the registry row, schema, tenant tables and first admin in one transaction.
    pub async fn provision(&self, request: NewTenant) -> Result<(Tenant, User), TenantError> {
        let name = validate_tenant_name(&request.name)?;
        let admin = request.admin.validated()?;
        let password_hash = password::hash_password(&admin.password)?;

        let mut tx = self.pool.begin().await?;

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM public.tenants WHERE lower(name) = lower($1) AND trashed_at IS NULL)",
        )
        .bind(&name)
        .fetch_one(&mut *tx)
        .await?;
        if taken {
            return Err(TenantError::AlreadyExists(name));
        }
        user_service::ensure_email_available(&mut *tx, &admin.email).await?;

        let tenant_id = Uuid::new_v4();
        let schema = TenantSchema::for_tenant(tenant_id);

        sqlx::query(
            "INSERT INTO public.tenants (id, name, schema_name, tier, schema_version) VALUES ($1, $2, $3, $4, 0)",
        )
        .bind(tenant_id)
        .bind(&name)
        .bind(schema.name())
        .bind(request.tier.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(&format!("CREATE SCHEMA {}", schema.quoted())))
            .await?;

        let version = migrations::apply_tenant_migrations(&mut tx, &schema, 0).await?;

        let tenant: Tenant = sqlx::query_as(&format!(
            "UPDATE public.tenants SET schema_version = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            Tenant::COLUMNS
        ))
        .bind(tenant_id)
        .bind(version)
        .fetch_one(&mut *tx)
        .await?;

        let user = user_service::insert_user(&mut *tx, Some(tenant_id), &admin, &password_hash, Role::Admin).await?;

        tx.commit().await?;

        info!(
            "Provisioned tenant '{}' ({}) on tier {} with schema {} v{}",
            tenant.name, tenant.id, tenant.tier, schema, version
        );
        Ok((tenant, user))
    }

    /// Apply pending tenant migrations. Returns how many were applied.
    pub async fn migrate(&self, tenant_id: Uuid) -> Result<usize, TenantError> {
        let mut tx = self.pool.begin().await?;

        let tenant: Tenant = sqlx::query_as(&format!(
            "SELECT {} FROM public.tenants WHERE id = $1 FOR UPDATE",
            Tenant::COLUMNS
        ))
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| TenantError::NotFound(tenant_id.to_string()))?;

        let schema = tenant.schema().map_err(DatabaseError::from)?;
        let pending = migrations::pending_after(tenant.schema_version).count();
        if pending == 0 {
            return Ok(0);
        }

        let version = migrations::apply_tenant_migrations(&mut tx, &schema, tenant.schema_version).await?;
        sqlx::query("UPDATE public.tenants SET schema_version = $2, updated_at = NOW() WHERE id = $1")
            .bind(tenant_id)
            .bind(version)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Migrated tenant {} from v{} to v{}", tenant.id, tenant.schema_version, version);
        Ok(pending)
    }

    pub async fn health(&self, tenant_id: Uuid) -> Result<TenantHealth, TenantError> {
        let tenant = self.get(tenant_id).await?;
        let schema = tenant.schema().map_err(DatabaseError::from)?;

        let schema_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)",
        )
        .bind(schema.name())
        .fetch_one(&self.pool)
        .await?;

        let mut tables = BTreeMap::new();
        if schema_exists {
            let present: Vec<String> = sqlx::query_scalar(
                "SELECT table_name::text FROM information_schema.tables WHERE table_schema = $1",
            )
            .bind(schema.name())
            .fetch_all(&self.pool)
            .await?;

            for table in HEALTH_TABLES.iter().filter(|t| present.iter().any(|p| p == *t)) {
                let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", schema.table(table)))
                    .fetch_one(&self.pool)
                    .await?;
                tables.insert(table.to_string(), count);
            }
        }

        let latest = latest_tenant_version();
        let up_to_date = tenant.schema_version == latest;
        Ok(TenantHealth {
            tenant_id: tenant.id,
            schema: schema.name().to_string(),
            schema_exists,
            schema_version: tenant.schema_version,
            latest_version: latest,
            up_to_date,
            healthy: schema_exists && up_to_date && tables.len() == HEALTH_TABLES.len(),
            tables,
        })
    }

    pub async fn list(&self, include_trashed: bool) -> Result<Vec<Tenant>, TenantError> {
        let tenants = sqlx::query_as(&format!(
            "SELECT {} FROM public.tenants WHERE ($1 OR trashed_at IS NULL) ORDER BY created_at",
            Tenant::COLUMNS
        ))
        .bind(include_trashed)
        .fetch_all(&self.pool)
        .await?;
        Ok(tenants)
    }

    /// Any tenant row, trashed or not
    pub async fn get(&self, tenant_id: Uuid) -> Result<Tenant, TenantError> {
        sqlx::query_as(&format!("SELECT {} FROM public.tenants WHERE id = $1", Tenant::COLUMNS))
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| TenantError::NotFound(tenant_id.to_string()))
    }

    pub async fn details(&self, tenant_id: Uuid) -> Result<TenantDetails, TenantError> {
        let tenant = self.get(tenant_id).await?;
        let active_users = user_service::count_active(&self.pool, tenant.id).await?;
        Ok(TenantDetails {
            features: tenant.tier.features(),
            tenant,
            active_users,
        })
    }

    pub async fn update(&self, tenant_id: Uuid, update: TenantUpdate) -> Result<Tenant, TenantError> {
        let name = update.name.as_deref().map(validate_tenant_name).transpose()?;
        let before = self.get(tenant_id).await?;

        let tenant: Tenant = sqlx::query_as(&format!(
            r#"
            UPDATE public.tenants
            SET name = COALESCE($2, name),
                tier = COALESCE($3, tier),
                is_active = COALESCE($4, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            Tenant::COLUMNS
        ))
        .bind(tenant_id)
        .bind(name)
        .bind(update.tier.map(|t| t.as_str()))
        .bind(update.is_active)
        .fetch_one(&self.pool)
        .await?;

        if before.tier != tenant.tier {
            info!("Tenant {} tier changed from {} to {}", tenant.id, before.tier, tenant.tier);
        }
        if before.is_active != tenant.is_active {
            info!("Tenant {} is_active set to {}", tenant.id, tenant.is_active);
        }
        Ok(tenant)
    }

    /// Soft delete: the schema and its records are kept.
    pub async fn trash(&self, tenant_id: Uuid) -> Result<Tenant, TenantError> {
        let tenant: Tenant = sqlx::query_as(&format!(
            "UPDATE public.tenants SET trashed_at = NOW(), is_active = FALSE, updated_at = NOW() \
             WHERE id = $1 AND trashed_at IS NULL RETURNING {}",
            Tenant::COLUMNS
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| TenantError::NotFound(tenant_id.to_string()))?;
        info!("Trashed tenant '{}' ({})", tenant.name, tenant.id);
        Ok(tenant)
    }

    pub async fn restore(&self, tenant_id: Uuid) -> Result<Tenant, TenantError> {
        let tenant: Tenant = sqlx::query_as(&format!(
            "UPDATE public.tenants SET trashed_at = NULL, is_active = TRUE, updated_at = NOW() \
             WHERE id = $1 AND trashed_at IS NOT NULL RETURNING {}",
            Tenant::COLUMNS
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| TenantError::NotFound(tenant_id.to_string()))?;
        info!("Restored tenant '{}' ({})", tenant.name, tenant.id);
        Ok(tenant)
    }
}

/// Validate tenant name follows rules
fn validate_tenant_name(name: &str) -> Result<String, TenantError> {
    let name = name.trim();
    if name.chars().count() < 2 {
        return Err(TenantError::InvalidName("Tenant name must be at least 2 characters".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(TenantError::InvalidName(format!(
            "Tenant name must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(TenantError::InvalidName("Tenant name cannot contain control characters".to_string()));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_names() {
        assert_eq!(validate_tenant_name("  Silva & Souza Advogados ").unwrap(), "Silva & Souza Advogados");
        assert!(matches!(validate_tenant_name("a"), Err(TenantError::InvalidName(_))));
        assert!(validate_tenant_name(&"x".repeat(121)).is_err());
        assert!(validate_tenant_name("bad\nname").is_err());
    }

    #[test]
    fn errors_map_to_http() {
        let err: ApiError = TenantError::AlreadyExists("Silva".into()).into();
        assert_eq!(err.status_code(), 409);
        let err: ApiError = TenantError::NotFound(Uuid::nil().to_string()).into();
        assert_eq!(err.status_code(), 404);
        let err: ApiError = TenantError::InvalidName("short".into()).into();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn health_covers_every_tenant_table() {
        for migration in migrations::TENANT_MIGRATIONS {
            for line in migration.sql.lines().filter(|l| l.starts_with("CREATE TABLE")) {
                let table = line
                    .trim_start_matches("CREATE TABLE ${schema}.")
                    .split_whitespace()
                    .next()
                    .unwrap_or_default();
                assert!(HEALTH_TABLES.contains(&table), "{} missing from health report", table);
            }
        }
    }
}
