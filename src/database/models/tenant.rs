use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::tenant_schema::{SchemaError, TenantSchema};
use crate::types::AccountTier;

/// Row of `public.tenants`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub schema_name: String,
    #[sqlx(try_from = "String")]
    pub tier: AccountTier,
    pub is_active: bool,
    pub schema_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub trashed_at: Option<DateTime<Utc>>,
}

impl Tenant {
    pub const COLUMNS: &'static str =
        "id, name, schema_name, tier, is_active, schema_version, created_at, updated_at, trashed_at";

    /// Validated schema of this tenant
    pub fn schema(&self) -> Result<TenantSchema, SchemaError> {
        TenantSchema::parse(&self.schema_name)
    }

    pub fn is_usable(&self) -> bool {
        self.is_active && self.trashed_at.is_none()
    }
}
