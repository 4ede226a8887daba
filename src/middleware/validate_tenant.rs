use axum::{extract::Request, middleware::Next, response::Response};
use sqlx::PgPool;

use super::auth::AuthUser;
use crate::database::models::tenant::Tenant;
use crate::database::models::user::User;
use crate::database::{DatabaseManager, TenantSchema};
use crate::error::ApiError;
use crate::services::user_service;
use crate::types::Feature;

/// Per-request tenant binding. The schema comes from the tenant registry row of the
/// authenticated user, never from request input.
#[derive(Clone, Debug)]
pub struct TenantContext {
    pub tenant: Tenant,
    pub schema: TenantSchema,
    pub user: User,
    pub pool: PgPool,
}

impl TenantContext {
    /// Fails with 402 when the firm's tier does not include `feature`
    pub fn require(&self, feature: Feature) -> Result<(), ApiError> {
        if self.tenant.tier.allows(feature) {
            Ok(())
        } else {
            Err(ApiError::plan_upgrade_required(feature))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.user.role.is_tenant_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Firm admin role required"))
        }
    }

    pub fn allows(&self, feature: Feature) -> bool {
        self.tenant.tier.allows(feature)
    }

    pub fn user_id(&self) -> uuid::Uuid {
        self.user.id
    }
}

/// Resolves the caller's tenant, requiring both the tenant and the user to be active
pub async fn validate_tenant_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before tenant validation"))?;

    let tenant_id = auth_user
        .tenant_id
        .ok_or_else(|| ApiError::forbidden("Platform accounts have no firm context"))?;

    let pool = DatabaseManager::pool().await?;

    let user = user_service::find_by_id(&pool, auth_user.user_id)
        .await?
        .filter(|u| u.is_active && u.tenant_id == Some(tenant_id))
        .ok_or_else(|| {
            tracing::warn!("Tenant validation failed: user {} is inactive or moved", auth_user.user_id);
            ApiError::forbidden("Account is inactive")
        })?;

    let tenant: Tenant = sqlx::query_as(&format!("SELECT {} FROM public.tenants WHERE id = $1", Tenant::COLUMNS))
        .bind(tenant_id)
        .fetch_optional(&pool)
        .await?
        .filter(Tenant::is_usable)
        .ok_or_else(|| {
            tracing::warn!("Tenant validation failed: tenant {} not found or inactive", tenant_id);
            ApiError::forbidden("Firm account is not active")
        })?;

    let schema = tenant.schema()?;

    request.extensions_mut().insert(TenantContext {
        tenant,
        schema,
        user,
        pool,
    });
    Ok(next.run(request).await)
}
