//! Login, token refresh and self-service firm signup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{self, password, refresh, AuthError, Claims};
use crate::config::{self, TenancyConfig};
use crate::database::models::tenant::Tenant;
use crate::database::models::user::User;
use crate::error::ApiError;
use crate::services::tenant_service::{NewTenant, TenantService};
use crate::services::user_service::{self, NewUser, UserSummary};
use crate::types::{AccountTier, Feature};

#[derive(Debug, Clone, Serialize)]
pub struct TenantSummary {
    pub id: Uuid,
    pub name: String,
    pub tier: AccountTier,
    pub features: Vec<Feature>,
}

impl From<&Tenant> for TenantSummary {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name.clone(),
            tier: tenant.tier,
            features: tenant.tier.features(),
        }
    }
}

/// Tokens handed out on login, refresh and signup
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
    pub user: UserSummary,
    pub tenant: Option<TenantSummary>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub firm_name: String,
    pub tier: Option<AccountTier>,
    #[serde(flatten)]
    pub admin: NewUser,
}

pub struct AuthService {
    pool: PgPool,
}

impl AuthService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession, ApiError> {
        let Some(user) = user_service::find_by_email(&self.pool, &request.email).await? else {
            // burn the same time as a real verification
            let _ = password::verify_password(&request.password, password::dummy_hash());
            warn!("Login rejected: unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };

        if !password::verify_password(&request.password, &user.password_hash)? {
            warn!("Login rejected: bad password for user {}", user.id);
            return Err(AuthError::InvalidCredentials.into());
        }

        let tenant = self.ensure_can_sign_in(&user).await?;
        let session = self.issue_session(user, tenant).await?;
        user_service::touch_last_login(&self.pool, session.user.id).await?;
        info!("User {} signed in", session.user.id);
        Ok(session)
    }

    /// Exchange a refresh token for a new session; the presented token is revoked.
    pub async fn refresh(&self, token: &str) -> Result<AuthSession, ApiError> {
        let user_id = refresh::consume(&self.pool, token)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

        let user = user_service::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

        let tenant = self.ensure_can_sign_in(&user).await?;
        self.issue_session(user, tenant).await
    }

    pub async fn logout(&self, user_id: Uuid, token: &str) -> Result<bool, ApiError> {
        Ok(refresh::revoke(&self.pool, user_id, token).await?)
    }

    /// Public signup: provisions a new firm with the caller as its first admin.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthSession, ApiError> {
        let tenancy = &config::config().tenancy;
        if !tenancy.allow_public_signup {
            return Err(ApiError::forbidden("Public signup is disabled"));
        }

        let service = TenantService::with_pool(self.pool.clone());
        let (tenant, user) = service
            .provision(NewTenant {
                name: request.firm_name,
                tier: signup_tier(request.tier, tenancy)?,
                admin: request.admin,
            })
            .await?;

        self.issue_session(user, Some(tenant)).await
    }

    async fn ensure_can_sign_in(&self, user: &User) -> Result<Option<Tenant>, ApiError> {
        if !user.is_active {
            warn!("Login rejected: user {} is inactive", user.id);
            return Err(ApiError::forbidden("Account is inactive"));
        }
        let Some(tenant_id) = user.tenant_id else {
            return Ok(None);
        };
        let tenant = TenantService::with_pool(self.pool.clone()).get(tenant_id).await?;
        if !tenant.is_usable() {
            warn!("Login rejected: tenant {} is inactive", tenant.id);
            return Err(ApiError::forbidden("Firm account is inactive"));
        }
        Ok(Some(tenant))
    }

    async fn issue_session(&self, user: User, tenant: Option<Tenant>) -> Result<AuthSession, ApiError> {
        let tier = tenant.as_ref().map(|t| t.tier);
        let access_token = auth::generate_jwt(&Claims::for_user(&user, tier))?;
        let refresh = refresh::issue(&self.pool, user.id).await?;

        Ok(AuthSession {
            access_token,
            token_type: "Bearer",
            expires_in: auth::access_token_ttl_secs(),
            refresh_token: refresh.token,
            refresh_expires_at: refresh.expires_at,
            tenant: tenant.as_ref().map(TenantSummary::from),
            user: user.into(),
        })
    }
}

/// Requested tier for a public signup, capped at `max_signup_tier`
fn signup_tier(requested: Option<AccountTier>, tenancy: &TenancyConfig) -> Result<AccountTier, ApiError> {
    let tier = requested.unwrap_or(tenancy.default_tier);
    if !tenancy.max_signup_tier.covers(tier) {
        return Err(ApiError::invalid_field(
            "tier",
            format!("The {} tier is not available for self-service signup", tier),
        ));
    }
    Ok(tier)
}
