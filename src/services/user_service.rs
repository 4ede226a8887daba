//! Accounts in `public.users`: lookup helpers and tenant team management.

use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::auth::{password, refresh};
use crate::database::models::tenant::Tenant;
use crate::database::models::user::User;
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::services::validation;
use crate::types::{AccountTier, Feature, Role};

const MAX_USER_NAME_LENGTH: usize = 120;

#[derive(Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl NewUser {
    /// Normalized copy with name, email and password strength checked
    pub fn validated(&self) -> Result<NewUser, ApiError> {
        password::validate_password_strength(&self.password)?;
        Ok(NewUser {
            name: validation::required("name", &self.name, MAX_USER_NAME_LENGTH)?,
            email: validation::email("email", &self.email)?,
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTeamUser {
    #[serde(flatten)]
    pub user: NewUser,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Member
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Public projection of a user
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            tenant_id: user.tenant_id,
            email: user.email,
            name: user.name,
            role: user.role,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

pub async fn ensure_email_available<'e, E>(executor: E, email: &str) -> Result<(), ApiError>
where
    E: PgExecutor<'e>,
{
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM public.users WHERE lower(email) = lower($1))")
        .bind(email)
        .fetch_one(executor)
        .await?;
    if taken {
        return Err(ApiError::conflict("Email is already registered"));
    }
    Ok(())
}

pub async fn insert_user<'e, E>(
    executor: E,
    tenant_id: Option<Uuid>,
    user: &NewUser,
    password_hash: &str,
    role: Role,
) -> Result<User, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let user = sqlx::query_as(&format!(
        "INSERT INTO public.users (id, tenant_id, email, name, password_hash, role) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
        User::COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(executor)
    .await?;
    Ok(user)
}

/// Create a platform root account (no tenant)
pub async fn create_root(pool: &PgPool, request: &NewUser) -> Result<User, ApiError> {
    let user = request.validated()?;
    let password_hash = password::hash_password(&user.password)?;

    let mut tx = pool.begin().await?;
    ensure_email_available(&mut *tx, &user.email).await?;
    let created = insert_user(&mut *tx, None, &user, &password_hash, Role::Root).await?;
    tx.commit().await?;

    info!("Created root user {} ({})", created.id, created.email);
    Ok(created)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, DatabaseError> {
    let user = sqlx::query_as(&format!(
        "SELECT {} FROM public.users WHERE lower(email) = lower($1)",
        User::COLUMNS
    ))
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, DatabaseError> {
    let user = sqlx::query_as(&format!("SELECT {} FROM public.users WHERE id = $1", User::COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn count_active<'e, E>(executor: E, tenant_id: Uuid) -> Result<i64, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM public.users WHERE tenant_id = $1 AND is_active")
        .bind(tenant_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// True when `user_id` is an active user of `tenant_id`
pub async fn belongs_to_tenant(pool: &PgPool, tenant_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
    let exists = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM public.users WHERE id = $1 AND tenant_id = $2 AND is_active)",
    )
    .bind(user_id)
    .bind(tenant_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Reject a user reference that does not point into the same tenant
pub async fn ensure_tenant_user(
    pool: &PgPool,
    tenant_id: Uuid,
    field: &str,
    user_id: Option<Uuid>,
) -> Result<(), ApiError> {
    if let Some(id) = user_id {
        if !belongs_to_tenant(pool, tenant_id, id).await? {
            return Err(ApiError::invalid_field(field, "User not found in this firm"));
        }
    }
    Ok(())
}

pub async fn touch_last_login(pool: &PgPool, user_id: Uuid) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE public.users SET last_login_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Team management inside one tenant
pub struct TeamService<'a> {
    pool: &'a PgPool,
    tenant: &'a Tenant,
}

impl<'a> TeamService<'a> {
    pub fn new(pool: &'a PgPool, tenant: &'a Tenant) -> Self {
        Self { pool, tenant }
    }

    pub async fn list(&self) -> Result<Vec<UserSummary>, ApiError> {
        let users: Vec<User> = sqlx::query_as(&format!(
            "SELECT {} FROM public.users WHERE tenant_id = $1 ORDER BY name",
            User::COLUMNS
        ))
        .bind(self.tenant.id)
        .fetch_all(self.pool)
        .await?;
        Ok(users.into_iter().map(UserSummary::from).collect())
    }

    pub async fn create(&self, request: NewTeamUser) -> Result<UserSummary, ApiError> {
        if request.role == Role::Root {
            return Err(ApiError::invalid_field("role", "Role must be admin or member"));
        }
        if request.role == Role::Admin && !self.tenant.tier.allows(Feature::TeamManagement) {
            return Err(ApiError::plan_upgrade_required(Feature::TeamManagement));
        }
        let user = request.user.validated()?;
        let password_hash = password::hash_password(&user.password)?;

        let mut tx = self.pool.begin().await?;
        self.lock_and_check_capacity(&mut *tx).await?;
        ensure_email_available(&mut *tx, &user.email).await?;
        let created = insert_user(&mut *tx, Some(self.tenant.id), &user, &password_hash, request.role).await?;
        tx.commit().await?;

        info!("Tenant {} added user {} as {}", self.tenant.id, created.id, created.role);
        Ok(created.into())
    }

    pub async fn update(&self, actor: Uuid, user_id: Uuid, update: UserUpdate) -> Result<UserSummary, ApiError> {
        if update.role == Some(Role::Root) {
            return Err(ApiError::invalid_field("role", "Role must be admin or member"));
        }
        if update.role.is_some() && !self.tenant.tier.allows(Feature::TeamManagement) {
            return Err(ApiError::plan_upgrade_required(Feature::TeamManagement));
        }
        if actor == user_id && (update.is_active == Some(false) || update.role == Some(Role::Member)) {
            return Err(ApiError::conflict("You cannot deactivate or demote yourself"));
        }

        let mut tx = self.pool.begin().await?;
        let current = self.fetch_member(&mut *tx, user_id).await?;

        if update.is_active == Some(true) && !current.is_active {
            self.lock_and_check_capacity(&mut *tx).await?;
        }

        let updated: User = sqlx::query_as(&format!(
            "UPDATE public.users SET role = COALESCE($3, role), is_active = COALESCE($4, is_active), updated_at = NOW() \
             WHERE id = $1 AND tenant_id = $2 RETURNING {}",
            User::COLUMNS
        ))
        .bind(user_id)
        .bind(self.tenant.id)
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.is_active)
        .fetch_one(&mut *tx)
        .await?;

        if current.is_active && !updated.is_active {
            refresh::revoke_all(&mut *tx, updated.id).await?;
        }
        tx.commit().await?;
        Ok(updated.into())
    }

    pub async fn deactivate(&self, actor: Uuid, user_id: Uuid) -> Result<UserSummary, ApiError> {
        self.update(
            actor,
            user_id,
            UserUpdate {
                role: None,
                is_active: Some(false),
            },
        )
        .await
    }

    async fn fetch_member(&self, tx: &mut sqlx::PgConnection, user_id: Uuid) -> Result<User, ApiError> {
        sqlx::query_as(&format!(
            "SELECT {} FROM public.users WHERE id = $1 AND tenant_id = $2",
            User::COLUMNS
        ))
        .bind(user_id)
        .bind(self.tenant.id)
        .fetch_optional(tx)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
    }

    /// Serializes capacity checks per tenant by locking its registry row.
    /// The limit comes from the tier read under the lock, not the request's snapshot.
    async fn lock_and_check_capacity(&self, tx: &mut sqlx::PgConnection) -> Result<(), ApiError> {
        let tier: String = sqlx::query_scalar("SELECT tier FROM public.tenants WHERE id = $1 FOR UPDATE")
            .bind(self.tenant.id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Tenant not found"))?;
        let tier: AccountTier = tier
            .parse()
            .map_err(|e| ApiError::internal_server_error(format!("Stored tier is invalid: {}", e)))?;

        check_capacity(tier, count_active(&mut *tx, self.tenant.id).await?)
    }
}

/// `active` counts the tenant's active users before the one being added or reactivated
pub fn check_capacity(tier: AccountTier, active: i64) -> Result<(), ApiError> {
    if let Some(max_users) = tier.max_users() {
        if active >= max_users {
            let required = tier.upgrade_for_users().unwrap_or(AccountTier::Gerencial);
            return Err(ApiError::UserLimitReached { max_users, required });
        }
    }
    Ok(())
}
