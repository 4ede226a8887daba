//! Opaque refresh tokens. Only the SHA-256 of a token is stored.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config;
use crate::database::DatabaseError;

/// A freshly minted token; `token` is shown to the client once
pub struct IssuedRefreshToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn generate_token() -> String {
    // two v4 uuids: 244 random bits
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub async fn issue<'e, E>(executor: E, user_id: Uuid) -> Result<IssuedRefreshToken, DatabaseError>
where
    E: sqlx::PgExecutor<'e>,
{
    let token = generate_token();
    let expires_at = Utc::now() + Duration::days(config::config().security.refresh_token_days as i64);

    sqlx::query(
        "INSERT INTO public.refresh_tokens (id, user_id, token_hash, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(hash_token(&token))
    .bind(expires_at)
    .execute(executor)
    .await?;

    Ok(IssuedRefreshToken { token, expires_at })
}

/// Revoke a live token and return its owner, or `None` if unknown, expired or already revoked
pub async fn consume(pool: &PgPool, token: &str) -> Result<Option<Uuid>, DatabaseError> {
    let user_id: Option<Uuid> = sqlx::query_scalar(
        r#"
        UPDATE public.refresh_tokens
        SET revoked_at = NOW()
        WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > NOW()
        RETURNING user_id
        "#,
    )
    .bind(hash_token(token))
    .fetch_optional(pool)
    .await?;
    Ok(user_id)
}

/// Revoke a token only if it belongs to `user_id`
pub async fn revoke(pool: &PgPool, user_id: Uuid, token: &str) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        "UPDATE public.refresh_tokens SET revoked_at = NOW() WHERE token_hash = $1 AND user_id = $2 AND revoked_at IS NULL",
    )
    .bind(hash_token(token))
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Revoke every live token of a user (deactivation, password change)
pub async fn revoke_all<'e, E>(executor: E, user_id: Uuid) -> Result<u64, DatabaseError>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query("UPDATE public.refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
