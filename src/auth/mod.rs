pub mod password;
pub mod refresh;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::database::models::user::User;
use crate::types::{AccountTier, Role};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    InvalidToken(String),

    #[error("{0}")]
    WeakPassword(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    /// `None` for platform root users
    pub tenant_id: Option<Uuid>,
    pub role: Role,
    /// Tier at issue time, informational only; requests are gated on the stored tier
    pub tier: Option<AccountTier>,
    pub name: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn for_user(user: &User, tier: Option<AccountTier>) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user.id,
            tenant_id: user.tenant_id,
            role: user.role,
            tier,
            name: user.name.clone(),
            email: user.email.clone(),
            exp,
            iat: now.timestamp(),
        }
    }
}

fn secret() -> Result<&'static [u8], AuthError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }
    Ok(secret.as_bytes())
}

pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    let encoding_key = EncodingKey::from_secret(secret()?);
    encode(&Header::default(), claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str) -> Result<Claims, AuthError> {
    let decoding_key = DecodingKey::from_secret(secret()?);
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| AuthError::InvalidToken(format!("Invalid JWT token: {}", e)))?;

    Ok(token_data.claims)
}

/// Seconds until an access token issued now expires
pub fn access_token_ttl_secs() -> i64 {
    config::config().security.jwt_expiry_hours as i64 * 3600
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, tenant_id: Option<Uuid>) -> User {
        User {
            id: Uuid::new_v4(),
            tenant_id,
            email: "ana@silva.adv.br".to_string(),
            name: "Ana Silva".to_string(),
            password_hash: String::new(),
            role,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn jwt_round_trip() {
        let tenant = Uuid::new_v4();
        let u = user(Role::Admin, Some(tenant));
        let token = generate_jwt(&Claims::for_user(&u, Some(AccountTier::Composta))).unwrap();
        let claims = validate_jwt(&token).unwrap();
        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.tenant_id, Some(tenant));
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.tier, Some(AccountTier::Composta));
    }

    #[test]
    fn rejects_tampered_token() {
        let u = user(Role::Root, None);
        let token = generate_jwt(&Claims::for_user(&u, None)).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
        assert!(matches!(validate_jwt(&tampered), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn rejects_expired_token() {
        let u = user(Role::Member, Some(Uuid::new_v4()));
        let mut claims = Claims::for_user(&u, None);
        claims.iat -= 7200;
        claims.exp = Utc::now().timestamp() - 3600;
        let token = generate_jwt(&claims).unwrap();
        assert!(validate_jwt(&token).is_err());
    }
}
