use crate::models::user::UserRole;
use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

static JWT_CONFIG: OnceLock<crate::config::jwt::JwtConfig> = OnceLock::new();

/// Must be called once at startup.
pub fn init_jwt_config(config: crate::config::jwt::JwtConfig) -> Result<()> {
    JWT_CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("JWT config already initialized"))?;
    Ok(())
}

fn get_config() -> Result<&'static crate::config::jwt::JwtConfig> {
    JWT_CONFIG
        .get()
        .ok_or_else(|| anyhow::anyhow!("JWT config not initialized"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
    pub token_type: TokenType,
}

/// Identity baked into every token.
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    pub user_id: Uuid,
    pub email: &'a str,
    pub username: &'a str,
    pub role: UserRole,
}

impl<'a> From<&'a crate::models::UserModel> for TokenSubject<'a> {
    fn from(user: &'a crate::models::UserModel) -> Self {
        Self {
            user_id: user.id,
            email: &user.email,
            username: &user.username,
            role: user.role,
        }
    }
}

fn encode_token(subject: TokenSubject<'_>, token_type: TokenType) -> Result<String> {
    let config = get_config()?;
    let now = chrono::Utc::now().timestamp() as usize;
    let ttl = match token_type {
        TokenType::Access => config.access_token_expiry,
        TokenType::Refresh => config.refresh_token_expiry,
    };
    let claims = Claims {
        sub: subject.user_id,
        email: subject.email.to_owned(),
        username: subject.username.to_owned(),
        role: subject.role,
        exp: now + ttl as usize,
        iat: now,
        token_type,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("Failed to encode {:?} token: {}", token_type, e))
}

pub fn encode_access_token(subject: TokenSubject<'_>) -> Result<String> {
    encode_token(subject, TokenType::Access)
}

pub fn encode_refresh_token(subject: TokenSubject<'_>) -> Result<String> {
    encode_token(subject, TokenType::Refresh)
}

pub fn decode_jwt(token: &str) -> Result<Claims> {
    let config = get_config()?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| anyhow::anyhow!("Failed to decode JWT: {}", e))
}

/// Installs a fixed signing config for unit tests. Safe to call repeatedly.
#[cfg(test)]
pub(crate) fn ensure_test_config() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let config = crate::config::jwt::JwtConfig::new(
            "a_very_long_secret_key_that_is_at_least_32_chars".to_string(),
            3600,
            7200,
        )
        .expect("valid test jwt config");
        let _ = init_jwt_config(config);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ensure_config() {
        ensure_test_config();
    }

    fn subject(id: Uuid) -> TokenSubject<'static> {
        TokenSubject {
            user_id: id,
            email: "seller1@x.com",
            username: "seller1",
            role: UserRole::Seller,
        }
    }

    #[test]
    fn access_token_carries_identity() {
        ensure_config();
        let id = Uuid::new_v4();
        let token = encode_access_token(subject(id)).unwrap();
        let claims = decode_jwt(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "seller1@x.com");
        assert_eq!(claims.role, UserRole::Seller);
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_outlives_access_token() {
        ensure_config();
        let id = Uuid::new_v4();
        let access = decode_jwt(&encode_access_token(subject(id)).unwrap()).unwrap();
        let refresh = decode_jwt(&encode_refresh_token(subject(id)).unwrap()).unwrap();
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn tampered_token_fails() {
        ensure_config();
        let token = encode_access_token(subject(Uuid::new_v4())).unwrap();
        let mut chars: Vec<char> = token.chars().collect();
        let mid = chars.len() / 2;
        chars[mid] = if chars[mid] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        assert!(decode_jwt(&tampered).is_err());
    }

    #[test]
    fn expired_token_fails() {
        ensure_config();
        let config = get_config().unwrap();
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@b.c".into(),
            username: "a".into(),
            role: UserRole::Buyer,
            exp: now - 3600,
            iat: now - 7200,
            token_type: TokenType::Access,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();
        assert!(decode_jwt(&token).is_err());
    }
}
