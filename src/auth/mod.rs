use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;
use crate::database::models::User;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: &User, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user.id,
            email: user.email.clone(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("{0}")]
    InvalidToken(String),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

/// Sign an opaque bearer token for the given user
pub fn issue_token(user: &User, security: &SecurityConfig) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let claims = Claims::new(user, security.jwt_expiry_hours);
    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());

    encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Validate a token's signature and expiry and return its claims
pub fn decode_token(token: &str, security: &SecurityConfig) -> Result<Claims, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());

    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(format!("Invalid token: {}", e)))
}

/// Salted bcrypt hash; plaintext passwords are never stored
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    Ok(bcrypt::verify(password, hash)?)
}

static DUMMY_HASHES: Lazy<Mutex<HashMap<u32, String>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// A real hash at `cost` that no submitted password is checked for a match
/// against; verifying against it costs the same as verifying a user's hash.
/// Computed once per cost.
pub fn dummy_hash(cost: u32) -> Result<String, AuthError> {
    let mut hashes = DUMMY_HASHES.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(hash) = hashes.get(&cost) {
        return Ok(hash.clone());
    }
    let hash = hash_password("recipe-api-dummy-password", cost)?;
    hashes.insert(cost, hash.clone());
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn user() -> User {
        User {
            id: 42,
            email: "cook@example.com".to_string(),
            password_hash: String::new(),
            name: "Cook".to_string(),
            is_active: true,
            is_staff: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_decodes_to_same_user() {
        let security = AppConfig::development().security;
        let token = issue_token(&user(), &security).unwrap();
        let claims = decode_token(&token, &security).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "cook@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let security = AppConfig::development().security;
        let token = issue_token(&user(), &security).unwrap();

        let mut other = security.clone();
        other.jwt_secret = "another-secret".to_string();
        assert!(matches!(decode_token(&token, &other), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let mut security = AppConfig::development().security;
        security.jwt_secret.clear();
        assert!(matches!(issue_token(&user(), &security), Err(AuthError::InvalidSecret)));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("testpass123", 4).unwrap();
        assert_ne!(hash, "testpass123");
        assert!(verify_password("testpass123", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn dummy_hash_is_reused_per_cost() {
        let first = dummy_hash(4).unwrap();
        assert!(first.starts_with("$2"));
        assert_eq!(dummy_hash(4).unwrap(), first);
        assert!(!verify_password("testpass123", &first).unwrap());
    }
}
