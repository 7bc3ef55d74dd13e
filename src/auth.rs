use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::HeaderMap;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::UserRole;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub phone: String,
    pub role: i16,
    pub iat: i64,
    pub exp: i64,
}

/// Identity extracted from a verified bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub phone: String,
    pub role: UserRole,
}

pub fn issue_token(
    secret: &str,
    ttl_seconds: i64,
    user_id: i64,
    phone: &str,
    role: UserRole,
) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        phone: phone.to_string(),
        role: role.code(),
        iat: now,
        exp: now + ttl_seconds,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| AppError::Internal(format!("failed to sign token: {err}")))
}

pub fn decode_token(secret: &str, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("invalid or expired token".to_string()))
}

fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))
}

/// Resolves the caller from the Authorization header.
pub fn require_user(state: &AppState, headers: &HeaderMap) -> AppResult<AuthUser> {
    let claims = decode_token(&state.config.jwt_secret, bearer_token(headers)?)?;
    let role = UserRole::from_code(claims.role)
        .ok_or_else(|| AppError::Unauthorized("unknown role in token".to_string()))?;
    Ok(AuthUser {
        id: claims.sub,
        phone: claims.phone,
        role,
    })
}

/// Landlord identity always comes from the token, never from request input.
pub fn require_landlord(state: &AppState, headers: &HeaderMap) -> AppResult<i64> {
    let user = require_user(state, headers)?;
    if user.role != UserRole::Landlord {
        return Err(AppError::Forbidden(
            "landlord account required".to_string(),
        ));
    }
    Ok(user.id)
}

pub fn hash_password(plain: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Internal(format!("failed to hash password: {err}")))
}

pub fn verify_password(plain: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use std::sync::Arc;

    fn test_state() -> AppState {
        let mut config = AppConfig::from_env();
        config.jwt_secret = "unit-test-secret".to_string();
        config.jwt_ttl_seconds = 3600;
        AppState {
            config: Arc::new(config),
            db_pool: None,
        }
    }

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        headers
    }

    #[test]
    fn token_round_trip() {
        let token =
            issue_token("unit-test-secret", 3600, 42, "13800000000", UserRole::Landlord).unwrap();
        let claims = decode_token("unit-test-secret", &token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.phone, "13800000000");
        assert_eq!(claims.role, UserRole::Landlord.code());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token =
            issue_token("unit-test-secret", 3600, 1, "13800000000", UserRole::Landlord).unwrap();
        assert!(decode_token("another-secret", &token).is_err());
    }

    #[test]
    fn require_landlord_rejects_tenants() {
        let state = test_state();
        let token =
            issue_token("unit-test-secret", 3600, 7, "13900000000", UserRole::Tenant).unwrap();
        let err = require_landlord(&state, &headers_with(&token)).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn missing_header_is_unauthorized() {
        let state = test_state();
        let err = require_landlord(&state, &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong-pass", &hash));
    }
}
