use super::model::{AuthenticatedUser, Claims};
use crate::core::config::AuthConfig;
use crate::core::error::AppError;
use crate::features::users::UserService;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;

/// Decode and verify an HS256 token signature and expiry
pub fn decode_claims(token: &str, key: &DecodingKey, leeway: u64) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = leeway;
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<Claims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

pub struct JwtValidator {
    decoding_key: DecodingKey,
    leeway: u64,
    users: Arc<UserService>,
}

impl JwtValidator {
    pub fn new(config: &AuthConfig, users: Arc<UserService>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            leeway: config.jwt_leeway.as_secs(),
            users,
        }
    }

    /// Signature, expiry, then the session version still on record
    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let claims = decode_claims(token, &self.decoding_key, self.leeway)?;
        let user = claims
            .into_user()
            .ok_or_else(|| AppError::Unauthorized("Malformed token claims".to_string()))?;

        match self.users.session_version(user.user_id).await? {
            Some(version) if version == user.session_version => Ok(user),
            Some(_) => Err(AppError::Unauthorized("Session has ended".to_string())),
            None => Err(AppError::Unauthorized("Account no longer exists".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn token(claims: &Claims, secret: &[u8]) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn claims(exp_offset: i64) -> Claims {
        let now = chrono::Utc::now().timestamp();
        Claims {
            sub: uuid::Uuid::new_v4().to_string(),
            email: "a@b.c".to_string(),
            ver: 0,
            iat: now,
            exp: now + exp_offset,
        }
    }

    #[test]
    fn test_valid_token_decodes() {
        let c = claims(600);
        let decoded = decode_claims(&token(&c, SECRET), &DecodingKey::from_secret(SECRET), 0);
        assert_eq!(decoded.unwrap(), c);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let c = claims(-600);
        let result = decode_claims(&token(&c, SECRET), &DecodingKey::from_secret(SECRET), 0);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let c = claims(600);
        let result = decode_claims(
            &token(&c, b"another-secret-another-secret-xx"),
            &DecodingKey::from_secret(SECRET),
            0,
        );
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_non_uuid_subject_is_malformed() {
        let mut c = claims(600);
        c.sub = "not-a-uuid".to_string();
        assert!(c.into_user().is_none());
    }
}
