use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::core::config::AuthConfig;
use crate::core::error::{AppError, Result};
use crate::features::auth::model::Claims;

/// Signed access token and its lifetime
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Issues HS256 access tokens
pub struct TokenService {
    encoding_key: EncodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl: Duration::seconds(config.token_ttl.as_secs() as i64),
        }
    }

    pub fn issue(&self, user_id: uuid::Uuid, email: &str, session_version: i32) -> Result<IssuedToken> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            ver: session_version,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let access_token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign access token: {}", e)))?;

        Ok(IssuedToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.ttl.num_seconds(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::validator::decode_claims;
    use jsonwebtoken::DecodingKey;
    use std::time::Duration as StdDuration;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            token_ttl: StdDuration::from_secs(3600),
            jwt_leeway: StdDuration::from_secs(0),
            reset_code_ttl: StdDuration::from_secs(600),
        }
    }

    #[test]
    fn test_issue_then_decode() {
        let config = config();
        let service = TokenService::new(&config);
        let user_id = uuid::Uuid::new_v4();

        let token = service.issue(user_id, "a@b.c", 3).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 3600);

        let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let claims = decode_claims(&token.access_token, &key, 0).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "a@b.c");
        assert_eq!(claims.ver, 3);
        assert_eq!(claims.exp - claims.iat, 3600);
    }
}
