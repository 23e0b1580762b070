//! Outbound transactional email
//!
//! Messages are rendered by a hosted template service; we only send the
//! template variables over HTTP.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::config::EmailConfig;
use crate::core::error::{AppError, Result};

/// Template variables for the verification-code email
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VerificationEmail {
    pub to_email: String,
    pub name: String,
    pub message: String,
    pub code: String,
    pub time: String,
}

impl VerificationEmail {
    pub const RESET_MESSAGE: &'static str = "Here is your password reset verification code:";

    /// Password-reset email; the greeting name is the local part of the address.
    pub fn password_reset(email: &str, code: &str, sent_at: chrono::DateTime<chrono::Utc>) -> Self {
        let name = email.split('@').next().unwrap_or(email).to_string();
        Self {
            to_email: email.to_string(),
            name,
            message: Self::RESET_MESSAGE.to_string(),
            code: code.to_string(),
            time: sent_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_verification(&self, email: &VerificationEmail) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct TemplateSendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: &'a VerificationEmail,
}

/// Template email API client
pub struct HttpEmailClient {
    api_url: String,
    service_id: String,
    template_id: String,
    public_key: String,
    http_client: reqwest::Client,
}

impl HttpEmailClient {
    pub fn new(api_url: String, config: &EmailConfig) -> Self {
        Self {
            api_url,
            service_id: config.service_id.clone(),
            template_id: config.template_id.clone(),
            public_key: config.public_key.clone(),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailClient {
    async fn send_verification(&self, email: &VerificationEmail) -> Result<()> {
        let body = TemplateSendRequest {
            service_id: &self.service_id,
            template_id: &self.template_id,
            user_id: &self.public_key,
            template_params: email,
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send verification email: {}", e);
                AppError::ExternalServiceError("Failed to send verification code".to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Email API error: HTTP {} - {}", status, body);
            return Err(AppError::ExternalServiceError(
                "Failed to send verification code".to_string(),
            ));
        }

        info!("Verification email sent to {}", email.to_email);
        Ok(())
    }
}

/// Used when no email API is configured: the code only goes to the log.
pub struct LoggingEmailSender;

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send_verification(&self, email: &VerificationEmail) -> Result<()> {
        warn!(
            to = %email.to_email,
            code = %email.code,
            "EMAIL_API_URL not set; verification email not delivered"
        );
        Ok(())
    }
}

/// Pick the sender matching the configuration
pub fn build_sender(config: &EmailConfig) -> std::sync::Arc<dyn EmailSender> {
    match &config.api_url {
        Some(url) => std::sync::Arc::new(HttpEmailClient::new(url.clone(), config)),
        None => std::sync::Arc::new(LoggingEmailSender),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_password_reset_template_variables() {
        let sent_at = chrono::Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
        let email = VerificationEmail::password_reset("juan.cruz@example.gov", "123456", sent_at);

        assert_eq!(email.to_email, "juan.cruz@example.gov");
        assert_eq!(email.name, "juan.cruz");
        assert_eq!(email.code, "123456");
        assert_eq!(email.message, VerificationEmail::RESET_MESSAGE);
        assert_eq!(email.time, "2025-03-01 08:30:00 UTC");
    }

    #[test]
    fn test_request_body_shape() {
        let sent_at = chrono::Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
        let email = VerificationEmail::password_reset("a@b.c", "654321", sent_at);
        let body = TemplateSendRequest {
            service_id: "svc",
            template_id: "tpl",
            user_id: "pk",
            template_params: &email,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["service_id"], "svc");
        assert_eq!(json["user_id"], "pk");
        assert_eq!(json["template_params"]["to_email"], "a@b.c");
        assert_eq!(json["template_params"]["code"], "654321");
    }

    #[tokio::test]
    async fn test_logging_sender_succeeds() {
        let email = VerificationEmail::password_reset("a@b.c", "111111", chrono::Utc::now());
        assert!(LoggingEmailSender.send_verification(&email).await.is_ok());
    }

    #[test]
    fn test_build_sender_without_url_uses_logging() {
        let config = EmailConfig {
            api_url: None,
            service_id: String::new(),
            template_id: String::new(),
            public_key: String::new(),
        };
        // no panic, no network
        let _sender = build_sender(&config);
    }
}
