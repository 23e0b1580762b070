use axum::{
    body::Body,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;

/// JSON body extractor whose failures use the `ApiResponse` envelope
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| AppError::BadRequest(rejection_message(&rejection)))
    }
}

fn rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::JsonDataError(err) => format!("Invalid request body: {}", err.body_text()),
        JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON".to_string(),
        JsonRejection::MissingJsonContentType(_) => {
            "Expected a request with Content-Type: application/json".to_string()
        }
        other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            "Request body is too large".to_string()
        }
        _ => "Failed to read request body".to_string(),
    }
}

/// Reads the user placed in request extensions by `auth_middleware`
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Please sign in to continue".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Router};
    use axum_test::TestServer;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Note {
        #[allow(dead_code)]
        body: String,
    }

    fn server() -> TestServer {
        let app = Router::new().route("/echo", post(|AppJson(_): AppJson<Note>| async { "ok" }));
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_json_uses_envelope() {
        let response = server()
            .post("/echo")
            .text("{ not json")
            .content_type("application/json")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Request body is not valid JSON");
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let app = Router::new().route("/me", post(|_: AuthenticatedUser| async { "ok" }));
        let response = TestServer::new(app).unwrap().post("/me").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}
