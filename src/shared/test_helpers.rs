#[cfg(test)]
use crate::features::auth::model::AuthenticatedUser;

#[cfg(test)]
use axum::{extract::Request, middleware::Next, response::Response, Router};

#[cfg(test)]
pub fn create_test_user() -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: uuid::Uuid::new_v4(),
        email: "tester@example.gov".to_string(),
        session_version: 0,
        expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
    }
}

/// Wrap a router so every request carries `user`, bypassing JWT validation
#[cfg(test)]
pub fn with_user(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                let response: Response = next.run(request).await;
                response
            }
        },
    ))
}

#[cfg(test)]
pub fn with_test_user(router: Router) -> Router {
    with_user(router, create_test_user())
}
