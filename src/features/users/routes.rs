use crate::features::users::handlers::profile_handler;
use crate::features::users::services::UserService;
use axum::{routing::get, Router};
use std::sync::Arc;

pub fn routes(service: Arc<UserService>) -> Router {
    Router::new()
        .route("/api/users/me", get(profile_handler::get_profile))
        .route("/api/departments", get(profile_handler::list_departments))
        .route(
            "/api/departments/{code}/users",
            get(profile_handler::list_department_users),
        )
        .with_state(service)
}
