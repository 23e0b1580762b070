use axum::{routing::get, Router};
use std::sync::Arc;

use crate::features::activities::handlers::list_activities;
use crate::features::activities::services::ActivityService;

pub fn routes(service: Arc<ActivityService>) -> Router {
    Router::new()
        .route("/api/activities", get(list_activities))
        .with_state(service)
}
