use axum::{
    routing::{get, post},
    Router,
};

use crate::features::dashboard::handlers::{
    comments_viewed, dashboard_stream, get_dashboard, mark_comments_read, DashboardContext,
};

pub fn routes(context: DashboardContext) -> Router {
    Router::new()
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/dashboard/stream", get(dashboard_stream))
        .route(
            "/api/dashboard/comments/mark-read",
            post(mark_comments_read),
        )
        .route("/api/dashboard/comments/viewed", post(comments_viewed))
        .with_state(context)
}
