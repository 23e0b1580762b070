use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::features::shares::handlers::{get_share_stats, list_shared_files, revoke_share, share_file};
use crate::features::shares::services::ShareService;

pub fn routes(service: Arc<ShareService>) -> Router {
    Router::new()
        .route("/api/shares", post(share_file).get(list_shared_files))
        .route("/api/shares/stats", get(get_share_stats))
        .route("/api/shares/{id}", delete(revoke_share))
        .with_state(service)
}
