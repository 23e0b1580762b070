use axum::{
    routing::{get, post, put},
    Router,
};

use crate::features::comments::handlers::{
    comments_stream, create_comment, delete_comment, get_comment_stats, list_comments,
    react_to_comment, reply_to_comment, update_comment, CommentState,
};

pub fn routes(state: CommentState) -> Router {
    Router::new()
        .route("/api/comments", post(create_comment).get(list_comments))
        .route("/api/comments/stats", get(get_comment_stats))
        .route("/api/comments/stream", get(comments_stream))
        .route(
            "/api/comments/{id}",
            put(update_comment).delete(delete_comment),
        )
        .route("/api/comments/{id}/reactions", post(react_to_comment))
        .route("/api/comments/{id}/replies", post(reply_to_comment))
        .with_state(state)
}
