use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{sse::Event, IntoResponse, Response, Sse},
    Json,
};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::comments::dtos::{
    CommentDto, CommentFeedDto, CommentQuery, CommentStatsDto, CreateCommentDto, ReactDto,
    ReplyDto, UpdateCommentDto,
};
use crate::features::comments::models::Reaction;
use crate::features::comments::services::{CommentService, CommentStreamEvent};
use crate::shared::types::{ApiResponse, Meta};

/// State for comment handlers
#[derive(Clone)]
pub struct CommentState {
    pub service: Arc<CommentService>,
    pub keep_alive: Duration,
}

async fn with_department(state: &CommentState, comment_id: Uuid) -> Result<CommentDto> {
    let row = state.service.find_with_department(comment_id).await?;
    Ok(row.into())
}

#[utoipa::path(
    post,
    path = "/api/comments",
    request_body = CreateCommentDto,
    responses(
        (status = 201, description = "Comment sent successfully", body = ApiResponse<CommentDto>),
        (status = 400, description = "Empty comment"),
        (status = 403, description = "Not a participant of the share"),
        (status = 404, description = "Share not found")
    ),
    tag = "comments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_comment(
    user: AuthenticatedUser,
    State(state): State<CommentState>,
    AppJson(dto): AppJson<CreateCommentDto>,
) -> Result<(StatusCode, Json<ApiResponse<CommentDto>>)> {
    let comment = state
        .service
        .create(user.user_id, &user.email, dto.share_id, &dto.body)
        .await?;
    let dto = with_department(&state, comment.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(dto),
            Some("Comment sent successfully".to_string()),
            None,
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/comments",
    params(CommentQuery),
    responses(
        (status = 200, description = "Comments retrieved successfully", body = ApiResponse<Vec<CommentDto>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "comments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_comments(
    user: AuthenticatedUser,
    State(state): State<CommentState>,
    Query(query): Query<CommentQuery>,
) -> Result<Json<ApiResponse<Vec<CommentDto>>>> {
    let comments: Vec<CommentDto> = state
        .service
        .list(user.user_id, query.tab)
        .await?
        .into_iter()
        .map(CommentDto::from)
        .collect();
    let total = comments.len() as i64;

    Ok(Json(ApiResponse::success(
        Some(comments),
        None,
        Some(Meta::total(total)),
    )))
}

#[utoipa::path(
    get,
    path = "/api/comments/stats",
    responses(
        (status = 200, description = "Comment statistics", body = ApiResponse<CommentStatsDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "comments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_comment_stats(
    user: AuthenticatedUser,
    State(state): State<CommentState>,
) -> Result<Json<ApiResponse<CommentStatsDto>>> {
    let stats = state.service.stats(user.user_id).await?;
    Ok(Json(ApiResponse::success(Some(stats), None, None)))
}

/// Live comments for one tab
///
/// Emits a `comments` event with the listing and stats on connect and after
/// every change, or a single `notification` event if the query fails.
/// Reconnect with another `tab` to switch; the previous subscription ends
/// with its stream.
#[utoipa::path(
    get,
    path = "/api/comments/stream",
    params(CommentQuery),
    responses(
        (status = 200, description = "Server-sent events", content_type = "text/event-stream", body = CommentFeedDto),
        (status = 401, description = "Unauthorized")
    ),
    tag = "comments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn comments_stream(
    user: AuthenticatedUser,
    State(state): State<CommentState>,
    Query(query): Query<CommentQuery>,
) -> Result<Response> {
    debug!("Comments stream opened for {} ({:?})", user.user_id, query.tab);
    let (rx, subscription) = state.service.watch(user.user_id, query.tab);

    let stream = ReceiverStream::new(rx).map(move |event| {
        let _subscription = &subscription;
        let sse = match event {
            CommentStreamEvent::Comments(feed) => Event::default().event("comments").json_data(feed),
            CommentStreamEvent::Notification(message) => Event::default()
                .event("notification")
                .json_data(serde_json::json!({ "message": message })),
        };
        Ok::<_, Infallible>(sse.unwrap_or_else(|e| {
            Event::default()
                .event("notification")
                .data(format!("Failed to encode update: {}", e))
        }))
    });

    let sse = Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(state.keep_alive)
            .text("ping"),
    );

    Ok(sse.into_response())
}

#[utoipa::path(
    put,
    path = "/api/comments/{id}",
    params(
        ("id" = Uuid, Path, description = "Comment id")
    ),
    request_body = UpdateCommentDto,
    responses(
        (status = 200, description = "Comment updated successfully", body = ApiResponse<CommentDto>),
        (status = 400, description = "Empty comment"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    ),
    tag = "comments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_comment(
    user: AuthenticatedUser,
    State(state): State<CommentState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateCommentDto>,
) -> Result<Json<ApiResponse<CommentDto>>> {
    state.service.edit(user.user_id, id, &dto.body).await?;
    let dto = with_department(&state, id).await?;
    Ok(Json(ApiResponse::success(
        Some(dto),
        Some("Comment updated successfully".to_string()),
        None,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    params(
        ("id" = Uuid, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment deleted successfully"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    ),
    tag = "comments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_comment(
    user: AuthenticatedUser,
    State(state): State<CommentState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    state.service.delete(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Comment deleted successfully".to_string()),
        None,
    )))
}

#[utoipa::path(
    post,
    path = "/api/comments/{id}/reactions",
    params(
        ("id" = Uuid, Path, description = "Comment id")
    ),
    request_body = ReactDto,
    responses(
        (status = 200, description = "Reaction recorded", body = ApiResponse<CommentDto>),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Comment not found")
    ),
    tag = "comments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn react_to_comment(
    user: AuthenticatedUser,
    State(state): State<CommentState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<ReactDto>,
) -> Result<Json<ApiResponse<CommentDto>>> {
    state.service.react(user.user_id, id, dto.reaction).await?;
    let comment = with_department(&state, id).await?;
    let message = match dto.reaction {
        Reaction::Like => "Liked comment",
        Reaction::Dislike => "Disliked comment",
    };
    Ok(Json(ApiResponse::success(
        Some(comment),
        Some(message.to_string()),
        None,
    )))
}

#[utoipa::path(
    post,
    path = "/api/comments/{id}/replies",
    params(
        ("id" = Uuid, Path, description = "Comment being answered")
    ),
    request_body = ReplyDto,
    responses(
        (status = 201, description = "Reply sent successfully", body = ApiResponse<CommentDto>),
        (status = 400, description = "Empty reply"),
        (status = 403, description = "Comment is not addressed to the caller"),
        (status = 404, description = "Comment not found")
    ),
    tag = "comments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn reply_to_comment(
    user: AuthenticatedUser,
    State(state): State<CommentState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<ReplyDto>,
) -> Result<(StatusCode, Json<ApiResponse<CommentDto>>)> {
    let reply = state
        .service
        .reply(user.user_id, &user.email, id, &dto.body)
        .await?;
    let dto = with_department(&state, reply.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(dto),
            Some("Reply sent successfully".to_string()),
            None,
        )),
    ))
}
