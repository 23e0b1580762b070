use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    Json,
};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::core::error::Result;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::dashboard::dtos::{DashboardViewDto, MarkReadResponseDto, ViewedResponseDto};
use crate::features::dashboard::services::{DashboardService, SessionEvent};
use crate::shared::types::ApiResponse;

#[derive(Clone)]
pub struct DashboardContext {
    pub service: Arc<DashboardService>,
    pub keep_alive: Duration,
}

fn sse_event(event: SessionEvent) -> Event {
    let encoded = match event {
        SessionEvent::Snapshot(view) => Event::default().event("snapshot").json_data(view),
        SessionEvent::Notification(message) => Event::default()
            .event("notification")
            .json_data(serde_json::json!({ "message": message })),
        SessionEvent::SessionEnded => Event::default()
            .event("session_ended")
            .json_data(serde_json::json!({ "message": "Session ended" })),
    };
    encoded.unwrap_or_else(|e| {
        Event::default()
            .event("notification")
            .data(format!("Failed to encode update: {}", e))
    })
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Dashboard view", body = ApiResponse<DashboardViewDto>),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Failed to fetch data")
    ),
    tag = "dashboard",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_dashboard(
    user: AuthenticatedUser,
    State(context): State<DashboardContext>,
) -> Result<Json<ApiResponse<DashboardViewDto>>> {
    let view = context.service.snapshot(user.user_id).await?;
    Ok(Json(ApiResponse::success(Some(view), None, None)))
}

/// Live dashboard
///
/// Sends the whole view as a `snapshot` event whenever it changes, a
/// `notification` event for each failure, and a final `session_ended` event
/// when the token expires or the user signs out. Use `?access_token=` when
/// the client cannot set headers.
#[utoipa::path(
    get,
    path = "/api/dashboard/stream",
    responses(
        (status = 200, description = "Server-sent events", content_type = "text/event-stream", body = DashboardViewDto),
        (status = 401, description = "Unauthorized")
    ),
    tag = "dashboard",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn dashboard_stream(
    user: AuthenticatedUser,
    State(context): State<DashboardContext>,
) -> Result<Response> {
    debug!("Dashboard stream requested by {}", user.user_id);
    let (events, guard) = context.service.open(&user).into_parts();

    let stream = ReceiverStream::new(events).map(move |event| {
        let _guard = &guard;
        Ok::<_, Infallible>(sse_event(event))
    });

    let sse = Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(context.keep_alive)
            .text("ping"),
    );
    Ok(sse.into_response())
}

#[utoipa::path(
    post,
    path = "/api/dashboard/comments/mark-read",
    responses(
        (status = 200, description = "Comments marked as read", body = ApiResponse<MarkReadResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User profile not found")
    ),
    tag = "dashboard",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn mark_comments_read(
    user: AuthenticatedUser,
    State(context): State<DashboardContext>,
) -> Result<Json<ApiResponse<MarkReadResponseDto>>> {
    let last_comment_check = context.service.mark_read(user.user_id).await?;
    Ok(Json(ApiResponse::success(
        Some(MarkReadResponseDto { last_comment_check }),
        Some("Comments marked as read".to_string()),
        None,
    )))
}

/// Record that the comments view was opened. Only open dashboards are
/// affected; the stored checkpoint is unchanged.
#[utoipa::path(
    post,
    path = "/api/dashboard/comments/viewed",
    responses(
        (status = 200, description = "Badges hidden", body = ApiResponse<ViewedResponseDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "dashboard",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn comments_viewed(
    user: AuthenticatedUser,
    State(context): State<DashboardContext>,
) -> Json<ApiResponse<ViewedResponseDto>> {
    let local_last_checked = context.service.viewed(user.user_id).await;
    Json(ApiResponse::success(
        Some(ViewedResponseDto { local_last_checked }),
        None,
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::dashboard::routes;
    use crate::features::dashboard::services::dashboard_service::tests::FakeSource;
    use crate::modules::change_feed::ChangeFeed;
    use crate::shared::test_helpers::{create_test_user, with_user};
    use axum::http::StatusCode;
    use axum_test::TestServer;

    fn server() -> TestServer {
        let user = create_test_user();
        let feed = ChangeFeed::default();
        let source = Arc::new(FakeSource::new(user.user_id, feed.clone()));
        let context = DashboardContext {
            service: Arc::new(DashboardService::new(source, feed, 16)),
            keep_alive: Duration::from_secs(15),
        };
        TestServer::new(with_user(routes(context), user)).unwrap()
    }

    #[tokio::test]
    async fn test_get_dashboard() {
        let response = server().get("/api/dashboard").await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["counts"]["my_files"], 3);
        assert_eq!(body["data"]["notifications"]["new_comments"], 0);
    }

    #[tokio::test]
    async fn test_mark_read_returns_checkpoint() {
        let response = server().post("/api/dashboard/comments/mark-read").await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert!(body["data"]["last_comment_check"].is_string());
    }

    #[tokio::test]
    async fn test_viewed_without_open_stream() {
        let response = server().post("/api/dashboard/comments/viewed").await;
        response.assert_status(StatusCode::OK);
    }
}
