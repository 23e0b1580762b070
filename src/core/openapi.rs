use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::activities::{
    dtos as activities_dtos, handlers as activities_handlers, models as activities_models,
};
use crate::features::auth::{dtos as auth_dtos, handlers as auth_handlers};
use crate::features::comments::{
    dtos as comments_dtos, handlers as comments_handlers, models as comments_models,
};
use crate::features::dashboard::{dtos as dashboard_dtos, handlers as dashboard_handlers};
use crate::features::files::{dtos as files_dtos, handlers as files_handlers, services as files_services};
use crate::features::shares::{dtos as shares_dtos, handlers as shares_handlers};
use crate::features::users::{dtos as users_dtos, handlers::profile_handler};
use crate::shared::types::{Meta, PaginationMeta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth_handlers::register,
        auth_handlers::login,
        auth_handlers::get_me,
        auth_handlers::logout,
        auth_handlers::request_password_reset,
        auth_handlers::confirm_password_reset,
        // Users
        profile_handler::get_profile,
        profile_handler::list_departments,
        profile_handler::list_department_users,
        // Files
        files_handlers::upload_file,
        files_handlers::get_upload_progress,
        files_handlers::list_files,
        files_handlers::get_file_stats,
        files_handlers::delete_file,
        files_handlers::bulk_delete_files,
        files_handlers::get_download_url,
        // Shares
        shares_handlers::share_file,
        shares_handlers::list_shared_files,
        shares_handlers::get_share_stats,
        shares_handlers::revoke_share,
        // Comments
        comments_handlers::create_comment,
        comments_handlers::list_comments,
        comments_handlers::get_comment_stats,
        comments_handlers::comments_stream,
        comments_handlers::update_comment,
        comments_handlers::delete_comment,
        comments_handlers::react_to_comment,
        comments_handlers::reply_to_comment,
        // Activities
        activities_handlers::list_activities,
        // Dashboard
        dashboard_handlers::get_dashboard,
        dashboard_handlers::dashboard_stream,
        dashboard_handlers::mark_comments_read,
        dashboard_handlers::comments_viewed,
    ),
    components(
        schemas(
            Meta,
            PaginationMeta,
            // Auth
            auth_dtos::RegisterRequestDto,
            auth_dtos::LoginRequestDto,
            auth_dtos::AuthResponseDto,
            auth_dtos::MeResponseDto,
            auth_dtos::PasswordResetRequestDto,
            auth_dtos::PasswordResetConfirmDto,
            // Users
            users_dtos::UserProfileResponseDto,
            users_dtos::DepartmentDto,
            users_dtos::DepartmentMemberDto,
            // Files
            files_dtos::UploadFileDto,
            files_dtos::FileResponseDto,
            files_dtos::FileStatsDto,
            files_dtos::BulkDeleteFilesDto,
            files_dtos::DeleteFilesResponseDto,
            files_dtos::DownloadUrlDto,
            files_services::UploadProgress,
            files_services::UploadStage,
            // Shares
            shares_dtos::ShareFileDto,
            shares_dtos::ShareLinkDto,
            shares_dtos::SharedFilesDto,
            shares_dtos::ShareStatsDto,
            // Comments
            comments_dtos::CreateCommentDto,
            comments_dtos::UpdateCommentDto,
            comments_dtos::ReplyDto,
            comments_dtos::ReactDto,
            comments_dtos::CommentDto,
            comments_dtos::CommentStatsDto,
            comments_dtos::CommentFeedDto,
            comments_models::CommentTab,
            comments_models::Reaction,
            // Activities
            activities_dtos::ActivityDto,
            activities_models::ActivityType,
            // Dashboard
            dashboard_dtos::DashboardViewDto,
            dashboard_dtos::DashboardCountsDto,
            dashboard_dtos::CommentNotificationsDto,
            dashboard_dtos::DepartmentStatsDto,
            dashboard_dtos::RecentShareDto,
            dashboard_dtos::ShareDirection,
            dashboard_dtos::CheckpointDto,
            dashboard_dtos::MarkReadResponseDto,
            dashboard_dtos::ViewedResponseDto,
        )
    ),
    tags(
        (name = "auth", description = "Sign-up, sign-in, sign-out and password reset"),
        (name = "users", description = "Profiles and departments"),
        (name = "files", description = "File upload and management"),
        (name = "shares", description = "Sharing files with colleagues"),
        (name = "comments", description = "Threaded comments on shared files"),
        (name = "activities", description = "Activity log"),
        (name = "dashboard", description = "Live dashboard"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "DocuHub API",
        version = "0.1.0",
        description = "API documentation for DocuHub",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
