pub mod dashboard_dto;

pub use dashboard_dto::{
    CheckpointDto, CommentNotificationsDto, DashboardCountsDto, DashboardViewDto,
    DepartmentStatsDto, MarkReadResponseDto, RecentShareDto, ShareDirection, ViewedResponseDto,
};
