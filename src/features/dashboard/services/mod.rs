pub mod dashboard_service;
pub mod session;
pub mod source;

pub use dashboard_service::{DashboardService, LiveDashboard, SessionGuard};
pub use session::SessionEvent;
pub use source::{DashboardSource, PgDashboardSource};
