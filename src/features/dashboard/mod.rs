//! Live dashboard aggregator.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/dashboard` | One-shot dashboard view |
//! | GET | `/api/dashboard/stream` | SSE: `snapshot`, `notification`, `session_ended` |
//! | POST | `/api/dashboard/comments/mark-read` | Move the comment read checkpoint |
//! | POST | `/api/dashboard/comments/viewed` | Hide badges on open dashboards |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use handlers::DashboardContext;
pub use routes::routes;
pub use services::{DashboardService, PgDashboardSource};
