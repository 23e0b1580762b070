//! Threaded comments between the two participants of a share.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use handlers::CommentState;
pub use routes::routes;
pub use services::CommentService;
