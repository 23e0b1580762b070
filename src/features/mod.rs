pub mod activities;
pub mod auth;
pub mod comments;
pub mod dashboard;
pub mod files;
pub mod shares;
pub mod users;
