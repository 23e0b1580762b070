pub mod auth_service;
pub mod password_reset_service;
pub mod token_service;

pub use auth_service::AuthService;
pub use password_reset_service::PasswordResetService;
pub use token_service::TokenService;
