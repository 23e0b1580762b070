pub mod auth_handler;

pub use auth_handler::{
    __path_confirm_password_reset, __path_get_me, __path_login, __path_logout, __path_register,
    __path_request_password_reset, confirm_password_reset, get_me, login, logout, register,
    request_password_reset, AuthState,
};
