//! Users, profiles and departments.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/users/me` | Caller's profile with department name |
//! | GET | `/api/departments` | Departments that have members |
//! | GET | `/api/departments/{code}/users` | Colleagues in a department |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use routes::routes;
pub use services::UserService;
