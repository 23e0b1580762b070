//! File sharing between colleagues.
//!
//! | Method | Path                | Description                          |
//! |--------|---------------------|--------------------------------------|
//! | POST   | `/api/shares`       | Share an owned file with recipients  |
//! | GET    | `/api/shares`       | Shared-with-me and shared-by-me      |
//! | GET    | `/api/shares/stats` | Totals, recent shares, collaborators |
//! | DELETE | `/api/shares/{id}`  | Revoke one link                      |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use routes::routes;
pub use services::ShareService;
