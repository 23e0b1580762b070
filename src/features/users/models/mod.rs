pub mod department;
pub mod user;

pub use user::{User, UserProfile};
