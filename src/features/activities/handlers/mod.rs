pub mod activity_handler;

pub use activity_handler::{__path_list_activities, list_activities};
