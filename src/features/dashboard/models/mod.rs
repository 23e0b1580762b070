pub mod state;

pub use state::{CommentStamp, DashboardPatch, DashboardState, FetchedRecords};
