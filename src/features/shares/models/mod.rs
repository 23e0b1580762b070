pub mod share;

pub use share::{collaboration_summary, CollaborationSummary, ShareLink, ShareLinkWithUser};
