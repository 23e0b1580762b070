pub mod comment;

pub use comment::{Comment, CommentTab, CommentWithDepartment, Reaction};
