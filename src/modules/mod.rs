pub mod change_feed;
pub mod email;
pub mod storage;
pub mod subscription;
