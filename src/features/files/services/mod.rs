pub mod file_service;
pub mod upload_progress;

pub use file_service::FileService;
pub use upload_progress::{UploadProgress, UploadProgressTracker, UploadStage};
