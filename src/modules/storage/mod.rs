//! Storage module for uploaded documents
//!
//! `ObjectStore` is the seam the files feature talks to; `MinIOClient` is the
//! S3-compatible implementation used in production.

mod minio_client;
mod sigv4;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::core::error::AppError;

pub use minio_client::MinIOClient;

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Opaque object key, needed for deletion
    pub key: String,
    /// Public URL of the object
    pub url: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Prefix every document key starts with
    fn files_prefix(&self) -> &str;

    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, AppError>;

    /// Time-limited download URL
    async fn presigned_url(&self, key: &str) -> Result<String, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Key layout: `{prefix}/{owner}/{object_id}.{ext}` (no extension suffix when empty)
pub fn object_key(prefix: &str, owner: &str, object_id: &str, extension: &str) -> String {
    if extension.is_empty() {
        format!("{}/{}/{}", prefix, owner, object_id)
    } else {
        format!("{}/{}/{}.{}", prefix, owner, object_id, extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_layout() {
        assert_eq!(
            object_key("files", "u1", "abc", "pdf"),
            "files/u1/abc.pdf"
        );
        assert_eq!(object_key("files", "u1", "abc", ""), "files/u1/abc");
    }
}
