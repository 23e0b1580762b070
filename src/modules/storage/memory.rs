use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{ObjectStore, StoredObject};
use crate::core::error::AppError;

/// In-memory object store for tests
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_uploads: bool,
}

impl InMemoryObjectStore {
    pub fn failing() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            fail_uploads: true,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn files_prefix(&self) -> &str {
        "files"
    }

    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<StoredObject, AppError> {
        if self.fail_uploads {
            return Err(AppError::ExternalServiceError(
                "storage unavailable".to_string(),
            ));
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(StoredObject {
            key: key.to_string(),
            url: format!("http://storage.test/docuhub-files/{}", key),
        })
    }

    async fn presigned_url(&self, key: &str) -> Result<String, AppError> {
        Ok(format!("http://storage.test/docuhub-files/{}?signed=1", key))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}
