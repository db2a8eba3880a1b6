use super::AssetUploader;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct UploadedAsset {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Clone)]
pub struct MockAssetUploader {
    uploads: Arc<Mutex<Vec<UploadedAsset>>>,
    base_url: String,
    should_fail: Arc<Mutex<bool>>,
}

impl MockAssetUploader {
    pub fn new() -> Self {
        Self {
            uploads: Arc::new(Mutex::new(Vec::new())),
            base_url: "https://mock-storage.example.com".to_string(),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn get_uploads(&self) -> Vec<UploadedAsset> {
        self.uploads.lock().unwrap().clone()
    }
}

impl Default for MockAssetUploader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetUploader for MockAssetUploader {
    async fn upload_image(
        &self,
        data: &[u8],
        content_type: &str,
        file_name: &str,
    ) -> Result<String> {
        if *self.should_fail.lock().unwrap() {
            return Err(Error::Upload("Mock upload failure".to_string()));
        }

        self.uploads.lock().unwrap().push(UploadedAsset {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            data: data.to_vec(),
        });
        Ok(format!("{}/{}", self.base_url, file_name))
    }
}
