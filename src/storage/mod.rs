//! Remote asset storage for reference images
//!
//! The image-conditioned model takes its reference as a URL, so reference
//! images are uploaded first and the returned URL is sent with the request.

pub mod client;
pub mod inline;
pub mod mock;

pub use client::FalStorageClient;
pub use inline::InlineUploader;
pub use mock::MockAssetUploader;

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait AssetUploader: Send + Sync {
    /// Upload `data` and return a URL the generation API can fetch.
    async fn upload_image(&self, data: &[u8], content_type: &str, file_name: &str)
        -> Result<String>;
}
