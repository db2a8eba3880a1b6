use super::AssetUploader;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct InitiateUploadRequest<'a> {
    content_type: &'a str,
    file_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct InitiateUploadResponse {
    upload_url: String,
    file_url: String,
}

/// Two-step upload to fal's CDN: reserve a signed URL, then PUT the bytes.
pub struct FalStorageClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FalStorageClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self::new_with_client(api_key, base_url, Client::new())
    }

    pub fn new_with_client(api_key: String, base_url: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn initiate(&self, content_type: &str, file_name: &str) -> Result<InitiateUploadResponse> {
        let url = format!(
            "{}/storage/upload/initiate?storage_type=fal-cdn-v3",
            self.base_url
        );
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Key {}", self.api_key))
            .json(&InitiateUploadRequest {
                content_type,
                file_name,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to initiate upload with fal storage: {}", e);
                Error::Upload(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("fal storage error (status {}): {}", status, error_text);
            return Err(Error::Upload(format!(
                "initiate failed (status {}): {}",
                status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse fal storage response: {}\nBody: {}", e, body);
            Error::Upload(format!("Failed to parse storage response: {}", e))
        })
    }
}

#[async_trait]
impl AssetUploader for FalStorageClient {
    async fn upload_image(
        &self,
        data: &[u8],
        content_type: &str,
        file_name: &str,
    ) -> Result<String> {
        let target = self.initiate(content_type, file_name).await?;

        let response = self
            .client
            .put(&target.upload_url)
            .header(CONTENT_TYPE, content_type)
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to upload reference image: {}", e);
                Error::Upload(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("Reference image upload returned status {}", status);
            return Err(Error::Upload(format!("upload returned status {}", status)));
        }

        tracing::info!("Uploaded reference image to {}", target.file_url);
        Ok(target.file_url)
    }
}
