use super::AssetUploader;
use crate::Result;
use async_trait::async_trait;
use base64::Engine as _;

/// Embeds the image in the request as a `data:` URL instead of uploading it.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineUploader;

impl InlineUploader {
    pub fn new() -> Self {
        Self
    }

    pub fn data_url(data: &[u8], content_type: &str) -> String {
        format!(
            "data:{};base64,{}",
            content_type,
            base64::engine::general_purpose::STANDARD.encode(data)
        )
    }
}

#[async_trait]
impl AssetUploader for InlineUploader {
    async fn upload_image(
        &self,
        data: &[u8],
        content_type: &str,
        _file_name: &str,
    ) -> Result<String> {
        tracing::debug!("Inlining {} byte reference image", data.len());
        Ok(Self::data_url(data, content_type))
    }
}
