use crate::{Error, Result};
use image::ImageFormat;
use uuid::Uuid;

/// A decoded reference image, ready for upload.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    bytes: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl ReferenceImage {
    fn decode_sync(bytes: Vec<u8>) -> Result<Self> {
        let format = image::guess_format(&bytes)
            .map_err(|e| Error::Validation(format!("unrecognized reference image: {}", e)))?;
        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| Error::Validation(format!("could not decode reference image: {}", e)))?;

        Ok(Self {
            width: decoded.width(),
            height: decoded.height(),
            bytes,
            format,
        })
    }

    /// Decode off the async runtime; undecodable input is a validation error.
    pub async fn decode(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Validation("reference image is empty".to_string()));
        }

        tokio::task::spawn_blocking(move || Self::decode_sync(bytes))
            .await
            .map_err(|e| Error::Invariant(format!("Image decode task join error: {}", e)))?
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Unique upload name carrying the detected extension.
    pub fn upload_file_name(&self) -> String {
        let ext = self.format.extensions_str().first().copied().unwrap_or("png");
        format!("reference_{}.{}", Uuid::new_v4(), ext)
    }
}
