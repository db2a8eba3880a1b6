//! fal FLUX request/response payloads.

use crate::models::{AspectRatio, GenerationRequest};
use serde::{Deserialize, Serialize};

/// Every request asks for a single image.
pub const NUM_IMAGES: u32 = 1;

/// Most permissive tolerance the FLUX pro endpoints accept.
pub const SAFETY_TOLERANCE: &str = "5";

/// Argument object posted to a FLUX model.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FluxArguments {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub num_images: u32,
    pub enable_safety_checker: bool,
    pub safety_tolerance: String,
    pub raw: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_prompt_strength: Option<f64>,
}

impl From<&GenerationRequest> for FluxArguments {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            prompt: request.prompt.clone(),
            aspect_ratio: request.aspect_ratio,
            num_images: NUM_IMAGES,
            enable_safety_checker: false,
            safety_tolerance: SAFETY_TOLERANCE.to_string(),
            raw: request.raw,
            seed: request.seed,
            image_url: request.reference.as_ref().map(|r| r.url.clone()),
            image_prompt_strength: request.reference.as_ref().map(|r| r.strength),
        }
    }
}

/// Top-level FLUX response.
#[derive(Debug, Deserialize)]
pub struct FluxResponse {
    pub images: Vec<FluxImage>,
    pub seed: Option<u64>,
    #[serde(default)]
    pub has_nsfw_concepts: Vec<bool>,
}

/// One produced image descriptor.
#[derive(Debug, Deserialize)]
pub struct FluxImage {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub content_type: Option<String>,
}
