use super::client::FalHttpClient;
use super::types::{FluxArguments, FluxResponse};
use super::GenerationService;
use crate::models::{
    GenerationRequest, GenerationResult, ResultImage, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL,
};
use crate::{Error, Result};
use async_trait::async_trait;

/// Which FLUX variant a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxModel {
    /// Text-to-image.
    Ultra,
    /// Image-conditioned ("redux").
    UltraRedux,
}

impl FluxModel {
    /// Depends only on whether a reference image is attached.
    pub fn for_request(request: &GenerationRequest) -> Self {
        if request.reference.is_some() {
            FluxModel::UltraRedux
        } else {
            FluxModel::Ultra
        }
    }
}

/// Model identifiers for both variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluxModels {
    pub text: String,
    pub image: String,
}

impl Default for FluxModels {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_MODEL.to_string(),
            image: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }
}

impl FluxModels {
    pub fn id(&self, model: FluxModel) -> &str {
        match model {
            FluxModel::Ultra => &self.text,
            FluxModel::UltraRedux => &self.image,
        }
    }
}

pub struct FalGenerationClient {
    http: FalHttpClient,
    models: FluxModels,
}

impl FalGenerationClient {
    pub fn new(api_key: String) -> Self {
        Self::new_with_http(FalHttpClient::new(api_key), FluxModels::default())
    }

    pub fn new_with_http(http: FalHttpClient, models: FluxModels) -> Self {
        Self { http, models }
    }
}

#[async_trait]
impl GenerationService for FalGenerationClient {
    fn model_for(&self, request: &GenerationRequest) -> String {
        self.models.id(FluxModel::for_request(request)).to_string()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let model_id = self.model_for(request);
        let arguments = FluxArguments::from(request);

        tracing::info!(
            "Submitting request to fal with model {} (aspect ratio {}, seed {:?}, reference {})",
            model_id,
            arguments.aspect_ratio,
            arguments.seed,
            arguments.image_url.is_some()
        );

        let response: FluxResponse = self.http.run(&model_id, &arguments).await?;

        if response.images.is_empty() {
            return Err(Error::Generation(
                "fal response contained no images".to_string(),
            ));
        }
        if response.has_nsfw_concepts.iter().any(|flagged| *flagged) {
            tracing::warn!("fal flagged at least one image as NSFW");
        }
        tracing::info!(
            "fal returned {} image(s) (seed {:?})",
            response.images.len(),
            response.seed
        );

        Ok(GenerationResult {
            images: response
                .images
                .into_iter()
                .map(|image| ResultImage::remote(image.url))
                .collect(),
        })
    }
}
