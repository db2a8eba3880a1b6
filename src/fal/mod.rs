//! fal.ai FLUX image generation
//!
//! Builds the request for the hosted FLUX models, submits it to the blocking
//! `fal.run` endpoint and hands back the URLs of the produced images.

pub mod client;
pub mod generation;
pub mod mock;
pub mod types;

pub use client::FalHttpClient;
pub use generation::{FalGenerationClient, FluxModel, FluxModels};
pub use mock::MockGenerationClient;

use crate::models::{GenerationRequest, GenerationResult};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Model identifier the request will be sent to.
    fn model_for(&self, request: &GenerationRequest) -> String;

    /// Submit one request and wait for the remote job to finish.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult>;
}
