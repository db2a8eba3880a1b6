use super::generation::{FluxModel, FluxModels};
use super::GenerationService;
use crate::models::{GenerationRequest, GenerationResult, ResultImage};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockGenerationClient {
    url_responses: Arc<Mutex<Vec<Vec<String>>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    failure: Arc<Mutex<Option<String>>>,
    models: FluxModels,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self {
            url_responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            models: FluxModels::default(),
        }
    }

    /// Queue the URLs returned by one call; responses cycle.
    pub fn with_urls(self, urls: Vec<String>) -> Self {
        self.url_responses.lock().unwrap().push(urls);
        self
    }

    /// Fail every call with a generation error carrying `message`.
    pub fn with_failure(self, message: &str) -> Self {
        *self.failure.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn get_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationService for MockGenerationClient {
    fn model_for(&self, request: &GenerationRequest) -> String {
        self.models.id(FluxModel::for_request(request)).to_string()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let count = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(Error::Generation(message));
        }

        let responses = self.url_responses.lock().unwrap();
        let urls = if responses.is_empty() {
            vec![format!("https://mock-fal.example.com/files/image_{}.jpg", count)]
        } else {
            responses[(count - 1) % responses.len()].clone()
        };

        Ok(GenerationResult {
            images: urls.into_iter().map(ResultImage::remote).collect(),
        })
    }
}
