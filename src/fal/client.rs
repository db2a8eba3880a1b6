use crate::models::DEFAULT_API_BASE;
use crate::{Error, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Thin REST client for the synchronous `fal.run` endpoints.
///
/// No request timeout is set: a generation blocks until the remote job is
/// done.
pub struct FalHttpClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FalHttpClient {
    pub fn new(api_key: String) -> Self {
        Self::new_with_client(api_key, DEFAULT_API_BASE.to_string(), Client::new())
    }

    pub fn new_with_client(api_key: String, base_url: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `request` to `<base_url>/<model_id>` and decode the result.
    pub async fn run<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        model_id: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!("{}/{}", self.base_url, model_id.trim_start_matches('/'));
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Key {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to fal: {}", e);
                Error::Generation(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("fal API error (status {}): {}", status, error_text);
            return Err(Error::Generation(format!(
                "fal API error (status {}): {}",
                status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse fal response: {}\nBody: {}", e, body);
            Error::Generation(format!("Failed to parse fal response: {}", e))
        })
    }
}
