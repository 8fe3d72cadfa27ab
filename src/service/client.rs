use crate::config::ServiceConfig;
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Audio service operations used by the CLI.
#[async_trait::async_trait]
pub trait AudioServiceApi: Send + Sync {
    /// Stored metadata for an audio checksum; `None` when the service has none.
    async fn get_audio_metadata(&self, checksum: &str) -> Result<Option<Value>>;

    /// A content item's cohort; `None` when it does not exist.
    async fn get_cohort(&self, content_id: &str) -> Result<Option<Value>>;

    /// Replace a content item's cohort, returning the stored document.
    async fn put_cohort(&self, content_id: &str, cohort: &Value) -> Result<Option<Value>>;
}

pub struct AudioServiceClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl AudioServiceClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .context("No audio service URL configured (set [service].base_url or AUDIO_SERVICE_URL)")?;
        Ok(Self::new(
            base_url,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        ))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.api_key {
            Some(ref key) => builder.header("X-Api-Key", key),
            None => builder,
        }
    }

    async fn read_json(response: reqwest::Response, context_msg: &str) -> Result<Option<Value>> {
        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND {
            tracing::debug!("{}: {}", context_msg, status);
            return Ok(None);
        }
        if !status.is_success() {
            let error = response.text().await.unwrap_or_default();
            anyhow::bail!("{}: {} {}", context_msg, status, error);
        }
        let body = response
            .json()
            .await
            .with_context(|| format!("{}: invalid JSON", context_msg))?;
        Ok(Some(body))
    }
}

#[async_trait::async_trait]
impl AudioServiceApi for AudioServiceClient {
    async fn get_audio_metadata(&self, checksum: &str) -> Result<Option<Value>> {
        let path = format!("/audio/{}/metadata", checksum);
        let response = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .context(format!("Failed to GET {}", path))?;
        Self::read_json(response, "Failed to fetch audio metadata").await
    }

    async fn get_cohort(&self, content_id: &str) -> Result<Option<Value>> {
        let path = format!("/cohorts/{}", content_id);
        let response = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .context(format!("Failed to GET {}", path))?;
        Self::read_json(response, "Failed to fetch cohort").await
    }

    async fn put_cohort(&self, content_id: &str, cohort: &Value) -> Result<Option<Value>> {
        let path = format!("/cohorts/{}", content_id);
        let response = self
            .request(reqwest::Method::POST, &path)
            .json(cohort)
            .send()
            .await
            .context(format!("Failed to POST {}", path))?;
        Self::read_json(response, "Failed to replace cohort").await
    }
}
