//! OpenAI-compatible embedding client.

use crate::config::EmbeddingConfig;
use crate::error::{EvalError, Result};
use crate::llm::ApiError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Client for the `/v1/embeddings` endpoint.
#[derive(Clone)]
pub struct Embedder {
    client: Client,
    config: EmbeddingConfig,
}

impl Embedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Embedding model name; also the default vector name in the store.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Vector dimension the model is configured to produce.
    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn endpoint(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        format!("{}/v1/embeddings", base)
    }

    /// Embed a single text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| EvalError::Embedding("Empty embedding response".to_string()))
    }

    /// Embed many texts, splitting them into requests of `batch_size`.
    pub async fn embed_all(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let batch_size = self.config.batch_size.max(1);
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size) {
            vectors.extend(self.embed_batch(batch).await?);
        }

        Ok(vectors)
    }

    /// Embed one batch of texts in a single request, in input order.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(model = %self.config.model, count = texts.len(), "embedding batch");

        let request = EmbeddingRequest {
            model: &self.config.model,
            input: texts,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
                return Err(EvalError::Embedding(format!(
                    "API error ({}): {}",
                    status, api_error.error.message
                )));
            }
            return Err(EvalError::Embedding(format!(
                "Request failed ({}): {}",
                status, body
            )));
        }

        let vectors = Self::parse_response(&body, texts.len())?;
        self.check_dimensions(&vectors)?;
        Ok(vectors)
    }

    fn parse_response(body: &str, expected: usize) -> Result<Vec<Vec<f32>>> {
        let mut parsed: EmbeddingResponse = serde_json::from_str(body)
            .map_err(|e| EvalError::Embedding(format!("Invalid response: {}", e)))?;

        if parsed.data.len() != expected {
            return Err(EvalError::Embedding(format!(
                "Expected {} embeddings, got {}",
                expected,
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn check_dimensions(&self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.config.dimensions) {
            return Err(EvalError::Embedding(format!(
                "Model '{}' returned {} dimensions, expected {}",
                self.config.model,
                bad.len(),
                self.config.dimensions
            )));
        }
        Ok(())
    }
}
