// Copyright 2026 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::EngineError;

/// Opaque embedding service: text in, ordered floats out.
///
/// Implementations fail with `EngineError::Embedding` on empty input or
/// service unavailability. Consumers normalize the output before storing or
/// comparing it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, EngineError>;
}

/// Create embedding provider from config
pub fn create_embedding_provider(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EngineError> {
    let api_key = std::env::var(&config.api_key_env).ok();
    let provider = HttpEmbeddingProvider::new(
        config.endpoint.clone(),
        config.model.clone(),
        api_key,
        Duration::from_secs(config.timeout_secs),
    )?;
    Ok(Arc::new(provider))
}

/// Embeddings client for OpenAI-compatible `/embeddings` endpoints.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbeddingProvider {
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EngineError::embedding)?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            model,
            api_key,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::Embedding(
                "empty text passed to embedding generation".to_string(),
            ));
        }
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            EngineError::Embedding("embedding API key not configured".to_string())
        })?;

        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(EngineError::embedding)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EngineError::Embedding(format!(
                "embeddings request failed ({}): {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(EngineError::embedding)?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .unwrap_or_default();

        if vector.is_empty() {
            return Err(EngineError::Embedding(
                "embedding service returned an empty vector".to_string(),
            ));
        }

        Ok(vector)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
