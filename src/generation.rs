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

use crate::config::GenerationConfig;
use crate::error::EngineError;

/// Opaque generative synthesis service: prompt in, text out.
///
/// Strictly best-effort from the resolver's point of view: a failed or empty
/// response degrades to a template answer, never a fatal error.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, EngineError>;
}

/// Create the generative provider from config, or `None` when synthesis is
/// disabled or no API key is present in the environment.
pub fn create_generative_provider(
    config: &GenerationConfig,
) -> Result<Option<Arc<dyn GenerativeProvider>>, EngineError> {
    if !config.enabled {
        return Ok(None);
    }
    let api_key = match std::env::var(&config.api_key_env) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => return Ok(None),
    };

    let provider = HttpGenerativeProvider::new(
        config.endpoint.clone(),
        config.model.clone(),
        api_key,
        Duration::from_secs(config.timeout_secs),
    )?;
    Ok(Some(Arc::new(provider)))
}

/// Chat client for OpenAI-compatible `/chat/completions` endpoints.
pub struct HttpGenerativeProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl HttpGenerativeProvider {
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EngineError::generation)?;
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            model,
            api_key,
        })
    }
}

#[async_trait]
impl GenerativeProvider for HttpGenerativeProvider {
    async fn generate(&self, prompt: &str) -> Result<String, EngineError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(EngineError::generation)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EngineError::Generation(format!(
                "chat request failed ({}): {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(EngineError::generation)?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(text.trim().to_string())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}
