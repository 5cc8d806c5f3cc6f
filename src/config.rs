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

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Embedding service configuration (OpenAI-compatible endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Generative synthesis configuration. Synthesis is optional: when disabled
/// or the API key is absent the resolver degrades to template answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Tier thresholds for query resolution. These are tunables, not law.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Minimum cosine similarity for a chunk to enter the candidate pool.
    /// A query where nothing clears the floor resolves at Tier 3.
    pub admission_floor: f32,
    /// Minimum top-candidate similarity for a confident direct answer;
    /// weaker matches degrade to synthesis or the candidate list.
    pub similar_threshold: f32,
    /// At or above this similarity a canonical answer is returned verbatim.
    pub exact_threshold: f32,
    pub top_k: usize,
    pub max_context_chars: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            admission_floor: 0.30,
            similar_threshold: 0.55,
            exact_threshold: 0.92,
            top_k: 6,
            max_context_chars: 6000,
        }
    }
}

/// Session state lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub topic_ttl_secs: u64,
    pub summary_ttl_secs: u64,
    pub summary_max_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            topic_ttl_secs: 1800,
            summary_ttl_secs: 3600,
            summary_max_chars: 500,
        }
    }
}

/// Main configuration for octomentor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub resolver: ResolverConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from config.toml file
    /// First tries to load from system config directory, falls back to embedded template
    pub fn load() -> Result<Self> {
        let config_path = crate::storage::get_system_config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Config doesn't exist, create from template
            let template_content = include_str!("../config-templates/default.toml");
            let config: Self = toml::from_str(template_content)?;

            // Save to system config directory
            if let Some(parent) = config_path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(&config_path, template_content)?;

            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_template_parses_to_defaults() {
        let template = include_str!("../config-templates/default.toml");
        let config: Config = toml::from_str(template).expect("template must parse");

        let defaults = Config::default();
        assert_eq!(
            config.resolver.admission_floor,
            defaults.resolver.admission_floor
        );
        assert_eq!(
            config.resolver.similar_threshold,
            defaults.resolver.similar_threshold
        );
        assert_eq!(
            config.resolver.exact_threshold,
            defaults.resolver.exact_threshold
        );
        assert_eq!(config.resolver.top_k, defaults.resolver.top_k);
        assert_eq!(
            config.resolver.max_context_chars,
            defaults.resolver.max_context_chars
        );
        assert_eq!(config.session.topic_ttl_secs, defaults.session.topic_ttl_secs);
        assert_eq!(
            config.session.summary_ttl_secs,
            defaults.session.summary_ttl_secs
        );
        assert_eq!(
            config.session.summary_max_chars,
            defaults.session.summary_max_chars
        );
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str("[resolver]\ntop_k = 3\n").unwrap();
        assert_eq!(config.resolver.top_k, 3);
        assert_eq!(config.resolver.admission_floor, 0.30);
        assert_eq!(config.session.summary_max_chars, 500);
    }
}
