//! Shared fixtures for unit tests: deterministic embedding providers that
//! never touch the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::EngineError;

/// Embedding provider backed by a fixed text → vector table.
///
/// Unknown texts get the default vector; every call is counted so tests can
/// assert on idempotency (e.g. upsert on an existing key must not re-embed).
pub struct StaticEmbedder {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    default: Vec<f32>,
    calls: AtomicUsize,
}

impl StaticEmbedder {
    pub fn new() -> Self {
        Self {
            vectors: Mutex::new(HashMap::new()),
            default: vec![1.0, 0.0, 0.0, 0.0],
            calls: AtomicUsize::new(0),
        }
    }

    pub fn register(&self, text: &str, vector: Vec<f32>) {
        self.vectors
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.trim().is_empty() {
            return Err(EngineError::Embedding("empty text".to_string()));
        }
        let vectors = self.vectors.lock().unwrap();
        Ok(vectors.get(text).cloned().unwrap_or_else(|| self.default.clone()))
    }
}

/// Embedding provider that always fails, standing in for an unavailable
/// service.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn generate_embedding(&self, _text: &str) -> Result<Vec<f32>, EngineError> {
        Err(EngineError::Embedding("embedding service down".to_string()))
    }
}
