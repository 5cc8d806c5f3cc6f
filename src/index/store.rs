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

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::embedding::EmbeddingProvider;
use crate::error::EngineError;
use crate::index::types::{Chunk, ChunkFilter, ChunkMetadata, IndexStats, Scope, SourceType};
use crate::vector;

/// Content-addressed in-memory index of knowledge chunks.
///
/// There is no secondary vector structure: similarity search materializes the
/// corpus and scans it linearly, which is the accepted design at the expected
/// corpus size. `scan_all` is the extension point for a real ANN index.
///
/// Writes on the same dedup key are not serialized against each other; the
/// last writer wins. Scans may miss a concurrent write.
pub struct ContentIndex {
    chunks: RwLock<Vec<Chunk>>,
    embedder: Arc<dyn EmbeddingProvider>,
    snapshot_path: Option<PathBuf>,
}

impl ContentIndex {
    /// Purely in-memory index (tests, embedded use).
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
            embedder,
            snapshot_path: None,
        }
    }

    /// Index backed by a best-effort JSON snapshot: loaded here when present,
    /// rewritten after every successful mutation. Snapshot failures are
    /// logged and never fail the operation.
    pub fn open(embedder: Arc<dyn EmbeddingProvider>, snapshot_path: PathBuf) -> Self {
        let chunks = match std::fs::read_to_string(&snapshot_path) {
            Ok(content) => match serde_json::from_str::<Vec<Chunk>>(&content) {
                Ok(chunks) => {
                    debug!(
                        "loaded {} chunks from snapshot {}",
                        chunks.len(),
                        snapshot_path.display()
                    );
                    chunks
                }
                Err(err) => {
                    warn!(
                        "ignoring unreadable index snapshot {}: {}",
                        snapshot_path.display(),
                        err
                    );
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        Self {
            chunks: RwLock::new(chunks),
            embedder,
            snapshot_path: Some(snapshot_path),
        }
    }

    /// Derive the dedup key: FAQ chunks are keyed by their text, everything
    /// else by its stable external identifier.
    pub fn derive_source_hash(
        source_type: SourceType,
        source_id: Option<&str>,
        text: &str,
    ) -> Result<String, EngineError> {
        match source_type {
            SourceType::Faq => {
                if text.trim().is_empty() {
                    return Err(EngineError::validation(
                        "FAQ chunks require text to derive the dedup key",
                    ));
                }
                Ok(hash_source(&format!("{}:{}", source_type, text)))
            }
            _ => {
                let source_id = source_id
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| {
                        EngineError::validation("source_id is required for non-FAQ sources")
                    })?;
                Ok(hash_source(&format!("{}:{}", source_type, source_id)))
            }
        }
    }

    /// Insert a chunk unless its dedup key is already indexed.
    ///
    /// Idempotent on an existing key: the stored chunk is returned unchanged
    /// and no embedding is regenerated. Embedding failure aborts the write
    /// and leaves the index untouched.
    pub async fn upsert(
        &self,
        text: &str,
        mut metadata: ChunkMetadata,
        scope: Scope,
        answer: Option<String>,
    ) -> Result<Chunk, EngineError> {
        let source_hash =
            Self::derive_source_hash(metadata.source_type, metadata.source_id.as_deref(), text)?;

        if let Some(existing) = self.find_by_hash(&source_hash) {
            return Ok(existing);
        }
        self.ensure_text_unique(text, &source_hash)?;

        let embedding = vector::normalize(&self.embedder.generate_embedding(text).await?);

        metadata.source_hash = Some(source_hash.clone());
        let chunk = Chunk::new(text.to_string(), answer, embedding, metadata, scope);

        {
            let mut chunks = self.chunks.write().expect("index lock poisoned");
            // A concurrent writer may have landed the same key while we were
            // embedding; keep upsert idempotent in that case too.
            if let Some(existing) = chunks
                .iter()
                .find(|c| c.metadata.source_hash.as_deref() == Some(source_hash.as_str()))
            {
                return Ok(existing.clone());
            }
            chunks.push(chunk.clone());
        }

        self.save_snapshot();
        Ok(chunk)
    }

    /// Re-index an existing chunk: new text is re-embedded, metadata and
    /// scope are replaced, the dedup key is recomputed and stored, and the
    /// version is bumped. An update on a never-indexed key falls back to
    /// insert semantics.
    ///
    /// The stored answer is replaced only when the chunk already carried a
    /// non-empty answer; unrelated updates can neither null a canonical FAQ
    /// answer nor attach one.
    pub async fn update(
        &self,
        text: &str,
        mut metadata: ChunkMetadata,
        scope: Scope,
        answer: Option<String>,
    ) -> Result<Chunk, EngineError> {
        let source_hash =
            Self::derive_source_hash(metadata.source_type, metadata.source_id.as_deref(), text)?;

        if self.find_by_hash(&source_hash).is_none() {
            return self.upsert(text, metadata, scope, answer).await;
        }
        self.ensure_text_unique(text, &source_hash)?;

        // Embed before mutating: a failed embedding must leave prior state
        // untouched.
        let embedding = vector::normalize(&self.embedder.generate_embedding(text).await?);

        let updated = {
            let mut chunks = self.chunks.write().expect("index lock poisoned");
            let position = chunks
                .iter()
                .position(|c| c.metadata.source_hash.as_deref() == Some(source_hash.as_str()));

            match position {
                Some(position) => {
                    let chunk = &mut chunks[position];
                    metadata.source_hash = Some(source_hash.clone());
                    metadata.version = chunk.metadata.version + 1;

                    if chunk.answer.as_deref().is_some_and(|a| !a.is_empty()) {
                        if let Some(new_answer) = answer.filter(|a| !a.is_empty()) {
                            chunk.answer = Some(new_answer);
                        }
                    }
                    chunk.text = text.to_string();
                    chunk.embedding = embedding;
                    chunk.metadata = metadata;
                    chunk.scope = scope;
                    chunk.updated_at = Utc::now();
                    chunk.clone()
                }
                None => {
                    // The chunk vanished while we were embedding; insert.
                    metadata.source_hash = Some(source_hash.clone());
                    let chunk = Chunk::new(text.to_string(), answer, embedding, metadata, scope);
                    chunks.push(chunk.clone());
                    chunk
                }
            }
        };

        self.save_snapshot();
        Ok(updated)
    }

    /// Delete chunks by exact dedup key when the filter can derive one,
    /// otherwise by partial metadata match (AND across provided fields).
    pub fn delete(&self, filter: &ChunkFilter) -> Result<usize, EngineError> {
        if filter.is_empty() {
            return Err(EngineError::validation(
                "delete requires a metadata filter",
            ));
        }

        let exact_hash = filter.source_type.and_then(|source_type| {
            Self::derive_source_hash(
                source_type,
                filter.source_id.as_deref(),
                filter.text.as_deref().unwrap_or(""),
            )
            .ok()
        });

        let removed = {
            let mut chunks = self.chunks.write().expect("index lock poisoned");
            let before = chunks.len();
            match exact_hash {
                Some(hash) => {
                    chunks.retain(|c| c.metadata.source_hash.as_deref() != Some(hash.as_str()))
                }
                None => chunks.retain(|c| !filter.matches(&c.metadata)),
            }
            before - chunks.len()
        };

        if removed > 0 {
            self.save_snapshot();
        }
        Ok(removed)
    }

    /// First chunk matching the predicate, in insertion order.
    pub fn find_exact<F>(&self, predicate: F) -> Option<Chunk>
    where
        F: Fn(&Chunk) -> bool,
    {
        let chunks = self.chunks.read().expect("index lock poisoned");
        chunks.iter().find(|c| predicate(c)).cloned()
    }

    /// Materialize the corpus for similarity scanning. Insertion order is
    /// stable and doubles as the tie-break order for equal scores.
    pub fn scan_all(&self) -> Vec<Chunk> {
        self.chunks.read().expect("index lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.chunks.read().expect("index lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> IndexStats {
        let chunks = self.chunks.read().expect("index lock poisoned");

        let mut by_source_type = std::collections::HashMap::new();
        let mut oldest = None;
        let mut newest = None;

        for chunk in chunks.iter() {
            *by_source_type
                .entry(chunk.metadata.source_type.to_string())
                .or_insert(0usize) += 1;

            if oldest.is_none_or(|old| chunk.created_at < old) {
                oldest = Some(chunk.created_at);
            }
            if newest.is_none_or(|new| chunk.created_at > new) {
                newest = Some(chunk.created_at);
            }
        }

        IndexStats {
            total_chunks: chunks.len(),
            by_source_type,
            oldest_indexed: oldest,
            newest_indexed: newest,
        }
    }

    fn find_by_hash(&self, source_hash: &str) -> Option<Chunk> {
        let chunks = self.chunks.read().expect("index lock poisoned");
        chunks
            .iter()
            .find(|c| c.metadata.source_hash.as_deref() == Some(source_hash))
            .cloned()
    }

    /// Chunk text is globally unique across the index, independently of the
    /// dedup key.
    fn ensure_text_unique(&self, text: &str, source_hash: &str) -> Result<(), EngineError> {
        let chunks = self.chunks.read().expect("index lock poisoned");
        let collision = chunks.iter().any(|c| {
            c.text == text && c.metadata.source_hash.as_deref() != Some(source_hash)
        });
        if collision {
            return Err(EngineError::validation(
                "chunk text is already indexed under a different source",
            ));
        }
        Ok(())
    }

    fn save_snapshot(&self) {
        let Some(path) = self.snapshot_path.as_ref() else {
            return;
        };

        let chunks = self.chunks.read().expect("index lock poisoned");
        match serde_json::to_string(&*chunks) {
            Ok(serialized) => {
                if let Err(err) = std::fs::write(path, serialized) {
                    warn!("failed to write index snapshot {}: {}", path.display(), err);
                }
            }
            Err(err) => warn!("failed to serialize index snapshot: {}", err),
        }
    }
}

fn hash_source(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
