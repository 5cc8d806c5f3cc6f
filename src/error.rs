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

use thiserror::Error;

/// Error taxonomy for the resolution engine.
///
/// Validation and embedding failures on index mutations propagate to the
/// mutation caller. Inside query resolution every downstream service failure
/// is caught at its boundary and converted into a degraded answer.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("embedding service failed: {0}")]
    Embedding(String),
    #[error("generation service failed: {0}")]
    Generation(String),
    #[error("session store failed: {0}")]
    SessionStore(String),
}

impl EngineError {
    pub fn validation<M: Into<String>>(msg: M) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn embedding<E: std::fmt::Display>(err: E) -> Self {
        EngineError::Embedding(err.to_string())
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        EngineError::Generation(err.to_string())
    }
}
