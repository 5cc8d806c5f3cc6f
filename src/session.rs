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

//! Per-session conversational state: the last discussed topic and a rolling
//! summary of recent turns.
//!
//! Everything here is best-effort. Loss on expiry or store failure is
//! acceptable and must never fail the surrounding request; failures are
//! logged and swallowed at this boundary.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::SessionConfig;
use crate::error::EngineError;

/// Key-value store with per-key TTL. Absence of a key is not an error.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), EngineError>;
}

/// In-process session store. Expiry is enforced at read time; there is no
/// background eviction sweep.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, deadline)) if *deadline > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), EngineError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }
}

/// Session identity: a stable key plus whether the caller is identified
/// (identified sessions get a conversation summary, anonymous ones only a
/// topic).
#[derive(Debug, Clone)]
pub struct SessionId {
    key: String,
    identified: bool,
}

impl SessionId {
    /// Session keyed by a user identity (e.g. an email address).
    pub fn identified<K: Into<String>>(key: K) -> Self {
        Self {
            key: key.into(),
            identified: true,
        }
    }

    /// Session keyed by network origin only.
    pub fn anonymous<K: Into<String>>(key: K) -> Self {
        Self {
            key: key.into(),
            identified: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_identified(&self) -> bool {
        self.identified
    }
}

/// Topic and rolling-summary accessors over a [`SessionStore`].
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// Last topic discussed in this session, if it has not expired.
    pub async fn current_topic(&self, session: &SessionId) -> Option<String> {
        match self.store.get(&topic_key(session)).await {
            Ok(topic) => topic,
            Err(err) => {
                warn!("session topic read failed: {}", err);
                None
            }
        }
    }

    /// Refresh the session topic with a new TTL window.
    pub async fn set_topic(&self, session: &SessionId, topic: &str) {
        let ttl = Duration::from_secs(self.config.topic_ttl_secs);
        if let Err(err) = self.store.set(&topic_key(session), topic, ttl).await {
            warn!("session topic write failed: {}", err);
        }
    }

    /// Rolling summary of recent turns; empty when absent or expired.
    pub async fn summary(&self, session: &SessionId) -> String {
        match self.store.get(&summary_key(session)).await {
            Ok(summary) => summary.unwrap_or_default(),
            Err(err) => {
                warn!("session summary read failed: {}", err);
                String::new()
            }
        }
    }

    /// Append one turn to the rolling summary, truncating the oldest content
    /// to stay within the character budget. Only identified sessions keep a
    /// summary. Read-modify-write without coordination: concurrent turns may
    /// race, last writer wins.
    pub async fn append_summary(&self, session: &SessionId, user_text: &str, bot_text: &str) {
        if !session.is_identified() {
            return;
        }

        let previous = self.summary(session).await;
        let appended = format!("{} User: {}. Bot: {}.", previous, user_text, bot_text);
        let truncated = keep_tail(&appended, self.config.summary_max_chars);

        let ttl = Duration::from_secs(self.config.summary_ttl_secs);
        if let Err(err) = self.store.set(&summary_key(session), &truncated, ttl).await {
            warn!("session summary write failed: {}", err);
        }
    }
}

fn topic_key(session: &SessionId) -> String {
    format!("currentContext:{}", session.key())
}

fn summary_key(session: &SessionId) -> String {
    format!("chatSummary:{}", session.key())
}

/// Keep the newest `max_chars` characters, dropping from the front.
fn keep_tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}
