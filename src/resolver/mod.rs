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

//! Tiered query resolution.
//!
//! A query walks through safety check → insight check → affirmation rewrite
//! → Tier 1 (exact) → Tier 2 (similar, optionally synthesized) → Tier 3
//! (no match). Session side effects happen only at the end of a successful
//! resolution and are best-effort: their failure never changes the answer.

pub mod insight;

#[cfg(test)]
mod resolver_tests;

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::EngineError;
use crate::generation::GenerativeProvider;
use crate::index::store::ContentIndex;
use crate::index::types::{Chunk, ScoredChunk, SourceType};
use crate::intent;
use crate::resolver::insight::InsightFilter;
use crate::session::{SessionContext, SessionId};
use crate::vector;

const REFUSAL_MESSAGE: &str =
    "I can't help with that request. Please keep queries professional and related to learning.";
const NO_MATCH_MESSAGE: &str =
    "I couldn't find relevant information. Would you like me to create a support ticket for this?";
const BE_MORE_SPECIFIC_MESSAGE: &str =
    "I found related information in our knowledge base. Could you be more specific?";

/// Match-confidence level of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Insight,
    Exact,
    Similar,
    NoMatch,
    Refused,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Insight => write!(f, "insight"),
            Tier::Exact => write!(f, "1"),
            Tier::Similar => write!(f, "2"),
            Tier::NoMatch => write!(f, "3"),
            Tier::Refused => write!(f, "refused"),
        }
    }
}

impl Serialize for Tier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Caller-facing resolution result. `context_used` carries the chunks the
/// answer is grounded in, for auditability; `show_ticket_option` is set
/// whenever the answer signals irrelevance or uncertainty.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub tier: Tier,
    pub answer: String,
    pub context_used: Vec<Chunk>,
    pub show_ticket_option: bool,
}

/// Orchestrates the content index, the two external services and the session
/// context into the three-tier decision pipeline. All collaborators are
/// injected; there are no ambient singletons.
pub struct TieredResolver {
    index: Arc<ContentIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Option<Arc<dyn GenerativeProvider>>,
    session: SessionContext,
    config: ResolverConfig,
}

impl TieredResolver {
    pub fn new(
        index: Arc<ContentIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Option<Arc<dyn GenerativeProvider>>,
        session: SessionContext,
        config: ResolverConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            generator,
            session,
            config,
        }
    }

    /// Resolve one query for one session.
    ///
    /// The only hard failure is empty input; every downstream service
    /// failure degrades to a lower tier or a template answer.
    pub async fn resolve(
        &self,
        text: &str,
        session: &SessionId,
    ) -> Result<Resolution, EngineError> {
        let mut clean_text = text.trim().to_string();
        if clean_text.is_empty() {
            return Err(EngineError::validation("query text is required"));
        }

        // Safety first: refusals read and write no state.
        if intent::is_inappropriate(&clean_text) {
            return Ok(Resolution {
                tier: Tier::Refused,
                answer: REFUSAL_MESSAGE.to_string(),
                context_used: Vec::new(),
                show_ticket_option: false,
            });
        }

        // Analytical intents run an aggregation instead of retrieval. An
        // empty aggregation falls through to the retrieval tiers.
        if let Some(insight_intent) = intent::detect_insight_intent(&clean_text) {
            let outcome = match insight_intent {
                intent::InsightIntent::HighestRatedCourse => {
                    insight::highest_rated(&self.index, &InsightFilter::default())
                }
            };
            if let Some(outcome) = outcome {
                if let Some(ref topic) = outcome.topic {
                    self.session.set_topic(session, topic).await;
                }
                self.session
                    .append_summary(session, &clean_text, &outcome.answer)
                    .await;
                return Ok(Resolution {
                    tier: Tier::Insight,
                    answer: outcome.answer,
                    context_used: outcome.context_used,
                    show_ticket_option: false,
                });
            }
        }

        // A bare affirmation continues the previous topic, when one exists.
        if intent::is_affirmation(&clean_text) {
            if let Some(topic) = self.session.current_topic(session).await {
                clean_text = format!("tell me about {}", topic);
            }
        }

        // Tier 1: exact FAQ text or direct course hit by name.
        if let Some(resolution) = self.tier1_exact(&clean_text).await {
            if let Some(title) = resolution
                .context_used
                .first()
                .and_then(|chunk| chunk.course_title())
            {
                self.session.set_topic(session, &title).await;
            }
            self.session
                .append_summary(session, &clean_text, &resolution.answer)
                .await;
            return Ok(resolution);
        }

        // Tier 2: semantic candidates over the whole corpus.
        let scored = self.embed_and_search(&clean_text, self.config.top_k).await;

        // Tier 3: nothing cleared the admission floor at all.
        if scored.is_empty() {
            return Ok(Resolution {
                tier: Tier::NoMatch,
                answer: NO_MATCH_MESSAGE.to_string(),
                context_used: Vec::new(),
                show_ticket_option: true,
            });
        }

        let top = scored[0].clone();

        // Near-exact semantic hit on a canonical answer bypasses synthesis.
        if let Some(answer) = top.chunk.answer.clone().filter(|a| !a.is_empty()) {
            if top.similarity >= self.config.exact_threshold {
                if let Some(title) = top.chunk.course_title() {
                    self.session.set_topic(session, &title).await;
                }
                self.session
                    .append_summary(session, &clean_text, &answer)
                    .await;
                return Ok(Resolution {
                    tier: Tier::Similar,
                    answer,
                    context_used: vec![top.chunk],
                    show_ticket_option: false,
                });
            }
        }

        // Confident course hit: answer directly from metadata. Below the
        // similarity threshold a single item cannot be asserted, so weaker
        // matches fall through to synthesis or the candidate list.
        if top.chunk.metadata.source_type == SourceType::Course
            && top.similarity >= self.config.similar_threshold
        {
            let title = top
                .chunk
                .course_title()
                .unwrap_or_else(|| "this course".to_string());
            let price = top
                .chunk
                .metadata
                .price
                .map(|price| format!(" at ₹{}", price))
                .unwrap_or_default();
            let answer = format!("The course **{}** is available{}.", title, price);

            self.session.set_topic(session, &title).await;
            self.session
                .append_summary(session, &clean_text, &answer)
                .await;
            return Ok(Resolution {
                tier: Tier::Similar,
                answer,
                context_used: vec![top.chunk],
                show_ticket_option: false,
            });
        }

        // Otherwise synthesize from the top-K, or degrade to a template.
        let resolution = self.synthesize(&clean_text, &scored, session).await;

        if let Some(name) = top
            .chunk
            .metadata
            .course_name
            .as_ref()
            .filter(|name| !name.is_empty())
        {
            self.session.set_topic(session, name).await;
        }
        self.session
            .append_summary(session, &clean_text, &resolution.answer)
            .await;
        Ok(resolution)
    }

    /// Tier 1: an FAQ whose text equals the query (case-insensitive) and
    /// carries a canonical answer, or a course whose name contains the
    /// extracted topic candidate.
    async fn tier1_exact(&self, text: &str) -> Option<Resolution> {
        let query = text.to_lowercase();
        let faq = self.index.find_exact(|chunk| {
            chunk.metadata.source_type == SourceType::Faq && chunk.text.to_lowercase() == query
        });
        if let Some(faq) = faq {
            if let Some(answer) = faq.answer.clone().filter(|a| !a.is_empty()) {
                return Some(Resolution {
                    tier: Tier::Exact,
                    answer,
                    context_used: vec![faq],
                    show_ticket_option: false,
                });
            }
        }

        let candidate = self.normalized_topic_candidate(text).await;
        if candidate.is_empty() {
            return None;
        }
        let needle = candidate.to_lowercase();
        let course = self.index.find_exact(|chunk| {
            chunk.metadata.source_type == SourceType::Course
                && chunk
                    .metadata
                    .course_name
                    .as_ref()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
        })?;

        let title = course
            .course_title()
            .unwrap_or_else(|| "this course".to_string());
        let price = course
            .metadata
            .price
            .map(|price| format!(" It costs ₹{}.", price))
            .unwrap_or_default();

        Some(Resolution {
            tier: Tier::Exact,
            answer: format!("The course **{}** is available.{}", title, price),
            context_used: vec![course],
            show_ticket_option: false,
        })
    }

    /// Spell-correct the query (best-effort, only when a generative service
    /// is configured), then extract the topic phrase.
    async fn normalized_topic_candidate(&self, text: &str) -> String {
        let normalized = match &self.generator {
            Some(generator) => match generator.generate(&spell_correction_prompt(text)).await {
                Ok(corrected) if !corrected.is_empty() => corrected,
                Ok(_) => text.to_string(),
                Err(err) => {
                    debug!("query normalization failed, using raw text: {}", err);
                    text.to_string()
                }
            },
            None => text.to_string(),
        };

        intent::extract_topic_candidate(&normalized)
    }

    /// Embed the query and linear-scan the corpus. An embedding failure
    /// degrades to an empty candidate list instead of propagating.
    async fn embed_and_search(&self, text: &str, top_k: usize) -> Vec<ScoredChunk> {
        let query_embedding = match self.embedder.generate_embedding(text).await {
            Ok(embedding) => vector::normalize(&embedding),
            Err(err) => {
                warn!("tier-2 embedding failed, degrading to no candidates: {}", err);
                return Vec::new();
            }
        };

        let mut scored: Vec<ScoredChunk> = self
            .index
            .scan_all()
            .into_iter()
            .filter_map(|chunk| {
                let similarity = vector::cosine_similarity(&query_embedding, &chunk.embedding);
                (similarity >= self.config.admission_floor)
                    .then_some(ScoredChunk { chunk, similarity })
            })
            .collect();

        // Stable sort: equal scores keep their scan order.
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }

    /// Synthesize an answer from the candidate set via the generative
    /// service, or degrade to the titled candidate list.
    async fn synthesize(
        &self,
        question: &str,
        scored: &[ScoredChunk],
        session: &SessionId,
    ) -> Resolution {
        let context_used: Vec<Chunk> = scored.iter().map(|s| s.chunk.clone()).collect();

        if let Some(ref generator) = self.generator {
            let summary = self.session.summary(session).await;
            let context_text = build_context(scored, self.config.max_context_chars);
            let prompt = synthesis_prompt(&summary, &context_text, question);

            match generator.generate(&prompt).await {
                Ok(response) if !response.is_empty() => {
                    return Resolution {
                        tier: Tier::Similar,
                        show_ticket_option: intent::signals_uncertainty(&response),
                        answer: response,
                        context_used,
                    };
                }
                Ok(_) => debug!("generation returned empty output, degrading to template"),
                Err(err) => warn!("generation failed, degrading to template: {}", err),
            }
        }

        self.degraded_candidate_list(scored, context_used)
    }

    /// No-LLM degradation: up to 3 titled candidates as bullets, or a
    /// "be more specific" prompt (with the ticket flag) when none carry a
    /// title.
    fn degraded_candidate_list(
        &self,
        scored: &[ScoredChunk],
        context_used: Vec<Chunk>,
    ) -> Resolution {
        let bullets: Vec<String> = scored
            .iter()
            .filter_map(|s| {
                s.chunk.display_title().map(|title| {
                    let price = s
                        .chunk
                        .metadata
                        .price
                        .map(|price| format!(" (₹{})", price))
                        .unwrap_or_default();
                    format!("• {}{}", title, price)
                })
            })
            .take(3)
            .collect();

        if bullets.is_empty() {
            Resolution {
                tier: Tier::Similar,
                answer: BE_MORE_SPECIFIC_MESSAGE.to_string(),
                context_used,
                show_ticket_option: true,
            }
        } else {
            Resolution {
                tier: Tier::Similar,
                answer: format!(
                    "I found related content that might help:\n{}\n\nTell me which one you want to explore.",
                    bullets.join("\n")
                ),
                context_used,
                show_ticket_option: false,
            }
        }
    }
}

/// Concatenate deduplicated chunk texts up to the character budget. A chunk
/// that would overflow the budget ends the context; chunks are never cut
/// mid-text.
fn build_context(scored: &[ScoredChunk], max_chars: usize) -> String {
    let mut context = String::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for candidate in scored {
        let text = candidate.chunk.text.trim();
        if text.is_empty() || seen.contains(text) {
            continue;
        }
        if context.chars().count() + 1 + text.chars().count() > max_chars {
            break;
        }
        if !context.is_empty() {
            context.push('\n');
        }
        context.push_str(text);
        seen.insert(text);
    }

    context
}

fn guardrail_system_prompt() -> &'static str {
    "You are a helpful support assistant for an e-learning platform.\n\n\
     Rules:\n\
     - Always prioritize direct FAQ answers (if available).\n\
     - Prefer factual, actionable details from metadata (course name, price, rating).\n\
     - Answer ONLY from the provided context or summarized chat history.\n\
     - If the query is inappropriate or unsafe, politely refuse.\n\
     - If context is insufficient, suggest creating a support ticket.\n\
     - Be concise, clear, and friendly."
}

fn synthesis_prompt(summary: &str, context: &str, question: &str) -> String {
    format!(
        "{}\n\nConversation summary: {}\n\nContext:\n{}\n\nUser question: {}\n\n\
         Instructions:\n\
         - If multiple relevant items exist, list up to 3 (title + price when available).\n\
         - Use ONLY the context above; don't invent data.\n\
         - End with a brief next step suggestion.",
        guardrail_system_prompt(),
        summary,
        context,
        question
    )
}

fn spell_correction_prompt(query: &str) -> String {
    format!(
        "Correct the following query for spelling/grammar ONLY if you're highly confident.\n\
         Do NOT change brand names, proper nouns, or course titles.\n\
         Return only the corrected text.\n\n\
         Query: \"{}\"",
        query
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::{Chunk, ChunkMetadata};

    fn scored(text: &str, similarity: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk::new(
                text.to_string(),
                None,
                vec![1.0],
                ChunkMetadata::new(SourceType::Faq),
                Default::default(),
            ),
            similarity,
        }
    }

    #[test]
    fn test_build_context_dedupes_and_respects_budget() {
        let candidates = vec![
            scored("alpha text", 0.9),
            scored("alpha text", 0.8),
            scored("beta text", 0.7),
            scored("a chunk far too large for the remaining budget", 0.6),
        ];

        let context = build_context(&candidates, 25);
        assert_eq!(context, "alpha text\nbeta text");
    }

    #[test]
    fn test_build_context_drops_whole_overflowing_chunk() {
        let candidates = vec![scored("12345", 0.9), scored("67890", 0.8)];
        // Second chunk would need 5 + 1 newline over a budget of 8.
        let context = build_context(&candidates, 8);
        assert_eq!(context, "12345");
    }

    #[test]
    fn test_tier_tags_serialize_as_strings() {
        assert_eq!(serde_json::to_string(&Tier::Insight).unwrap(), "\"insight\"");
        assert_eq!(serde_json::to_string(&Tier::Exact).unwrap(), "\"1\"");
        assert_eq!(serde_json::to_string(&Tier::Similar).unwrap(), "\"2\"");
        assert_eq!(serde_json::to_string(&Tier::NoMatch).unwrap(), "\"3\"");
    }
}
