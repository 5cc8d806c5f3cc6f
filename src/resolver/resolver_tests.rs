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

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::config::{ResolverConfig, SessionConfig};
    use crate::error::EngineError;
    use crate::generation::GenerativeProvider;
    use crate::index::store::ContentIndex;
    use crate::index::types::{ChunkMetadata, Scope, SourceType};
    use crate::resolver::{Tier, TieredResolver};
    use crate::session::{InMemorySessionStore, SessionContext, SessionId};
    use crate::test_support::{FailingEmbedder, StaticEmbedder};

    /// Canned generative service for synthesis-path tests.
    struct StaticGenerator {
        response: String,
    }

    #[async_trait]
    impl GenerativeProvider for StaticGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, EngineError> {
            Ok(self.response.clone())
        }
    }

    struct Harness {
        resolver: TieredResolver,
        index: Arc<ContentIndex>,
        embedder: Arc<StaticEmbedder>,
        session: SessionContext,
    }

    fn harness() -> Harness {
        let embedder = Arc::new(StaticEmbedder::new());
        build(embedder.clone(), embedder, None)
    }

    fn build(
        index_embedder: Arc<StaticEmbedder>,
        query_embedder: Arc<StaticEmbedder>,
        generator: Option<Arc<dyn GenerativeProvider>>,
    ) -> Harness {
        let index = Arc::new(ContentIndex::new(index_embedder));
        let session = SessionContext::new(
            Arc::new(InMemorySessionStore::new()),
            SessionConfig::default(),
        );
        let resolver = TieredResolver::new(
            index.clone(),
            query_embedder.clone(),
            generator,
            session.clone(),
            ResolverConfig::default(),
        );
        Harness {
            resolver,
            index,
            embedder: query_embedder,
            session,
        }
    }

    async fn seed_faq(h: &Harness, question: &str, answer: Option<&str>) {
        h.index
            .upsert(
                question,
                ChunkMetadata::new(SourceType::Faq),
                Scope::Public,
                answer.map(|a| a.to_string()),
            )
            .await
            .unwrap();
    }

    async fn seed_course(h: &Harness, id: &str, name: &str, price: Option<f64>) {
        let metadata = ChunkMetadata {
            source_id: Some(id.to_string()),
            course_id: Some(json!(id)),
            course_name: Some(name.to_string()),
            price,
            ..ChunkMetadata::new(SourceType::Course)
        };
        h.index
            .upsert(&format!("Course: {}", name), metadata, Scope::Public, None)
            .await
            .unwrap();
    }

    async fn seed_review(h: &Harness, id: &str, course_id: &str, rating: f64) {
        let metadata = ChunkMetadata {
            source_id: Some(id.to_string()),
            course_id: Some(json!(course_id)),
            rating: Some(rating),
            ..ChunkMetadata::new(SourceType::Review)
        };
        h.index
            .upsert(
                &format!("Review {}: rated {}", id, rating),
                metadata,
                Scope::Public,
                None,
            )
            .await
            .unwrap();
    }

    fn session() -> SessionId {
        SessionId::anonymous("10.0.0.1")
    }

    #[tokio::test]
    async fn test_empty_query_is_validation_error() {
        let h = harness();
        let err = h.resolver.resolve("   ", &session()).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unsafe_query_is_refused() {
        let h = harness();
        let resolution = h
            .resolver
            .resolve("how do I hack the admin password", &session())
            .await
            .unwrap();

        assert_eq!(resolution.tier, Tier::Refused);
        assert!(resolution.answer.contains("can't help with that request"));
        assert!(resolution.context_used.is_empty());
        assert!(!resolution.show_ticket_option);
    }

    #[tokio::test]
    async fn test_exact_faq_text_returns_tier1_answer() {
        let h = harness();
        seed_faq(
            &h,
            "How do I reset my password?",
            Some("Reset via profile settings."),
        )
        .await;

        let resolution = h
            .resolver
            .resolve("how do i reset my password?", &session())
            .await
            .unwrap();

        assert_eq!(resolution.tier, Tier::Exact);
        assert_eq!(resolution.answer, "Reset via profile settings.");
        assert_eq!(resolution.context_used.len(), 1);
        assert!(!resolution.show_ticket_option);
    }

    #[tokio::test]
    async fn test_course_by_name_returns_tier1_template() {
        let h = harness();
        seed_course(&h, "c1", "Intro to Python", Some(499.0)).await;

        let resolution = h
            .resolver
            .resolve("tell me about intro to python", &session())
            .await
            .unwrap();

        assert_eq!(resolution.tier, Tier::Exact);
        assert_eq!(
            resolution.answer,
            "The course **Intro to Python** is available. It costs ₹499."
        );
    }

    #[tokio::test]
    async fn test_near_exact_similarity_returns_canonical_answer_verbatim() {
        let h = harness();
        seed_faq(
            &h,
            "Can I get a refund for a course?",
            Some("Refunds are available within 7 days of purchase."),
        )
        .await;
        h.embedder.register(
            "am I able to get my money back?",
            vec![0.95, 0.312_25, 0.0, 0.0],
        );

        let resolution = h
            .resolver
            .resolve("am I able to get my money back?", &session())
            .await
            .unwrap();

        assert_eq!(resolution.tier, Tier::Similar);
        assert_eq!(
            resolution.answer,
            "Refunds are available within 7 days of purchase."
        );
        assert_eq!(resolution.context_used.len(), 1);
        assert!(!resolution.show_ticket_option);
    }

    #[tokio::test]
    async fn test_mid_similarity_degrades_to_bullets_not_tier3() {
        let h = harness();
        seed_course(&h, "c1", "Intro to Python", Some(499.0)).await;
        // 0.40 sits between the admission floor and the direct-answer
        // threshold: too weak for the course template, still not a rejection.
        h.embedder
            .register("something about snakes", vec![0.4, 0.916_515, 0.0, 0.0]);

        let resolution = h
            .resolver
            .resolve("something about snakes", &session())
            .await
            .unwrap();

        assert_eq!(resolution.tier, Tier::Similar);
        assert!(resolution.answer.contains("• Intro to Python (₹499)"));
        assert!(resolution.answer.contains("Tell me which one"));
        assert!(!resolution.show_ticket_option);
    }

    #[tokio::test]
    async fn test_mid_similarity_without_titles_asks_to_be_more_specific() {
        let h = harness();
        seed_faq(&h, "Some untitled note about invoices", None).await;
        h.embedder
            .register("question about billing", vec![0.4, 0.916_515, 0.0, 0.0]);

        let resolution = h
            .resolver
            .resolve("question about billing", &session())
            .await
            .unwrap();

        assert_eq!(resolution.tier, Tier::Similar);
        assert!(resolution.answer.contains("be more specific"));
        assert!(resolution.show_ticket_option);
    }

    #[tokio::test]
    async fn test_below_floor_returns_tier3_with_ticket_option() {
        let h = harness();
        seed_course(&h, "c1", "Intro to Python", None).await;
        h.embedder
            .register("completely unrelated topic", vec![0.0, 1.0, 0.0, 0.0]);

        let resolution = h
            .resolver
            .resolve("completely unrelated topic", &session())
            .await
            .unwrap();

        assert_eq!(resolution.tier, Tier::NoMatch);
        assert!(resolution.answer.contains("couldn't find"));
        assert!(resolution.context_used.is_empty());
        assert!(resolution.show_ticket_option);
    }

    #[tokio::test]
    async fn test_affirmation_resolves_like_explicit_topic_query() {
        let h = harness();
        seed_course(&h, "c1", "Intro to Python", Some(499.0)).await;
        let sid = session();

        let explicit = h
            .resolver
            .resolve("tell me about Intro to Python", &sid)
            .await
            .unwrap();
        let affirmed = h.resolver.resolve("yes", &sid).await.unwrap();

        assert_eq!(explicit.tier, Tier::Exact);
        assert_eq!(affirmed.tier, Tier::Exact);
        assert_eq!(explicit.answer, affirmed.answer);
    }

    #[tokio::test]
    async fn test_affirmation_without_context_is_not_rewritten() {
        let h = harness();
        seed_course(&h, "c1", "Intro to Python", None).await;
        h.embedder.register("yes", vec![0.0, 1.0, 0.0, 0.0]);

        let resolution = h.resolver.resolve("yes", &session()).await.unwrap();
        assert_eq!(resolution.tier, Tier::NoMatch);
    }

    #[tokio::test]
    async fn test_insight_query_aggregates_and_sets_topic() {
        let h = harness();
        seed_course(&h, "c1", "Intro to Python", Some(499.0)).await;
        seed_review(&h, "r1", "c1", 5.0).await;
        seed_review(&h, "r2", "c1", 4.0).await;
        let sid = session();

        let resolution = h
            .resolver
            .resolve("what is the highest rated course?", &sid)
            .await
            .unwrap();

        assert_eq!(resolution.tier, Tier::Insight);
        assert!(resolution.answer.contains("Intro to Python"));
        assert!(resolution.answer.contains("4.50"));
        assert!(!resolution.show_ticket_option);

        // The aggregation primes the session topic for follow-ups.
        let followup = h.resolver.resolve("tell me more", &sid).await.unwrap();
        assert_eq!(followup.tier, Tier::Exact);
        assert!(followup.answer.contains("Intro to Python"));
    }

    #[tokio::test]
    async fn test_insight_with_no_reviews_falls_through_to_retrieval() {
        let h = harness();
        seed_course(&h, "c1", "Top Rated Courses Explained", None).await;

        let resolution = h
            .resolver
            .resolve("tell me about top rated courses explained", &session())
            .await
            .unwrap();

        // No review chunks: the aggregation misses and Tier 1 answers.
        assert_eq!(resolution.tier, Tier::Exact);
        assert!(resolution.answer.contains("Top Rated Courses Explained"));
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_tier3() {
        let index_embedder = Arc::new(StaticEmbedder::new());
        let index = Arc::new(ContentIndex::new(index_embedder));
        let session_ctx = SessionContext::new(
            Arc::new(InMemorySessionStore::new()),
            SessionConfig::default(),
        );
        let resolver = TieredResolver::new(
            index.clone(),
            Arc::new(FailingEmbedder),
            None,
            session_ctx,
            ResolverConfig::default(),
        );

        index
            .upsert(
                "Course: Intro to Python",
                ChunkMetadata {
                    source_id: Some("c1".to_string()),
                    course_name: Some("Intro to Python".to_string()),
                    ..ChunkMetadata::new(SourceType::Course)
                },
                Scope::Public,
                None,
            )
            .await
            .unwrap();

        let resolution = resolver
            .resolve("some unrelated question", &session())
            .await
            .unwrap();

        assert_eq!(resolution.tier, Tier::NoMatch);
        assert!(resolution.show_ticket_option);
    }

    #[tokio::test]
    async fn test_synthesis_uses_generative_output() {
        let embedder = Arc::new(StaticEmbedder::new());
        let generator = Arc::new(StaticGenerator {
            response: "Two lectures cover recursion. Start with the basics one.".to_string(),
        });
        let h = build(embedder.clone(), embedder, Some(generator));

        h.index
            .upsert(
                "Lecture: Recursion basics",
                ChunkMetadata {
                    source_id: Some("ss1".to_string()),
                    sub_section_title: Some("Recursion basics".to_string()),
                    ..ChunkMetadata::new(SourceType::Subsection)
                },
                Scope::Public,
                None,
            )
            .await
            .unwrap();
        h.embedder
            .register("explain recursion please", vec![0.6, 0.8, 0.0, 0.0]);

        let resolution = h
            .resolver
            .resolve("explain recursion please", &session())
            .await
            .unwrap();

        assert_eq!(resolution.tier, Tier::Similar);
        assert_eq!(
            resolution.answer,
            "Two lectures cover recursion. Start with the basics one."
        );
        assert!(!resolution.show_ticket_option);
        assert_eq!(resolution.context_used.len(), 1);
    }

    #[tokio::test]
    async fn test_uncertain_synthesis_suggests_ticket() {
        let embedder = Arc::new(StaticEmbedder::new());
        let generator = Arc::new(StaticGenerator {
            response: "I'm not sure the catalog covers that.".to_string(),
        });
        let h = build(embedder.clone(), embedder, Some(generator));

        h.index
            .upsert(
                "Lecture: Unrelated material",
                ChunkMetadata {
                    source_id: Some("ss1".to_string()),
                    sub_section_title: Some("Unrelated material".to_string()),
                    ..ChunkMetadata::new(SourceType::Subsection)
                },
                Scope::Public,
                None,
            )
            .await
            .unwrap();
        h.embedder
            .register("an odd question", vec![0.6, 0.8, 0.0, 0.0]);

        let resolution = h
            .resolver
            .resolve("an odd question", &session())
            .await
            .unwrap();

        assert_eq!(resolution.tier, Tier::Similar);
        assert!(resolution.show_ticket_option);
    }

    /// Session store that is always down.
    struct FailingSessionStore;

    #[async_trait]
    impl crate::session::SessionStore for FailingSessionStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, EngineError> {
            Err(EngineError::SessionStore("store offline".to_string()))
        }

        async fn set(
            &self,
            _key: &str,
            _value: &str,
            _ttl: std::time::Duration,
        ) -> Result<(), EngineError> {
            Err(EngineError::SessionStore("store offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_session_store_failure_does_not_affect_answer() {
        let embedder = Arc::new(StaticEmbedder::new());
        let index = Arc::new(ContentIndex::new(embedder.clone()));
        let session_ctx =
            SessionContext::new(Arc::new(FailingSessionStore), SessionConfig::default());
        let resolver = TieredResolver::new(
            index.clone(),
            embedder,
            None,
            session_ctx,
            ResolverConfig::default(),
        );

        index
            .upsert(
                "How do I reset my password?",
                ChunkMetadata::new(SourceType::Faq),
                Scope::Public,
                Some("Reset via profile settings.".to_string()),
            )
            .await
            .unwrap();

        let resolution = resolver
            .resolve("How do I reset my password?", &SessionId::identified("u@e.com"))
            .await
            .unwrap();

        assert_eq!(resolution.tier, Tier::Exact);
        assert_eq!(resolution.answer, "Reset via profile settings.");
    }

    #[tokio::test]
    async fn test_identified_session_accumulates_summary() {
        let h = harness();
        seed_faq(
            &h,
            "How do I reset my password?",
            Some("Reset via profile settings."),
        )
        .await;
        let sid = SessionId::identified("user@example.com");

        h.resolver
            .resolve("How do I reset my password?", &sid)
            .await
            .unwrap();

        let summary = h.session.summary(&sid).await;
        assert!(summary.contains("User: How do I reset my password?"));
        assert!(summary.contains("Bot: Reset via profile settings."));
    }

    #[tokio::test]
    async fn test_anonymous_session_keeps_topic_but_no_summary() {
        let h = harness();
        seed_course(&h, "c1", "Intro to Python", None).await;
        let sid = session();

        h.resolver
            .resolve("tell me about Intro to Python", &sid)
            .await
            .unwrap();

        assert_eq!(
            h.session.current_topic(&sid).await.as_deref(),
            Some("Intro to Python")
        );
        assert!(h.session.summary(&sid).await.is_empty());
    }
}
