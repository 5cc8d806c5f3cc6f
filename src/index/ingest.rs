//! Adapters for upstream content-mutation events.
//!
//! Course authoring, section/subsection authoring and review submission all
//! funnel through here: each event builds a human-readable composite text
//! (only non-empty fields, stable order, period-space separated) and calls
//! the matching index operation. The composite text is what gets embedded,
//! so its construction directly affects retrieval quality.

use serde_json::Value;

use crate::error::EngineError;
use crate::index::store::ContentIndex;
use crate::index::types::{Chunk, ChunkFilter, ChunkMetadata, Scope, SourceType};

/// Join the non-empty parts with ". " in the given order.
pub fn compact_join(parts: &[Option<String>]) -> String {
    parts
        .iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(". ")
}

/// An upstream mutation that can be projected into the index.
pub trait IndexableEvent {
    fn composite_text(&self) -> String;
    fn metadata(&self) -> ChunkMetadata;
}

/// Index a newly authored entity.
pub async fn created<E: IndexableEvent>(
    index: &ContentIndex,
    event: &E,
) -> Result<Chunk, EngineError> {
    index
        .upsert(&event.composite_text(), event.metadata(), Scope::Public, None)
        .await
}

/// Re-index an entity after edits (falls back to insert when never indexed).
pub async fn updated<E: IndexableEvent>(
    index: &ContentIndex,
    event: &E,
) -> Result<Chunk, EngineError> {
    index
        .update(&event.composite_text(), event.metadata(), Scope::Public, None)
        .await
}

/// Remove an entity's chunk by its stable identifier.
pub fn deleted(
    index: &ContentIndex,
    source_type: SourceType,
    source_id: &str,
) -> Result<usize, EngineError> {
    index.delete(&ChunkFilter {
        source_type: Some(source_type),
        source_id: Some(source_id.to_string()),
        ..Default::default()
    })
}

/// Course authored or edited.
#[derive(Debug, Clone)]
pub struct CourseSaved {
    pub course_id: String,
    pub course_name: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub price: Option<f64>,
    pub status: Option<String>,
    pub tags: Vec<String>,
}

impl IndexableEvent for CourseSaved {
    fn composite_text(&self) -> String {
        compact_join(&[
            Some(format!("Course: {}", self.course_name)),
            self.category_name
                .as_ref()
                .map(|name| format!("Category: {}", name)),
            self.description
                .as_ref()
                .map(|description| format!("Description: {}", description)),
        ])
    }

    fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            source_id: Some(self.course_id.clone()),
            course_id: Some(Value::String(self.course_id.clone())),
            course_name: Some(self.course_name.clone()),
            category_id: self.category_id.clone(),
            price: self.price,
            status: self.status.clone(),
            tags: self.tags.clone(),
            ..ChunkMetadata::new(SourceType::Course)
        }
    }
}

/// Section authored or renamed.
#[derive(Debug, Clone)]
pub struct SectionSaved {
    pub section_id: String,
    pub section_name: String,
    pub course_id: Option<String>,
    pub course_name: Option<String>,
}

impl IndexableEvent for SectionSaved {
    fn composite_text(&self) -> String {
        compact_join(&[
            self.course_name
                .as_ref()
                .map(|name| format!("Course: {}", name)),
            Some(format!("Section: {}", self.section_name)),
        ])
    }

    fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            source_id: Some(self.section_id.clone()),
            section_id: Some(self.section_id.clone()),
            section_name: Some(self.section_name.clone()),
            course_id: self.course_id.clone().map(Value::String),
            course_name: self.course_name.clone(),
            ..ChunkMetadata::new(SourceType::Section)
        }
    }
}

/// Lecture (subsection) authored or edited.
#[derive(Debug, Clone)]
pub struct SubsectionSaved {
    pub sub_section_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub section_id: Option<String>,
    pub section_name: Option<String>,
    pub course_id: Option<String>,
    pub course_name: Option<String>,
}

impl IndexableEvent for SubsectionSaved {
    fn composite_text(&self) -> String {
        compact_join(&[
            self.course_name
                .as_ref()
                .map(|name| format!("Course: {}", name)),
            self.section_name
                .as_ref()
                .map(|name| format!("Section: {}", name)),
            Some(format!("Lecture: {}", self.title)),
            self.summary
                .as_ref()
                .map(|summary| format!("Summary: {}", summary)),
        ])
    }

    fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            source_id: Some(self.sub_section_id.clone()),
            sub_section_id: Some(self.sub_section_id.clone()),
            sub_section_title: Some(self.title.clone()),
            section_id: self.section_id.clone(),
            section_name: self.section_name.clone(),
            course_id: self.course_id.clone().map(Value::String),
            course_name: self.course_name.clone(),
            ..ChunkMetadata::new(SourceType::Subsection)
        }
    }
}

/// Review submitted for a course.
///
/// `course_id` is whatever encoding the reviews pipeline delivers (string or
/// numeric); the insight aggregation reconciles it against course chunks.
#[derive(Debug, Clone)]
pub struct ReviewSubmitted {
    pub review_id: String,
    pub course_id: Value,
    pub course_name: Option<String>,
    pub user_id: Option<String>,
    pub rating: f64,
    pub review: Option<String>,
}

impl IndexableEvent for ReviewSubmitted {
    fn composite_text(&self) -> String {
        compact_join(&[
            self.course_name
                .as_ref()
                .map(|name| format!("Course: {}", name)),
            self.review
                .as_ref()
                .map(|review| format!("Review: {}", review)),
            Some(format!("Rating: {}", self.rating)),
        ])
    }

    fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            source_id: Some(self.review_id.clone()),
            course_id: Some(self.course_id.clone()),
            course_name: self.course_name.clone(),
            user_id: self.user_id.clone(),
            rating: Some(self.rating),
            ..ChunkMetadata::new(SourceType::Review)
        }
    }
}

/// Seed the built-in technical FAQ set. Idempotent: already-indexed
/// questions are left untouched. Returns the number of chunks indexed.
pub async fn seed_faqs(index: &ContentIndex) -> Result<usize, EngineError> {
    let before = index.len();

    for faq in crate::faqs::technical_faqs() {
        let metadata = ChunkMetadata {
            tags: faq.tags.iter().map(|tag| tag.to_string()).collect(),
            ..ChunkMetadata::new(SourceType::Faq)
        };
        index
            .upsert(
                faq.question,
                metadata,
                Scope::Public,
                Some(faq.answer.to_string()),
            )
            .await?;
    }

    Ok(index.len() - before)
}
