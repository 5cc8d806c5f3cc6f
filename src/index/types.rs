use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of knowledge a chunk was derived from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Course,
    Section,
    Subsection,
    Review,
    Category,
    Faq,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Course => write!(f, "course"),
            SourceType::Section => write!(f, "section"),
            SourceType::Subsection => write!(f, "subsection"),
            SourceType::Review => write!(f, "review"),
            SourceType::Category => write!(f, "category"),
            SourceType::Faq => write!(f, "faq"),
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "course" => Ok(SourceType::Course),
            "section" => Ok(SourceType::Section),
            "subsection" => Ok(SourceType::Subsection),
            "review" => Ok(SourceType::Review),
            "category" => Ok(SourceType::Category),
            "faq" => Ok(SourceType::Faq),
            other => Err(format!("unknown source type: {}", other)),
        }
    }
}

/// Visibility class of a chunk
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Public,
    Instructor,
    Admin,
}

/// Typed metadata attached to an indexed chunk.
///
/// `course_id` is kept as a raw JSON value on purpose: upstream systems store
/// the same logical identifier both as its native type and as a string, and
/// the insight aggregation has to reconcile the two encodings at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_section_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_section_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Derived dedup key; filled in by the index on write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl ChunkMetadata {
    pub fn new(source_type: SourceType) -> Self {
        Self {
            source_type,
            source_id: None,
            course_id: None,
            course_name: None,
            section_id: None,
            section_name: None,
            sub_section_id: None,
            sub_section_title: None,
            category_id: None,
            user_id: None,
            rating: None,
            tags: Vec::new(),
            price: None,
            status: None,
            source_hash: None,
            version: 1,
        }
    }
}

/// One indexed unit of retrievable knowledge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
    #[serde(default)]
    pub scope: Scope,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(
        text: String,
        answer: Option<String>,
        embedding: Vec<f32>,
        metadata: ChunkMetadata,
        scope: Scope,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text,
            answer,
            embedding,
            metadata,
            scope,
            created_at: now,
            updated_at: now,
        }
    }

    /// Course title for answer composition: metadata first, then the
    /// "Course: …" prefix of the composite text.
    pub fn course_title(&self) -> Option<String> {
        self.metadata
            .course_name
            .clone()
            .filter(|name| !name.is_empty())
            .or_else(|| crate::intent::parse_course_name_from_text(&self.text))
    }

    /// Best available human title, used by the degraded candidate list.
    pub fn display_title(&self) -> Option<String> {
        [
            &self.metadata.course_name,
            &self.metadata.section_name,
            &self.metadata.sub_section_title,
        ]
        .into_iter()
        .flatten()
        .find(|title| !title.is_empty())
        .cloned()
    }
}

/// A chunk scored against a query embedding
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub similarity: f32,
}

/// Metadata filter for deletions: all present fields must match.
#[derive(Debug, Clone, Default)]
pub struct ChunkFilter {
    pub source_type: Option<SourceType>,
    pub source_id: Option<String>,
    /// Only used to derive the dedup key for FAQ chunks.
    pub text: Option<String>,
    pub course_id: Option<serde_json::Value>,
    pub section_id: Option<String>,
    pub sub_section_id: Option<String>,
    pub category_id: Option<String>,
    pub user_id: Option<String>,
}

impl ChunkFilter {
    /// True when no matchable field is set. `text` alone does not count: it
    /// only derives the FAQ dedup key and never participates in partial
    /// matching, so a text-only filter must not fall through to a match-all.
    pub fn is_empty(&self) -> bool {
        self.source_type.is_none()
            && self.source_id.is_none()
            && self.course_id.is_none()
            && self.section_id.is_none()
            && self.sub_section_id.is_none()
            && self.category_id.is_none()
            && self.user_id.is_none()
    }

    /// Partial match: every field present on the filter must equal the
    /// chunk's metadata (logical AND).
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        if let Some(source_type) = self.source_type {
            if metadata.source_type != source_type {
                return false;
            }
        }
        if let Some(ref source_id) = self.source_id {
            if metadata.source_id.as_ref() != Some(source_id) {
                return false;
            }
        }
        if let Some(ref course_id) = self.course_id {
            if metadata.course_id.as_ref() != Some(course_id) {
                return false;
            }
        }
        if let Some(ref section_id) = self.section_id {
            if metadata.section_id.as_ref() != Some(section_id) {
                return false;
            }
        }
        if let Some(ref sub_section_id) = self.sub_section_id {
            if metadata.sub_section_id.as_ref() != Some(sub_section_id) {
                return false;
            }
        }
        if let Some(ref category_id) = self.category_id {
            if metadata.category_id.as_ref() != Some(category_id) {
                return false;
            }
        }
        if let Some(ref user_id) = self.user_id {
            if metadata.user_id.as_ref() != Some(user_id) {
                return false;
            }
        }
        true
    }
}

/// Statistics about the content index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_chunks: usize,
    pub by_source_type: HashMap<String, usize>,
    pub oldest_indexed: Option<DateTime<Utc>>,
    pub newest_indexed: Option<DateTime<Utc>>,
}
