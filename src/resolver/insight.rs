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

//! Cross-referencing aggregations over the index.
//!
//! Review chunks and course chunks come from different upstream pipelines
//! that encode the same course identifier differently (native type vs its
//! string form). The join below reconciles the two encodings at read time;
//! consolidating the representation at write time in `index::ingest` is the
//! real fix, the fallback chain is kept for compatibility with existing
//! corpora.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::index::store::ContentIndex;
use crate::index::types::{Chunk, SourceType};

/// Optional narrowing of the review population.
#[derive(Debug, Clone, Default)]
pub struct InsightFilter {
    pub course_id: Option<Value>,
    pub tag: Option<String>,
}

/// Result of an aggregation: a composed answer plus the chunks it is
/// grounded in. `topic` feeds the session context when the join resolved a
/// course.
#[derive(Debug, Clone)]
pub struct InsightOutcome {
    pub answer: String,
    pub context_used: Vec<Chunk>,
    pub topic: Option<String>,
}

struct RatingGroup {
    course_id: Value,
    rating_sum: f64,
    count: usize,
}

impl RatingGroup {
    fn average(&self) -> f64 {
        self.rating_sum / self.count as f64
    }
}

/// Mean rating per course over all review chunks; the winner (mean desc,
/// count desc) is joined back to its canonical course chunk.
///
/// Returns `None` when no reviews match. A failed join still returns a
/// degraded numeric summary — a missing course chunk never fails the
/// request.
pub fn highest_rated(index: &ContentIndex, filter: &InsightFilter) -> Option<InsightOutcome> {
    let chunks = index.scan_all();

    let mut groups: HashMap<String, RatingGroup> = HashMap::new();
    for chunk in &chunks {
        if chunk.metadata.source_type != SourceType::Review {
            continue;
        }
        let Some(rating) = chunk.metadata.rating else {
            continue;
        };
        let Some(course_id) = chunk.metadata.course_id.as_ref() else {
            continue;
        };
        if let Some(ref wanted) = filter.course_id {
            if course_id != wanted {
                continue;
            }
        }
        if let Some(ref tag) = filter.tag {
            if !chunk.metadata.tags.iter().any(|t| t == tag) {
                continue;
            }
        }

        // Key on the serialized value so "42" and 42 stay distinct groups,
        // exactly as the upstream data stores them.
        let key = course_id.to_string();
        groups
            .entry(key)
            .and_modify(|group| {
                group.rating_sum += rating;
                group.count += 1;
            })
            .or_insert(RatingGroup {
                course_id: course_id.clone(),
                rating_sum: rating,
                count: 1,
            });
    }

    let top = groups.into_values().max_by(|a, b| {
        a.average()
            .partial_cmp(&b.average())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.count.cmp(&b.count))
    })?;

    let average = top.average();
    let course = resolve_course_chunk(&chunks, &top.course_id);

    let Some(course) = course else {
        debug!(
            course_id = %top.course_id,
            "highest-rated join missed: no course chunk for identifier"
        );
        return Some(InsightOutcome {
            answer: format!(
                "Highest average rating: {:.2} (course metadata not found).",
                average
            ),
            context_used: Vec::new(),
            topic: None,
        });
    };

    let title = course
        .metadata
        .course_name
        .clone()
        .unwrap_or_else(|| "this course".to_string());
    let price = course
        .metadata
        .price
        .map(|price| format!(" at ₹{}", price))
        .unwrap_or_default();

    let answer = format!(
        "The highest-rated course is **{}** with an average rating of **{:.2}** based on {} review(s){}.",
        title, average, top.count, price
    );
    let topic = course.metadata.course_name.clone();

    Some(InsightOutcome {
        answer,
        context_used: vec![course],
        topic,
    })
}

/// Three-step join from a review-side identifier to its course chunk:
/// typed-value match, string-form match, then a full scan comparing
/// string-coerced identifiers on both sides.
fn resolve_course_chunk(chunks: &[Chunk], course_id: &Value) -> Option<Chunk> {
    let courses = || {
        chunks
            .iter()
            .filter(|c| c.metadata.source_type == SourceType::Course)
    };

    // 1) Direct match (works if encodings align)
    if let Some(course) = courses().find(|c| c.metadata.course_id.as_ref() == Some(course_id)) {
        return Some(course.clone());
    }

    // 2) Match by string form (covers an identifier stored as a string)
    let id_string = Value::String(coerce_identifier(course_id));
    if let Some(course) = courses().find(|c| c.metadata.course_id.as_ref() == Some(&id_string)) {
        return Some(course.clone());
    }

    // 3) Coerce both sides to strings and compare
    courses()
        .find(|c| {
            c.metadata
                .course_id
                .as_ref()
                .is_some_and(|id| coerce_identifier(id) == coerce_identifier(course_id))
        })
        .cloned()
}

/// String form of an identifier value: strings unquoted, everything else via
/// its JSON rendering.
fn coerce_identifier(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
