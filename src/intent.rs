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

//! Stateless text-pattern predicates over raw query text.
//!
//! Every detector is backed by a table of compiled patterns so new safety
//! rules or intents are additive data changes, not new branching logic.

use regex::{Regex, RegexSet};
use std::sync::LazyLock;

/// Security-bypass / injection / credential-probing vocabulary.
const UNSAFE_PATTERNS: &[&str] = &[
    r"(?i)bypass",
    r"(?i)disable auth",
    r"(?i)admin password",
    r"(?i)drop table",
    r"(?i)sql",
    r"(?i)hack",
    r"(?i)injection",
];

/// Explicit/abusive vocabulary, checked in addition to the unsafe table.
const EXPLICIT_PATTERNS: &[&str] = &[
    r"(?i)\bnsfw\b",
    r"(?i)\bnude\b",
    r"(?i)\bexplicit\b",
    r"(?i)\bhate\b",
    r"(?i)\babuse\b",
];

static UNSAFE_SET: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new(UNSAFE_PATTERNS).expect("unsafe pattern table must compile"));

static EXPLICIT_SET: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new(EXPLICIT_PATTERNS).expect("explicit pattern table must compile"));

/// Short confirmatory phrases. Whole-string match only: "yes" is an
/// affirmation, "yes I broke the login page" is not.
static AFFIRMATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:yes|yep|yeah|that one|this one|tell me more|details|reviews?|price)$")
        .expect("affirmation pattern must compile")
});

/// Analytical queries that should run an aggregation instead of retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightIntent {
    HighestRatedCourse,
}

static INSIGHT_TABLE: LazyLock<Vec<(InsightIntent, Regex)>> = LazyLock::new(|| {
    let table = [
        (
            InsightIntent::HighestRatedCourse,
            r"(?i)\b(?:highest|top)\s*rated\b",
        ),
        (
            InsightIntent::HighestRatedCourse,
            r"(?i)\bbest\b.*\b(?:course|class)",
        ),
    ];
    table
        .into_iter()
        .map(|(intent, pattern)| {
            (
                intent,
                Regex::new(pattern).expect("insight pattern table must compile"),
            )
        })
        .collect()
});

/// Request templates whose tail names the entity being asked about.
static REQUEST_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:tell me about|price(?:\s*for)?|cost(?:\s*of)?|details (?:on|for)|info on|do you have)\s+(.+)",
    )
    .expect("request template must compile")
});

/// "Course: <name>." prefix inside composite chunk text.
static COURSE_NAME_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Course:\s*([^.]+?)(?:\.|$)").expect("course name pattern must compile")
});

/// Phrasing in a synthesized answer that signals the model found nothing
/// useful (drives the ticket-creation suggestion).
static UNCERTAINTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)couldn.t find|not sure").expect("uncertainty pattern must compile")
});

pub fn is_unsafe(text: &str) -> bool {
    UNSAFE_SET.is_match(text)
}

pub fn is_inappropriate(text: &str) -> bool {
    is_unsafe(text) || EXPLICIT_SET.is_match(text)
}

pub fn is_affirmation(text: &str) -> bool {
    AFFIRMATION.is_match(text.trim())
}

pub fn detect_insight_intent(text: &str) -> Option<InsightIntent> {
    INSIGHT_TABLE
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(intent, _)| *intent)
}

pub fn signals_uncertainty(text: &str) -> bool {
    UNCERTAINTY.is_match(text)
}

/// Best-effort phrase extraction for entity lookup. Never fails: request
/// templates first, then the last few tokens, worst case the trimmed input.
pub fn extract_topic_candidate(text: &str) -> String {
    let trimmed = text.trim();

    if let Some(captures) = REQUEST_TEMPLATE.captures(trimmed) {
        let tail = captures[1].trim();
        if !tail.is_empty() {
            return tail.to_string();
        }
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.len() >= 2 {
        let start = words.len().saturating_sub(3);
        return words[start..].join(" ");
    }

    trimmed.to_string()
}

/// Pull a course name out of composite chunk text ("Course: X. Section: …").
pub fn parse_course_name_from_text(text: &str) -> Option<String> {
    COURSE_NAME_IN_TEXT
        .captures(text)
        .map(|captures| captures[1].trim().to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsafe_vocabulary() {
        assert!(is_unsafe("how do I bypass the paywall"));
        assert!(is_unsafe("give me the admin password"));
        assert!(is_unsafe("DROP TABLE users"));
        assert!(!is_unsafe("how do I enroll in a course"));
    }

    #[test]
    fn test_inappropriate_includes_unsafe() {
        assert!(is_inappropriate("sql injection tricks"));
        assert!(is_inappropriate("show me nsfw content"));
        assert!(!is_inappropriate("what is the refund policy"));
    }

    #[test]
    fn test_affirmation_full_string_only() {
        assert!(is_affirmation("yes"));
        assert!(is_affirmation("Yes"));
        assert!(is_affirmation("  tell me more  "));
        assert!(is_affirmation("price"));
        assert!(is_affirmation("reviews"));

        // Substrings must not trigger
        assert!(!is_affirmation("yes I want a refund"));
        assert!(!is_affirmation("what is the price of rust course"));
    }

    #[test]
    fn test_insight_detection() {
        assert_eq!(
            detect_insight_intent("what is the highest rated course?"),
            Some(InsightIntent::HighestRatedCourse)
        );
        assert_eq!(
            detect_insight_intent("which is the top rated one"),
            Some(InsightIntent::HighestRatedCourse)
        );
        assert_eq!(
            detect_insight_intent("what is the best python class"),
            Some(InsightIntent::HighestRatedCourse)
        );
        assert_eq!(detect_insight_intent("tell me about python"), None);
    }

    #[test]
    fn test_topic_extraction_request_templates() {
        assert_eq!(
            extract_topic_candidate("tell me about Intro to Python"),
            "Intro to Python"
        );
        assert_eq!(extract_topic_candidate("price for Rust Basics"), "Rust Basics");
        assert_eq!(
            extract_topic_candidate("do you have machine learning"),
            "machine learning"
        );
    }

    #[test]
    fn test_topic_extraction_last_tokens_fallback() {
        assert_eq!(
            extract_topic_candidate("I want to learn advanced web development"),
            "advanced web development"
        );
        assert_eq!(extract_topic_candidate("python"), "python");
        assert_eq!(extract_topic_candidate("  python  "), "python");
    }

    #[test]
    fn test_parse_course_name_from_composite_text() {
        let text = "Course: Intro to Python. Section: Basics. Lecture: Variables.";
        assert_eq!(
            parse_course_name_from_text(text),
            Some("Intro to Python".to_string())
        );
        assert_eq!(parse_course_name_from_text("Review: 5 stars"), None);
    }

    #[test]
    fn test_uncertainty_signal() {
        assert!(signals_uncertainty("I couldn't find anything relevant."));
        assert!(signals_uncertainty("I'm not sure about that."));
        assert!(!signals_uncertainty("The course costs 499."));
    }
}
