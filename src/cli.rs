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

use clap::{Parser, Subcommand};

use crate::index::types::SourceType;

#[derive(Parser, Debug)]
#[command(name = "octomentor")]
#[command(version, author = "Muvon Un Limited <opensource@muvon.io>")]
#[command(about = "Tiered semantic query resolution engine for e-learning support assistants", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive support chat against the indexed knowledge base
    Chat {
        /// Identify the session by email (enables the rolling conversation summary)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Resolve a single query and print the result
    Ask {
        /// The query text
        text: String,

        /// Identify the session by email (enables the rolling conversation summary)
        #[arg(short, long)]
        email: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Manage the content index
    Index {
        #[command(subcommand)]
        command: IndexCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum IndexCommand {
    /// Index a course (use --update to re-index after edits)
    Course {
        /// Stable course identifier
        #[arg(long)]
        id: String,

        /// Course name
        #[arg(long)]
        name: String,

        /// Course description
        #[arg(long)]
        description: Option<String>,

        /// Category name
        #[arg(long)]
        category: Option<String>,

        /// Course price
        #[arg(long)]
        price: Option<f64>,

        /// Tags for categorization (comma-separated)
        #[arg(long)]
        tags: Option<String>,

        /// Re-index an existing entry instead of inserting
        #[arg(long)]
        update: bool,
    },

    /// Index a course section
    Section {
        /// Stable section identifier
        #[arg(long)]
        id: String,

        /// Section name
        #[arg(long)]
        name: String,

        /// Identifier of the course this section belongs to
        #[arg(long)]
        course_id: Option<String>,

        /// Name of the course this section belongs to
        #[arg(long)]
        course_name: Option<String>,

        /// Re-index an existing entry instead of inserting
        #[arg(long)]
        update: bool,
    },

    /// Index a lecture (subsection)
    Subsection {
        /// Stable subsection identifier
        #[arg(long)]
        id: String,

        /// Lecture title
        #[arg(long)]
        title: String,

        /// Lecture summary
        #[arg(long)]
        summary: Option<String>,

        /// Identifier of the parent section
        #[arg(long)]
        section_id: Option<String>,

        /// Name of the parent section
        #[arg(long)]
        section_name: Option<String>,

        /// Identifier of the course this lecture belongs to
        #[arg(long)]
        course_id: Option<String>,

        /// Name of the course this lecture belongs to
        #[arg(long)]
        course_name: Option<String>,

        /// Re-index an existing entry instead of inserting
        #[arg(long)]
        update: bool,
    },

    /// Index a course review
    Review {
        /// Stable review identifier
        #[arg(long)]
        id: String,

        /// Identifier of the reviewed course
        #[arg(long)]
        course_id: String,

        /// Name of the reviewed course
        #[arg(long)]
        course_name: Option<String>,

        /// Identifier of the reviewing user
        #[arg(long)]
        user_id: Option<String>,

        /// Rating given by the review
        #[arg(long)]
        rating: f64,

        /// Review text
        #[arg(long)]
        text: Option<String>,

        /// Re-index an existing entry instead of inserting
        #[arg(long)]
        update: bool,
    },

    /// Index a canonical FAQ answer
    Faq {
        /// The question text (also the dedup key)
        question: String,

        /// The canonical answer
        answer: String,

        /// Tags for categorization (comma-separated)
        #[arg(long)]
        tags: Option<String>,
    },

    /// Seed the built-in technical FAQ set
    SeedFaqs,

    /// Delete chunks by exact key or partial metadata filter
    Delete {
        /// Source type of the chunks to delete
        #[arg(long)]
        source_type: Option<SourceType>,

        /// Stable identifier of the entity to delete
        #[arg(long)]
        source_id: Option<String>,

        /// FAQ question text (FAQ chunks are keyed by text)
        #[arg(long)]
        text: Option<String>,

        /// Delete everything referencing this course
        #[arg(long)]
        course_id: Option<String>,

        /// Delete everything referencing this section
        #[arg(long)]
        section_id: Option<String>,
    },

    /// Show index statistics
    Stats,

    /// List indexed chunks
    List {
        /// Maximum number of chunks to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}
