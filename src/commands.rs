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

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use crate::cli::{Commands, IndexCommand};
use crate::config::Config;
use crate::formatting;
use crate::index::ingest::{
    self, CourseSaved, ReviewSubmitted, SectionSaved, SubsectionSaved,
};
use crate::index::store::ContentIndex;
use crate::index::types::{Chunk, ChunkFilter, ChunkMetadata, Scope, SourceType};
use crate::resolver::TieredResolver;
use crate::session::{InMemorySessionStore, SessionContext, SessionId};

pub async fn execute(config: &Config, command: Commands) -> Result<()> {
    let embedder = crate::embedding::create_embedding_provider(&config.embedding)?;
    let snapshot_path = crate::storage::get_index_snapshot_path()?;
    let index = Arc::new(ContentIndex::open(embedder.clone(), snapshot_path));

    match command {
        Commands::Chat { email } => {
            if index.is_empty() {
                println!(
                    "The index is empty. Seed the built-in FAQs with 'octomentor index seed-faqs'."
                );
            }
            let resolver = build_resolver(config, index, embedder)?;
            chat_loop(&resolver, &session_id(email.as_deref())).await
        }
        Commands::Ask {
            text,
            email,
            format,
        } => {
            let resolver = build_resolver(config, index, embedder)?;
            let resolution = resolver.resolve(&text, &session_id(email.as_deref())).await?;
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&resolution)?),
                _ => print!("{}", formatting::format_resolution(&resolution)),
            }
            Ok(())
        }
        Commands::Index { command } => run_index_command(&index, command).await,
    }
}

fn build_resolver(
    config: &Config,
    index: Arc<ContentIndex>,
    embedder: Arc<dyn crate::embedding::EmbeddingProvider>,
) -> Result<TieredResolver> {
    let generator = crate::generation::create_generative_provider(&config.generation)?;
    let session = SessionContext::new(
        Arc::new(InMemorySessionStore::new()),
        config.session.clone(),
    );
    Ok(TieredResolver::new(
        index,
        embedder,
        generator,
        session,
        config.resolver.clone(),
    ))
}

fn session_id(email: Option<&str>) -> SessionId {
    match email {
        Some(email) => SessionId::identified(email),
        None => SessionId::anonymous("local"),
    }
}

async fn chat_loop(resolver: &TieredResolver, session: &SessionId) -> Result<()> {
    println!("Ask about courses, pricing or support. Type 'exit' to quit.");

    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        match resolver.resolve(line, session).await {
            Ok(resolution) => print!("{}", formatting::format_resolution(&resolution)),
            Err(err) => eprintln!("Error: {}", err),
        }
    }

    Ok(())
}

async fn run_index_command(index: &ContentIndex, command: IndexCommand) -> Result<()> {
    match command {
        IndexCommand::Course {
            id,
            name,
            description,
            category,
            price,
            tags,
            update,
        } => {
            let event = CourseSaved {
                course_id: id,
                course_name: name,
                description,
                category_id: None,
                category_name: category,
                price,
                status: None,
                tags: parse_tags(tags),
            };
            let chunk = apply(index, &event, update).await?;
            report_indexed(&chunk);
        }
        IndexCommand::Section {
            id,
            name,
            course_id,
            course_name,
            update,
        } => {
            let event = SectionSaved {
                section_id: id,
                section_name: name,
                course_id,
                course_name,
            };
            let chunk = apply(index, &event, update).await?;
            report_indexed(&chunk);
        }
        IndexCommand::Subsection {
            id,
            title,
            summary,
            section_id,
            section_name,
            course_id,
            course_name,
            update,
        } => {
            let event = SubsectionSaved {
                sub_section_id: id,
                title,
                summary,
                section_id,
                section_name,
                course_id,
                course_name,
            };
            let chunk = apply(index, &event, update).await?;
            report_indexed(&chunk);
        }
        IndexCommand::Review {
            id,
            course_id,
            course_name,
            user_id,
            rating,
            text,
            update,
        } => {
            let event = ReviewSubmitted {
                review_id: id,
                course_id: Value::String(course_id),
                course_name,
                user_id,
                rating,
                review: text,
            };
            let chunk = apply(index, &event, update).await?;
            report_indexed(&chunk);
        }
        IndexCommand::Faq {
            question,
            answer,
            tags,
        } => {
            let metadata = ChunkMetadata {
                tags: parse_tags(tags),
                ..ChunkMetadata::new(SourceType::Faq)
            };
            let chunk = index
                .upsert(&question, metadata, Scope::Public, Some(answer))
                .await?;
            report_indexed(&chunk);
        }
        IndexCommand::SeedFaqs => {
            let seeded = ingest::seed_faqs(index).await?;
            println!("Seeded {} FAQ chunk(s)", seeded);
        }
        IndexCommand::Delete {
            source_type,
            source_id,
            text,
            course_id,
            section_id,
        } => {
            // A plain (type, id) pair is the entity-deleted event; anything
            // else is a partial metadata filter.
            let removed = match (source_type, source_id, text, course_id, section_id) {
                (Some(source_type), Some(source_id), None, None, None) => {
                    ingest::deleted(index, source_type, &source_id)?
                }
                (source_type, source_id, text, course_id, section_id) => {
                    let filter = ChunkFilter {
                        source_type,
                        source_id,
                        text,
                        course_id: course_id.map(Value::String),
                        section_id,
                        ..Default::default()
                    };
                    index.delete(&filter)?
                }
            };
            println!("Deleted {} chunk(s)", removed);
        }
        IndexCommand::Stats => {
            print!("{}", formatting::format_stats(&index.stats()));
        }
        IndexCommand::List { limit } => {
            let chunks = index.scan_all();
            print!("{}", formatting::format_chunk_list(&chunks, limit));
        }
    }

    Ok(())
}

async fn apply<E: ingest::IndexableEvent>(
    index: &ContentIndex,
    event: &E,
    update: bool,
) -> Result<Chunk> {
    let chunk = if update {
        ingest::updated(index, event).await?
    } else {
        ingest::created(index, event).await?
    };
    Ok(chunk)
}

fn report_indexed(chunk: &Chunk) {
    println!(
        "Indexed {} chunk (version {}): {}",
        chunk.metadata.source_type, chunk.metadata.version, chunk.text
    );
}

fn parse_tags(tags: Option<String>) -> Vec<String> {
    tags.map(|tags| {
        tags.split(',')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect()
    })
    .unwrap_or_default()
}
