use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::index::types::{Chunk, IndexStats};
use crate::resolver::{Resolution, Tier};

pub fn format_resolution(resolution: &Resolution) -> String {
    let mut output = String::new();

    let tier_label = match resolution.tier {
        Tier::Insight => "insight".magenta().bold().to_string(),
        Tier::Exact => "tier 1 · exact".green().bold().to_string(),
        Tier::Similar => "tier 2 · similar".cyan().bold().to_string(),
        Tier::NoMatch => "tier 3 · no match".yellow().bold().to_string(),
        Tier::Refused => "refused".red().bold().to_string(),
    };
    output.push_str(&tier_label);
    output.push('\n');

    output.push_str(&resolution.answer);
    output.push('\n');

    if !resolution.context_used.is_empty() {
        output.push_str(&"─".repeat(60));
        output.push('\n');
        output.push_str(&"Grounded in:".bright_black().to_string());
        output.push('\n');
        for chunk in &resolution.context_used {
            let preview = preview_text(&chunk.text, 80);
            output.push_str(
                &format!("  [{}] {}", chunk.metadata.source_type, preview)
                    .bright_black()
                    .to_string(),
            );
            output.push('\n');
        }
    }

    if resolution.show_ticket_option {
        output.push_str(
            &"A support ticket can be created for this query."
                .yellow()
                .to_string(),
        );
        output.push('\n');
    }

    output
}

pub fn format_stats(stats: &IndexStats) -> String {
    let mut output = String::new();

    output.push_str(&"Content Index Statistics".bold().to_string());
    output.push('\n');
    output.push_str(&format!("Total Chunks: {}", stats.total_chunks));
    output.push('\n');

    let mut counts: Vec<(&String, &usize)> = stats.by_source_type.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    for (source_type, count) in counts {
        output.push_str(&format!("  {}: {}", source_type, count));
        output.push('\n');
    }

    if let Some(oldest) = stats.oldest_indexed {
        output.push_str(&format!("Oldest Indexed: {}", format_relative_time(oldest)));
        output.push('\n');
    }

    if let Some(newest) = stats.newest_indexed {
        output.push_str(&format!("Newest Indexed: {}", format_relative_time(newest)));
        output.push('\n');
    }

    output
}

pub fn format_chunk_list(chunks: &[Chunk], limit: usize) -> String {
    if chunks.is_empty() {
        return "No chunks indexed".to_string();
    }

    let mut output = String::new();

    // Header
    output.push_str(
        &format!(
            "{:<12} {:<52} {:<8} {}\n",
            "Type", "Text", "Answer", "Indexed"
        )
        .bold()
        .to_string(),
    );
    output.push_str(&"─".repeat(96));
    output.push('\n');

    for chunk in chunks.iter().take(limit) {
        output.push_str(&format!(
            "{:<12} {:<52} {:<8} {}\n",
            chunk.metadata.source_type.to_string(),
            preview_text(&chunk.text, 50),
            if chunk.answer.is_some() { "yes" } else { "-" },
            format_relative_time(chunk.created_at)
        ));
    }

    if chunks.len() > limit {
        output.push_str(&format!("… and {} more", chunks.len() - limit));
        output.push('\n');
    }

    output
}

fn format_relative_time(dt: DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(dt);

    if duration.num_days() > 0 {
        format!("{} days ago", duration.num_days())
    } else if duration.num_hours() > 0 {
        format!("{} hours ago", duration.num_hours())
    } else if duration.num_minutes() > 0 {
        format!("{} minutes ago", duration.num_minutes())
    } else {
        "just now".to_string()
    }
}

fn preview_text(input: &str, max_chars: usize) -> String {
    if input.chars().count() > max_chars {
        let truncated: String = input.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        input.to_string()
    }
}
