//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::core::{ChunkSequence, Metadata, RetrievalResult};
use crate::error::Error;
use crate::memory::PersistedTurn;
use crate::prompt::Answer;
use crate::storage::StoreStats;
use serde::Serialize;
use serde_json::json;
use std::fmt::Write;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Formats an error for display.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => format_json(&json!({
            "error": error.to_string(),
            "kind": error_kind(error),
        })),
    }
}

const fn error_kind(error: &Error) -> &'static str {
    match error {
        Error::Storage(_) => "storage",
        Error::Chunking(_) => "chunking",
        Error::Io(_) => "io",
        Error::Llm(_) => "llm",
        Error::Command(_) => "command",
        Error::Config { .. } => "config",
        Error::Contract { .. } => "contract",
    }
}

/// Formats a status response.
#[must_use]
pub fn format_status(stats: &StoreStats, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_status_text(stats),
        OutputFormat::Json => format_json(stats),
    }
}

fn format_status_text(stats: &StoreStats) -> String {
    let mut output = String::new();
    output.push_str("ragline status\n");
    output.push_str("==============\n\n");
    for (collection, count) in &stats.collections {
        let _ = writeln!(output, "  {:<13}{count}", format!("{collection}:"));
    }
    let _ = writeln!(output, "  Total:       {}", stats.total_documents());
    let _ = writeln!(output, "  Embedder:    {}", stats.model_name);
    let _ = writeln!(output, "  Schema:      v{}", stats.schema_version);
    if let Some(size) = stats.db_size {
        let _ = writeln!(output, "  DB size:     {}", format_size(size));
    }
    output
}

/// Formats segmentation output.
#[must_use]
pub fn format_chunks(chunks: &ChunkSequence, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            for (i, chunk) in chunks.iter().enumerate() {
                let _ = writeln!(
                    output,
                    "--- chunk {} ({} chars) ---",
                    i + 1,
                    chunk.chars().count()
                );
                let _ = writeln!(output, "{chunk}");
            }
            let _ = writeln!(output, "{} chunks", chunks.len());
            output
        }
        OutputFormat::Json => format_json(&json!({
            "count": chunks.len(),
            "chunks": chunks,
        })),
    }
}

/// Formats an ingestion summary.
#[must_use]
pub fn format_ingest(source: &str, count: usize, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("Ingested {count} documents from {source}\n"),
        OutputFormat::Json => format_json(&json!({"source": source, "documents": count})),
    }
}

#[derive(Debug, Serialize)]
struct Hit<'a> {
    rank: usize,
    id: &'a str,
    distance: f32,
    document: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a Metadata>,
}

/// Formats filtered search results.
#[must_use]
pub fn format_search_results(result: &RetrievalResult, query: &str, format: OutputFormat) -> String {
    let hits: Vec<Hit<'_>> = result
        .iter()
        .enumerate()
        .map(|(i, (document, distance, id, metadata))| Hit {
            rank: i + 1,
            id,
            distance,
            document,
            metadata,
        })
        .collect();

    match format {
        OutputFormat::Text => {
            if hits.is_empty() {
                return format!("No results for \"{query}\"\n");
            }
            let mut output = String::new();
            let _ = writeln!(output, "Results for \"{query}\":\n");
            for hit in &hits {
                let _ = writeln!(
                    output,
                    "{:>3}. {} (distance {:.4})\n     {}",
                    hit.rank,
                    hit.id,
                    hit.distance,
                    truncate(&hit.document.replace('\n', " "), 120)
                );
            }
            output
        }
        OutputFormat::Json => format_json(&json!({
            "query": query,
            "count": hits.len(),
            "results": hits,
        })),
    }
}

/// Formats an answer.
#[must_use]
pub fn format_answer(answer: &Answer, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("{answer}\n"),
        OutputFormat::Json => format_json(&json!({"answer": answer})),
    }
}

/// Formats persisted conversation turns.
#[must_use]
pub fn format_memory(turns: &[PersistedTurn], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if turns.is_empty() {
                return "No memory entries.\n".to_string();
            }
            let mut output = String::new();
            for turn in turns {
                let _ = writeln!(output, "[{}] user:      {}", turn.turn_id, turn.query);
                let _ = writeln!(output, "[{}] assistant: {}", turn.turn_id, turn.response);
            }
            output
        }
        OutputFormat::Json => format_json(&turns),
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Formats a byte size as human-readable.
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Truncates a string to `max_chars` characters with ellipsis.
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else if max_chars <= 3 {
        s.chars().take(max_chars).collect()
    } else {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{head}...")
    }
}
