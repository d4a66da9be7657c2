//! Prompt assembly and answer decoding.
//!
//! The system prompt is an output-type header followed by a body holding the
//! schema description (JSON output only), the retrieved search results, the
//! recent conversation and the latest query.

use crate::core::RetrievalResult;
use crate::error::{Error, Result};
use crate::llm::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

const PLAINTEXT_HEADER: &str = "\
You are a strict plain-text generator for a general purpose assistant with deep understanding of the given data and questions.
Output plain text only and connect the given data with the user query to answer their questions, statements and more.
Remain formal and factually correct whenever useful.
";

const JSON_HEADER: &str = "\
You are a strict JSON-object generator for a general purpose assistant with deep understanding of the given data and questions.
Output a single valid JSON object and connect the given data with the user query to answer their questions, statements and more.
Remain formal and factually correct whenever useful.

Additionally, follow this JSON schema:
";

const MARKDOWN_HEADER: &str = "\
You are a strict markdown generator for a general purpose assistant with deep understanding of the given data and questions.
Respond with markdown text that answers the questions of the latest user query in detail and responds to its statements accordingly.
";

/// Requested answer format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// Plain text.
    #[serde(alias = "plain", alias = "txt")]
    Plaintext,
    /// A JSON object following a schema.
    Json,
    /// Markdown.
    #[default]
    #[serde(alias = "md")]
    Markdown,
}

impl OutputType {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plaintext => "plaintext",
            Self::Json => "json",
            Self::Markdown => "markdown",
        }
    }

    /// System prompt header for this output type.
    #[must_use]
    pub const fn header(self) -> &'static str {
        match self {
            Self::Plaintext => PLAINTEXT_HEADER,
            Self::Json => JSON_HEADER,
            Self::Markdown => MARKDOWN_HEADER,
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "plaintext" | "plain" | "txt" => Ok(Self::Plaintext),
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(Error::config(format!("unknown output type: {s}"))),
        }
    }
}

/// Inputs for one system prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptParts<'a> {
    /// Answer format.
    pub output_type: OutputType,
    /// Schema for JSON output.
    pub schema: Option<&'a JsonSchema>,
    /// Filtered hits for the query.
    pub results: &'a RetrievalResult,
    /// Recent conversation, one line per query and response.
    pub recent_memories: &'a str,
    /// The query being answered.
    pub query: &'a str,
}

/// Renders the system prompt.
#[must_use]
pub fn build_system_prompt(parts: &PromptParts<'_>) -> String {
    let schema = match (parts.output_type, parts.schema) {
        (OutputType::Json, Some(schema)) => schema.describe(),
        _ => String::new(),
    };
    let context = parts.results.documents().join("\n");

    format!(
        "{header}\nJSON-Schema:\n{schema}\n\nSearch results from database:\n{context}\n\nMost recent memories:\n{recent}\n\nLatest User-Query: {query}\n",
        header = parts.output_type.header(),
        recent = parts.recent_memories,
        query = parts.query,
    )
}

/// A decoded model answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    /// Structured output that parsed as JSON.
    Json(Value),
    /// Free text, or structured output that failed to parse.
    Text(String),
}

impl Answer {
    /// Decodes completion text. With `structured`, the text is parsed as
    /// JSON and kept as raw text if parsing fails.
    #[must_use]
    pub fn decode(text: String, structured: bool) -> Self {
        if !structured {
            return Self::Text(text);
        }
        match serde_json::from_str::<Value>(strip_code_fence(&text)) {
            Ok(value) => Self::Json(value),
            Err(e) => {
                tracing::warn!(error = %e, "structured output did not parse, returning raw text");
                Self::Text(text)
            }
        }
    }

    /// Whether the answer was decoded as JSON.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => match serde_json::to_string_pretty(value) {
                Ok(pretty) => f.write_str(&pretty),
                Err(_) => write!(f, "{value}"),
            },
            Self::Text(text) => f.write_str(text),
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map_or(trimmed, str::trim)
}
