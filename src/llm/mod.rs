//! Completion endpoint interface.
//!
//! The pipeline talks to a language model through the [`Completer`] trait:
//! one blocking call per request, no retries. [`OpenAiCompleter`] speaks the
//! OpenAI-compatible chat-completions protocol.

mod openai;

pub use openai::{DEFAULT_BASE_URL, OpenAiCompleter};

use crate::core::Message;
use crate::error::{Error, Result};
use serde_json::Value;
use std::path::Path;

/// Sampling parameters for one completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    /// Output token cap.
    pub max_output_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_output_tokens: 1024,
            temperature: 1.0,
            top_p: 1.0,
        }
    }
}

/// A named JSON schema the model output must follow.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchema {
    /// Schema name sent to the endpoint.
    pub name: String,
    /// The JSON schema document.
    pub schema: Value,
}

impl JsonSchema {
    /// Loads a schema file.
    ///
    /// Accepts a bare schema, `{"name", "schema"}`, or the same wrapped in
    /// a `"format"` object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file is missing or is not a usable
    /// schema.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("schema file {}: {e}", path.display())))?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("schema file {}: {e}", path.display())))?;
        Self::from_value(value)
    }

    /// Builds a schema from an already parsed JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no object schema can be found.
    pub fn from_value(value: Value) -> Result<Self> {
        let inner = value.get("format").cloned().unwrap_or(value);
        let (name, schema) = match inner.get("schema") {
            Some(schema) => (
                inner
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("response")
                    .to_string(),
                schema.clone(),
            ),
            None => ("response".to_string(), inner),
        };

        if !schema.get("properties").is_some_and(Value::is_object) {
            return Err(Error::config("JSON schema has no \"properties\" object"));
        }
        Ok(Self { name, schema })
    }

    /// One line per top-level property: `'name' [type]: description`.
    #[must_use]
    pub fn describe(&self) -> String {
        let Some(properties) = self.schema.get("properties").and_then(Value::as_object) else {
            return String::new();
        };
        properties
            .iter()
            .map(|(name, definition)| {
                let kind = definition.get("type").map_or_else(
                    || "any".to_string(),
                    |t| t.as_str().map_or_else(|| t.to_string(), str::to_string),
                );
                let description = definition
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                format!("'{name}' [{kind}]: {description}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System instructions, sent first.
    pub system_prompt: String,
    /// Conversation messages after the system prompt.
    pub messages: Vec<Message>,
    /// Sampling parameters.
    pub params: SamplingParams,
    /// Structured output schema, if any.
    pub json_schema: Option<JsonSchema>,
}

impl CompletionRequest {
    /// Creates a request without a schema.
    pub fn new(system_prompt: impl Into<String>, messages: Vec<Message>, params: SamplingParams) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages,
            params,
            json_schema: None,
        }
    }

    /// Creates a request from an assembled context whose leading system
    /// messages become the system prompt.
    pub fn from_context(context: Vec<Message>, params: SamplingParams) -> Self {
        let (system, messages): (Vec<Message>, Vec<Message>) = context
            .into_iter()
            .partition(|m| m.role == crate::core::Role::System);
        let system_prompt = system
            .into_iter()
            .map(|m| m.content)
            .collect::<Vec<_>>()
            .join("\n\n");
        Self::new(system_prompt, messages, params)
    }

    /// Requests structured output following `schema`.
    #[must_use]
    pub fn with_schema(mut self, schema: Option<JsonSchema>) -> Self {
        self.json_schema = schema;
        self
    }
}

/// A language model completion endpoint.
pub trait Completer: Send + Sync {
    /// Model identifier.
    fn model(&self) -> &str;

    /// Runs one completion and returns the output text.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`](crate::error::LlmError) on transport failure,
    /// a non-success status or a malformed response.
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}
