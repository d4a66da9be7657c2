//! OpenAI-compatible chat-completions client.

use crate::core::Message;
use crate::error::{LlmError, Result};
use crate::llm::{Completer, CompletionRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Default endpoint base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Blocking chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenAiCompleter {
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<&'a Message>,
    max_completion_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiCompleter {
    /// Creates a client for `model` at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Creates a client reading the API key from `OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] if the variable is unset or empty.
    pub fn from_env(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(LlmError::MissingApiKey)?;
        Ok(Self::new(base_url, api_key, model))
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn body(&self, system: &Message, request: &CompletionRequest) -> Result<Value> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(system);
        messages.extend(request.messages.iter());

        let body = ChatRequest {
            model: &self.model,
            messages,
            max_completion_tokens: request.params.max_output_tokens,
            temperature: request.params.temperature,
            top_p: request.params.top_p,
            response_format: request.json_schema.as_ref().map(|schema| {
                json!({
                    "type": "json_schema",
                    "json_schema": {"name": schema.name, "schema": schema.schema}
                })
            }),
        };
        let value = serde_json::to_value(body).map_err(LlmError::from)?;
        Ok(value)
    }
}

impl Completer for OpenAiCompleter {
    fn model(&self) -> &str {
        &self.model
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let system = Message::system(request.system_prompt.clone());
        let body = self.body(&system, request)?;

        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            structured = request.json_schema.is_some(),
            "requesting completion"
        );

        let response = ureq::post(&self.endpoint())
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body)
            .map_err(LlmError::from)?;

        let parsed: ChatResponse = response
            .into_json()
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Malformed("response has no message content".to_string()))?;

        tracing::debug!(model = %self.model, chars = text.len(), "completion received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{JsonSchema, SamplingParams};

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            "be brief",
            vec![Message::user("hello"), Message::assistant("hi")],
            SamplingParams {
                max_output_tokens: 64,
                temperature: 0.5,
                top_p: 0.9,
            },
        )
    }

    #[test]
    fn test_body_puts_system_first() {
        let client = OpenAiCompleter::new("http://localhost:1/v1/", "key", "gpt-4.1-mini");
        let system = Message::system("be brief");
        let body = client.body(&system, &request()).unwrap();

        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["max_completion_tokens"], 64);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["messages"][2]["role"], "assistant");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_body_with_schema() {
        let client = OpenAiCompleter::new("http://localhost:1/v1", "key", "m");
        let schema = JsonSchema::from_value(serde_json::json!({
            "properties": {"a": {"type": "string", "description": "x"}}
        }))
        .unwrap();
        let system = Message::system("s");
        let body = client.body(&system, &request().with_schema(Some(schema))).unwrap();
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "response");
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let client = OpenAiCompleter::new("http://localhost:1/v1/", "key", "m");
        assert_eq!(client.endpoint(), "http://localhost:1/v1/chat/completions");
    }

    #[test]
    fn test_unreachable_endpoint_is_transport_error() {
        let client = OpenAiCompleter::new("http://127.0.0.1:9", "key", "m");
        let err = client.complete(&request()).unwrap_err();
        assert!(matches!(err, crate::Error::Llm(LlmError::Transport(_))));
    }
}
