//! Conversation turns and role-tagged messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One query/response exchange.
///
/// Created when a query is issued; the response is filled in once the model
/// answers. Only completed turns are recorded into memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTurn {
    /// The user query.
    pub query: String,
    /// The model response, `None` until it arrives.
    pub response: Option<String>,
}

impl MemoryTurn {
    /// Creates a pending turn.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: None,
        }
    }

    /// Creates a completed turn.
    pub fn completed(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: Some(response.into()),
        }
    }

    /// Attaches the model response.
    pub fn complete(&mut self, response: impl Into<String>) {
        self.response = Some(response.into());
    }

    /// Whether the response has arrived.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.response.is_some()
    }

    /// Renders the turn as message pairs (user, then assistant if present).
    #[must_use]
    pub fn to_messages(&self) -> Vec<Message> {
        let mut messages = vec![Message::user(self.query.clone())];
        if let Some(response) = &self.response {
            messages.push(Message::assistant(response.clone()));
        }
        messages
    }
}

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// End user.
    User,
    /// Model output.
    Assistant,
}

impl Role {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role-tagged message sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl Message {
    /// Creates a message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// System message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}
