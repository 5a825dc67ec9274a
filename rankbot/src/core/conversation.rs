//! Conversation model exchanged with the model capability.
//!
//! A [`Conversation`] is owned by exactly one agent run and only grows by
//! appending turns. Everything here serializes to the JSON shape the model
//! bridge reads.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A scalar tool argument. Nested values are not accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl ArgValue {
    /// Render the argument as text; numbers and booleans use their JSON form.
    pub fn to_text(&self) -> String {
        match self {
            ArgValue::Bool(value) => value.to_string(),
            ArgValue::Number(value) => value.to_string(),
            ArgValue::Text(value) => value.clone(),
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Identifier echoed back on the matching result turn.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, ArgValue>,
}

impl ToolCallRequest {
    /// Return a string argument, or `None` when absent or blank.
    pub fn arg(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .map(ArgValue::to_text)
            .filter(|value| !value.trim().is_empty())
    }
}

/// One entry in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    System {
        content: String,
    },
    User {
        content: String,
    },
    ToolCalls {
        calls: Vec<ToolCallRequest>,
    },
    ToolResult {
        call_id: String,
        name: String,
        content: String,
    },
}

/// Append-only turn log for a single agent run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Start a conversation from agent instructions and the task prompt.
    pub fn new(instructions: &str, task: &str) -> Self {
        Self {
            turns: vec![
                Turn::System {
                    content: instructions.to_string(),
                },
                Turn::User {
                    content: task.to_string(),
                },
            ],
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push_tool_calls(&mut self, calls: Vec<ToolCallRequest>) {
        self.turns.push(Turn::ToolCalls { calls });
    }

    pub fn push_tool_result(&mut self, call: &ToolCallRequest, content: String) {
        self.turns.push(Turn::ToolResult {
            call_id: call.id.clone(),
            name: call.name.clone(),
            content,
        });
    }
}

/// What the model capability answered for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelReply {
    ToolCalls { calls: Vec<ToolCallRequest> },
    Final { content: String },
}

/// Transport or service fault reported by the model capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("request rejected: {0}")]
    BadRequest(String),
    #[error("model service error: {0}")]
    Server(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
}
