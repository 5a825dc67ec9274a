//! Model capability boundary.
//!
//! The run loop only sees [`ChatModel`]. The shipped implementation,
//! [`CommandModel`], hands each request to a bridge process: one JSON request
//! on stdin, one tagged JSON reply on stdout, credential in the child
//! environment. Transport concerns (HTTP, provider quirks) live in the bridge.

use std::process::Command;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::core::conversation::{Conversation, ModelReply, ToolCallRequest, UpstreamError};
use crate::io::config::{Credentials, ENV_API_KEY, ModelConfig};
use crate::io::process::run_command_with_timeout;
use crate::tools::ToolSpec;

const REPLY_LIMIT_BYTES: usize = 4 * 1024 * 1024;

/// Everything the model sees for one turn.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub agent: &'a str,
    pub conversation: &'a Conversation,
    pub tools: &'a [ToolSpec],
    pub output_schema: Option<&'a Value>,
}

/// A chat-completion capability. Implementations may be slow and may fail.
pub trait ChatModel {
    fn complete(&self, request: &ChatRequest<'_>) -> Result<ModelReply, UpstreamError>;
}

#[derive(Serialize)]
struct BridgeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    agent: &'a str,
    messages: &'a Conversation,
    tools: &'a [ToolSpec],
    #[serde(skip_serializing_if = "Option::is_none")]
    output_schema: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BridgeReply {
    Final { content: String },
    ToolCalls { calls: Vec<ToolCallRequest> },
    Error { kind: BridgeErrorKind, message: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BridgeErrorKind {
    RateLimit,
    BadRequest,
    Server,
    Transport,
    #[serde(other)]
    Other,
}

/// Decode one bridge reply.
pub fn parse_bridge_reply(stdout: &[u8]) -> Result<ModelReply, UpstreamError> {
    let reply: BridgeReply = serde_json::from_slice(stdout).map_err(|err| {
        UpstreamError::Transport(format!("unparsable bridge reply: {err}"))
    })?;
    match reply {
        BridgeReply::Final { content } => Ok(ModelReply::Final { content }),
        BridgeReply::ToolCalls { calls } => Ok(ModelReply::ToolCalls { calls }),
        BridgeReply::Error { kind, message } => Err(match kind {
            BridgeErrorKind::RateLimit => UpstreamError::RateLimited(message),
            BridgeErrorKind::BadRequest => UpstreamError::BadRequest(message),
            BridgeErrorKind::Transport => UpstreamError::Transport(message),
            BridgeErrorKind::Server | BridgeErrorKind::Other => UpstreamError::Server(message),
        }),
    }
}

/// [`ChatModel`] backed by an external bridge command.
#[derive(Debug, Clone)]
pub struct CommandModel {
    command: Vec<String>,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    credentials: Credentials,
}

impl CommandModel {
    pub fn new(config: &ModelConfig, credentials: Credentials) -> Self {
        Self {
            command: config.command.clone(),
            model: config.name.clone(),
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
            credentials,
        }
    }
}

impl ChatModel for CommandModel {
    #[instrument(skip_all, fields(agent = request.agent, turns = request.conversation.len()))]
    fn complete(&self, request: &ChatRequest<'_>) -> Result<ModelReply, UpstreamError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(UpstreamError::BadRequest("model command is empty".to_string()));
        };
        let payload = serde_json::to_vec(&BridgeRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            agent: request.agent,
            messages: request.conversation,
            tools: request.tools,
            output_schema: request.output_schema,
        })
        .map_err(|err| UpstreamError::BadRequest(format!("serialize request: {err}")))?;

        let mut cmd = Command::new(program);
        cmd.args(args).env(ENV_API_KEY, self.credentials.api_key());
        let out = run_command_with_timeout(cmd, Some(payload), self.timeout, REPLY_LIMIT_BYTES)
            .map_err(|err| UpstreamError::Transport(format!("{err:#}")))?;

        if out.timed_out {
            return Err(UpstreamError::Timeout(self.timeout));
        }
        if !out.status.success() {
            let stderr = out.stderr_text();
            warn!(exit_code = ?out.status.code(), stderr = %stderr, "model bridge failed");
            return Err(UpstreamError::Transport(format!(
                "bridge exited with {}: {stderr}",
                out.status
            )));
        }
        if out.stdout_truncated > 0 {
            return Err(UpstreamError::Transport(format!(
                "bridge reply exceeded {REPLY_LIMIT_BYTES} bytes"
            )));
        }
        let reply = parse_bridge_reply(&out.stdout)?;
        debug!(
            final_answer = matches!(reply, ModelReply::Final { .. }),
            "model replied"
        );
        Ok(reply)
    }
}
