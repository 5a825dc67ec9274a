//! Test-only helpers: scripted model replies, throwaway git repositories
//! and in-memory zip archives.

use std::collections::VecDeque;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::conversation::{
    ArgValue, Conversation, ModelReply, ToolCallRequest, Turn, UpstreamError,
};
use crate::io::model::{ChatModel, ChatRequest};

/// A final-answer reply.
pub fn final_reply(content: &str) -> ModelReply {
    ModelReply::Final {
        content: content.to_string(),
    }
}

/// A reply requesting the given calls.
pub fn tool_calls(calls: Vec<ToolCallRequest>) -> ModelReply {
    ModelReply::ToolCalls { calls }
}

/// A tool call with text arguments.
pub fn tool_call(name: &str, args: &[(&str, &str)]) -> ToolCallRequest {
    ToolCallRequest {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: args
            .iter()
            .map(|(key, value)| (key.to_string(), ArgValue::Text(value.to_string())))
            .collect(),
    }
}

/// The task prompt (first user turn) of a conversation.
pub fn task_of(conversation: &Conversation) -> &str {
    conversation
        .turns()
        .iter()
        .find_map(|turn| match turn {
            Turn::User { content } => Some(content.as_str()),
            _ => None,
        })
        .unwrap_or("")
}

/// What a scripted model saw on one call.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub agent: String,
    pub conversation: Conversation,
    pub tool_names: Vec<String>,
    pub has_schema: bool,
}

/// Replays a fixed queue of replies and records every request.
///
/// Once the queue is empty every call fails with a server error.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelReply, UpstreamError>>>,
    requests: Mutex<Vec<CapturedRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self::from_results(replies.into_iter().map(Ok).collect())
    }

    pub fn from_results(replies: Vec<Result<ModelReply, UpstreamError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl ChatModel for ScriptedModel {
    fn complete(&self, request: &ChatRequest<'_>) -> Result<ModelReply, UpstreamError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(CapturedRequest {
                agent: request.agent.to_string(),
                conversation: request.conversation.clone(),
                tool_names: request.tools.iter().map(|t| t.name.to_string()).collect(),
                has_schema: request.output_schema.is_some(),
            });
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(UpstreamError::Server("script exhausted".to_string())))
    }
}

/// A model whose reply is computed from the request, for tests where
/// several agents run in an unpredictable order.
pub struct FnModel<F>(pub F);

impl<F> ChatModel for FnModel<F>
where
    F: Fn(&ChatRequest<'_>) -> Result<ModelReply, UpstreamError>,
{
    fn complete(&self, request: &ChatRequest<'_>) -> Result<ModelReply, UpstreamError> {
        (self.0)(request)
    }
}

/// Build a zip archive in memory from `(name, contents)` pairs.
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    write_zip(files, CompressionMethod::Stored)
}

/// Like [`zip_bytes`], with every member deflated.
pub fn deflated_zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    write_zip(files, CompressionMethod::Deflated)
}

fn write_zip(files: &[(&str, &str)], method: CompressionMethod) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(method);
    for (name, contents) in files {
        writer.start_file(*name, options).expect("start zip member");
        writer
            .write_all(contents.as_bytes())
            .expect("write zip member");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// A scratch repository with a `main` branch and fake `origin/*` refs.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = Self { dir };
        repo.git(&["init", "-q", "-b", "main"]);
        repo.write("README.md", "# Submissions\n");
        repo.git(&["add", "-A"]);
        repo.git(&["commit", "-q", "-m", "initial"]);
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file into the working tree without committing it.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    /// Commit `files` on `branch` (forked from `main`), publish it as
    /// `origin/<branch>`, and switch back to `main`. Returns the commit id.
    pub fn commit_on_branch(&self, branch: &str, files: &[(&str, &[u8])]) -> String {
        self.git(&["checkout", "-q", "-B", branch, "main"]);
        for (rel, contents) in files {
            let path = self.path().join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create parent dirs");
            }
            fs::write(&path, contents).expect("write file");
        }
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "--allow-empty", "-m", branch]);
        let sha = self.git(&["rev-parse", "HEAD"]).trim().to_string();
        let remote_ref = format!("refs/remotes/origin/{branch}");
        self.git(&["update-ref", &remote_ref, &sha]);
        self.git(&["checkout", "-q", "main"]);
        sha
    }

    fn git(&self, args: &[&str]) -> String {
        let out = Command::new("git")
            .args([
                "-c",
                "user.name=rankbot",
                "-c",
                "user.email=rankbot@example.com",
                "-c",
                "commit.gpgsign=false",
            ])
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("spawn git");
        assert!(
            out.status.success(),
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8_lossy(&out.stdout).into_owned()
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}
