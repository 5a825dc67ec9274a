//! Sandboxed tools exposed to judge agents.
//!
//! Every tool is "string in, string out": inside the crate tools return
//! `Result<String, ToolError>`, and [`ToolAccess::dispatch`] renders failures
//! as `Error: ...` text for the model. Nothing here panics or propagates an
//! error to the run loop.
//!
//! Which pair of tools an agent sees is decided by the group's [`Location`]
//! through [`ToolSet::for_location`].

pub mod archive;
pub mod listing;
pub mod local;
pub mod versioned;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

use crate::core::conversation::ToolCallRequest;
use crate::core::types::Location;
use crate::io::config::ToolLimits;
use crate::io::git::{Git, GitError};

/// Tool failure; shown to the model as `Error: <message>`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("missing required argument `{0}`")]
    MissingArgument(&'static str),
    #[error("invalid value for `{name}`: {value}")]
    InvalidArgument { name: &'static str, value: String },
    #[error("unknown repo `{requested}`, expected one of: {known}")]
    UnknownRepo { requested: String, known: String },
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("tool `{0}` is not available for this project")]
    NotOffered(String),
    #[error("path escapes the repository root: {0}")]
    PathEscapesRoot(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    EmptyListing(&'static str),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error("{0}")]
    Archive(String),
    #[error("{member} not found in zip. Available: {available:?}")]
    MemberNotFound {
        member: String,
        available: Vec<String>,
    },
    #[error("{0}")]
    Io(String),
}

impl ToolError {
    /// Text handed back to the model.
    pub fn to_tool_result(&self) -> String {
        format!("Error: {self}")
    }
}

/// The fixed tool surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ToolName {
    GitListFiles,
    GitReadFile,
    ReadLocalFile,
    ListLocalDirectory,
    ExtractZipAndList,
    ReadFileFromZip,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::GitListFiles,
        ToolName::GitReadFile,
        ToolName::ReadLocalFile,
        ToolName::ListLocalDirectory,
        ToolName::ExtractZipAndList,
        ToolName::ReadFileFromZip,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::GitListFiles => "git_list_files",
            ToolName::GitReadFile => "git_read_file",
            ToolName::ReadLocalFile => "read_local_file",
            ToolName::ListLocalDirectory => "list_local_directory",
            ToolName::ExtractZipAndList => "extract_zip_and_list",
            ToolName::ReadFileFromZip => "read_file_from_zip",
        }
    }

    pub fn parse(name: &str) -> Option<ToolName> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub fn spec(self) -> ToolSpec {
        let repo = json!({"type": "string", "description": "Cohort repository label, e.g. 'c4'."});
        let branch = json!({"type": "string", "description": "Branch name or commit id."});
        let (description, properties, required): (&str, Value, &[&str]) = match self {
            ToolName::GitListFiles => (
                "List files on a git branch or commit, optionally under a subdirectory.",
                json!({"repo": repo, "branch": branch, "path": {"type": "string", "description": "Optional subdirectory."}}),
                &["repo", "branch"],
            ),
            ToolName::GitReadFile => (
                "Read one file from a git branch or commit without checking it out.",
                json!({"repo": repo, "branch": branch, "filepath": {"type": "string"}}),
                &["repo", "branch", "filepath"],
            ),
            ToolName::ReadLocalFile => (
                "Read a file from the repository working tree.",
                json!({"repo": repo, "filepath": {"type": "string", "description": "Path relative to the repository root."}}),
                &["repo", "filepath"],
            ),
            ToolName::ListLocalDirectory => (
                "Recursively list files with sizes in a working-tree directory.",
                json!({"repo": repo, "dirpath": {"type": "string", "description": "Directory relative to the repository root."}}),
                &["repo", "dirpath"],
            ),
            ToolName::ExtractZipAndList => (
                "Extract a .zip committed to a branch and list the files inside.",
                json!({"repo": repo, "branch": branch, "zip_path": {"type": "string"}}),
                &["repo", "branch", "zip_path"],
            ),
            ToolName::ReadFileFromZip => (
                "Read one file from inside a .zip committed to a branch.",
                json!({"repo": repo, "branch": branch, "zip_path": {"type": "string"}, "file_inside_zip": {"type": "string"}}),
                &["repo", "branch", "zip_path", "file_inside_zip"],
            ),
        };
        ToolSpec {
            name: self.as_str(),
            description,
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }),
        }
    }
}

/// Tool description sent to the model capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// The pair of tools offered for one kind of location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSet {
    Versioned,
    Local,
    Archive,
}

impl ToolSet {
    /// `None` when there is nothing to inspect.
    pub fn for_location(location: &Location) -> Option<ToolSet> {
        match location {
            Location::NoSubmission => None,
            Location::Archive { .. } => Some(ToolSet::Archive),
            Location::Branch { .. } if location.is_working_tree() => Some(ToolSet::Local),
            Location::Branch { .. } | Location::PinnedCommit { .. } => Some(ToolSet::Versioned),
        }
    }

    pub fn tools(self) -> [ToolName; 2] {
        match self {
            ToolSet::Versioned => [ToolName::GitListFiles, ToolName::GitReadFile],
            ToolSet::Local => [ToolName::ListLocalDirectory, ToolName::ReadLocalFile],
            ToolSet::Archive => [ToolName::ExtractZipAndList, ToolName::ReadFileFromZip],
        }
    }

    pub fn contains(self, tool: ToolName) -> bool {
        self.tools().contains(&tool)
    }
}

/// Repository roots and limits shared by all tools.
#[derive(Debug, Clone)]
pub struct ToolBox {
    repos: BTreeMap<String, PathBuf>,
    limits: ToolLimits,
}

impl ToolBox {
    pub fn new(repos: BTreeMap<String, PathBuf>, limits: ToolLimits) -> Self {
        Self { repos, limits }
    }

    pub fn access(&self, set: ToolSet) -> ToolAccess<'_> {
        ToolAccess { toolbox: self, set }
    }

    fn repo_root(&self, call: &ToolCallRequest) -> Result<&Path, ToolError> {
        let label = required(call, "repo")?;
        self.repos
            .get(label.trim())
            .map(PathBuf::as_path)
            .ok_or_else(|| ToolError::UnknownRepo {
                requested: label.clone(),
                known: self.repos.keys().cloned().collect::<Vec<_>>().join(", "),
            })
    }

    fn git(&self, root: &Path) -> Git {
        Git::new(
            root,
            self.limits.git_timeout(),
            self.limits.max_blob_bytes,
        )
    }

    /// Run one tool with typed errors.
    pub fn run(&self, tool: ToolName, call: &ToolCallRequest) -> Result<String, ToolError> {
        let root = self.repo_root(call)?;
        let limits = &self.limits;
        match tool {
            ToolName::GitListFiles => versioned::list_files(
                &self.git(root),
                &required(call, "branch")?,
                call.arg("path").as_deref(),
                limits.max_entries,
            ),
            ToolName::GitReadFile => versioned::read_file(
                &self.git(root),
                &required(call, "branch")?,
                &required(call, "filepath")?,
                limits.max_file_lines,
                limits.max_result_bytes,
            ),
            ToolName::ReadLocalFile => local::read_file(
                root,
                &required(call, "filepath")?,
                limits.max_file_lines,
                limits.max_result_bytes,
            ),
            ToolName::ListLocalDirectory => local::list_directory(
                root,
                call.arg("dirpath").as_deref().unwrap_or(""),
                limits.max_entries,
            ),
            ToolName::ExtractZipAndList => archive::extract_and_list(
                &self.git(root),
                &required(call, "branch")?,
                &required(call, "zip_path")?,
                None,
                limits.max_entries,
                limits.max_blob_bytes,
            ),
            ToolName::ReadFileFromZip => archive::read_member(
                &self.git(root),
                &required(call, "branch")?,
                &required(call, "zip_path")?,
                &required(call, "file_inside_zip")?,
                limits.max_file_lines,
                limits.max_result_bytes,
            ),
        }
    }
}

fn required(call: &ToolCallRequest, key: &'static str) -> Result<String, ToolError> {
    call.arg(key).ok_or(ToolError::MissingArgument(key))
}

/// The registry handed to one agent run.
#[derive(Debug, Clone, Copy)]
pub struct ToolAccess<'a> {
    toolbox: &'a ToolBox,
    set: ToolSet,
}

impl ToolAccess<'_> {
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.set.tools().into_iter().map(ToolName::spec).collect()
    }

    /// Execute a model-requested call and render the result as text.
    pub fn dispatch(&self, call: &ToolCallRequest) -> String {
        match self.try_dispatch(call) {
            Ok(output) => output,
            Err(err) => {
                warn!(tool = %call.name, err = %err, "tool call failed");
                err.to_tool_result()
            }
        }
    }

    fn try_dispatch(&self, call: &ToolCallRequest) -> Result<String, ToolError> {
        let tool =
            ToolName::parse(&call.name).ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;
        if !self.set.contains(tool) {
            return Err(ToolError::NotOffered(call.name.clone()));
        }
        self.toolbox.run(tool, call)
    }
}
