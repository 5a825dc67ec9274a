//! Submission identity types.
//!
//! A [`ProjectRef`] is produced once during ingestion and read by every later
//! phase. The [`Location`] variant decides which prompt and which tools a
//! group gets, so call sites never re-derive it from raw link flags.

use serde::Serialize;

/// Numeric group identifier taken from the scorecard `Group` column.
pub type GroupId = u32;

/// Where a group's submission lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    /// The scorecard has no usable project link.
    NoSubmission,
    /// A `.zip` committed to `branch` at `archive_path`.
    Archive { branch: String, archive_path: String },
    /// A link pinned to a specific commit, optionally scoped to a directory.
    PinnedCommit {
        commit: String,
        path: Option<String>,
    },
    /// A branch, optionally scoped to a directory.
    Branch {
        branch: String,
        path: Option<String>,
    },
}

impl Location {
    pub fn has_submission(&self) -> bool {
        !matches!(self, Location::NoSubmission)
    }

    /// True when the submission is read from the checked-out working tree
    /// rather than through git objects.
    pub fn is_working_tree(&self) -> bool {
        matches!(self, Location::Branch { branch, .. } if branch == "main")
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Location::NoSubmission => "none",
            Location::Archive { .. } => "archive",
            Location::PinnedCommit { .. } => "commit",
            Location::Branch { .. } if self.is_working_tree() => "local",
            Location::Branch { .. } => "branch",
        }
    }
}

/// One hackathon submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRef {
    pub group: GroupId,
    pub project_link: String,
    pub video_link: String,
    pub location: Location,
}

impl ProjectRef {
    pub fn has_submission(&self) -> bool {
        self.location.has_submission()
    }
}
