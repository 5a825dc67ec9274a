//! Read-only git adapter over a submissions repository.
//!
//! Submissions are read straight from git objects (`ls-tree`, `show`), never
//! by checking anything out, so probing one branch cannot disturb the working
//! tree another tool is reading. Every call is time-bounded.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::io::process::{CommandOutput, run_command_with_timeout};

/// Failure of a single git invocation.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("could not run git: {0}")]
    Spawn(String),
    /// Non-zero exit; `stderr` carries git's own diagnostic.
    #[error("{stderr}")]
    Failed { args: String, stderr: String },
    #[error("git timed out after {0:?}")]
    TimedOut(Duration),
    #[error("git output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },
}

/// Wrapper for executing git commands in a repository directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    timeout: Duration,
    output_limit: usize,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>, timeout: Duration, output_limit: usize) -> Self {
        Self {
            workdir: workdir.into(),
            timeout,
            output_limit,
        }
    }

    /// Recursive file names under `path` at `reference`.
    #[instrument(skip_all, fields(reference, path))]
    pub fn ls_tree_names(
        &self,
        reference: &str,
        path: Option<&str>,
    ) -> Result<Vec<String>, GitError> {
        let mut args = vec!["ls-tree", "-r", "--name-only", reference];
        if let Some(path) = path {
            args.push(path);
        }
        let out = self.run_checked(&args)?;
        let names = String::from_utf8_lossy(&out.stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        debug!(count = names.len(), "listed tree");
        Ok(names)
    }

    /// Raw blob bytes for `<reference>:<path>`.
    #[instrument(skip_all, fields(reference, path))]
    pub fn show_bytes(&self, reference: &str, path: &str) -> Result<Vec<u8>, GitError> {
        let spec = format!("{reference}:{path}");
        let out = self.run_checked(&["show", &spec])?;
        Ok(out.stdout)
    }

    /// Blob content decoded lossily as UTF-8.
    pub fn show_text(&self, reference: &str, path: &str) -> Result<String, GitError> {
        let bytes = self.show_bytes(reference, path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn run_checked(&self, args: &[&str]) -> Result<CommandOutput, GitError> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.workdir);
        let out = run_command_with_timeout(cmd, None, self.timeout, self.output_limit)
            .map_err(|err| GitError::Spawn(format!("{err:#}")))?;

        if out.timed_out {
            warn!(args = %args.join(" "), "git timed out");
            return Err(GitError::TimedOut(self.timeout));
        }
        if !out.status.success() {
            let stderr = out.stderr_text();
            warn!(args = %args.join(" "), stderr = %stderr, "git failed");
            return Err(GitError::Failed {
                args: args.join(" "),
                stderr,
            });
        }
        if out.stdout_truncated > 0 {
            return Err(GitError::OutputTooLarge {
                limit: self.output_limit,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;

    fn git(repo: &TestRepo) -> Git {
        Git::new(repo.path(), Duration::from_secs(30), 1_000_000)
    }

    #[test]
    fn lists_and_reads_remote_branch_without_checkout() {
        let repo = TestRepo::new();
        repo.commit_on_branch(
            "Group_2",
            &[("app/main.py", b"print('hi')\n"), ("README.md", b"# Two\n")],
        );
        let git = git(&repo);

        let names = git.ls_tree_names("origin/Group_2", None).expect("ls-tree");
        assert!(names.contains(&"app/main.py".to_string()));

        let scoped = git
            .ls_tree_names("origin/Group_2", Some("app"))
            .expect("ls-tree scoped");
        assert_eq!(scoped, vec!["app/main.py".to_string()]);

        let text = git.show_text("origin/Group_2", "README.md").expect("show");
        assert_eq!(text, "# Two\n");
        assert!(!repo.path().join("app/main.py").exists());
    }

    #[test]
    fn unknown_ref_carries_git_diagnostic() {
        let repo = TestRepo::new();
        let err = git(&repo)
            .ls_tree_names("origin/nope", None)
            .unwrap_err();
        match err {
            GitError::Failed { stderr, .. } => assert!(!stderr.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn oversized_blob_is_rejected() {
        let repo = TestRepo::new();
        repo.commit_on_branch("big", &[("blob.bin", &[7u8; 64])]);
        let small = Git::new(repo.path(), Duration::from_secs(30), 16);
        let err = small.show_bytes("origin/big", "blob.bin").unwrap_err();
        assert!(matches!(err, GitError::OutputTooLarge { limit: 16 }));
    }
}
