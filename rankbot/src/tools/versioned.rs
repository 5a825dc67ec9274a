//! Tools that read a ref straight from git objects.

use tracing::info;

use crate::io::git::Git;
use crate::io::ingest::looks_like_commit;
use crate::tools::ToolError;
use crate::tools::listing::{cap_entries, is_noise, truncate_text};

/// Qualify a branch name to its remote-tracking ref.
///
/// Already-qualified refs and commit ids are returned as-is.
pub fn qualify_ref(reference: &str) -> String {
    let reference = reference.trim();
    if reference.starts_with("origin/")
        || reference.starts_with("refs/")
        || looks_like_commit(reference)
    {
        reference.to_string()
    } else {
        format!("origin/{reference}")
    }
}

/// Reject values git would parse as options.
pub(crate) fn ensure_not_option(name: &'static str, value: &str) -> Result<(), ToolError> {
    if value.trim_start().starts_with('-') {
        return Err(ToolError::InvalidArgument {
            name,
            value: value.to_string(),
        });
    }
    Ok(())
}

pub fn list_files(
    git: &Git,
    branch: &str,
    path: Option<&str>,
    max_entries: usize,
) -> Result<String, ToolError> {
    ensure_not_option("branch", branch)?;
    if let Some(path) = path {
        ensure_not_option("path", path)?;
    }
    let reference = qualify_ref(branch);
    info!(reference = %reference, path = path.unwrap_or(""), "git_list_files");

    let names: Vec<String> = git
        .ls_tree_names(&reference, path)?
        .into_iter()
        .filter(|name| !is_noise(name))
        .collect();
    if names.is_empty() {
        return Err(ToolError::EmptyListing("no files at this ref and path"));
    }
    Ok(cap_entries(names, max_entries))
}

pub fn read_file(
    git: &Git,
    branch: &str,
    filepath: &str,
    max_lines: usize,
    max_bytes: usize,
) -> Result<String, ToolError> {
    ensure_not_option("branch", branch)?;
    let reference = qualify_ref(branch);
    info!(reference = %reference, filepath, "git_read_file");
    let content = git.show_text(&reference, filepath)?;
    Ok(truncate_text(&content, max_lines, max_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;
    use std::time::Duration;

    #[test]
    fn qualify_ref_rules() {
        assert_eq!(qualify_ref("Group_1"), "origin/Group_1");
        assert_eq!(qualify_ref("origin/Group_1"), "origin/Group_1");
        assert_eq!(qualify_ref("refs/heads/main"), "refs/heads/main");
        assert_eq!(qualify_ref("0123abc"), "0123abc");
        assert_eq!(qualify_ref("deadbeef"), "deadbeef");
        assert_eq!(qualify_ref("feature-x"), "origin/feature-x");
    }

    #[test]
    fn listing_filters_noise_and_reads_with_truncation() {
        let repo = TestRepo::new();
        let long: String = (1..=10).map(|i| format!("row {i}\n")).collect();
        repo.commit_on_branch(
            "Group_7",
            &[
                ("app.py", long.as_bytes()),
                ("__pycache__/app.cpython-311.pyc", b"\x00"),
                (".DS_Store", b"x"),
            ],
        );
        let git = Git::new(repo.path(), Duration::from_secs(30), 1 << 20);

        let listing = list_files(&git, "Group_7", None, 200).expect("list");
        assert!(listing.lines().any(|line| line == "app.py"));
        assert!(!listing.contains("__pycache__"));
        assert!(!listing.contains(".DS_Store"));

        let text = read_file(&git, "Group_7", "app.py", 3, 4096).expect("read");
        assert!(text.starts_with("row 1\nrow 2\nrow 3\n"));
        assert!(text.ends_with("... (truncated at 3 lines)"));
    }

    #[test]
    fn pinned_commit_is_read_without_qualification() {
        let repo = TestRepo::new();
        let sha = repo.commit_on_branch("Group_8", &[("main.py", b"x = 1\n")]);
        let git = Git::new(repo.path(), Duration::from_secs(30), 1 << 20);
        let text = read_file(&git, &sha[..10], "main.py", 300, 4096).expect("read");
        assert_eq!(text, "x = 1");
    }

    #[test]
    fn missing_path_surfaces_git_diagnostic() {
        let repo = TestRepo::new();
        repo.commit_on_branch("Group_1", &[("a.py", b"")]);
        let git = Git::new(repo.path(), Duration::from_secs(30), 1 << 20);
        let err = read_file(&git, "Group_1", "nope.py", 300, 4096).unwrap_err();
        assert!(matches!(err, ToolError::Git(_)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn option_like_refs_are_refused() {
        let repo = TestRepo::new();
        let git = Git::new(repo.path(), Duration::from_secs(30), 1 << 20);
        let err = list_files(&git, "--output=/tmp/x", None, 200).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { name: "branch", .. }));
    }
}
