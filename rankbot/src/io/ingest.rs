//! Scorecard, syllabus and reference-table ingestion.
//!
//! Project links are classified into a [`Location`] here, once, so later
//! phases only ever match on the variant.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use csv::StringRecord;
use regex::Regex;
use tracing::{debug, info, instrument};

use crate::core::reconcile::{
    CONCEPT_COLUMN, DIFFICULTY_COLUMN, GROUP_COLUMN, QUALITY_COLUMN, TOTAL_COLUMN,
    parse_group_cell,
};
use crate::core::types::{GroupId, Location, ProjectRef};

pub const PROJECT_LINK_COLUMN: &str = "Project Link";
pub const VIDEO_LINK_COLUMN: &str = "Video Link";
pub const COMMENTS_COLUMN: &str = "Comments";

static COMMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/commit/([0-9a-f]{7,40})").expect("commit regex is valid"));
static ZIP_BLOB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/blob/([^/]+)/(.+\.zip)$").expect("zip regex is valid"));
static TREE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/tree/([^/]+)(?:/(.+))?$").expect("tree regex is valid"));
static BLOB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/blob/([^/]+)/(.+)$").expect("blob regex is valid"));

/// True for a 7 to 40 character lowercase hex string.
pub fn looks_like_commit(reference: &str) -> bool {
    (7..=40).contains(&reference.len())
        && reference
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Classify a hosted-repository URL.
///
/// Rules are tried in order: commit link, zipped blob, tree (commit-pinned
/// when the ref is hex), plain blob. Anything else has no submission.
pub fn parse_project_link(link: &str) -> Location {
    let link = link.trim().trim_end_matches('/');
    if link.is_empty() {
        return Location::NoSubmission;
    }

    if let Some(caps) = COMMIT_RE.captures(link) {
        return Location::PinnedCommit {
            commit: caps[1].to_string(),
            path: None,
        };
    }

    if let Some(caps) = ZIP_BLOB_RE.captures(link) {
        return Location::Archive {
            branch: percent_decode(&caps[1]),
            archive_path: percent_decode(&caps[2]),
        };
    }

    if let Some(caps) = TREE_RE.captures(link) {
        let reference = percent_decode(&caps[1]);
        let path = caps.get(2).map(|m| percent_decode(m.as_str()));
        if looks_like_commit(&reference) {
            return Location::PinnedCommit {
                commit: reference,
                path,
            };
        }
        return Location::Branch {
            branch: reference,
            path,
        };
    }

    if let Some(caps) = BLOB_RE.captures(link) {
        return Location::Branch {
            branch: percent_decode(&caps[1]),
            path: Some(percent_decode(&caps[2])),
        };
    }

    Location::NoSubmission
}

/// Decode `%XX` escapes; malformed escapes are kept literally.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%'
            && idx + 2 < bytes.len()
            && let (Some(hi), Some(lo)) = (hex_value(bytes[idx + 1]), hex_value(bytes[idx + 2]))
        {
            out.push((hi << 4) | lo);
            idx += 3;
            continue;
        }
        out.push(bytes[idx]);
        idx += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

struct Table {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl Table {
    fn read(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("open {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("read header of {}", path.display()))?
            .clone();
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("read rows of {}", path.display()))?;
        Ok(Self { headers, rows })
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header.trim() == name)
    }

    fn require(&self, name: &str, path: &Path) -> Result<usize> {
        match self.column(name) {
            Some(idx) => Ok(idx),
            None => bail!("{} has no `{name}` column", path.display()),
        }
    }
}

fn cell(row: &StringRecord, idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map(str::trim).unwrap_or("")
}

/// Load one [`ProjectRef`] per scorecard row with a numeric group id.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_groups(path: &Path) -> Result<Vec<ProjectRef>> {
    let table = Table::read(path)?;
    let group_col = table.require(GROUP_COLUMN, path)?;
    let link_col = table.column(PROJECT_LINK_COLUMN);
    let video_col = table.column(VIDEO_LINK_COLUMN);

    let mut groups = Vec::new();
    for row in &table.rows {
        let Some(group) = parse_group_cell(cell(row, Some(group_col))) else {
            continue;
        };
        let project_link = cell(row, link_col).to_string();
        let location = parse_project_link(&project_link);
        debug!(group, kind = location.kind(), "parsed group");
        groups.push(ProjectRef {
            group,
            project_link,
            video_link: cell(row, video_col).to_string(),
            location,
        });
    }

    let evaluable = groups.iter().filter(|g| g.has_submission()).count();
    info!(groups = groups.len(), evaluable, "loaded groups");
    Ok(groups)
}

/// Keep only the listed groups; an empty filter keeps everything.
pub fn filter_groups(groups: Vec<ProjectRef>, only: &[GroupId]) -> Vec<ProjectRef> {
    if only.is_empty() {
        return groups;
    }
    groups
        .into_iter()
        .filter(|group| only.contains(&group.group))
        .collect()
}

/// Render the syllabus CSV as markdown blocks, one per sprint.
pub fn load_syllabus(path: &Path) -> Result<String> {
    let table = Table::read(path)?;
    let title = table.column("Sprint Title");
    let topics = table.column("Topics");
    let description = table.column("Description");
    let outcomes = table.column("Outcomes");
    let tools = table.column("Tools - Sprint Wise");

    let mut blocks = Vec::new();
    for row in &table.rows {
        let title = cell(row, title);
        let topics = cell(row, topics);
        if title.is_empty() && topics.is_empty() {
            continue;
        }
        let mut block = Vec::new();
        if !title.is_empty() {
            block.push(format!("## {title}"));
        }
        for (label, value) in [
            ("Topics", topics),
            ("Description", cell(row, description)),
            ("Outcomes", cell(row, outcomes)),
            ("Tools", cell(row, tools)),
        ] {
            if !value.is_empty() {
                block.push(format!("**{label}:** {value}"));
            }
        }
        block.push(String::new());
        blocks.push(block.join("\n"));
    }
    Ok(blocks.join("\n"))
}

/// Render a scored cohort's scorecard as a calibration table.
pub fn load_reference_table(path: &Path, cohort: &str) -> Result<String> {
    let table = Table::read(path)?;
    let group_col = table.require(GROUP_COLUMN, path)?;
    let columns = [
        table.column(CONCEPT_COLUMN),
        table.column(DIFFICULTY_COLUMN),
        table.column(QUALITY_COLUMN),
        table.column(TOTAL_COLUMN),
    ];
    let comments = table.column(COMMENTS_COLUMN);

    let mut lines = vec![
        format!("# {} Reference Scores (for calibration)", cohort.to_uppercase()),
        String::new(),
        "| Group | Concept | Difficulty | Code Quality | Total | Comments |".to_string(),
        "|-------|---------|------------|--------------|-------|----------|".to_string(),
    ];
    for row in &table.rows {
        let group = cell(row, Some(group_col));
        if parse_group_cell(group).is_none() {
            continue;
        }
        let scores: Vec<&str> = columns
            .iter()
            .map(|&idx| match cell(row, idx) {
                "" => "-",
                value => value,
            })
            .collect();
        lines.push(format!(
            "| {group} | {} | {} |",
            scores.join(" | "),
            cell(row, comments)
        ));
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn commit_links_pin_the_commit() {
        let loc = parse_project_link("https://github.com/org/repo/commit/abc1234def");
        assert_eq!(
            loc,
            Location::PinnedCommit {
                commit: "abc1234def".to_string(),
                path: None
            }
        );
    }

    #[test]
    fn zip_blobs_are_archives_with_decoded_segments() {
        let loc = parse_project_link(
            "https://github.com/org/repo/blob/Group%205/final%20build/project.zip",
        );
        assert_eq!(
            loc,
            Location::Archive {
                branch: "Group 5".to_string(),
                archive_path: "final build/project.zip".to_string()
            }
        );
    }

    #[test]
    fn tree_links_split_branch_and_commit() {
        assert_eq!(
            parse_project_link("https://github.com/org/repo/tree/main/group-3/app"),
            Location::Branch {
                branch: "main".to_string(),
                path: Some("group-3/app".to_string())
            }
        );
        assert_eq!(
            parse_project_link("https://github.com/org/repo/tree/Group_1/"),
            Location::Branch {
                branch: "Group_1".to_string(),
                path: None
            }
        );
        assert_eq!(
            parse_project_link("https://github.com/org/repo/tree/0123abcd/src"),
            Location::PinnedCommit {
                commit: "0123abcd".to_string(),
                path: Some("src".to_string())
            }
        );
    }

    #[test]
    fn plain_blob_is_a_branch_path() {
        assert_eq!(
            parse_project_link("https://github.com/org/repo/blob/Group_9/app.py"),
            Location::Branch {
                branch: "Group_9".to_string(),
                path: Some("app.py".to_string())
            }
        );
    }

    #[test]
    fn blank_or_foreign_links_have_no_submission() {
        assert_eq!(parse_project_link("   "), Location::NoSubmission);
        assert_eq!(
            parse_project_link("https://drive.google.com/file/d/xyz"),
            Location::NoSubmission
        );
    }

    #[test]
    fn percent_decode_keeps_malformed_escapes() {
        assert_eq!(percent_decode("a%20b"), "a b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz%4"), "%zz%4");
        assert_eq!(percent_decode("caf%C3%A9"), "café");
    }

    #[test]
    fn load_groups_skips_non_numeric_rows() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("c4.csv");
        fs::write(
            &path,
            "Group,Project Link,Video Link,Concept Score (10)\n\
             1,https://github.com/o/r/tree/Group_1,https://v/1,\n\
             2,,,\n\
             Notes,,,\n",
        )
        .expect("write");

        let groups = load_groups(&path).expect("load");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].video_link, "https://v/1");
        assert!(groups[0].has_submission());
        assert_eq!(groups[1].location, Location::NoSubmission);

        let only = filter_groups(groups, &[2]);
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].group, 2);
    }

    #[test]
    fn syllabus_renders_markdown_blocks() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("syllabus.csv");
        fs::write(
            &path,
            "Sprint Title,Topics,Description,Outcomes,Tools - Sprint Wise\n\
             Sprint 1,Prompting,,Write prompts,OpenAI\n\
             ,,,,\n",
        )
        .expect("write");
        let text = load_syllabus(&path).expect("load");
        assert_eq!(
            text,
            "## Sprint 1\n**Topics:** Prompting\n**Outcomes:** Write prompts\n**Tools:** OpenAI\n"
        );
    }

    #[test]
    fn reference_table_marks_empty_cells() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("c3.csv");
        fs::write(
            &path,
            "Group,Concept Score (10),Difficulty Level (10),Code Quality (10),Total (30),Comments\n\
             4,10,,9,19,great\n",
        )
        .expect("write");
        let text = load_reference_table(&path, "c3").expect("load");
        assert!(text.starts_with("# C3 Reference Scores"));
        assert!(text.ends_with("| 4 | 10 | - | 9 | 19 | great |"), "{text}");
    }
}
