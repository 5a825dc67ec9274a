//! Markdown report, JSON export and console summary.
//!
//! All three render the aggregated [`ResultRow`] list in its given order.
//! A missing score is shown as zero with a "No submission" note, never as a
//! silent zero.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::ranking::ResultRow;
use crate::core::scores::ScoreMaps;
use crate::core::types::GroupId;
use crate::io::atomic::write_atomic;

const NO_SUBMISSION: &str = "No submission";

/// One group in the JSON export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreExport {
    pub group: GroupId,
    pub concept_score: u8,
    pub concept_justification: String,
    pub concept_concepts_found: Vec<String>,
    pub difficulty_score: u8,
    pub difficulty_justification: String,
    pub code_quality_score: u8,
    pub code_quality_justification: String,
    pub total: u32,
}

pub fn export_rows(rows: &[ResultRow], scores: &ScoreMaps) -> Vec<ScoreExport> {
    rows.iter()
        .map(|row| {
            let concept = scores.concept.get(&row.group);
            let difficulty = scores.difficulty.get(&row.group);
            let quality = scores.quality.get(&row.group);
            ScoreExport {
                group: row.group,
                concept_score: concept.map_or(0, |c| c.score),
                concept_justification: concept
                    .map_or_else(|| NO_SUBMISSION.to_string(), |c| c.justification.clone()),
                concept_concepts_found: concept
                    .map(|c| c.concepts_found.clone())
                    .unwrap_or_default(),
                difficulty_score: difficulty.map_or(0, |d| d.score),
                difficulty_justification: difficulty
                    .map_or_else(|| NO_SUBMISSION.to_string(), |d| d.justification.clone()),
                code_quality_score: quality.map_or(0, |q| q.score),
                code_quality_justification: quality
                    .map_or_else(|| NO_SUBMISSION.to_string(), |q| q.justification.clone()),
                total: row.total,
            }
        })
        .collect()
}

fn mark(flag: bool) -> &'static str {
    if flag { "✓" } else { "✗" }
}

fn score_cell(score: Option<u8>) -> String {
    score.unwrap_or(0).to_string()
}

pub fn render_report(cohort: &str, rows: &[ResultRow], scores: &ScoreMaps) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {} Hackathon Evaluation Report", cohort.to_uppercase());
    out.push_str("\n## Summary\n\n");
    out.push_str("| Rank | Group | Concept | Difficulty | Code Quality | Total |\n");
    out.push_str("|------|-------|---------|------------|--------------|-------|\n");
    for row in rows {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            row.position,
            row.group,
            score_cell(row.concept),
            score_cell(row.difficulty),
            score_cell(row.quality),
            row.total
        );
    }
    out.push_str("\n---\n\n## Detailed Evaluations\n\n");

    for row in rows {
        let _ = writeln!(out, "### Group {} (Total: {}/30)\n", row.group, row.total);

        match scores.concept.get(&row.group) {
            Some(c) => {
                let _ = writeln!(out, "**Concept Score: {}/10**", c.score);
                let _ = writeln!(out, "- Concepts found: {}", c.concepts_found.join(", "));
                let _ = writeln!(out, "- Concepts missing: {}", c.concepts_missing.join(", "));
                let _ = writeln!(out, "- Justification: {}", c.justification);
            }
            None => {
                let _ = writeln!(out, "**Concept Score: 0/10** — {NO_SUBMISSION}");
            }
        }
        out.push('\n');

        match scores.difficulty.get(&row.group) {
            Some(d) => {
                let _ = writeln!(out, "**Difficulty Score: {}/10**", d.score);
                let _ = writeln!(out, "- Justification: {}", d.justification);
            }
            None => {
                let _ = writeln!(out, "**Difficulty Score: 0/10** — {NO_SUBMISSION}");
            }
        }
        out.push('\n');

        match scores.quality.get(&row.group) {
            Some(q) => {
                let _ = writeln!(out, "**Code Quality Score: {}/10**", q.score);
                let _ = writeln!(out, "- Folder structure: {}", mark(q.has_proper_folders));
                let _ = writeln!(
                    out,
                    "- README: {} ({})",
                    mark(q.has_readme),
                    q.readme_quality
                );
                let _ = writeln!(out, "- Requirements: {}", mark(q.has_requirements_txt));
                let _ = writeln!(out, "- Env handling: {}", mark(q.has_env_handling));
                let _ = writeln!(out, "- Organization: {}", q.code_organization);
                let _ = writeln!(out, "- Justification: {}", q.justification);
            }
            None => {
                let _ = writeln!(out, "**Code Quality Score: 0/10** — {NO_SUBMISSION}");
            }
        }
        out.push_str("\n---\n\n");
    }
    out
}

pub fn render_console_table(cohort: &str, rows: &[ResultRow]) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "\n{rule}");
    let _ = writeln!(out, " {} Hackathon Evaluation Results", cohort.to_uppercase());
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "{:<5} {:<7} {:<9} {:<6} {:<9} {:<6}",
        "Rank", "Group", "Concept", "Diff", "Quality", "Total"
    );
    let _ = writeln!(
        out,
        "{} {} {} {} {} {}",
        "-".repeat(5),
        "-".repeat(7),
        "-".repeat(9),
        "-".repeat(6),
        "-".repeat(9),
        "-".repeat(6)
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<5} {:<7} {:<9} {:<6} {:<9} {:<6}",
            row.position,
            row.group,
            score_cell(row.concept),
            score_cell(row.difficulty),
            score_cell(row.quality),
            row.total
        );
    }
    let _ = writeln!(out, "{rule}");
    out
}

pub fn write_report(path: &Path, cohort: &str, rows: &[ResultRow], scores: &ScoreMaps) -> Result<()> {
    write_atomic(path, render_report(cohort, rows, scores).as_bytes())
        .with_context(|| format!("write report {}", path.display()))
}

pub fn write_scores_json(path: &Path, rows: &[ResultRow], scores: &ScoreMaps) -> Result<()> {
    let mut payload =
        serde_json::to_string_pretty(&export_rows(rows, scores)).context("serialize scores")?;
    payload.push('\n');
    write_atomic(path, payload.as_bytes())
        .with_context(|| format!("write scores {}", path.display()))
}
