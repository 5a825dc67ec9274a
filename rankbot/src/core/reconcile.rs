//! Merge fresh scores into a persisted scorecard table.
//!
//! Only score cells with a new value are overwritten, so partial re-runs keep
//! earlier results. Totals and positions are always recomputed from the cells
//! as they stand after the merge. Rows without a numeric group id are left
//! untouched.

use thiserror::Error;

use crate::core::ranking::shared_positions;
use crate::core::scores::ScoreMaps;
use crate::core::types::GroupId;

pub const GROUP_COLUMN: &str = "Group";
pub const CONCEPT_COLUMN: &str = "Concept Score (10)";
pub const DIFFICULTY_COLUMN: &str = "Difficulty Level (10)";
pub const QUALITY_COLUMN: &str = "Code Quality (10)";
pub const TOTAL_COLUMN: &str = "Total (30)";
pub const POSITION_COLUMN: &str = "Position";

/// A header row plus data rows, cell for cell as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scorecard {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("scorecard is missing column `{0}`")]
    MissingColumn(&'static str),
}

struct Columns {
    group: usize,
    concept: usize,
    difficulty: usize,
    quality: usize,
    total: usize,
    position: usize,
}

impl Columns {
    fn resolve(headers: &[String]) -> Result<Self, ReconcileError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .ok_or(ReconcileError::MissingColumn(name))
        };
        Ok(Self {
            group: find(GROUP_COLUMN)?,
            concept: find(CONCEPT_COLUMN)?,
            difficulty: find(DIFFICULTY_COLUMN)?,
            quality: find(QUALITY_COLUMN)?,
            total: find(TOTAL_COLUMN)?,
            position: find(POSITION_COLUMN)?,
        })
    }
}

/// Parse a group cell; only plain digit strings count.
pub fn parse_group_cell(cell: &str) -> Option<GroupId> {
    let cell = cell.trim();
    if cell.is_empty() || !cell.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    cell.parse().ok()
}

fn parse_score_cell(cell: Option<&String>) -> u32 {
    cell.map(|value| value.trim())
        .filter(|value| !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

/// Apply `scores` to `card` in place.
pub fn reconcile(card: &mut Scorecard, scores: &ScoreMaps) -> Result<(), ReconcileError> {
    let cols = Columns::resolve(&card.headers)?;
    let width = card.headers.len();
    let mut ranked: Vec<(usize, u32)> = Vec::new();

    for (idx, row) in card.rows.iter_mut().enumerate() {
        let Some(group) = row.get(cols.group).and_then(|cell| parse_group_cell(cell)) else {
            continue;
        };
        if row.len() < width {
            row.resize(width, String::new());
        }

        if let Some(score) = scores.concept_score(group) {
            row[cols.concept] = score.to_string();
        }
        if let Some(score) = scores.difficulty_score(group) {
            row[cols.difficulty] = score.to_string();
        }
        if let Some(score) = scores.quality_score(group) {
            row[cols.quality] = score.to_string();
        }

        let total = parse_score_cell(row.get(cols.concept))
            + parse_score_cell(row.get(cols.difficulty))
            + parse_score_cell(row.get(cols.quality));
        if total > 0 {
            row[cols.total] = total.to_string();
            ranked.push((idx, total));
        } else {
            row[cols.total].clear();
            row[cols.position].clear();
        }
    }

    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let totals: Vec<u32> = ranked.iter().map(|&(_, total)| total).collect();
    for (&(idx, _), position) in ranked.iter().zip(shared_positions(&totals)) {
        card.rows[idx][cols.position] = position.to_string();
    }
    Ok(())
}
