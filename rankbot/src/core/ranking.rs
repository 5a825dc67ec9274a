//! Totals, ordering, and shared-position ranking.

use serde::Serialize;

use crate::core::scores::ScoreMaps;
use crate::core::types::GroupId;

/// One group's aggregated result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub group: GroupId,
    pub concept: Option<u8>,
    pub difficulty: Option<u8>,
    pub quality: Option<u8>,
    /// Sum of present scores; absent slots count as zero.
    pub total: u32,
    pub position: u32,
}

/// Combine the three score maps into rows ordered by descending total, then
/// ascending group id.
pub fn aggregate(groups: &[GroupId], scores: &ScoreMaps) -> Vec<ResultRow> {
    let mut rows: Vec<ResultRow> = groups
        .iter()
        .map(|&group| {
            let concept = scores.concept_score(group);
            let difficulty = scores.difficulty_score(group);
            let quality = scores.quality_score(group);
            ResultRow {
                group,
                concept,
                difficulty,
                quality,
                total: total_of([concept, difficulty, quality]),
                position: 0,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.total.cmp(&a.total).then(a.group.cmp(&b.group)));

    let totals: Vec<u32> = rows.iter().map(|row| row.total).collect();
    for (row, position) in rows.iter_mut().zip(shared_positions(&totals)) {
        row.position = position;
    }
    rows
}

/// Sum the present slots.
pub fn total_of(slots: [Option<u8>; 3]) -> u32 {
    slots.iter().flatten().map(|&score| u32::from(score)).sum()
}

/// Positions for totals already sorted in descending order.
///
/// Equal totals share a position; the next distinct total takes its 1-based
/// index, so `[30, 30, 20, 10]` ranks as `[1, 1, 3, 4]`.
pub fn shared_positions(sorted_totals: &[u32]) -> Vec<u32> {
    let mut positions = Vec::with_capacity(sorted_totals.len());
    let mut current = 0u32;
    let mut previous: Option<u32> = None;
    for (idx, &total) in sorted_totals.iter().enumerate() {
        if previous != Some(total) {
            current = idx as u32 + 1;
        }
        positions.push(current);
        previous = Some(total);
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scores::{ConceptScore, DifficultyEntry};

    fn concept(score: u8) -> ConceptScore {
        ConceptScore {
            score,
            concepts_found: Vec::new(),
            concepts_missing: Vec::new(),
            justification: String::new(),
        }
    }

    #[test]
    fn tied_totals_share_a_position() {
        assert_eq!(shared_positions(&[30, 30, 20, 10]), vec![1, 1, 3, 4]);
        assert_eq!(shared_positions(&[9, 9, 9]), vec![1, 1, 1]);
        assert_eq!(shared_positions(&[]), Vec::<u32>::new());
    }

    #[test]
    fn aggregate_orders_by_total_then_group() {
        let mut scores = ScoreMaps::default();
        scores.concept.insert(4, concept(7));
        scores.concept.insert(2, concept(7));
        scores.concept.insert(9, concept(9));
        scores.difficulty.insert(
            9,
            DifficultyEntry {
                group: 9,
                score: 1,
                justification: String::new(),
            },
        );

        let rows = aggregate(&[4, 2, 9, 5], &scores);
        let order: Vec<(GroupId, u32, u32)> = rows
            .iter()
            .map(|row| (row.group, row.total, row.position))
            .collect();
        assert_eq!(order, vec![(9, 10, 1), (2, 7, 2), (4, 7, 2), (5, 0, 4)]);
    }

    #[test]
    fn absent_scores_stay_absent_but_count_as_zero() {
        let rows = aggregate(&[1], &ScoreMaps::default());
        assert_eq!(rows[0].concept, None);
        assert_eq!(rows[0].quality, None);
        assert_eq!(rows[0].difficulty, None);
        assert_eq!(rows[0].total, 0);
    }
}
