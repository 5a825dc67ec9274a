//! Rubric score records and the per-run score maps.
//!
//! Maps are keyed by group id. A group missing from a map has no score for
//! that rubric; it is never represented by a zero-valued record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::GroupId;

/// Concept coverage verdict for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptScore {
    pub score: u8,
    pub concepts_found: Vec<String>,
    pub concepts_missing: Vec<String>,
    pub justification: String,
}

/// Code quality verdict for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScore {
    pub score: u8,
    pub has_proper_folders: bool,
    pub has_readme: bool,
    pub readme_quality: String,
    pub has_requirements_txt: bool,
    pub has_env_handling: bool,
    pub code_organization: String,
    pub justification: String,
}

/// One group's entry in the relative difficulty ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyEntry {
    pub group: GroupId,
    pub score: u8,
    pub justification: String,
}

/// Difficulty verdicts for the whole cohort, produced in one agent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyScores {
    pub scores: Vec<DifficultyEntry>,
}

/// Free-text technical summary of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary(pub String);

/// Scores collected by one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreMaps {
    pub concept: BTreeMap<GroupId, ConceptScore>,
    pub quality: BTreeMap<GroupId, QualityScore>,
    pub difficulty: BTreeMap<GroupId, DifficultyEntry>,
}

impl ScoreMaps {
    pub fn concept_score(&self, group: GroupId) -> Option<u8> {
        self.concept.get(&group).map(|entry| entry.score)
    }

    pub fn quality_score(&self, group: GroupId) -> Option<u8> {
        self.quality.get(&group).map(|entry| entry.score)
    }

    pub fn difficulty_score(&self, group: GroupId) -> Option<u8> {
        self.difficulty.get(&group).map(|entry| entry.score)
    }
}
