//! The four agents of an evaluation run.

use anyhow::{Context, Result};

use crate::core::scores::{ConceptScore, DifficultyScores, QualityScore, Summary};
use crate::io::config::TurnLimits;
use crate::io::prompt::PromptEngine;

use super::Agent;
use super::contract::OutputContract;

pub const SUMMARIZER: &str = "ProjectSummarizer";
pub const CONCEPT_JUDGE: &str = "ConceptJudge";
pub const QUALITY_JUDGE: &str = "CodeQualityJudge";
pub const DIFFICULTY_JUDGE: &str = "DifficultyJudge";

#[derive(Debug, Clone)]
pub struct Judges {
    pub summarizer: Agent<Summary>,
    pub concept: Agent<ConceptScore>,
    pub quality: Agent<QualityScore>,
    pub difficulty: Agent<DifficultyScores>,
}

impl Judges {
    /// Render every agent's instructions. `syllabus` and `reference` are
    /// injected verbatim.
    pub fn build(
        engine: &PromptEngine,
        syllabus: &str,
        reference: &str,
        turns: &TurnLimits,
    ) -> Result<Self> {
        Ok(Self {
            summarizer: Agent::new(
                SUMMARIZER,
                engine.summarizer_instructions()?,
                turns.summary,
            ),
            concept: Agent::new(
                CONCEPT_JUDGE,
                bound::<ConceptScore>(engine, engine.concept_instructions(syllabus, reference)?)?,
                turns.scoring,
            ),
            quality: Agent::new(
                QUALITY_JUDGE,
                bound::<QualityScore>(engine, engine.quality_instructions(reference)?)?,
                turns.scoring,
            ),
            difficulty: Agent::new(
                DIFFICULTY_JUDGE,
                bound::<DifficultyScores>(engine, engine.difficulty_instructions(reference)?)?,
                turns.difficulty,
            ),
        })
    }
}

/// Append the output-format suffix for `O`'s schema.
fn bound<O: OutputContract>(engine: &PromptEngine, instructions: String) -> Result<String> {
    let Some(schema) = O::schema() else {
        return Ok(instructions);
    };
    let suffix = engine
        .output_format(schema)
        .context("render output format suffix")?;
    Ok(instructions + &suffix)
}
