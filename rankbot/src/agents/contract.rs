//! Output contracts: how each agent's final text becomes a typed value.

use std::sync::LazyLock;

use serde_json::Value;

use crate::core::output::{OutputError, parse_schema, parse_structured};
use crate::core::scores::{ConceptScore, DifficultyScores, QualityScore, Summary};

static CONCEPT_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    parse_schema(include_str!("../../schemas/concept.schema.json"))
        .expect("concept schema should be valid JSON")
});
static QUALITY_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    parse_schema(include_str!("../../schemas/quality.schema.json"))
        .expect("quality schema should be valid JSON")
});
static DIFFICULTY_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    parse_schema(include_str!("../../schemas/difficulty.schema.json"))
        .expect("difficulty schema should be valid JSON")
});

/// A value an agent run can terminate with.
pub trait OutputContract: Sized {
    /// Schema the final answer must satisfy; `None` for free text.
    fn schema() -> Option<&'static Value>;

    fn from_final(content: &str) -> Result<Self, OutputError>;
}

impl OutputContract for ConceptScore {
    fn schema() -> Option<&'static Value> {
        Some(&*CONCEPT_SCHEMA)
    }

    fn from_final(content: &str) -> Result<Self, OutputError> {
        parse_structured(content, &CONCEPT_SCHEMA)
    }
}

impl OutputContract for QualityScore {
    fn schema() -> Option<&'static Value> {
        Some(&*QUALITY_SCHEMA)
    }

    fn from_final(content: &str) -> Result<Self, OutputError> {
        parse_structured(content, &QUALITY_SCHEMA)
    }
}

impl OutputContract for DifficultyScores {
    fn schema() -> Option<&'static Value> {
        Some(&*DIFFICULTY_SCHEMA)
    }

    fn from_final(content: &str) -> Result<Self, OutputError> {
        parse_structured(content, &DIFFICULTY_SCHEMA)
    }
}

impl OutputContract for Summary {
    fn schema() -> Option<&'static Value> {
        None
    }

    fn from_final(content: &str) -> Result<Self, OutputError> {
        let text = content.trim();
        if text.is_empty() {
            return Err(OutputError::Validation("empty summary".to_string()));
        }
        Ok(Summary(text.to_string()))
    }
}
