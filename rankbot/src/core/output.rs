//! Output contract checks for final agent answers.
//!
//! Final text is recovered with [`extract_json`], validated against the
//! agent's JSON Schema, and only then deserialized into the typed result.
//! Every failure comes back as an [`OutputError`] value.

use jsonschema::Draft;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::core::recover::{Extraction, extract_json};

/// Why a final answer was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    /// No JSON boundary could be located in the response.
    #[error("no JSON value found in response: {0}")]
    Recovery(String),
    /// JSON was found but does not satisfy the output contract.
    #[error("response violates output contract: {0}")]
    Validation(String),
    /// An agent without tools asked to call one.
    #[error("agent has no tools but requested `{0}`")]
    UnexpectedToolCall(String),
}

/// Parse a JSON Schema document embedded in the binary.
pub fn parse_schema(raw: &str) -> Result<Value, OutputError> {
    serde_json::from_str(raw).map_err(|err| OutputError::Validation(format!("invalid schema: {err}")))
}

/// Recover, validate, and deserialize a structured answer.
pub fn parse_structured<T: DeserializeOwned>(raw: &str, schema: &Value) -> Result<T, OutputError> {
    let extracted = extract_json(raw);
    let value: Value = match serde_json::from_str(extracted.json) {
        Ok(value) => value,
        Err(err) if extracted.method == Extraction::Unchanged => {
            return Err(OutputError::Recovery(format!("{err}: {}", preview(raw))));
        }
        Err(err) => return Err(OutputError::Validation(format!("invalid JSON: {err}"))),
    };

    validate_schema(&value, schema)?;

    serde_json::from_value(value).map_err(|err| OutputError::Validation(err.to_string()))
}

/// Validate a JSON instance against a JSON Schema (Draft 2020-12).
pub fn validate_schema(instance: &Value, schema: &Value) -> Result<(), OutputError> {
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| OutputError::Validation(format!("invalid schema: {err}")))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(OutputError::Validation(messages.join("; ")));
    }
    Ok(())
}

fn preview(raw: &str) -> String {
    const LIMIT: usize = 120;
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Verdict {
        score: u8,
        justification: String,
    }

    fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "required": ["score", "justification"],
            "properties": {
                "score": {"type": "integer", "minimum": 1, "maximum": 10},
                "justification": {"type": "string"}
            }
        })
    }

    #[test]
    fn accepts_payload_wrapped_in_prose() {
        let raw = "Here you go: {\"score\": 8, \"justification\": \"solid\"} cheers";
        let got: Verdict = parse_structured(raw, &schema()).expect("parse");
        assert_eq!(
            got,
            Verdict {
                score: 8,
                justification: "solid".to_string()
            }
        );
    }

    #[test]
    fn out_of_range_score_is_a_validation_failure() {
        let raw = "{\"score\": 11, \"justification\": \"too generous\"}";
        let err = parse_structured::<Verdict>(raw, &schema()).unwrap_err();
        assert!(matches!(err, OutputError::Validation(_)), "{err}");
    }

    #[test]
    fn zero_score_is_rejected() {
        let raw = "{\"score\": 0, \"justification\": \"nothing\"}";
        let err = parse_structured::<Verdict>(raw, &schema()).unwrap_err();
        assert!(matches!(err, OutputError::Validation(_)));
    }

    #[test]
    fn missing_field_is_a_validation_failure() {
        let err = parse_structured::<Verdict>("{\"score\": 3}", &schema()).unwrap_err();
        assert!(err.to_string().contains("justification"), "{err}");
    }

    #[test]
    fn plain_prose_is_a_recovery_failure() {
        let err = parse_structured::<Verdict>("I cannot score this.", &schema()).unwrap_err();
        assert!(matches!(err, OutputError::Recovery(_)));
    }

    #[test]
    fn broken_json_is_a_validation_failure() {
        let err = parse_structured::<Verdict>("{\"score\": 3,,}", &schema()).unwrap_err();
        assert!(matches!(err, OutputError::Validation(_)));
    }
}
