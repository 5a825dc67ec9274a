//! Scorecard CSV persistence.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::{info, instrument};

use crate::core::reconcile::{Scorecard, reconcile};
use crate::core::scores::ScoreMaps;
use crate::io::atomic::write_atomic;

pub fn read_scorecard(path: &Path) -> Result<Scorecard> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("open scorecard {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("read scorecard header {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("read scorecard row {}", path.display()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(Scorecard { headers, rows })
}

pub fn write_scorecard(path: &Path, card: &Scorecard) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    writer
        .write_record(&card.headers)
        .context("encode scorecard header")?;
    for row in &card.rows {
        writer.write_record(row).context("encode scorecard row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow!("flush scorecard csv: {}", err.error()))?;
    write_atomic(path, &bytes)
}

/// Merge `scores` into the scorecard at `path` and rewrite it in place.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn reconcile_file(path: &Path, scores: &ScoreMaps) -> Result<()> {
    let mut card = read_scorecard(path)?;
    reconcile(&mut card, scores).with_context(|| format!("reconcile {}", path.display()))?;
    write_scorecard(path, &card)?;
    info!(rows = card.rows.len(), "scorecard updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scores::QualityScore;
    use std::fs;

    const HEADER: &str = "Group,Project Link,Video Link,Concept Score (10),Difficulty Level (10),Code Quality (10),Total (30),Position,Comments";

    fn quality(score: u8) -> QualityScore {
        QualityScore {
            score,
            has_proper_folders: true,
            has_readme: true,
            readme_quality: "good".to_string(),
            has_requirements_txt: true,
            has_env_handling: false,
            code_organization: "tidy".to_string(),
            justification: "fine".to_string(),
        }
    }

    #[test]
    fn reconcile_file_rewrites_in_place_and_is_stable() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("c4.csv");
        fs::write(
            &path,
            format!(
                "{HEADER}\n1,\"https://x/tree/a,b\",,7,,,,,\"multi\nline\"\n2,,,,,,,,\nAverage,,,,,,,,\n"
            ),
        )
        .expect("write");

        let mut scores = ScoreMaps::default();
        scores.quality.insert(1, quality(6));

        reconcile_file(&path, &scores).expect("first");
        let first = fs::read(&path).expect("read");
        reconcile_file(&path, &scores).expect("second");
        assert_eq!(fs::read(&path).expect("read"), first);

        let card = read_scorecard(&path).expect("parse");
        assert_eq!(card.rows[0][1], "https://x/tree/a,b");
        assert_eq!(card.rows[0][5], "6");
        assert_eq!(card.rows[0][6], "13");
        assert_eq!(card.rows[0][7], "1");
        assert_eq!(card.rows[0][8], "multi\nline");
        assert_eq!(card.rows[1][6], "");
        assert_eq!(card.rows[2][0], "Average");
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(reconcile_file(&temp.path().join("nope.csv"), &ScoreMaps::default()).is_err());
    }
}
