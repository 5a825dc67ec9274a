//! Run configuration: `rankbot.toml` under the base directory plus a small
//! set of environment overrides.
//!
//! Everything is resolved once at startup into a [`RankBotConfig`] and a
//! [`Credentials`] value and passed down explicitly. Environment access goes
//! through an [`EnvLookup`] so tests can substitute values.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "rankbot.toml";

pub const ENV_API_KEY: &str = "OPENROUTER_API_KEY";
pub const ENV_BASE: &str = "RANK_BOT_BASE";
pub const ENV_MODEL: &str = "RANK_BOT_MODEL";
pub const ENV_GIT_TIMEOUT: &str = "RANK_BOT_GIT_TIMEOUT";
pub const ENV_MAX_FILE_LINES: &str = "RANK_BOT_MAX_FILE_LINES";

/// Environment variable lookup.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Read from the real process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Judge configuration (TOML). Missing fields take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RankBotConfig {
    pub model: ModelConfig,
    /// Cohort label (`c3`, `c4`, ...) to its submissions repo and scorecard.
    pub cohorts: BTreeMap<String, CohortConfig>,
    /// Cohort whose scorecard is shown to the judges for calibration.
    pub reference_cohort: String,
    pub syllabus: PathBuf,
    pub tools: ToolLimits,
    pub turns: TurnLimits,
    /// Concurrent groups in the summary and scoring phases.
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    /// Bridge process argv; receives one request on stdin per model call.
    pub command: Vec<String>,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CohortConfig {
    pub repo: PathBuf,
    pub scorecard: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolLimits {
    pub max_file_lines: usize,
    pub max_entries: usize,
    pub git_timeout_secs: u64,
    /// Ceiling on a fetched git blob and on an archive's extracted size.
    pub max_blob_bytes: usize,
    /// Ceiling on the text of one file read handed back to a model.
    pub max_result_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TurnLimits {
    pub summary: u32,
    pub scoring: u32,
    pub difficulty: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "anthropic/claude-sonnet-4".to_string(),
            command: vec!["rankbot-bridge".to_string()],
            max_tokens: 4096,
            timeout_secs: 300,
        }
    }
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self {
            max_file_lines: 300,
            max_entries: 200,
            git_timeout_secs: 30,
            max_blob_bytes: 50 * 1024 * 1024,
            max_result_bytes: 64 * 1024,
        }
    }
}

impl ToolLimits {
    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }
}

impl Default for TurnLimits {
    fn default() -> Self {
        Self {
            summary: 15,
            scoring: 20,
            difficulty: 5,
        }
    }
}

impl Default for RankBotConfig {
    fn default() -> Self {
        let mut cohorts = BTreeMap::new();
        cohorts.insert(
            "c3".to_string(),
            CohortConfig {
                repo: PathBuf::from("Submissions_C3"),
                scorecard: PathBuf::from("sheets/Outskill Eng Accelerator Score Card - C3.csv"),
            },
        );
        cohorts.insert(
            "c4".to_string(),
            CohortConfig {
                repo: PathBuf::from("Submissions-C4"),
                scorecard: PathBuf::from("sheets/Outskill Eng Accelerator Score Card - C4.csv"),
            },
        );
        Self {
            model: ModelConfig::default(),
            cohorts,
            reference_cohort: "c3".to_string(),
            syllabus: PathBuf::from("sheets/Engineering Accelerator Program - Schedule + Roadmap.csv"),
            tools: ToolLimits::default(),
            turns: TurnLimits::default(),
            workers: 1,
        }
    }
}

impl RankBotConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.name.trim().is_empty() {
            return Err(anyhow!("model.name must be non-empty"));
        }
        if self.model.command.is_empty() || self.model.command[0].trim().is_empty() {
            return Err(anyhow!("model.command must be a non-empty array"));
        }
        if self.model.max_tokens == 0 || self.model.timeout_secs == 0 {
            return Err(anyhow!("model.max_tokens and model.timeout_secs must be > 0"));
        }
        if self.tools.max_file_lines == 0
            || self.tools.max_entries == 0
            || self.tools.git_timeout_secs == 0
            || self.tools.max_blob_bytes == 0
            || self.tools.max_result_bytes == 0
        {
            return Err(anyhow!("tools limits must all be > 0"));
        }
        if self.turns.summary == 0 || self.turns.scoring == 0 || self.turns.difficulty == 0 {
            return Err(anyhow!("turns limits must all be > 0"));
        }
        if self.workers == 0 {
            return Err(anyhow!("workers must be > 0"));
        }
        if !self.cohorts.contains_key(&self.reference_cohort) {
            return Err(anyhow!(
                "reference_cohort `{}` is not a configured cohort",
                self.reference_cohort
            ));
        }
        Ok(())
    }

    /// Apply `RANK_BOT_*` overrides on top of file values.
    pub fn apply_env(&mut self, env: EnvLookup<'_>) -> Result<()> {
        if let Some(model) = non_empty(env(ENV_MODEL)) {
            self.model.name = model;
        }
        if let Some(raw) = non_empty(env(ENV_GIT_TIMEOUT)) {
            self.tools.git_timeout_secs = raw
                .parse()
                .with_context(|| format!("parse {ENV_GIT_TIMEOUT}={raw}"))?;
        }
        if let Some(raw) = non_empty(env(ENV_MAX_FILE_LINES)) {
            self.tools.max_file_lines = raw
                .parse()
                .with_context(|| format!("parse {ENV_MAX_FILE_LINES}={raw}"))?;
        }
        Ok(())
    }

    pub fn cohort(&self, label: &str) -> Result<&CohortConfig> {
        self.cohorts.get(label).with_context(|| {
            let known: Vec<&str> = self.cohorts.keys().map(String::as_str).collect();
            format!("unknown cohort `{label}` (configured: {})", known.join(", "))
        })
    }
}

/// Base directory from `RANK_BOT_BASE`, else `fallback`.
pub fn resolve_base_dir(env: EnvLookup<'_>, fallback: &Path) -> PathBuf {
    non_empty(env(ENV_BASE))
        .map(PathBuf::from)
        .unwrap_or_else(|| fallback.to_path_buf())
}

/// Load config from a TOML file, apply env overrides and validate.
///
/// A missing file yields the defaults.
pub fn load_config(path: &Path, env: EnvLookup<'_>) -> Result<RankBotConfig> {
    let mut cfg = if path.exists() {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
    } else {
        RankBotConfig::default()
    };
    cfg.apply_env(env)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Model service credential.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    pub fn from_env(env: EnvLookup<'_>) -> Result<Self> {
        match non_empty(env(ENV_API_KEY)) {
            Some(api_key) => Ok(Self { api_key }),
            None => bail!("{ENV_API_KEY} is not set"),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
