//! `rankbot run` and `rankbot inspect`: wire configuration, ingestion, the
//! pipeline and the output writers together.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::agents::Judges;
use crate::core::ranking::ResultRow;
use crate::core::types::{GroupId, Location, ProjectRef};
use crate::io::config::{
    CONFIG_FILE_NAME, Credentials, EnvLookup, RankBotConfig, load_config, resolve_base_dir,
};
use crate::io::ingest::{filter_groups, load_groups, load_reference_table, load_syllabus};
use crate::io::model::{ChatModel, CommandModel};
use crate::io::prompt::PromptEngine;
use crate::io::report::{render_console_table, write_report, write_scores_json};
use crate::io::scorecard::reconcile_file;
use crate::pipeline::{Evaluation, Pipeline, prepare_tasks};
use crate::tools::ToolBox;

/// Resolved base directory and validated configuration.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub base_dir: PathBuf,
    pub config: RankBotConfig,
}

impl Workspace {
    /// Resolve the base directory and load `rankbot.toml` (or `config_path`).
    pub fn load(config_path: Option<&Path>, cwd: &Path, env: EnvLookup<'_>) -> Result<Self> {
        let base_dir = resolve_base_dir(env, cwd);
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base_dir.join(CONFIG_FILE_NAME));
        let config = load_config(&path, env)?;
        Ok(Self { base_dir, config })
    }

    fn scorecard_path(&self, cohort: &str) -> Result<PathBuf> {
        Ok(self.base_dir.join(&self.config.cohort(cohort)?.scorecard))
    }

    pub fn report_path(&self, cohort: &str) -> PathBuf {
        self.base_dir.join(format!("{cohort}_evaluation_report.md"))
    }

    pub fn scores_path(&self, cohort: &str) -> PathBuf {
        self.base_dir.join(format!("{cohort}_scores.json"))
    }

    /// Every configured cohort repository, keyed by the label tools accept.
    pub fn toolbox(&self) -> ToolBox {
        let repos: BTreeMap<String, PathBuf> = self
            .config
            .cohorts
            .iter()
            .map(|(label, cohort)| (label.clone(), self.base_dir.join(&cohort.repo)))
            .collect();
        ToolBox::new(repos, self.config.tools.clone())
    }

    pub fn load_projects(&self, cohort: &str, only: &[GroupId]) -> Result<Vec<ProjectRef>> {
        let path = self.scorecard_path(cohort)?;
        let groups = load_groups(&path)?;
        Ok(filter_groups(groups, only))
    }
}

/// Outcome of a completed `run`.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub evaluation: Evaluation,
    pub report_path: PathBuf,
    pub scores_path: PathBuf,
    pub scorecard_path: PathBuf,
}

impl RunReport {
    pub fn rows(&self) -> &[ResultRow] {
        &self.evaluation.rows
    }
}

/// Evaluate `cohort` with `model` and write every output.
///
/// Only configuration, ingestion and output errors are returned; failed
/// agent runs show up as absent scores.
pub fn run_evaluation<M>(
    workspace: &Workspace,
    cohort: &str,
    only: &[GroupId],
    model: &M,
) -> Result<RunReport>
where
    M: ChatModel + Sync + ?Sized,
{
    let config = &workspace.config;
    let scorecard_path = workspace.scorecard_path(cohort)?;
    let projects = workspace.load_projects(cohort, only)?;

    let syllabus = load_syllabus(&workspace.base_dir.join(&config.syllabus))
        .context("load syllabus")?;
    let reference = load_reference_table(
        &workspace.scorecard_path(&config.reference_cohort)?,
        &config.reference_cohort,
    )
    .context("load reference scores")?;

    let engine = PromptEngine::new()?;
    let judges = Judges::build(&engine, &syllabus, &reference, &config.turns)?;
    let tasks = prepare_tasks(&engine, &projects, cohort)?;
    let toolbox = workspace.toolbox();

    info!(
        cohort,
        groups = projects.len(),
        submissions = tasks.len(),
        workers = config.workers,
        "starting evaluation"
    );
    let evaluation = Pipeline::new(model, &judges, &toolbox, config.workers).run(&projects, &tasks);

    let report_path = workspace.report_path(cohort);
    let scores_path = workspace.scores_path(cohort);
    write_report(&report_path, cohort, &evaluation.rows, &evaluation.scores)?;
    write_scores_json(&scores_path, &evaluation.rows, &evaluation.scores)?;
    reconcile_file(&scorecard_path, &evaluation.scores)?;
    info!(
        report = %report_path.display(),
        scores = %scores_path.display(),
        "outputs written"
    );

    Ok(RunReport {
        evaluation,
        report_path,
        scores_path,
        scorecard_path,
    })
}

/// `rankbot run`: credentials are checked before anything is read.
pub fn cmd_run(
    cohort: &str,
    only: &[GroupId],
    config_path: Option<&Path>,
    cwd: &Path,
    env: EnvLookup<'_>,
) -> Result<String> {
    let workspace = Workspace::load(config_path, cwd, env)?;
    let credentials = Credentials::from_env(env)?;
    workspace.config.cohort(cohort)?;
    let model = CommandModel::new(&workspace.config.model, credentials);

    let report = run_evaluation(&workspace, cohort, only, &model)?;
    Ok(render_console_table(cohort, report.rows()))
}

/// `rankbot inspect`: one line per group with its resolved location.
pub fn cmd_inspect(
    cohort: &str,
    config_path: Option<&Path>,
    cwd: &Path,
    env: EnvLookup<'_>,
) -> Result<String> {
    let workspace = Workspace::load(config_path, cwd, env)?;
    let projects = workspace.load_projects(cohort, &[])?;
    Ok(render_locations(&projects))
}

pub fn render_locations(projects: &[ProjectRef]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<7} {:<8} DETAIL", "GROUP", "KIND");
    for project in projects {
        let detail = match &project.location {
            Location::NoSubmission => "-".to_string(),
            Location::Archive {
                branch,
                archive_path,
            } => format!("branch={branch} zip={archive_path}"),
            Location::PinnedCommit { commit, path } => {
                format!("commit={commit} path={}", path.as_deref().unwrap_or("/"))
            }
            Location::Branch { branch, path } => {
                format!("branch={branch} path={}", path.as_deref().unwrap_or("/"))
            }
        };
        let _ = writeln!(
            out,
            "{:<7} {:<8} {detail}",
            project.group,
            project.location.kind()
        );
    }
    out
}
