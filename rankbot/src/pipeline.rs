//! Scoring pipeline: summaries, per-project scoring, batch difficulty and
//! aggregation.
//!
//! Failures are isolated per group. A group whose run does not succeed is
//! logged and left out of the affected score map; nothing here aborts the
//! batch once the prompts have been rendered.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use anyhow::{Context, Result};
use tracing::{error, info, instrument, warn};

use crate::agents::{Judges, RunOutcome, run_agent};
use crate::core::ranking::{ResultRow, aggregate};
use crate::core::scores::{ConceptScore, DifficultyEntry, QualityScore, ScoreMaps};
use crate::core::types::{GroupId, ProjectRef};
use crate::io::model::ChatModel;
use crate::io::prompt::PromptEngine;
use crate::tools::{ToolBox, ToolSet};

const SUMMARY_SEPARATOR: &str = "\n\n---\n\n";

/// Rendered prompts for one group with a submission.
#[derive(Debug, Clone)]
pub struct ProjectTask {
    pub group: GroupId,
    pub tools: ToolSet,
    pub prompt: String,
    pub summary_prompt: String,
}

/// Render every submission's prompts up front so the phases cannot fail on
/// templating.
pub fn prepare_tasks(
    engine: &PromptEngine,
    projects: &[ProjectRef],
    repo: &str,
) -> Result<Vec<ProjectTask>> {
    let mut tasks = Vec::new();
    for project in projects {
        let Some(tools) = ToolSet::for_location(&project.location) else {
            continue;
        };
        let prompt = engine
            .project_prompt(project, repo)
            .with_context(|| format!("render prompt for group {}", project.group))?;
        let summary_prompt = engine
            .summary_request(&prompt)
            .with_context(|| format!("render summary request for group {}", project.group))?;
        tasks.push(ProjectTask {
            group: project.group,
            tools,
            prompt,
            summary_prompt,
        });
    }
    Ok(tasks)
}

/// Everything one evaluation run produced.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Rendered summary entry per group, placeholders included.
    pub summaries: BTreeMap<GroupId, String>,
    pub scores: ScoreMaps,
    pub rows: Vec<ResultRow>,
}

pub struct Pipeline<'a, M: ?Sized> {
    model: &'a M,
    judges: &'a Judges,
    toolbox: &'a ToolBox,
    workers: usize,
}

impl<'a, M> Pipeline<'a, M>
where
    M: ChatModel + Sync + ?Sized,
{
    pub fn new(model: &'a M, judges: &'a Judges, toolbox: &'a ToolBox, workers: usize) -> Self {
        Self {
            model,
            judges,
            toolbox,
            workers: workers.max(1),
        }
    }

    /// Run phases two to five over `projects`.
    #[instrument(skip_all, fields(groups = projects.len()))]
    pub fn run(&self, projects: &[ProjectRef], tasks: &[ProjectTask]) -> Evaluation {
        let summaries = self.collect_summaries(projects, tasks);
        let (concept, quality) = self.score_projects(tasks);
        let difficulty = self.score_difficulty(projects, &summaries);

        let scores = ScoreMaps {
            concept,
            quality,
            difficulty,
        };
        let groups: Vec<GroupId> = projects.iter().map(|p| p.group).collect();
        let rows = aggregate(&groups, &scores);
        info!(rows = rows.len(), "aggregation complete");
        Evaluation {
            summaries,
            scores,
            rows,
        }
    }

    /// Phase 2: one summary entry for every group, in group order.
    #[instrument(skip_all)]
    pub fn collect_summaries(
        &self,
        projects: &[ProjectRef],
        tasks: &[ProjectTask],
    ) -> BTreeMap<GroupId, String> {
        info!(submissions = tasks.len(), "collecting summaries");
        let mut summaries: BTreeMap<GroupId, String> = projects
            .iter()
            .map(|p| (p.group, no_submission_placeholder(p.group)))
            .collect();

        let collected = run_bounded(tasks, self.workers, |task| {
            let outcome = run_agent(
                self.model,
                &self.judges.summarizer,
                Some(self.toolbox.access(task.tools)),
                &task.summary_prompt,
            );
            let entry = match outcome {
                RunOutcome::Success(summary) => format!("## Group {}\n{}", task.group, summary.0),
                failed => {
                    log_failure(task.group, "summary", &failed);
                    format!("Group {}: Summary collection failed.", task.group)
                }
            };
            (task.group, entry)
        });
        summaries.extend(collected);
        summaries
    }

    /// Phase 3: concept and quality runs per submission.
    #[instrument(skip_all)]
    pub fn score_projects(
        &self,
        tasks: &[ProjectTask],
    ) -> (
        BTreeMap<GroupId, ConceptScore>,
        BTreeMap<GroupId, QualityScore>,
    ) {
        info!(submissions = tasks.len(), "scoring projects");
        let scored = run_bounded(tasks, self.workers, |task| {
            let access = self.toolbox.access(task.tools);
            let concept = run_agent(self.model, &self.judges.concept, Some(access), &task.prompt);
            if !concept.is_success() {
                log_failure(task.group, "concept", &concept);
            }
            let quality = run_agent(self.model, &self.judges.quality, Some(access), &task.prompt);
            if !quality.is_success() {
                log_failure(task.group, "quality", &quality);
            }
            (task.group, concept.success(), quality.success())
        });

        let mut concept_map = BTreeMap::new();
        let mut quality_map = BTreeMap::new();
        for (group, concept, quality) in scored {
            if let Some(score) = concept {
                concept_map.insert(group, score);
            }
            if let Some(score) = quality {
                quality_map.insert(group, score);
            }
        }
        (concept_map, quality_map)
    }

    /// Phase 4: one tool-less run over every summary. Any failure leaves the
    /// whole map empty.
    #[instrument(skip_all)]
    pub fn score_difficulty(
        &self,
        projects: &[ProjectRef],
        summaries: &BTreeMap<GroupId, String>,
    ) -> BTreeMap<GroupId, DifficultyEntry> {
        let task = summaries
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(SUMMARY_SEPARATOR);
        info!(summaries = summaries.len(), "scoring difficulty");

        let outcome = run_agent(self.model, &self.judges.difficulty, None, &task);
        let scores = match outcome {
            RunOutcome::Success(scores) => scores,
            failed => {
                error!(
                    cause = %failed.failure_reason().unwrap_or_default(),
                    "difficulty scoring failed; no difficulty scores this run"
                );
                return BTreeMap::new();
            }
        };

        let eligible: BTreeSet<GroupId> = projects
            .iter()
            .filter(|p| p.has_submission())
            .map(|p| p.group)
            .collect();
        let mut difficulty = BTreeMap::new();
        for entry in scores.scores {
            if !eligible.contains(&entry.group) {
                warn!(group = entry.group, "dropping difficulty entry for group without submission");
                continue;
            }
            if difficulty.contains_key(&entry.group) {
                warn!(group = entry.group, "dropping duplicate difficulty entry");
                continue;
            }
            difficulty.insert(entry.group, entry);
        }
        difficulty
    }
}

fn no_submission_placeholder(group: GroupId) -> String {
    format!("Group {group}: No submission — no code available.")
}

fn log_failure<T>(group: GroupId, phase: &str, outcome: &RunOutcome<T>) {
    error!(
        group,
        phase,
        cause = %outcome.failure_reason().unwrap_or_default(),
        "agent run failed"
    );
}

/// Apply `work` to every item on at most `workers` threads. Results keep
/// the input order.
fn run_bounded<T, R, F>(items: &[T], workers: usize, work: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let workers = workers.clamp(1, items.len().max(1));
    if workers == 1 {
        return items.iter().map(work).collect();
    }

    let next = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<R>>> = Mutex::new(items.iter().map(|_| None).collect());
    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    let Some(item) = items.get(idx) else {
                        break;
                    };
                    let result = work(item);
                    slots.lock().unwrap_or_else(PoisonError::into_inner)[idx] = Some(result);
                }
            });
        }
    });
    slots
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .into_iter()
        .flatten()
        .collect()
}
