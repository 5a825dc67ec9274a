//! Agent instructions and per-project task prompts, rendered with minijinja
//! from templates embedded at compile time.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde_json::Value;

use crate::core::types::{Location, ProjectRef};

const TEMPLATES: [(&str, &str); 11] = [
    ("concept", include_str!("prompts/concept.md")),
    ("quality", include_str!("prompts/quality.md")),
    ("difficulty", include_str!("prompts/difficulty.md")),
    ("summarizer", include_str!("prompts/summarizer.md")),
    ("summary_request", include_str!("prompts/summary_request.md")),
    ("output_format", include_str!("prompts/output_format.md")),
    ("project_none", include_str!("prompts/project_none.md")),
    ("project_archive", include_str!("prompts/project_archive.md")),
    ("project_commit", include_str!("prompts/project_commit.md")),
    ("project_local", include_str!("prompts/project_local.md")),
    ("project_branch", include_str!("prompts/project_branch.md")),
];

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)
                .with_context(|| format!("load prompt template {name}"))?;
        }
        Ok(Self { env })
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let template = self.env.get_template(name)?;
        template
            .render(ctx)
            .with_context(|| format!("render prompt template {name}"))
    }

    pub fn concept_instructions(&self, syllabus: &str, reference: &str) -> Result<String> {
        self.render(
            "concept",
            context! { syllabus => syllabus.trim(), reference => reference.trim() },
        )
    }

    pub fn quality_instructions(&self, reference: &str) -> Result<String> {
        self.render("quality", context! { reference => reference.trim() })
    }

    pub fn difficulty_instructions(&self, reference: &str) -> Result<String> {
        self.render("difficulty", context! { reference => reference.trim() })
    }

    pub fn summarizer_instructions(&self) -> Result<String> {
        self.render("summarizer", context! {})
    }

    /// Suffix telling a schema-bound agent exactly what JSON to emit.
    pub fn output_format(&self, schema: &Value) -> Result<String> {
        let schema = serde_json::to_string_pretty(schema).context("serialize output schema")?;
        self.render("output_format", context! { schema => schema })
    }

    /// Task prompt for one group, with tool hints matching its location.
    pub fn project_prompt(&self, project: &ProjectRef, repo: &str) -> Result<String> {
        let group = project.group;
        match &project.location {
            Location::NoSubmission => self.render("project_none", context! { group }),
            Location::Archive {
                branch,
                archive_path,
            } => self.render(
                "project_archive",
                context! { group, repo, branch, archive_path },
            ),
            Location::PinnedCommit { commit, path } => {
                self.render("project_commit", context! { group, repo, commit, path })
            }
            Location::Branch { branch, path } => {
                let path = path.as_deref().unwrap_or("");
                let name = if project.location.is_working_tree() {
                    "project_local"
                } else {
                    "project_branch"
                };
                self.render(name, context! { group, repo, branch, path })
            }
        }
    }

    /// Wrap a project prompt into a request for a free-text summary.
    pub fn summary_request(&self, project_prompt: &str) -> Result<String> {
        self.render("summary_request", context! { project_prompt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(location: Location) -> ProjectRef {
        ProjectRef {
            group: 7,
            project_link: String::new(),
            video_link: String::new(),
            location,
        }
    }

    #[test]
    fn every_template_loads() {
        let engine = PromptEngine::new().expect("engine");
        assert!(engine.summarizer_instructions().expect("render").contains("Do not score"));
    }

    #[test]
    fn archive_prompt_names_only_archive_tools() {
        let engine = PromptEngine::new().expect("engine");
        let prompt = engine
            .project_prompt(
                &project(Location::Archive {
                    branch: "Group_7".to_string(),
                    archive_path: "build/app.zip".to_string(),
                }),
                "c4",
            )
            .expect("render");
        assert!(prompt.starts_with("# Evaluate Group 7"));
        assert!(prompt.contains("- Zip path: 'build/app.zip'"));
        assert!(prompt.contains("extract_zip_and_list"));
        assert!(!prompt.contains("git_list_files"));
        assert!(!prompt.contains("read_local_file"));
    }

    #[test]
    fn main_branch_uses_local_tools_and_other_branches_use_git() {
        let engine = PromptEngine::new().expect("engine");
        let local = engine
            .project_prompt(
                &project(Location::Branch {
                    branch: "main".to_string(),
                    path: Some("group-7".to_string()),
                }),
                "c4",
            )
            .expect("render");
        assert!(local.contains("dirpath='group-7'"));

        let remote = engine
            .project_prompt(
                &project(Location::Branch {
                    branch: "Group_7".to_string(),
                    path: None,
                }),
                "c3",
            )
            .expect("render");
        assert!(remote.contains("repo='c3', branch='Group_7' and path=''"));
    }

    #[test]
    fn commit_prompt_mentions_path_hint_only_when_present() {
        let engine = PromptEngine::new().expect("engine");
        let bare = engine
            .project_prompt(
                &project(Location::PinnedCommit {
                    commit: "abc1234".to_string(),
                    path: None,
                }),
                "c4",
            )
            .expect("render");
        assert!(!bare.contains("Path hint"));
        assert!(bare.contains("branch='abc1234'"));

        let scoped = engine
            .project_prompt(
                &project(Location::PinnedCommit {
                    commit: "abc1234".to_string(),
                    path: Some("src".to_string()),
                }),
                "c4",
            )
            .expect("render");
        assert!(scoped.contains("- Path hint: 'src'"));
    }

    #[test]
    fn instructions_embed_reference_and_schema() {
        let engine = PromptEngine::new().expect("engine");
        let text = engine
            .concept_instructions("## Sprint 1", "| 4 | 10 |")
            .expect("render");
        assert!(text.contains("| 4 | 10 |"));
        assert!(text.ends_with("## Sprint 1"));

        let suffix = engine
            .output_format(&serde_json::json!({"type": "object"}))
            .expect("render");
        assert!(suffix.starts_with("\n\n## CRITICAL: Output Format"));
        assert!(suffix.contains("\"type\": \"object\""));
    }
}
