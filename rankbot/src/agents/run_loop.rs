//! The agent run loop: model turn, optional tool dispatch, repeat until a
//! final answer or the turn ceiling.
//!
//! [`run_agent`] never returns `Err` and never panics on model-controlled
//! input. Every way a run can end is a [`RunOutcome`] variant.

use tracing::{debug, info, instrument, warn};

use crate::core::conversation::{Conversation, ModelReply, UpstreamError};
use crate::core::output::OutputError;
use crate::io::model::{ChatModel, ChatRequest};
use crate::tools::{ToolAccess, ToolSpec};

use super::Agent;
use super::contract::OutputContract;

/// How one agent run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome<T> {
    Success(T),
    /// The final answer could not be recovered or failed its schema.
    Invalid(OutputError),
    /// The model was still calling tools when the ceiling was reached.
    TurnLimitExceeded { turns: u32 },
    UpstreamError(UpstreamError),
}

impl<T> RunOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }

    /// Consume the outcome, keeping only a successful value.
    pub fn success(self) -> Option<T> {
        match self {
            RunOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Short description of a non-success outcome for logs.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            RunOutcome::Success(_) => None,
            RunOutcome::Invalid(err) => Some(format!("invalid output: {err}")),
            RunOutcome::TurnLimitExceeded { turns } => {
                Some(format!("no final answer within {turns} turns"))
            }
            RunOutcome::UpstreamError(err) => Some(format!("upstream error: {err}")),
        }
    }
}

/// Drive one agent to completion.
///
/// With `tools == None` the agent must answer on its first turn; a tool
/// request from such an agent ends the run as [`RunOutcome::Invalid`].
#[instrument(skip_all, fields(agent = agent.name, max_turns = agent.max_turns))]
pub fn run_agent<M, O>(
    model: &M,
    agent: &Agent<O>,
    tools: Option<ToolAccess<'_>>,
    task: &str,
) -> RunOutcome<O>
where
    M: ChatModel + ?Sized,
    O: OutputContract,
{
    let mut conversation = Conversation::new(&agent.instructions, task);
    let specs: Vec<ToolSpec> = tools.map(|access| access.specs()).unwrap_or_default();

    for turn in 1..=agent.max_turns {
        let request = ChatRequest {
            agent: agent.name,
            conversation: &conversation,
            tools: &specs,
            output_schema: O::schema(),
        };
        let reply = match model.complete(&request) {
            Ok(reply) => reply,
            Err(err) => {
                warn!(turn, err = %err, "model call failed");
                return RunOutcome::UpstreamError(err);
            }
        };

        let calls = match reply {
            ModelReply::Final { content } => {
                info!(turn, "final answer received");
                return match O::from_final(&content) {
                    Ok(value) => RunOutcome::Success(value),
                    Err(err) => {
                        warn!(turn, err = %err, "final answer rejected");
                        RunOutcome::Invalid(err)
                    }
                };
            }
            ModelReply::ToolCalls { calls } => calls,
        };

        if calls.is_empty() {
            return RunOutcome::Invalid(OutputError::Validation(
                "tool call reply without any calls".to_string(),
            ));
        }
        let Some(access) = tools else {
            return RunOutcome::Invalid(OutputError::UnexpectedToolCall(calls[0].name.clone()));
        };
        if turn == agent.max_turns {
            break;
        }

        info!(turn, calls = calls.len(), "dispatching tool calls");
        conversation.push_tool_calls(calls.clone());
        for call in &calls {
            let result = access.dispatch(call);
            debug!(tool = %call.name, bytes = result.len(), "tool returned");
            conversation.push_tool_result(call, result);
        }
    }

    warn!("turn limit reached without a final answer");
    RunOutcome::TurnLimitExceeded {
        turns: agent.max_turns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::Turn;
    use crate::core::scores::{ConceptScore, Summary};
    use crate::io::config::ToolLimits;
    use crate::test_support::{ScriptedModel, final_reply, tool_call, tool_calls};
    use crate::tools::{ToolBox, ToolSet};
    use std::collections::BTreeMap;
    use std::fs;

    const CONCEPT_JSON: &str = r#"{"score": 6, "concepts_found": ["RAG"], "concepts_missing": ["Agents"], "justification": "partial"}"#;

    fn summary_agent(max_turns: u32) -> Agent<Summary> {
        Agent::new("Summarizer", "summarize".to_string(), max_turns)
    }

    fn local_toolbox(root: &std::path::Path) -> ToolBox {
        let mut repos = BTreeMap::new();
        repos.insert("c4".to_string(), root.to_path_buf());
        ToolBox::new(repos, ToolLimits::default())
    }

    #[test]
    fn direct_answer_without_tools() {
        let model = ScriptedModel::new(vec![final_reply(&format!("Here you go: {CONCEPT_JSON}"))]);
        let agent: Agent<ConceptScore> = Agent::new("ConceptJudge", "judge".to_string(), 3);

        let outcome = run_agent(&model, &agent, None, "group 1");
        let score = outcome.success().expect("success");
        assert_eq!(score.score, 6);

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].has_schema);
        assert!(requests[0].tool_names.is_empty());
    }

    #[test]
    fn tool_results_are_fed_back_before_the_final_answer() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("app.py"), "print('hi')\n").expect("write");
        let toolbox = local_toolbox(temp.path());
        let model = ScriptedModel::new(vec![
            tool_calls(vec![
                tool_call("read_local_file", &[("repo", "c4"), ("filepath", "app.py")]),
                tool_call("read_local_file", &[("repo", "c4"), ("filepath", "../etc/passwd")]),
            ]),
            final_reply("A tiny script."),
        ]);

        let outcome = run_agent(
            &model,
            &summary_agent(5),
            Some(toolbox.access(ToolSet::Local)),
            "group 1",
        );
        assert_eq!(outcome, RunOutcome::Success(Summary("A tiny script.".to_string())));

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].tool_names,
            vec!["list_local_directory".to_string(), "read_local_file".to_string()]
        );
        let turns = requests[1].conversation.turns();
        assert!(matches!(&turns[2], Turn::ToolCalls { calls } if calls.len() == 2));
        match (&turns[3], &turns[4]) {
            (Turn::ToolResult { content: first, .. }, Turn::ToolResult { content: second, .. }) => {
                assert_eq!(first, "print('hi')");
                assert!(second.starts_with("Error: "));
            }
            other => panic!("unexpected turns: {other:?}"),
        }
    }

    #[test]
    fn turn_ceiling_yields_turn_limit_exceeded() {
        let temp = tempfile::tempdir().expect("tempdir");
        let toolbox = local_toolbox(temp.path());
        let looping = || tool_calls(vec![tool_call("list_local_directory", &[("repo", "c4")])]);
        let model = ScriptedModel::new(vec![looping(), looping(), looping()]);

        let outcome = run_agent(
            &model,
            &summary_agent(2),
            Some(toolbox.access(ToolSet::Local)),
            "group 1",
        );
        assert_eq!(outcome, RunOutcome::TurnLimitExceeded { turns: 2 });
        assert_eq!(model.requests().len(), 2);
    }

    #[test]
    fn tool_request_from_tool_less_agent_is_invalid() {
        let model = ScriptedModel::new(vec![tool_calls(vec![tool_call(
            "git_list_files",
            &[("repo", "c4")],
        )])]);
        let outcome = run_agent(&model, &summary_agent(5), None, "all summaries");
        assert_eq!(
            outcome,
            RunOutcome::Invalid(OutputError::UnexpectedToolCall("git_list_files".to_string()))
        );
    }

    #[test]
    fn empty_tool_request_is_reported_as_such() {
        let model = ScriptedModel::new(vec![tool_calls(Vec::new())]);
        let outcome = run_agent(&model, &summary_agent(5), None, "all summaries");
        assert_eq!(
            outcome,
            RunOutcome::Invalid(OutputError::Validation(
                "tool call reply without any calls".to_string()
            ))
        );
    }

    #[test]
    fn upstream_errors_short_circuit() {
        let model = ScriptedModel::from_results(vec![Err(UpstreamError::RateLimited(
            "429".to_string(),
        ))]);
        let outcome = run_agent(&model, &summary_agent(5), None, "task");
        assert_eq!(
            outcome,
            RunOutcome::UpstreamError(UpstreamError::RateLimited("429".to_string()))
        );
        assert!(outcome.failure_reason().expect("reason").contains("429"));
    }

    #[test]
    fn unparsable_final_answer_is_invalid() {
        let model = ScriptedModel::new(vec![final_reply("I could not decide on a score.")]);
        let agent: Agent<ConceptScore> = Agent::new("ConceptJudge", "judge".to_string(), 3);
        let outcome = run_agent(&model, &agent, None, "group 1");
        assert!(matches!(outcome, RunOutcome::Invalid(_)));
        assert!(!outcome.is_success());
    }
}
