//! Agent ↔ tool-caller loop, optionally carrying tabular tool output.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use super::state::{ConversationState, Message, Role, Step};
use super::traits::{ChatReply, Pipeline};
use crate::providers::Provider;
use crate::tools::{find_mentioned, Tool, ToolSpec};

/// Phrase in an assistant reply that hands control to the tool caller.
pub const TOOL_TRIGGER: &str = "use tool";
/// Tool message appended when no registered tool is named.
pub const UNMATCHED_TOOL_OUTPUT: &str = "Tool execution result";
pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;

pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f64,
    system_prompt: Option<String>,
    tools: Vec<Box<dyn Tool>>,
    tool_specs: Vec<ToolSpec>,
    max_tool_iterations: usize,
    tabular: bool,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f64,
        tools: Vec<Box<dyn Tool>>,
    ) -> Self {
        let tool_specs = tools.iter().map(|t| t.spec()).collect();
        Self {
            provider,
            model: model.into(),
            temperature,
            system_prompt: None,
            tools,
            tool_specs,
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            tabular: false,
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    /// `0` selects the default bound.
    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = if max == 0 {
            DEFAULT_MAX_TOOL_ITERATIONS
        } else {
            max
        };
        self
    }

    /// Keep the latest tool table and return it with the reply.
    pub fn tabular(mut self, tabular: bool) -> Self {
        self.tabular = tabular;
        self
    }

    async fn agent_step(&self, state: ConversationState) -> Result<ConversationState> {
        let history = state.chat_history(self.system_prompt.as_deref());
        let reply = self
            .provider
            .chat_with_history(&history, &self.model, self.temperature)
            .await
            .with_context(|| format!("{} request failed", self.provider.name()))?;

        let next = if reply.to_lowercase().contains(TOOL_TRIGGER) {
            Step::ToolCaller
        } else {
            Step::End
        };
        tracing::debug!(%next, reply_len = reply.len(), "agent step finished");
        Ok(state.with_message(Message::assistant(reply)).routed_to(next))
    }

    async fn tool_step(&self, state: ConversationState) -> ConversationState {
        let request = state.last_assistant_text().unwrap_or_default().to_string();

        let Some(tool) = find_mentioned(&self.tools, &request) else {
            tracing::debug!("no registered tool named in reply");
            return state
                .with_message(Message::tool(UNMATCHED_TOOL_OUTPUT))
                .routed_to(Step::Agent);
        };

        let name = tool.name().to_string();
        match tool.execute(serde_json::json!({ "input": request })).await {
            Ok(result) if result.success => {
                tracing::info!(tool = %name, "tool executed");
                let mut state = state.with_message(Message::tool(result.output));
                if self.tabular {
                    if let Some(table) = result.data {
                        state = state.with_table(table);
                    }
                }
                state.routed_to(Step::Agent)
            }
            Ok(result) => {
                let error = result.error.unwrap_or_else(|| "unknown error".into());
                tracing::warn!(tool = %name, %error, "tool reported failure");
                state
                    .with_message(Message::tool(format!("{name} failed: {error}")))
                    .routed_to(Step::Agent)
            }
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "tool execution error");
                state
                    .with_message(Message::tool(format!("{name} failed: {e}")))
                    .routed_to(Step::Agent)
            }
        }
    }
}

#[async_trait]
impl Pipeline for AgentLoop {
    fn entry(&self) -> Step {
        Step::Agent
    }

    async fn run(&self, mut state: ConversationState) -> Result<ConversationState> {
        loop {
            state = match state.next() {
                Step::Agent => self.agent_step(state).await?,
                // each tool-caller visit appends exactly one tool message
                Step::ToolCaller if state.count(Role::Tool) >= self.max_tool_iterations => {
                    tracing::warn!(
                        max = self.max_tool_iterations,
                        "tool iteration limit reached; ending turn"
                    );
                    state.routed_to(Step::End)
                }
                Step::ToolCaller => self.tool_step(state).await,
                Step::End => return Ok(state),
                other => anyhow::bail!("agent loop cannot handle step {other}"),
            };
        }
    }

    fn reply(&self, state: &ConversationState) -> ChatReply {
        let response = state.final_response();
        if self.tabular {
            ChatReply::Tabular {
                response,
                data: state.table().map(|t| t.to_records()),
            }
        } else {
            ChatReply::Text(response)
        }
    }

    fn tools(&self) -> &[ToolSpec] {
        &self.tool_specs
    }

    fn name(&self) -> &str {
        if self.tabular {
            "tabular"
        } else {
            "agent_loop"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::state::Role;
    use crate::agent::tests::ScriptedProvider;
    use crate::tools::{planning_tools, tabular_tools};

    fn agent_loop(provider: &Arc<ScriptedProvider>) -> AgentLoop {
        AgentLoop::new(provider.clone(), "test-model", 0.7, planning_tools())
    }

    async fn run(pipeline: &AgentLoop, text: &str) -> ConversationState {
        pipeline
            .run(ConversationState::new(text, pipeline.entry()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn plain_reply_ends_after_one_call() {
        let provider = Arc::new(ScriptedProvider::new(["Here is your plan."]));
        let pipeline = agent_loop(&provider);

        let state = run(&pipeline, "plan my week").await;
        assert_eq!(state.next(), Step::End);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(pipeline.reply(&state), ChatReply::Text("Here is your plan.".into()));
    }

    #[tokio::test]
    async fn trigger_phrase_runs_named_tool_then_returns_to_agent() {
        let provider = Arc::new(ScriptedProvider::new([
            "I will USE TOOL update_spreadsheet now",
            "All set.",
        ]));
        let pipeline = agent_loop(&provider);

        let state = run(&pipeline, "add 10% to chairs").await;
        let roles: Vec<Role> = state.messages().iter().map(|m| m.role()).collect();
        assert_eq!(roles, [Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
        assert_eq!(state.messages()[2].content(), "Spreadsheet updated successfully");
        assert_eq!(state.final_response(), "All set.");

        let second_call = &provider.calls()[1];
        assert_eq!(
            second_call.last().map(|m| m.content.as_str()),
            Some("Tool result: Spreadsheet updated successfully")
        );
    }

    #[tokio::test]
    async fn unnamed_tool_gets_constant_output() {
        let provider = Arc::new(ScriptedProvider::new(["use tool", "ok"]));
        let state = run(&agent_loop(&provider), "hi").await;
        assert_eq!(state.messages()[2].content(), UNMATCHED_TOOL_OUTPUT);
    }

    #[tokio::test]
    async fn system_prompt_leads_every_request() {
        let provider = Arc::new(ScriptedProvider::new(["use tool", "done"]));
        let pipeline = agent_loop(&provider).with_system_prompt(Some("You plan.".into()));
        run(&pipeline, "hi").await;

        for call in provider.calls() {
            assert_eq!(call[0].role, "system");
            assert_eq!(call[0].content, "You plan.");
        }
    }

    #[tokio::test]
    async fn iteration_bound_stops_endless_tool_requests() {
        let provider = Arc::new(ScriptedProvider::repeating("use tool again"));
        let pipeline = agent_loop(&provider).with_max_tool_iterations(2);

        let state = run(&pipeline, "loop forever").await;
        assert_eq!(state.next(), Step::End);
        assert_eq!(state.count(Role::Tool), 2);
        assert_eq!(provider.call_count(), 3);
        assert_eq!(state.final_response(), "use tool again");
    }

    #[test]
    fn zero_iterations_selects_default() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<&str>::new()));
        let pipeline = agent_loop(&provider).with_max_tool_iterations(0);
        assert_eq!(pipeline.max_tool_iterations, DEFAULT_MAX_TOOL_ITERATIONS);
    }

    #[tokio::test]
    async fn provider_error_propagates() {
        let provider = Arc::new(ScriptedProvider::failing("quota exceeded"));
        let pipeline = agent_loop(&provider);
        let err = pipeline
            .run(ConversationState::new("hi", Step::Agent))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("quota exceeded"));
    }

    #[tokio::test]
    async fn tabular_loop_returns_latest_table_as_records() {
        let provider = Arc::new(ScriptedProvider::new([
            "use tool get_planning_data",
            "Chairs in Asia Pacific are trending up.",
        ]));
        let pipeline = AgentLoop::new(provider.clone(), "m", 0.7, tabular_tools()).tabular(true);

        let state = run(&pipeline, "show chair numbers").await;
        assert!(state.messages()[2].content().starts_with("| product |"));

        let reply = pipeline.reply(&state);
        assert_eq!(reply.response(), "Chairs in Asia Pacific are trending up.");
        let data = reply.data().expect("table records");
        assert_eq!(data.len(), 5);
        assert_eq!(data[0]["region"], "Asia Pacific");
    }

    #[tokio::test]
    async fn tabular_reply_without_table_has_no_data() {
        let provider = Arc::new(ScriptedProvider::new(["nothing to fetch"]));
        let pipeline = AgentLoop::new(provider.clone(), "m", 0.7, tabular_tools()).tabular(true);
        let state = run(&pipeline, "hello").await;
        assert!(pipeline.reply(&state).data().is_none());
    }

    #[test]
    fn tool_listing_matches_registry() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<&str>::new()));
        assert_eq!(agent_loop(&provider).tools().len(), 2);
        let tabular = AgentLoop::new(provider, "m", 0.7, tabular_tools()).tabular(true);
        assert_eq!(tabular.tools().len(), 3);
        assert_eq!(tabular.name(), "tabular");
    }
}
