use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use super::classifier::KeywordClassifier;
use super::fallback::FallbackPolicy;
use super::loop_::{AgentLoop, DEFAULT_MAX_TOOL_ITERATIONS};
use super::router::{ReadWriteRouter, READ_ACKNOWLEDGEMENT};
use super::state::ConversationState;
use super::traits::{ChatReply, Pipeline, QueryClassifier};
use crate::config::Config;
use crate::endpoint::{create_endpoint, QueryEndpoint, QueryGenerator};
use crate::providers::{self, Provider};
use crate::tools::{planning_tools, tabular_tools, Tool, ToolSpec};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a planning assistant that helps with project management and scheduling.
You can update spreadsheets and check business logic rules.
Say \"use tool\" followed by the tool name when you need one.";

pub const TABULAR_SYSTEM_PROMPT: &str = "You are a planning assistant that helps with project management and scheduling.
You can update spreadsheets, check business logic rules and fetch planning data as tables.
Say \"use tool\" followed by the tool name when you need one, and summarize tables you receive.";

/// Which pipeline handles incoming messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    AgentLoop,
    Tabular,
    #[default]
    Router,
}

impl PipelineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AgentLoop => "agent_loop",
            Self::Tabular => "tabular",
            Self::Router => "router",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "agent_loop" | "agent" => Ok(Self::AgentLoop),
            "tabular" => Ok(Self::Tabular),
            "router" => Ok(Self::Router),
            other => anyhow::bail!(
                "unknown pipeline '{other}' (expected agent_loop, tabular or router)"
            ),
        }
    }
}

/// Entry point: one message in, one [`ChatReply`] out.
pub struct Agent {
    kind: PipelineKind,
    pipeline: Box<dyn Pipeline>,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Wire provider, endpoint and classifier from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider_name = config.default_provider.as_deref().unwrap_or("openai");
        let provider = providers::create_provider(
            provider_name,
            config.api_key.as_deref(),
            config.api_url.as_deref(),
        )
        .with_context(|| format!("Failed to create provider '{provider_name}'"))?;

        let classifier =
            KeywordClassifier::new(&config.routing.write_keywords, config.routing.match_mode);

        let mut builder = Self::builder()
            .pipeline(config.agent.pipeline)
            .provider(Arc::from(provider))
            .endpoint(Arc::new(create_endpoint(&config.endpoint)?))
            .classifier(Box::new(classifier))
            .temperature(config.default_temperature)
            .max_tool_iterations(config.agent.max_tool_iterations)
            .fallback_policy(config.routing.fallback)
            .read_response(config.routing.read_response.clone());
        if let Some(model) = &config.default_model {
            builder = builder.model(model.clone());
        }
        if let Some(prompt) = &config.agent.system_prompt {
            builder = builder.system_prompt(prompt.clone());
        }
        builder.build()
    }

    /// Run one message through a fresh conversation.
    pub async fn process_message(&self, message: &str) -> Result<ChatReply> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("message", %request_id, pipeline = %self.kind);

        async {
            let state = ConversationState::new(message, self.pipeline.entry());
            let state = self.pipeline.run(state).await?;
            let reply = self.pipeline.reply(&state);
            tracing::info!(
                messages = state.messages().len(),
                query_type = reply.query_type().map(|q| q.as_str()),
                "message processed"
            );
            Ok::<_, anyhow::Error>(reply)
        }
        .instrument(span)
        .await
    }

    pub fn tools(&self) -> &[ToolSpec] {
        self.pipeline.tools()
    }

    pub fn pipeline(&self) -> PipelineKind {
        self.kind
    }
}

pub struct AgentBuilder {
    kind: PipelineKind,
    provider: Option<Arc<dyn Provider>>,
    endpoint: Option<Arc<dyn QueryGenerator>>,
    classifier: Option<Box<dyn QueryClassifier>>,
    tools: Option<Vec<Box<dyn Tool>>>,
    model: String,
    temperature: f64,
    system_prompt: Option<String>,
    max_tool_iterations: usize,
    policy: FallbackPolicy,
    read_response: String,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            kind: PipelineKind::default(),
            provider: None,
            endpoint: None,
            classifier: None,
            tools: None,
            model: "gpt-4-turbo-preview".into(),
            temperature: 0.7,
            system_prompt: None,
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            policy: FallbackPolicy::default(),
            read_response: READ_ACKNOWLEDGEMENT.into(),
        }
    }

    pub fn pipeline(mut self, kind: PipelineKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn endpoint(mut self, endpoint: Arc<dyn QueryGenerator>) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn classifier(mut self, classifier: Box<dyn QueryClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Replace the pipeline's default tool registry.
    pub fn tools(mut self, tools: Vec<Box<dyn Tool>>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max;
        self
    }

    pub fn fallback_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn read_response(mut self, text: impl Into<String>) -> Self {
        self.read_response = text.into();
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self.provider.context("Agent requires a provider")?;

        let pipeline: Box<dyn Pipeline> = match self.kind {
            PipelineKind::AgentLoop | PipelineKind::Tabular => {
                let tabular = self.kind == PipelineKind::Tabular;
                let (tools, default_prompt) = if tabular {
                    (self.tools.unwrap_or_else(tabular_tools), TABULAR_SYSTEM_PROMPT)
                } else {
                    (self.tools.unwrap_or_else(planning_tools), DEFAULT_SYSTEM_PROMPT)
                };
                let prompt = self
                    .system_prompt
                    .unwrap_or_else(|| default_prompt.to_string());
                Box::new(
                    AgentLoop::new(provider, self.model, self.temperature, tools)
                        .with_system_prompt(Some(prompt))
                        .with_max_tool_iterations(self.max_tool_iterations)
                        .tabular(tabular),
                )
            }
            PipelineKind::Router => {
                let endpoint = match self.endpoint {
                    Some(endpoint) => endpoint,
                    None => Arc::new(QueryEndpoint::new(None, None, Duration::from_secs(30))?),
                };
                let classifier = self
                    .classifier
                    .unwrap_or_else(|| Box::new(KeywordClassifier::default()));
                let router = ReadWriteRouter::new(
                    classifier,
                    endpoint,
                    provider,
                    self.model,
                    self.temperature,
                );
                Box::new(
                    router
                        .with_policy(self.policy)
                        .with_read_response(self.read_response),
                )
            }
        };

        tracing::debug!(pipeline = pipeline.name(), "agent built");
        Ok(Agent {
            kind: self.kind,
            pipeline,
        })
    }
}
