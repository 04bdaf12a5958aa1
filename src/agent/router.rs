//! Read/write router: classify, then answer writes from the remote endpoint
//! with the hosted model as fallback.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use super::classifier::QueryType;
use super::fallback::{evaluate, FallbackPolicy, PrimaryOutcome};
use super::state::{ConversationState, Message, Step};
use super::traits::{ChatReply, Pipeline, QueryClassifier};
use crate::endpoint::QueryGenerator;
use crate::providers::Provider;

/// Acknowledgement returned for read requests.
pub const READ_ACKNOWLEDGEMENT: &str = "Data read operation processed successfully";

pub struct ReadWriteRouter {
    classifier: Box<dyn QueryClassifier>,
    endpoint: Arc<dyn QueryGenerator>,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f64,
    policy: FallbackPolicy,
    read_response: String,
}

impl ReadWriteRouter {
    pub fn new(
        classifier: Box<dyn QueryClassifier>,
        endpoint: Arc<dyn QueryGenerator>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f64,
    ) -> Self {
        Self {
            classifier,
            endpoint,
            provider,
            model: model.into(),
            temperature,
            policy: FallbackPolicy::default(),
            read_response: READ_ACKNOWLEDGEMENT.to_string(),
        }
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_read_response(mut self, text: impl Into<String>) -> Self {
        self.read_response = text.into();
        self
    }

    fn classify_step(&self, state: ConversationState) -> ConversationState {
        let text = state.last_user_text().unwrap_or_default().to_lowercase();
        let query_type = self.classifier.classify(&text);
        tracing::info!(%query_type, classifier = self.classifier.name(), "request classified");

        let next = match query_type {
            QueryType::Write => Step::WriteHandler,
            QueryType::Read => Step::ReadHandler,
        };
        state.with_query_type(query_type).routed_to(next)
    }

    fn read_step(&self, state: ConversationState) -> ConversationState {
        state
            .with_message(Message::assistant(self.read_response.clone()))
            .routed_to(Step::End)
    }

    async fn write_step(&self, state: ConversationState) -> Result<ConversationState> {
        let input = state.last_user_text().unwrap_or_default().to_string();
        let primary = self.endpoint.generate_query(&input).await;

        let answer = match evaluate(primary, self.policy) {
            PrimaryOutcome::Answered(query) => {
                tracing::info!(endpoint = self.endpoint.name(), "remote endpoint answered");
                query
            }
            PrimaryOutcome::Fallback(err) => {
                tracing::warn!(
                    kind = %err.kind(),
                    error = %err,
                    "remote endpoint failed; falling back to hosted model"
                );
                self.provider
                    .chat_with_history(&state.chat_history(None), &self.model, self.temperature)
                    .await
                    .with_context(|| format!("{} fallback request failed", self.provider.name()))?
            }
            PrimaryOutcome::Abort(err) => {
                tracing::error!(kind = %err.kind(), error = %err, "remote endpoint failed");
                return Err(anyhow::Error::new(err).context("remote endpoint failed"));
            }
        };

        Ok(state
            .with_message(Message::assistant(answer))
            .routed_to(Step::End))
    }
}

#[async_trait]
impl Pipeline for ReadWriteRouter {
    fn entry(&self) -> Step {
        Step::Classifier
    }

    async fn run(&self, mut state: ConversationState) -> Result<ConversationState> {
        loop {
            state = match state.next() {
                Step::Classifier => self.classify_step(state),
                Step::ReadHandler => self.read_step(state),
                Step::WriteHandler => self.write_step(state).await?,
                Step::End => return Ok(state),
                other => anyhow::bail!("router cannot handle step {other}"),
            };
        }
    }

    fn reply(&self, state: &ConversationState) -> ChatReply {
        ChatReply::Routed {
            response: state.final_response(),
            query_type: state.query_type().unwrap_or(QueryType::Read),
        }
    }

    fn name(&self) -> &str {
        "router"
    }
}
