//! Seams of the agent subsystem: classification and pipelines.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::classifier::QueryType;
use super::state::{ConversationState, Step};
use crate::tools::ToolSpec;

/// Query classifier for routing requests to a read or write branch.
pub trait QueryClassifier: Send + Sync {
    fn classify(&self, query: &str) -> QueryType;
    fn name(&self) -> &str;
}

/// A graph of steps that turns a fresh [`ConversationState`] into a finished one.
///
/// Implementations own their collaborators (provider, tools, endpoint) and are
/// shared read-only across concurrent requests.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Step a fresh state is routed to.
    fn entry(&self) -> Step;

    /// Drive `state` until it reaches [`Step::End`].
    async fn run(&self, state: ConversationState) -> Result<ConversationState>;

    /// Extract the caller-facing payload from a finished state.
    fn reply(&self, state: &ConversationState) -> ChatReply;

    /// Specs of the tools this pipeline can dispatch to.
    fn tools(&self) -> &[ToolSpec] {
        &[]
    }

    fn name(&self) -> &str;
}

/// Payload returned for one processed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatReply {
    Routed {
        response: String,
        query_type: QueryType,
    },
    Tabular {
        response: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Vec<Map<String, Value>>>,
    },
    Text(String),
}

impl ChatReply {
    pub fn response(&self) -> &str {
        match self {
            Self::Text(response)
            | Self::Tabular { response, .. }
            | Self::Routed { response, .. } => response,
        }
    }

    pub fn query_type(&self) -> Option<QueryType> {
        match self {
            Self::Routed { query_type, .. } => Some(*query_type),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&[Map<String, Value>]> {
        match self {
            Self::Tabular { data, .. } => data.as_deref(),
            _ => None,
        }
    }

    pub fn into_response(self) -> String {
        match self {
            Self::Text(response)
            | Self::Tabular { response, .. }
            | Self::Routed { response, .. } => response,
        }
    }
}
