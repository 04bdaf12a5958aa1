//! Message pipelines: the agent ↔ tool loop (plain and tabular) and the
//! read/write router with remote-endpoint fallback.

pub mod actions;
#[allow(clippy::module_inception)]
pub mod agent;
pub mod classifier;
pub mod fallback;
pub mod keywords;
pub mod loop_;
pub mod router;
pub mod state;
pub mod traits;

#[cfg(test)]
pub(crate) mod tests;

pub use actions::{run_action, suggest_actions, ActionError, ActionRequest, SuggestedAction};
pub use agent::{Agent, AgentBuilder, PipelineKind};
pub use classifier::{KeywordClassifier, QueryType};
pub use fallback::{evaluate, FallbackPolicy, PrimaryOutcome};
pub use keywords::{KeywordTable, MatchMode};
pub use loop_::AgentLoop;
pub use router::ReadWriteRouter;
pub use state::{ConversationState, Message, Role, Step, NO_RESPONSE};
pub use traits::{ChatReply, Pipeline, QueryClassifier};
