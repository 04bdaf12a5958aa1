//! Decides what happens after the remote endpoint answers or fails.

use serde::{Deserialize, Serialize};

use crate::endpoint::{EndpointError, FailureKind};

/// Which endpoint failure kinds are recovered by asking the hosted model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackPolicy {
    pub on_unconfigured: bool,
    pub on_unreachable: bool,
    pub on_rejected: bool,
    pub on_malformed: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::always()
    }
}

impl FallbackPolicy {
    /// Fall back on every failure.
    pub const fn always() -> Self {
        Self {
            on_unconfigured: true,
            on_unreachable: true,
            on_rejected: true,
            on_malformed: true,
        }
    }

    pub fn allows(&self, kind: FailureKind) -> bool {
        match kind {
            FailureKind::Unconfigured => self.on_unconfigured,
            FailureKind::Unreachable => self.on_unreachable,
            FailureKind::Rejected => self.on_rejected,
            FailureKind::Malformed => self.on_malformed,
        }
    }
}

/// Outcome of the primary call after applying the policy.
#[derive(Debug)]
pub enum PrimaryOutcome {
    Answered(String),
    Fallback(EndpointError),
    Abort(EndpointError),
}

pub fn evaluate(result: Result<String, EndpointError>, policy: FallbackPolicy) -> PrimaryOutcome {
    match result {
        Ok(answer) => PrimaryOutcome::Answered(answer),
        Err(err) if policy.allows(err.kind()) => PrimaryOutcome::Fallback(err),
        Err(err) => PrimaryOutcome::Abort(err),
    }
}
