use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure of the remote query endpoint.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("remote endpoint URL is not configured")]
    NotConfigured,
    #[error("remote endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("remote endpoint returned a malformed payload: {0}")]
    Malformed(String),
}

/// Coarse classification of an [`EndpointError`], used for logging and for
/// the fallback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unconfigured,
    Unreachable,
    Rejected,
    Malformed,
}

impl EndpointError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotConfigured => FailureKind::Unconfigured,
            Self::Transport(_) => FailureKind::Unreachable,
            Self::Status { .. } => FailureKind::Rejected,
            Self::Malformed(_) => FailureKind::Malformed,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unconfigured => "unconfigured",
            Self::Unreachable => "unreachable",
            Self::Rejected => "rejected",
            Self::Malformed => "malformed",
        })
    }
}
