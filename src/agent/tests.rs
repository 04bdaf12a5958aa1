//! Shared doubles for pipeline tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::providers::{ChatMessage, Provider};

enum Script {
    Queue(Mutex<VecDeque<String>>),
    Repeat(String),
    Fail(String),
}

/// Provider that answers from a script and records every history it receives.
pub(crate) struct ScriptedProvider {
    script: Script,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    /// Replies in order; `"done"` once the script runs out.
    pub(crate) fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(Script::Queue(Mutex::new(
            replies.into_iter().map(Into::into).collect(),
        )))
    }

    pub(crate) fn repeating(reply: &str) -> Self {
        Self::with_script(Script::Repeat(reply.to_string()))
    }

    pub(crate) fn failing(error: &str) -> Self {
        Self::with_script(Script::Fail(error.to_string()))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat_with_history(
        &self,
        messages: &[ChatMessage],
        _model: &str,
        _temperature: f64,
    ) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        match &self.script {
            Script::Queue(queue) => Ok(queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "done".to_string())),
            Script::Repeat(reply) => Ok(reply.clone()),
            Script::Fail(error) => anyhow::bail!("{error}"),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
