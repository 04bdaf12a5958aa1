//! Per-request conversation state.
//!
//! A [`ConversationState`] is created fresh for every request and threaded
//! through the pipeline by value: each step consumes the state and returns a
//! transformed copy. Messages are append-only and immutable once appended.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::classifier::QueryType;
use crate::providers::ChatMessage;
use crate::tools::TableData;

/// Returned when a finished state holds no assistant message.
pub const NO_RESPONSE: &str = "No response generated";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Convert to the wire shape expected by chat-completion providers.
    ///
    /// Tool output is sent as a user turn: the providers reject `tool` role
    /// messages that do not answer a native tool call id.
    pub fn to_chat_message(&self) -> ChatMessage {
        match self.role {
            Role::Tool => ChatMessage::user(format!("Tool result: {}", self.content)),
            role => ChatMessage {
                role: role.as_str().to_string(),
                content: self.content.clone(),
            },
        }
    }
}

/// Routing label: which node runs next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Agent,
    ToolCaller,
    Classifier,
    ReadHandler,
    WriteHandler,
    End,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Agent => "agent",
            Self::ToolCaller => "tool_caller",
            Self::Classifier => "classifier",
            Self::ReadHandler => "read_handler",
            Self::WriteHandler => "write_handler",
            Self::End => "end",
        };
        f.write_str(label)
    }
}

/// Message history plus routing metadata for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<Message>,
    next: Step,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    query_type: Option<QueryType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    table: Option<TableData>,
}

impl ConversationState {
    /// Start a conversation from raw user text.
    pub fn new(user_text: impl Into<String>, entry: Step) -> Self {
        Self {
            messages: vec![Message::user(user_text)],
            next: entry,
            query_type: None,
            table: None,
        }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn routed_to(mut self, next: Step) -> Self {
        self.next = next;
        self
    }

    pub fn with_query_type(mut self, query_type: QueryType) -> Self {
        self.query_type = Some(query_type);
        self
    }

    pub fn with_table(mut self, table: TableData) -> Self {
        self.table = Some(table);
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn next(&self) -> Step {
        self.next
    }

    pub fn query_type(&self) -> Option<QueryType> {
        self.query_type
    }

    pub fn table(&self) -> Option<&TableData> {
        self.table.as_ref()
    }

    pub fn count(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    fn last_by(&self, role: Role) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == role)
    }

    pub fn last_user_text(&self) -> Option<&str> {
        self.last_by(Role::User).map(Message::content)
    }

    pub fn last_assistant_text(&self) -> Option<&str> {
        self.last_by(Role::Assistant).map(Message::content)
    }

    /// The text handed back to the caller once the pipeline has finished.
    pub fn final_response(&self) -> String {
        self.last_assistant_text()
            .map_or_else(|| NO_RESPONSE.to_string(), ToString::to_string)
    }

    /// History in provider wire format, optionally led by a system prompt.
    pub fn chat_history(&self, system_prompt: Option<&str>) -> Vec<ChatMessage> {
        let mut history = Vec::with_capacity(self.messages.len() + 1);
        if let Some(prompt) = system_prompt.filter(|p| !p.trim().is_empty()) {
            history.push(ChatMessage::system(prompt));
        }
        history.extend(self.messages.iter().map(Message::to_chat_message));
        history
    }
}
