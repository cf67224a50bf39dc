use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use tokio::sync::Mutex;

/// A ClientWrapper is a wrapper around a chat-completion service.
/// It provides a common interface for everything in this crate that needs to
/// talk to a model: agents, the speaker selector, the planner, and the plain
/// one-shot prompt path. It does not keep any conversation state; sessions
/// own their own history and hand the full message slice to the wrapper on
/// every call.

/// Represents the possible roles for a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Set by the developer to steer the model's responses.
    System,
    /// A message sent by the human user of the app.
    User,
    /// Content generated by a model (or by an agent on a model's behalf).
    Assistant,
}

impl Role {
    /// The wire identifier for this role ("system", "user", "assistant").
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, Default)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// A single tool invocation requested by a model.
///
/// Agents and the planner scan model output for a JSON fragment of the form
/// `{"tool_call": {"name": "...", "parameters": {...}}}` and parse it into
/// this struct. The `name` routes the call through a
/// [`ToolRegistry`](crate::tool_protocol::ToolRegistry); `parameters` is the
/// raw JSON payload forwarded to the tool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Name of the tool to execute (e.g. `"resource_graph_query"`).
    pub name: String,
    /// Raw JSON parameters extracted from the model's request.
    pub parameters: serde_json::Value,
}

/// The payload of a [`Message`].
///
/// Model replies are either plain prose or a batch of tool invocations.
/// Keeping the distinction as a tagged variant lets callers pattern-match
/// instead of re-inspecting text at every layer.
#[derive(Clone, Debug)]
pub enum MessageContent {
    /// Ordinary conversational text.
    Text(String),
    /// One or more tool invocations parsed out of a model reply.
    ToolCalls(Vec<ToolCallRequest>),
}

impl MessageContent {
    /// Borrow the textual content, or `""` for a tool-call batch.
    pub fn as_text(&self) -> &str {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::ToolCalls(_) => "",
        }
    }

    /// Render the content as prompt text suitable for re-sending to a model.
    ///
    /// Tool-call batches are rendered back into the same
    /// `{"tool_call": ...}` JSON convention they were parsed from, so a
    /// history containing them round-trips through the wire untouched.
    pub fn to_prompt_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::ToolCalls(calls) => calls
                .iter()
                .map(|call| {
                    serde_json::json!({ "tool_call": call }).to_string()
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A message in a conversation history.
///
/// Histories are append-only: insertion order is conversation order, and no
/// layer of this crate mutates a message once it has been pushed.
#[derive(Clone, Debug)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// Which participant authored the message, when one is known.
    /// User and system messages carry `None`.
    pub author_name: Option<String>,
    /// The actual content of the message.
    pub content: MessageContent,
}

impl Message {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: Role::System,
            author_name: None,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            author_name: None,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Build an anonymous assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Message {
            role: Role::Assistant,
            author_name: None,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Build an assistant message attributed to a named participant.
    pub fn assistant_from(author: impl Into<String>, content: impl Into<String>) -> Self {
        Message {
            role: Role::Assistant,
            author_name: Some(author.into()),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Build an assistant message carrying a parsed tool-call batch.
    pub fn tool_calls_from(author: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        Message {
            role: Role::Assistant,
            author_name: Some(author.into()),
            content: MessageContent::ToolCalls(calls),
        }
    }

    /// Borrow the textual content of the message (`""` for tool calls).
    pub fn text(&self) -> &str {
        self.content.as_text()
    }
}

/// Type alias for a Send-able error box used across async boundaries.
pub type SendError = Box<dyn Error + Send + Sync>;

/// Trait defining the interface to a chat-completion service.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Send the full message history to the model and get a reply.
    async fn send_message(&self, messages: &[Message]) -> Result<Message, SendError>;

    /// The model identifier this wrapper talks to (for logging).
    fn model_name(&self) -> &str;

    /// Retrieve usage from the *last* `send_message()` call.
    /// Default impl reads the wrapper's usage slot, if it keeps one.
    async fn get_last_usage(&self) -> Option<TokenUsage> {
        match self.usage_slot() {
            Some(slot) => slot.lock().await.clone(),
            None => None,
        }
    }

    /// Wrappers that track token usage should override this to expose their slot.
    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        None
    }
}
