//! Single-agent chat session with rolling history.
//!
//! Wraps one [`Agent`] with an owned conversation history and a token
//! budget. Before each send, the oldest messages are trimmed until the
//! estimated prompt size fits the budget. Token counts are estimated at
//! roughly four characters per token plus one per role marker; the estimate
//! only has to be stable, not exact, because it is compared against a budget
//! chosen with headroom.

use log::info;

use crate::cloudcrew::agent::{Agent, AgentReply};
use crate::cloudcrew::client_wrapper::{Message, Role, SendError, TokenUsage};

const DEFAULT_MAX_TOKENS: usize = 128_000;

/// A stateful conversation with a single agent.
pub struct ChatSession {
    agent: Agent,
    history: Vec<Message>,
    max_tokens: usize,
    total_usage: TokenUsage,
}

impl ChatSession {
    /// Wrap an agent with an empty history and the default token budget.
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            history: Vec::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
            total_usage: TokenUsage::default(),
        }
    }

    /// Override the token budget (builder pattern).
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The conversation so far, oldest first.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Cumulative token usage across every send in this session.
    pub fn token_usage(&self) -> &TokenUsage {
        &self.total_usage
    }

    /// The wrapped agent.
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Append a message and let the agent take a turn over the history.
    pub async fn send_message(
        &mut self,
        role: Role,
        content: impl Into<String>,
    ) -> Result<AgentReply, SendError> {
        self.history.push(Message {
            role,
            author_name: None,
            content: crate::cloudcrew::client_wrapper::MessageContent::Text(content.into()),
        });
        self.trim_to_budget();

        let reply = self.agent.respond(&self.history).await?;
        if let Some(usage) = &reply.tokens_used {
            self.total_usage.input_tokens += usage.input_tokens;
            self.total_usage.output_tokens += usage.output_tokens;
            self.total_usage.total_tokens += usage.total_tokens;
        }
        self.history
            .push(Message::assistant_from(self.agent.name.clone(), reply.content.clone()));
        Ok(reply)
    }

    /// Drop history from the front until the estimated size fits the budget.
    fn trim_to_budget(&mut self) {
        let mut estimated: usize = self.history.iter().map(estimate_tokens).sum();
        let mut dropped = 0;
        while estimated > self.max_tokens && self.history.len() > 1 {
            estimated -= estimate_tokens(&self.history[0]);
            self.history.remove(0);
            dropped += 1;
        }
        if dropped > 0 {
            info!(
                "trimmed {} old messages to fit {} token budget",
                dropped, self.max_tokens
            );
        }
    }
}

/// Rough token estimate: four characters per token plus one for the role.
fn estimate_tokens(message: &Message) -> usize {
    message.content.to_prompt_text().len() / 4 + 1
}
