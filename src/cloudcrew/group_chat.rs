//! Multi-agent group chat.
//!
//! A [`GroupChatSession`] owns a set of peer [`Agent`]s, a shared transcript,
//! a [`SpeakerSelector`] that picks who talks next, and a
//! [`TerminationChecker`] that decides when the conversation is over.
//!
//! The turn loop is:
//!
//! 1. Ask the selector for the next speaker.
//! 2. Resolve the name to a participant (unknown names go to the selector's
//!    fallback).
//! 3. Let the agent respond over the shared history and append its reply.
//! 4. Run the termination check; stop on sentinel or turn cap.
//!
//! A failed agent turn does not abort the session. The failure is logged and
//! recorded in the transcript as a visible message so the other participants
//! (and the termination cap) can still move the conversation to an end.

use chrono::{DateTime, Utc};
use log::{info, warn};
use uuid::Uuid;

use crate::cloudcrew::agent::Agent;
use crate::cloudcrew::client_wrapper::{Message, SendError, TokenUsage};
use crate::cloudcrew::selection::SpeakerSelector;
use crate::cloudcrew::termination::{SessionState, TerminationChecker, TerminationReason};

/// How a group chat run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionReason {
    /// An approving agent declared the goal achieved.
    GoalAchieved,
    /// The turn cap ran out before the goal was declared.
    IterationCapExceeded,
}

/// The result of one [`GroupChatSession::run`] invocation.
#[derive(Debug)]
pub struct GroupChatOutcome {
    /// Every message exchanged during this run, including the user input.
    pub transcript: Vec<Message>,
    /// Number of agent turns taken.
    pub turns: usize,
    /// Why the run stopped.
    pub reason: CompletionReason,
    /// Aggregated token usage across all agent turns that reported any.
    pub tokens_used: Option<TokenUsage>,
}

/// A conversation between peer agents moderated by a speaker selector.
pub struct GroupChatSession {
    /// Unique id for correlating log lines from concurrent sessions.
    pub id: Uuid,
    /// When the session was created.
    pub started_at: DateTime<Utc>,

    participants: Vec<Agent>,
    selector: SpeakerSelector,
    termination: TerminationChecker,
    history: Vec<Message>,
    turn_count: usize,
}

impl GroupChatSession {
    /// Assemble a session from participants, a selector, and a termination
    /// checker.
    pub fn new(
        participants: Vec<Agent>,
        selector: SpeakerSelector,
        termination: TerminationChecker,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            participants,
            selector,
            termination,
            history: Vec::new(),
            turn_count: 0,
        }
    }

    /// The accumulated conversation history across runs.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Names of the participating agents, in registration order.
    pub fn participant_names(&self) -> Vec<&str> {
        self.participants.iter().map(|a| a.name.as_str()).collect()
    }

    /// Run the conversation for one user input until termination.
    ///
    /// When the previous run terminated and the checker was built with
    /// auto-reset, the checker (and turn counter) is reset so the session can
    /// serve a fresh conversation over the same transcript.
    pub async fn run(&mut self, user_input: impl Into<String>) -> Result<GroupChatOutcome, SendError> {
        if self.termination.state() == SessionState::Terminated {
            if self.termination.auto_reset() {
                self.termination.reset();
                self.turn_count = 0;
            } else {
                return Err("session already terminated".into());
            }
        }

        let run_start = self.history.len();
        let user_input = user_input.into();
        info!("[{}] user: {}", self.id, user_input);
        self.history.push(Message::user(user_input));

        let mut total_usage: Option<TokenUsage> = None;

        let reason = loop {
            let speaker = self.selector.select_next(&self.history).await;
            let agent = match self.resolve(&speaker) {
                Some(idx) => &self.participants[idx],
                None => {
                    warn!(
                        "[{}] selector chose unknown participant {:?}, using {}",
                        self.id,
                        speaker,
                        self.selector.fallback()
                    );
                    let fallback = self.selector.fallback().to_string();
                    match self.resolve(&fallback) {
                        Some(idx) => &self.participants[idx],
                        None => return Err(
                            format!("fallback participant {:?} is not in the session", fallback)
                                .into(),
                        ),
                    }
                }
            };

            let name = agent.name.clone();
            match agent.respond(&self.history).await {
                Ok(reply) => {
                    info!("[{}] {}: {}", self.id, name, reply.content);
                    if let Some(usage) = reply.tokens_used {
                        let slot = total_usage.get_or_insert(TokenUsage::default());
                        slot.input_tokens += usage.input_tokens;
                        slot.output_tokens += usage.output_tokens;
                        slot.total_tokens += usage.total_tokens;
                    }
                    self.history.push(Message::assistant_from(name, reply.content));
                }
                Err(err) => {
                    warn!("[{}] turn by {} failed: {}", self.id, name, err);
                    self.history.push(Message::assistant_from(
                        name.clone(),
                        format!("[{} was unable to complete this turn: {}]", name, err),
                    ));
                }
            }

            self.turn_count += 1;
            if let Some(reason) = self.termination.check(&self.history, self.turn_count) {
                break reason;
            }
        };

        let completion = match reason {
            TerminationReason::SentinelDetected => CompletionReason::GoalAchieved,
            TerminationReason::IterationCapExceeded => CompletionReason::IterationCapExceeded,
        };
        info!(
            "[{}] terminated after {} turns: {:?}",
            self.id, self.turn_count, completion
        );

        Ok(GroupChatOutcome {
            transcript: self.history[run_start..].to_vec(),
            turns: self.turn_count,
            reason: completion,
            tokens_used: total_usage,
        })
    }

    fn resolve(&self, name: &str) -> Option<usize> {
        self.participants.iter().position(|a| a.name == name)
    }
}
