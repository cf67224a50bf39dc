//! Termination protocol for group chat sessions.
//!
//! A conversation ends one of two ways: an approving participant states the
//! goal sentinel, or the turn cap is exhausted. The checker is an absorbing
//! state machine. Once it reports termination it keeps reporting it until
//! [`reset`](TerminationChecker::reset) is called, so a late reply can never
//! reopen a finished conversation.
//!
//! Sentinel detection is deliberately narrow: the phrase must appear in the
//! *last* message of the history, and that message must be authored by one of
//! the approver participants. Another agent quoting the sentinel mid-chat
//! does not end the session.

use std::collections::HashSet;

use crate::cloudcrew::client_wrapper::Message;

/// Default turn cap for group chat sessions.
pub const DEFAULT_MAX_TURNS: usize = 111;

/// Whether a session is still accepting turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Terminated,
}

/// Why a session terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    /// An approver stated the goal sentinel.
    SentinelDetected,
    /// The turn cap was reached without the sentinel appearing.
    IterationCapExceeded,
}

/// Absorbing termination state machine for a group chat.
pub struct TerminationChecker {
    sentinel: String,
    approvers: HashSet<String>,
    max_turns: usize,
    auto_reset: bool,
    state: SessionState,
    reason: Option<TerminationReason>,
}

impl TerminationChecker {
    /// Build a checker for the given sentinel and approving participants.
    ///
    /// The sentinel comparison is case-insensitive; it is lowercased once
    /// here rather than on every check.
    pub fn new<I, S>(sentinel: impl Into<String>, approvers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sentinel: sentinel.into().to_lowercase(),
            approvers: approvers.into_iter().map(Into::into).collect(),
            max_turns: DEFAULT_MAX_TURNS,
            auto_reset: false,
            state: SessionState::Running,
            reason: None,
        }
    }

    /// Override the turn cap (builder pattern).
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Automatically reset to `Running` when a new conversation starts on a
    /// terminated checker (builder pattern).
    pub fn with_auto_reset(mut self) -> Self {
        self.auto_reset = true;
        self
    }

    /// Current state of the checker.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Why the last termination happened, if any.
    pub fn reason(&self) -> Option<TerminationReason> {
        self.reason
    }

    /// Whether the checker resets itself between conversations.
    pub fn auto_reset(&self) -> bool {
        self.auto_reset
    }

    /// Return the checker to `Running` for a fresh conversation.
    pub fn reset(&mut self) {
        self.state = SessionState::Running;
        self.reason = None;
    }

    /// Evaluate the history after a completed turn.
    ///
    /// `turn_count` is the number of agent turns taken so far. The cap is
    /// checked first and applies regardless of who spoke last; the sentinel
    /// only counts when the final message was authored by an approver.
    pub fn check(
        &mut self,
        history: &[Message],
        turn_count: usize,
    ) -> Option<TerminationReason> {
        if self.state == SessionState::Terminated {
            return self.reason;
        }

        if turn_count >= self.max_turns {
            self.state = SessionState::Terminated;
            self.reason = Some(TerminationReason::IterationCapExceeded);
            return self.reason;
        }

        let last = history.last()?;
        let from_approver = last
            .author_name
            .as_deref()
            .map(|author| self.approvers.contains(author))
            .unwrap_or(false);

        if from_approver && last.text().to_lowercase().contains(&self.sentinel) {
            self.state = SessionState::Terminated;
            self.reason = Some(TerminationReason::SentinelDetected);
            return self.reason;
        }

        None
    }

    /// Boolean form of [`check`](TerminationChecker::check).
    pub fn should_terminate(&mut self, history: &[Message], turn_count: usize) -> bool {
        self.check(history, turn_count).is_some()
    }
}
