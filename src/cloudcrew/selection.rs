//! Speaker selection for group chat sessions.
//!
//! Between turns, a classifier call decides which participant speaks next.
//! The classifier is an ordinary chat completion: it receives the selection
//! instructions (participant roster, handoff rules, JSON schema) plus the
//! rendered conversation history, and replies with
//! `{"name": "...", "reason": "..."}`.
//!
//! Selection must never stall the conversation. Whatever goes wrong with the
//! classifier, a missing reply, unparsable JSON, a blank name, the selector
//! falls back to its configured coordinator and the session moves on.

use log::{info, warn};
use serde::Deserialize;
use std::sync::Arc;

use crate::cloudcrew::client_wrapper::{ClientWrapper, Message};
use crate::cloudcrew::json_translator;

/// The classifier's parsed verdict. Both fields are optional so that a
/// structurally valid but incomplete reply still deserializes.
#[derive(Debug, Deserialize)]
pub struct SpeakerChoice {
    pub name: Option<String>,
    pub reason: Option<String>,
}

/// Picks the next speaker by running a classifier completion over the
/// conversation history.
pub struct SpeakerSelector {
    client: Arc<dyn ClientWrapper>,
    instructions: String,
    fallback: String,
}

impl SpeakerSelector {
    /// Build a selector with explicit instructions and a fallback speaker.
    ///
    /// `fallback` is the participant chosen whenever the classifier fails to
    /// produce a usable name. It should be the coordinating agent.
    pub fn new(
        client: Arc<dyn ClientWrapper>,
        instructions: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            client,
            instructions: instructions.into(),
            fallback: fallback.into(),
        }
    }

    /// The participant used when classification fails.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Render the standard selection instructions for a participant roster.
    ///
    /// `participants` supplies the names listed in the roster;
    /// `handoff_rules` is one line per rule, written in terms of those names.
    pub fn build_instructions(participants: &[&str], handoff_rules: &[&str]) -> String {
        let mut out = String::from(
            "Select which participant will take the next turn based on the conversation history.\n\n\
             Only choose from these participants:\n",
        );
        for name in participants {
            out.push_str(&format!("- {}\n", name));
        }
        out.push_str("\nChoose the next participant according to the action of the most recent participant:\n");
        for rule in handoff_rules {
            out.push_str(&format!("- {}\n", rule));
        }
        out.push_str(
            "\nRespond in json format. The JSON schema can include only:\n\
             {\n\
                 \"name\": \"string (the name of the assistant selected for the next turn)\",\n\
                 \"reason\": \"string (the reason for the participant was selected)\"\n\
             }\n",
        );
        out
    }

    /// Choose the next speaker for the given history.
    ///
    /// Always returns a name: classifier failures of any kind resolve to the
    /// fallback participant.
    pub async fn select_next(&self, history: &[Message]) -> String {
        let prompt = format!(
            "{}\nHistory:\n{}",
            self.instructions,
            render_history(history)
        );
        let messages = [Message::user(prompt)];

        let reply = match self.client.send_message(&messages).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("speaker selection failed, using {}: {}", self.fallback, err);
                return self.fallback.clone();
            }
        };

        let choice: Option<SpeakerChoice> = json_translator::translate(reply.text());
        let name = choice
            .as_ref()
            .and_then(|c| c.name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let reason = choice
            .as_ref()
            .and_then(|c| c.reason.as_deref())
            .unwrap_or("none given");

        match name {
            Some(name) => {
                info!("next speaker: {} ({})", name, reason);
                name.to_string()
            }
            None => {
                info!("next speaker: {} (classifier gave no name)", self.fallback);
                self.fallback.clone()
            }
        }
    }
}

/// Render a history slice in `role - author: 'content'` lines for the
/// classifier prompt.
fn render_history(history: &[Message]) -> String {
    history
        .iter()
        .map(|msg| {
            format!(
                "{} - {}: '{}'",
                msg.role,
                msg.author_name.as_deref().unwrap_or("*"),
                msg.content.to_prompt_text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudcrew::client_wrapper::{SendError, TokenUsage};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct FixedClient {
        reply: Result<String, String>,
        last_prompt: Mutex<String>,
    }

    impl FixedClient {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                last_prompt: Mutex::new(String::new()),
            }
        }

        fn failing(error: &str) -> Self {
            Self {
                reply: Err(error.to_string()),
                last_prompt: Mutex::new(String::new()),
            }
        }
    }

    #[async_trait]
    impl ClientWrapper for FixedClient {
        async fn send_message(&self, messages: &[Message]) -> Result<Message, SendError> {
            {
                let mut prompt = self.last_prompt.lock().await;
                *prompt = messages
                    .last()
                    .map(|m| m.content.to_prompt_text())
                    .unwrap_or_default();
            }
            match &self.reply {
                Ok(text) => Ok(Message::assistant(text.clone())),
                Err(err) => Err(err.clone().into()),
            }
        }

        fn model_name(&self) -> &str {
            "fixed"
        }

        fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
            None
        }
    }

    fn selector(client: Arc<dyn ClientWrapper>) -> SpeakerSelector {
        SpeakerSelector::new(client, "pick someone", "RequestCoordinator")
    }

    #[tokio::test]
    async fn picks_the_named_participant() {
        let client = Arc::new(FixedClient::replying(
            r#"{"name":"QueryExecutor","reason":"a query is needed"}"#,
        ));
        let sel = selector(client);
        let next = sel.select_next(&[Message::user("list resources")]).await;
        assert_eq!(next, "QueryExecutor");
    }

    #[tokio::test]
    async fn fenced_reply_is_parsed() {
        let client = Arc::new(FixedClient::replying(
            "```json\n{\"name\":\"ResourceTagger\",\"reason\":\"tagging\"}\n```",
        ));
        let sel = selector(client);
        let next = sel.select_next(&[Message::user("tag it")]).await;
        assert_eq!(next, "ResourceTagger");
    }

    #[tokio::test]
    async fn blank_name_falls_back_to_coordinator() {
        let client = Arc::new(FixedClient::replying(r#"{"name":"   ","reason":"?"}"#));
        let sel = selector(client);
        let next = sel.select_next(&[Message::user("hi")]).await;
        assert_eq!(next, "RequestCoordinator");
    }

    #[tokio::test]
    async fn garbage_reply_falls_back_to_coordinator() {
        let client = Arc::new(FixedClient::replying("the next speaker should be Bob"));
        let sel = selector(client);
        let next = sel.select_next(&[Message::user("hi")]).await;
        assert_eq!(next, "RequestCoordinator");
    }

    #[tokio::test]
    async fn transport_error_falls_back_to_coordinator() {
        let client = Arc::new(FixedClient::failing("connection refused"));
        let sel = selector(client);
        let next = sel.select_next(&[Message::user("hi")]).await;
        assert_eq!(next, "RequestCoordinator");
    }

    #[tokio::test]
    async fn prompt_includes_history_and_authors() {
        let client = Arc::new(FixedClient::replying(r#"{"name":"A","reason":"r"}"#));
        let sel = selector(client.clone());
        sel.select_next(&[
            Message::user("tag my vm"),
            Message::assistant_from("QueryExecutor", "found it"),
        ])
        .await;

        let prompt = client.last_prompt.lock().await;
        assert!(prompt.contains("History:"));
        assert!(prompt.contains("user - *: 'tag my vm'"));
        assert!(prompt.contains("assistant - QueryExecutor: 'found it'"));
    }

    #[test]
    fn instructions_list_roster_rules_and_schema() {
        let text = SpeakerSelector::build_instructions(
            &["ResourceTagger", "QueryExecutor", "RequestCoordinator"],
            &["After user input, it is RequestCoordinator turn."],
        );
        assert!(text.contains("- ResourceTagger\n"));
        assert!(text.contains("- After user input, it is RequestCoordinator turn.\n"));
        assert!(text.contains("\"name\""));
        assert!(text.contains("\"reason\""));
    }
}
