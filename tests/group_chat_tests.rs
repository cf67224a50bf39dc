use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cloudcrew::agent::Agent;
use cloudcrew::client_wrapper::{ClientWrapper, Message, Role, SendError};
use cloudcrew::group_chat::{CompletionReason, GroupChatSession};
use cloudcrew::selection::SpeakerSelector;
use cloudcrew::termination::TerminationChecker;

/// Replies with a fixed sequence, repeating the last entry when exhausted.
struct SequenceClient {
    responses: Vec<String>,
    call_count: AtomicUsize,
}

impl SequenceClient {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: responses.iter().map(|s| s.to_string()).collect(),
            call_count: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ClientWrapper for SequenceClient {
    async fn send_message(&self, _messages: &[Message]) -> Result<Message, SendError> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        let content = self
            .responses
            .get(idx)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or_default();
        Ok(Message::assistant(content))
    }

    fn model_name(&self) -> &str {
        "sequence"
    }
}

/// Always fails, for exercising contained turn failures.
struct BrokenClient;

#[async_trait]
impl ClientWrapper for BrokenClient {
    async fn send_message(&self, _messages: &[Message]) -> Result<Message, SendError> {
        Err("model unavailable".into())
    }

    fn model_name(&self) -> &str {
        "broken"
    }
}

fn choice(name: &str) -> String {
    format!(r#"{{"name":"{}","reason":"scripted"}}"#, name)
}

fn coordinator(client: Arc<dyn ClientWrapper>) -> Agent {
    Agent::new(
        "RequestCoordinator",
        "Coordinates",
        "Coordinate and finish with GOAL_IS_ACHIEVED.",
        client,
    )
}

fn worker(client: Arc<dyn ClientWrapper>) -> Agent {
    Agent::new("QueryExecutor", "Runs queries", "Run queries.", client)
}

fn termination() -> TerminationChecker {
    TerminationChecker::new("GOAL_IS_ACHIEVED", ["RequestCoordinator"])
}

#[tokio::test]
async fn conversation_ends_when_coordinator_declares_the_goal() {
    let selector_client = SequenceClient::new(&[
        &choice("QueryExecutor"),
        &choice("RequestCoordinator"),
    ]);
    let worker_client = SequenceClient::new(&["Found 3 resources."]);
    let coordinator_client = SequenceClient::new(&["All set. GOAL_IS_ACHIEVED."]);

    let mut chat = GroupChatSession::new(
        vec![worker(worker_client), coordinator(coordinator_client)],
        SpeakerSelector::new(selector_client, "instructions", "RequestCoordinator"),
        termination(),
    );

    let outcome = chat.run("how many resources do I have?").await.unwrap();
    assert_eq!(outcome.reason, CompletionReason::GoalAchieved);
    assert_eq!(outcome.turns, 2);

    // Transcript: user input, worker reply, coordinator reply.
    assert_eq!(outcome.transcript.len(), 3);
    assert_eq!(outcome.transcript[0].role, Role::User);
    assert_eq!(
        outcome.transcript[1].author_name.as_deref(),
        Some("QueryExecutor")
    );
    assert!(outcome.transcript[2].text().contains("GOAL_IS_ACHIEVED"));
}

#[tokio::test]
async fn sentinel_from_worker_does_not_terminate() {
    // The worker says the sentinel but is not an approver; the cap ends it.
    let selector_client = SequenceClient::new(&[&choice("QueryExecutor")]);
    let worker_client = SequenceClient::new(&["I believe GOAL_IS_ACHIEVED already."]);

    let mut chat = GroupChatSession::new(
        vec![worker(worker_client)],
        SpeakerSelector::new(selector_client, "instructions", "QueryExecutor"),
        termination().with_max_turns(4),
    );

    let outcome = chat.run("do something").await.unwrap();
    assert_eq!(outcome.reason, CompletionReason::IterationCapExceeded);
    assert_eq!(outcome.turns, 4);
}

#[tokio::test]
async fn garbage_selector_output_routes_to_fallback() {
    let selector_client = SequenceClient::new(&["whoever seems best"]);
    let coordinator_client =
        SequenceClient::new(&["Handled directly. GOAL_IS_ACHIEVED."]);

    let mut chat = GroupChatSession::new(
        vec![coordinator(coordinator_client)],
        SpeakerSelector::new(selector_client, "instructions", "RequestCoordinator"),
        termination(),
    );

    let outcome = chat.run("hello").await.unwrap();
    assert_eq!(outcome.reason, CompletionReason::GoalAchieved);
    assert_eq!(
        outcome.transcript[1].author_name.as_deref(),
        Some("RequestCoordinator")
    );
}

#[tokio::test]
async fn unknown_participant_name_routes_to_fallback() {
    let selector_client = SequenceClient::new(&[&choice("SomeoneElse")]);
    let coordinator_client = SequenceClient::new(&["Done. GOAL_IS_ACHIEVED."]);

    let mut chat = GroupChatSession::new(
        vec![coordinator(coordinator_client)],
        SpeakerSelector::new(selector_client, "instructions", "RequestCoordinator"),
        termination(),
    );

    let outcome = chat.run("hello").await.unwrap();
    assert_eq!(outcome.reason, CompletionReason::GoalAchieved);
    assert_eq!(outcome.turns, 1);
}

#[tokio::test]
async fn failed_turn_is_recorded_and_conversation_continues() {
    let selector_client = SequenceClient::new(&[
        &choice("QueryExecutor"),
        &choice("RequestCoordinator"),
    ]);
    let coordinator_client = SequenceClient::new(&["Recovering. GOAL_IS_ACHIEVED."]);

    let mut chat = GroupChatSession::new(
        vec![
            worker(Arc::new(BrokenClient)),
            coordinator(coordinator_client),
        ],
        SpeakerSelector::new(selector_client, "instructions", "RequestCoordinator"),
        termination(),
    );

    let outcome = chat.run("query something").await.unwrap();
    assert_eq!(outcome.reason, CompletionReason::GoalAchieved);
    // The failed turn is visible in the transcript, attributed to the worker.
    assert_eq!(
        outcome.transcript[1].author_name.as_deref(),
        Some("QueryExecutor")
    );
    assert!(outcome.transcript[1]
        .text()
        .contains("unable to complete this turn"));
}

#[tokio::test]
async fn auto_reset_allows_a_second_conversation() {
    let selector_client = SequenceClient::new(&[&choice("RequestCoordinator")]);
    let coordinator_client = SequenceClient::new(&["GOAL_IS_ACHIEVED"]);

    let mut chat = GroupChatSession::new(
        vec![coordinator(coordinator_client)],
        SpeakerSelector::new(selector_client, "instructions", "RequestCoordinator"),
        termination().with_auto_reset(),
    );

    let first = chat.run("first question").await.unwrap();
    assert_eq!(first.reason, CompletionReason::GoalAchieved);

    let second = chat.run("second question").await.unwrap();
    assert_eq!(second.reason, CompletionReason::GoalAchieved);
    // Turn count restarted for the new conversation.
    assert_eq!(second.turns, 1);

    // The full session history holds both conversations.
    assert_eq!(chat.history().len(), 4);
}

#[tokio::test]
async fn terminated_session_without_auto_reset_rejects_new_input() {
    let selector_client = SequenceClient::new(&[&choice("RequestCoordinator")]);
    let coordinator_client = SequenceClient::new(&["GOAL_IS_ACHIEVED"]);

    let mut chat = GroupChatSession::new(
        vec![coordinator(coordinator_client)],
        SpeakerSelector::new(selector_client, "instructions", "RequestCoordinator"),
        termination(),
    );

    chat.run("first").await.unwrap();
    let err = chat.run("second").await.unwrap_err();
    assert!(err.to_string().contains("terminated"));
}
