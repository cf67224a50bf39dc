use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cloudcrew::client_wrapper::{ClientWrapper, Message, SendError};
use cloudcrew::crew;
use cloudcrew::group_chat::CompletionReason;
use cloudcrew::tools::ArmClient;

/// One scripted client shared by the selector and all three agents, replying
/// in call order.
struct SharedScript {
    responses: Vec<String>,
    call_count: AtomicUsize,
}

impl SharedScript {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: responses.iter().map(|s| s.to_string()).collect(),
            call_count: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ClientWrapper for SharedScript {
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
        "shared-script"
    }
}

#[tokio::test]
async fn stock_crew_runs_to_goal_with_the_coordinator() {
    // Call order: selector, then the chosen agent, repeated.
    let client = SharedScript::new(&[
        r#"{"name":"RequestCoordinator","reason":"user turn"}"#,
        "This is not an Azure resource question, so I must decline. GOAL_IS_ACHIEVED.",
    ]);
    let arm = Arc::new(ArmClient::new("token".to_string()));

    let mut chat = crew::build_group_chat(client, arm);
    let outcome = chat.run("what's the weather like?").await.unwrap();

    assert_eq!(outcome.reason, CompletionReason::GoalAchieved);
    assert_eq!(outcome.turns, 1);
    assert_eq!(
        outcome.transcript.last().unwrap().author_name.as_deref(),
        Some("RequestCoordinator")
    );
}

#[tokio::test]
async fn fenced_selector_reply_still_routes() {
    let client = SharedScript::new(&[
        "```json\n{\"name\":\"RequestCoordinator\",\"reason\":\"user turn\"}\n```",
        "Declined politely. GOAL_IS_ACHIEVED.",
    ]);
    let arm = Arc::new(ArmClient::new("token".to_string()));

    let mut chat = crew::build_group_chat(client, arm);
    let outcome = chat.run("hello").await.unwrap();
    assert_eq!(outcome.reason, CompletionReason::GoalAchieved);
}

#[tokio::test]
async fn stock_crew_auto_resets_between_conversations() {
    let client = SharedScript::new(&[
        r#"{"name":"RequestCoordinator","reason":"first"}"#,
        "Done. GOAL_IS_ACHIEVED.",
        r#"{"name":"RequestCoordinator","reason":"second"}"#,
        "Done again. GOAL_IS_ACHIEVED.",
    ]);
    let arm = Arc::new(ArmClient::new("token".to_string()));

    let mut chat = crew::build_group_chat(client, arm);
    assert!(chat.run("first").await.is_ok());
    let second = chat.run("second").await.unwrap();
    assert_eq!(second.reason, CompletionReason::GoalAchieved);
    assert_eq!(second.turns, 1);
}
