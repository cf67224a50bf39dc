//! Agent System
//!
//! This module provides the core [`Agent`] struct: a named LLM participant
//! with instructions, an optional tool registry, and a bounded tool loop.
//!
//! Agents are stateless with respect to conversation history. The group chat
//! owns the shared transcript and passes a view of it to
//! [`respond`](Agent::respond) each turn; the agent prepends its own system
//! instructions, runs the model, executes any requested tools, and returns
//! the final text. This keeps every participant reading the same history and
//! makes the agent trivially shareable across session kinds.
//!
//! # Example
//!
//! ```rust,no_run
//! use cloudcrew::agent::Agent;
//! use cloudcrew::client_wrapper::Message;
//! use cloudcrew::clients::AzureOpenAIClient;
//! use cloudcrew::config::AzureSettings;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let settings = AzureSettings::from_env()?;
//! let client = Arc::new(AzureOpenAIClient::new(&settings));
//!
//! let agent = Agent::new(
//!     "RequestCoordinator",
//!     "Coordinates user requests",
//!     "You coordinate incoming requests and hand off work.",
//!     client,
//! );
//!
//! let reply = agent
//!     .respond(&[Message::user("Which storage accounts are untagged?")])
//!     .await?;
//! println!("{}", reply.content);
//! # Ok(())
//! # }
//! ```

use log::{info, warn};
use std::sync::Arc;

use crate::cloudcrew::client_wrapper::{ClientWrapper, Message, SendError, TokenUsage};
use crate::cloudcrew::tool_protocol::{parse_tool_call, ToolRegistry};

const DEFAULT_MAX_TOOL_ITERATIONS: usize = 5;

/// Response body returned after asking an agent to take a turn.
///
/// When the agent makes multiple tool calls during a single turn, the
/// `tokens_used` field aggregates usage across all LLM round-trips.
#[derive(Debug, Clone)]
pub struct AgentReply {
    /// Final message content produced across tool iterations.
    pub content: String,
    /// Optional token usage aggregated across all tool iterations.
    pub tokens_used: Option<TokenUsage>,
    /// Number of tool executions performed while producing the reply.
    pub tool_calls_made: usize,
}

/// A named LLM participant with instructions and optional tool access.
pub struct Agent {
    /// Stable identifier referenced by the speaker selector and transcripts.
    pub name: String,
    /// One-line summary of the agent's responsibility, embedded into the
    /// selector's participant roster.
    pub description: String,
    /// System instructions governing the agent's behavior.
    pub instructions: String,

    client: Arc<dyn ClientWrapper>,
    tools: Option<Arc<ToolRegistry>>,
    max_tool_iterations: usize,
}

impl Agent {
    /// Create a new agent with the mandatory identity information.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        instructions: impl Into<String>,
        client: Arc<dyn ClientWrapper>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instructions: instructions.into(),
            client,
            tools: None,
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }

    /// Grant the agent access to a registry of tools (builder pattern).
    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Override the tool-loop cap (builder pattern).
    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max;
        self
    }

    /// Borrow the underlying [`ClientWrapper`].
    pub fn client(&self) -> &Arc<dyn ClientWrapper> {
        &self.client
    }

    /// List the names of the tools available to this agent.
    pub fn list_tools(&self) -> Vec<String> {
        match &self.tools {
            Some(tools) => tools.list_tools().iter().map(|m| m.name.clone()).collect(),
            None => Vec::new(),
        }
    }

    /// Take one turn against the shared conversation history.
    ///
    /// Builds `[system instructions + tool docs] + history`, sends it, and
    /// then runs the tool loop: while the reply contains a
    /// `{"tool_call": ...}` fragment and the iteration cap has not been hit,
    /// the tool is executed and its result is fed back as a follow-up user
    /// message before calling the model again.
    pub async fn respond(&self, history: &[Message]) -> Result<AgentReply, SendError> {
        let mut system = self.instructions.clone();
        if let Some(tools) = &self.tools {
            system.push_str(&tools.tool_documentation());
        }

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(system));
        messages.extend_from_slice(history);

        let mut total_usage: Option<TokenUsage> = None;
        let mut accumulate = |usage: Option<TokenUsage>| {
            if let Some(usage) = usage {
                let slot = total_usage.get_or_insert(TokenUsage {
                    input_tokens: 0,
                    output_tokens: 0,
                    total_tokens: 0,
                });
                slot.input_tokens += usage.input_tokens;
                slot.output_tokens += usage.output_tokens;
                slot.total_tokens += usage.total_tokens;
            }
        };

        let reply = self.client.send_message(&messages).await?;
        accumulate(self.client.get_last_usage().await);
        let mut current = reply.text().to_string();
        let mut tool_iteration = 0;

        while let Some(call) = parse_tool_call(&current) {
            let tools = match &self.tools {
                Some(tools) => tools,
                // A tool-less agent hallucinated the convention; return the
                // text as-is and let the conversation carry on.
                None => break,
            };

            if tool_iteration >= self.max_tool_iterations {
                warn!("{}: tool iteration cap reached", self.name);
                current = format!(
                    "{}\n\n[Warning: Maximum tool iterations reached]",
                    current
                );
                break;
            }
            tool_iteration += 1;

            info!("{}: executing tool {}", self.name, call.name);
            let result_message = match tools.execute_tool(&call.name, call.parameters.clone()).await
            {
                Ok(result) if result.success => format!(
                    "Tool '{}' executed successfully. Result: {}",
                    call.name,
                    serde_json::to_string_pretty(&result.output)
                        .unwrap_or_else(|_| format!("{:?}", result.output))
                ),
                Ok(result) => format!(
                    "Tool '{}' failed. Error: {}",
                    call.name,
                    result.error.unwrap_or_else(|| "Unknown error".to_string())
                ),
                Err(err) => format!("Tool execution error: {}", err),
            };

            messages.push(Message::tool_calls_from(&self.name, vec![call]));
            messages.push(Message::user(result_message));

            let follow_up = self.client.send_message(&messages).await?;
            accumulate(self.client.get_last_usage().await);
            current = follow_up.text().to_string();
        }

        Ok(AgentReply {
            content: current,
            tokens_used: total_usage,
            tool_calls_made: tool_iteration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudcrew::client_wrapper::Role;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct ScriptedClient {
        responses: Vec<String>,
        call_count: AtomicUsize,
        usage: Mutex<Option<TokenUsage>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: responses.into_iter().map(String::from).collect(),
                call_count: AtomicUsize::new(0),
                usage: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ClientWrapper for ScriptedClient {
        async fn send_message(&self, _messages: &[Message]) -> Result<Message, SendError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            let content = self
                .responses
                .get(idx)
                .cloned()
                .unwrap_or_else(|| "done".to_string());
            {
                let mut slot = self.usage.lock().await;
                *slot = Some(TokenUsage {
                    input_tokens: 10,
                    output_tokens: 5,
                    total_tokens: 15,
                });
            }
            Ok(Message::assistant(content))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }

        fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
            Some(&self.usage)
        }
    }

    #[tokio::test]
    async fn plain_reply_passes_through() {
        let client = Arc::new(ScriptedClient::new(vec!["All resources are tagged."]));
        let agent = Agent::new("Reporter", "Reports findings", "Report.", client);

        let reply = agent
            .respond(&[Message::user("status?")])
            .await
            .unwrap();
        assert_eq!(reply.content, "All resources are tagged.");
        assert_eq!(reply.tool_calls_made, 0);
        assert_eq!(reply.tokens_used.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn tool_call_without_registry_is_returned_verbatim() {
        let raw = "{\"tool_call\": {\"name\": \"x\", \"parameters\": {}}}";
        let client = Arc::new(ScriptedClient::new(vec![raw]));
        let agent = Agent::new("NoTools", "No tools", "Chat only.", client);

        let reply = agent.respond(&[Message::user("go")]).await.unwrap();
        assert_eq!(reply.content, raw);
        assert_eq!(reply.tool_calls_made, 0);
    }

    #[tokio::test]
    async fn tool_loop_executes_and_resends() {
        use crate::cloudcrew::tool_protocol::{
            ToolMetadata, ToolProtocol, ToolResult,
        };
        use std::error::Error;

        struct CountTool;

        #[async_trait]
        impl ToolProtocol for CountTool {
            async fn execute(
                &self,
                _tool_name: &str,
                _parameters: serde_json::Value,
            ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
                Ok(ToolResult::success(serde_json::json!({ "count": 42 })))
            }

            fn list_tools(&self) -> Vec<ToolMetadata> {
                vec![ToolMetadata::new("count_resources", "Count resources")]
            }

            fn protocol_name(&self) -> &str {
                "mock"
            }
        }

        let client = Arc::new(ScriptedClient::new(vec![
            "{\"tool_call\": {\"name\": \"count_resources\", \"parameters\": {}}}",
            "There are 42 resources.",
        ]));
        let mut registry = ToolRegistry::empty();
        registry.register(Arc::new(CountTool));

        let agent = Agent::new("Counter", "Counts", "Count things.", client)
            .with_tools(Arc::new(registry));

        let reply = agent.respond(&[Message::user("how many?")]).await.unwrap();
        assert_eq!(reply.content, "There are 42 resources.");
        assert_eq!(reply.tool_calls_made, 1);
        // Two LLM round-trips, 15 tokens each.
        assert_eq!(reply.tokens_used.unwrap().total_tokens, 30);
    }

    #[tokio::test]
    async fn tool_loop_stops_at_cap() {
        use crate::cloudcrew::tool_protocol::{
            ToolMetadata, ToolProtocol, ToolResult,
        };
        use std::error::Error;

        struct LoopTool;

        #[async_trait]
        impl ToolProtocol for LoopTool {
            async fn execute(
                &self,
                _tool_name: &str,
                _parameters: serde_json::Value,
            ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
                Ok(ToolResult::success(serde_json::json!("again")))
            }

            fn list_tools(&self) -> Vec<ToolMetadata> {
                vec![ToolMetadata::new("loop", "Loops forever")]
            }

            fn protocol_name(&self) -> &str {
                "mock"
            }
        }

        // Every reply requests another tool call.
        let looping = "{\"tool_call\": {\"name\": \"loop\", \"parameters\": {}}}";
        let client = Arc::new(ScriptedClient::new(vec![looping; 10]));
        let mut registry = ToolRegistry::empty();
        registry.register(Arc::new(LoopTool));

        let agent = Agent::new("Looper", "Loops", "Loop.", client)
            .with_tools(Arc::new(registry))
            .with_max_tool_iterations(2);

        let reply = agent.respond(&[Message::user("go")]).await.unwrap();
        assert_eq!(reply.tool_calls_made, 2);
        assert!(reply.content.contains("Maximum tool iterations reached"));
    }

    #[tokio::test]
    async fn system_instructions_lead_the_message_array() {
        struct CapturingClient {
            seen_roles: Mutex<Vec<Role>>,
        }

        #[async_trait]
        impl ClientWrapper for CapturingClient {
            async fn send_message(&self, messages: &[Message]) -> Result<Message, SendError> {
                let mut seen = self.seen_roles.lock().await;
                *seen = messages.iter().map(|m| m.role.clone()).collect();
                Ok(Message::assistant("ok"))
            }

            fn model_name(&self) -> &str {
                "capturing"
            }
        }

        let client = Arc::new(CapturingClient {
            seen_roles: Mutex::new(Vec::new()),
        });
        let agent = Agent::new("A", "d", "instructions", client.clone());
        agent.respond(&[Message::user("hi")]).await.unwrap();

        let seen = client.seen_roles.lock().await;
        assert_eq!(seen[0], Role::System);
        assert_eq!(seen[1], Role::User);
    }
}
