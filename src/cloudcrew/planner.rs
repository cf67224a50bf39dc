//! Stepwise planner.
//!
//! Drives a single model toward a goal through iterative think/act cycles.
//! Each iteration the model either requests a tool via the
//! `{"tool_call": ...}` convention or produces a line starting with
//! `FINAL ANSWER:`, which ends the plan. A hard iteration cap bounds the
//! loop for goals the model cannot close out.

use log::{info, warn};
use std::sync::Arc;

use crate::cloudcrew::client_wrapper::{ClientWrapper, Message, SendError, TokenUsage};
use crate::cloudcrew::tool_protocol::{parse_tool_call, ToolRegistry};

const FINAL_ANSWER_MARKER: &str = "FINAL ANSWER:";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a stepwise planner. Work toward the stated goal one \
action at a time. When you need information or need to act, request exactly one tool call. When \
the goal is complete, reply with a line starting with 'FINAL ANSWER:' followed by the answer.";

/// Tunables for a planner run.
pub struct PlannerOptions {
    /// Maximum think/act iterations before the run is cut off.
    pub max_iterations: usize,
    /// System prompt framing the planning behavior.
    pub system_prompt: String,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// The result of a planner run.
#[derive(Debug)]
pub struct PlannerOutcome {
    /// The text after `FINAL ANSWER:`, or the last reply when the cap hit.
    pub final_answer: String,
    /// Iterations actually executed.
    pub iterations: usize,
    /// True when the run stopped because of the iteration cap.
    pub cap_reached: bool,
    /// Every message exchanged during the run.
    pub transcript: Vec<Message>,
    /// Aggregated token usage, when the client reports any.
    pub tokens_used: Option<TokenUsage>,
}

/// Iterative goal-directed executor over a tool registry.
pub struct StepwisePlanner {
    client: Arc<dyn ClientWrapper>,
    tools: Arc<ToolRegistry>,
    options: PlannerOptions,
}

impl StepwisePlanner {
    pub fn new(client: Arc<dyn ClientWrapper>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            client,
            tools,
            options: PlannerOptions::default(),
        }
    }

    /// Override the default options (builder pattern).
    pub fn with_options(mut self, options: PlannerOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the plan loop for `goal` until a final answer or the cap.
    pub async fn execute(&self, goal: &str) -> Result<PlannerOutcome, SendError> {
        let mut system = self.options.system_prompt.clone();
        system.push_str(&self.tools.tool_documentation());

        let mut messages = vec![
            Message::system(system),
            Message::user(format!("Goal: {}", goal)),
        ];

        let mut total_usage: Option<TokenUsage> = None;
        let mut iterations = 0;

        loop {
            iterations += 1;
            let reply = self.client.send_message(&messages).await?;
            if let Some(usage) = self.client.get_last_usage().await {
                let slot = total_usage.get_or_insert(TokenUsage::default());
                slot.input_tokens += usage.input_tokens;
                slot.output_tokens += usage.output_tokens;
                slot.total_tokens += usage.total_tokens;
            }
            let text = reply.text().to_string();

            if let Some(idx) = text.find(FINAL_ANSWER_MARKER) {
                let answer = text[idx + FINAL_ANSWER_MARKER.len()..].trim().to_string();
                info!("planner finished after {} iterations", iterations);
                messages.push(Message::assistant(text.clone()));
                return Ok(PlannerOutcome {
                    final_answer: answer,
                    iterations,
                    cap_reached: false,
                    transcript: messages,
                    tokens_used: total_usage,
                });
            }

            if let Some(call) = parse_tool_call(&text) {
                info!("planner iteration {}: tool {}", iterations, call.name);
                let result_message =
                    match self.tools.execute_tool(&call.name, call.parameters.clone()).await {
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
                messages.push(Message::tool_calls_from("planner", vec![call]));
                messages.push(Message::user(result_message));
            } else {
                // Neither a final answer nor a tool call; nudge the model
                // back onto the protocol.
                messages.push(Message::assistant(text));
                messages.push(Message::user(format!(
                    "Continue toward the goal. Request a tool call, or reply with '{}' when done.",
                    FINAL_ANSWER_MARKER
                )));
            }

            if iterations >= self.options.max_iterations {
                warn!("planner hit iteration cap at {}", iterations);
                let last = messages
                    .iter()
                    .rev()
                    .find(|m| matches!(m.role, crate::cloudcrew::client_wrapper::Role::Assistant))
                    .map(|m| m.content.to_prompt_text())
                    .unwrap_or_default();
                return Ok(PlannerOutcome {
                    final_answer: last,
                    iterations,
                    cap_reached: true,
                    transcript: messages,
                    tokens_used: total_usage,
                });
            }
        }
    }
}
