//! # CloudCrew
//!
//! CloudCrew is a Rust toolkit for running a small crew of LLM agents
//! against the Azure management plane. Peer agents share one conversation;
//! a classifier picks who speaks each turn, tools carry out Resource Graph
//! queries and tagging operations, and a termination protocol decides when
//! the goal is achieved.
//!
//! The crate provides layered abstractions for:
//!
//! * **Agents with Tools**: [`Agent`] participants that connect to a chat
//!   deployment and execute actions through a [`tool_protocol::ToolRegistry`]
//! * **Group Chat**: [`GroupChatSession`] coordinating multiple agents over a
//!   shared transcript, with LLM-driven speaker [`selection`] and a sentinel
//!   based [`termination`] protocol
//! * **Stateful Conversations**: [`ChatSession`] for a single agent with
//!   rolling history and token accounting
//! * **Stepwise Planning**: [`planner::StepwisePlanner`] for iterative
//!   goal-directed tool execution
//! * **Azure Plumbing**: [`clients::AzureOpenAIClient`] for chat completions
//!   and [`tools::ArmClient`] for the Resource Manager API
//!
//! ## Core Concepts
//!
//! ### The Stock Crew
//!
//! [`crew::build_group_chat`] assembles the three-agent resource-management
//! crew: a `RequestCoordinator` that owns the conversation and declares the
//! goal achieved, a `QueryExecutor` with Resource Graph access, and a
//! `ResourceTagger` that applies tags.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cloudcrew::clients::AzureOpenAIClient;
//! use cloudcrew::config::AzureSettings;
//! use cloudcrew::crew;
//! use cloudcrew::tools::ArmClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     cloudcrew::init_logger();
//!
//!     let settings = AzureSettings::from_env()?;
//!     let client = Arc::new(AzureOpenAIClient::new(&settings));
//!     let arm = Arc::new(ArmClient::new(
//!         settings.arm_token.clone().unwrap_or_default(),
//!     ));
//!
//!     let mut chat = crew::build_group_chat(client, arm);
//!     let outcome = chat.run("Tag my storage accounts with env=prod").await?;
//!     for message in &outcome.transcript {
//!         println!("# {} - {}: '{}'",
//!             message.role,
//!             message.author_name.as_deref().unwrap_or("*"),
//!             message.text());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Single-Agent Sessions
//!
//! For plain conversations, wrap one agent in a [`ChatSession`]; it keeps a
//! rolling history trimmed to a token budget and accumulates usage totals.
//!
//! Continue exploring the modules re-exported from the crate root for the
//! richer interaction patterns.

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Applications opt in to `RUST_LOG` driven diagnostics without committing
/// to a specific logging backend anywhere else in the crate.
///
/// ```rust
/// cloudcrew::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `cloudcrew` module.
pub mod cloudcrew;

// Re-exporting key items for easier external access.
pub use cloudcrew::agent::{self, Agent, AgentReply};
pub use cloudcrew::chat_session::{self, ChatSession};
pub use cloudcrew::client_wrapper;
pub use cloudcrew::client_wrapper::{
    ClientWrapper, Message, MessageContent, Role, SendError, TokenUsage, ToolCallRequest,
};
pub use cloudcrew::clients;
pub use cloudcrew::config;
pub use cloudcrew::config::AzureSettings;
pub use cloudcrew::crew;
pub use cloudcrew::group_chat;
pub use cloudcrew::group_chat::{CompletionReason, GroupChatOutcome, GroupChatSession};
pub use cloudcrew::json_translator;
pub use cloudcrew::planner;
pub use cloudcrew::planner::{PlannerOptions, PlannerOutcome, StepwisePlanner};
pub use cloudcrew::selection;
pub use cloudcrew::selection::{SpeakerChoice, SpeakerSelector};
pub use cloudcrew::termination;
pub use cloudcrew::termination::{SessionState, TerminationChecker, TerminationReason};
pub use cloudcrew::tool_protocol;
pub use cloudcrew::tools;
