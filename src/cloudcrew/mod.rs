// src/cloudcrew/mod.rs

pub mod agent;
pub mod chat_session;
pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod crew;
pub mod group_chat;
pub mod json_translator;
pub mod planner;
pub mod selection;
pub mod termination;
pub mod tool_protocol;
pub mod tools;

// Explicitly export the session types so callers reach them as
// cloudcrew::GroupChatSession rather than cloudcrew::group_chat::GroupChatSession.
pub use chat_session::ChatSession;
pub use group_chat::GroupChatSession;
