//! Tool Protocol Abstraction Layer
//!
//! Connects agents to the actions they can take. A [`ToolProtocol`] executes
//! one or more named tools; a [`ToolRegistry`] aggregates protocols and
//! routes calls by tool name. The registry also renders the prompt block
//! that teaches a model which tools exist and how to request one.
//!
//! # Architecture
//!
//! ```text
//! Agent → ToolRegistry → ToolProtocol (trait) → [ARM query | ARM tagging | user-defined]
//! ```
//!
//! Models request a tool by emitting a JSON fragment in their reply:
//!
//! ```text
//! {"tool_call": {"name": "resource_graph_query", "parameters": {"query": "..."}}}
//! ```
//!
//! [`parse_tool_call`] scans a reply for that fragment; agents and the
//! planner both use it to decide whether a turn was prose or an action.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::cloudcrew::client_wrapper::ToolCallRequest;

/// Represents the result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool execution was successful.
    pub success: bool,
    /// The output data from the tool.
    pub output: serde_json::Value,
    /// Optional error message if execution failed.
    pub error: Option<String>,
}

impl ToolResult {
    /// Convenience constructor for successful tool execution.
    pub fn success(output: serde_json::Value) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    /// Convenience constructor for failed tool execution.
    pub fn failure(error: String) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error),
        }
    }
}

/// Defines the type of a tool parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ToolParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

/// Defines a parameter for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ToolParameterType,
    pub description: Option<String>,
    pub required: bool,
}

impl ToolParameter {
    /// Define a new tool parameter with the provided name and type.
    pub fn new(name: impl Into<String>, param_type: ToolParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: None,
            required: false,
        }
    }

    /// Add a human readable description that will surface in tool prompts.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the argument as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Metadata about a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolMetadata {
    /// Create metadata with the supplied identifier and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter definition to the tool metadata.
    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }
}

/// Error types for tool operations.
#[derive(Debug, Clone)]
pub enum ToolError {
    /// Requested tool is not registered in the current registry.
    NotFound(String),
    /// The provided JSON parameters failed validation.
    InvalidParameters(String),
    /// The remote API rejected or failed the call.
    Remote(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::NotFound(name) => write!(f, "tool not found: {}", name),
            ToolError::InvalidParameters(msg) => write!(f, "invalid parameters: {}", msg),
            ToolError::Remote(msg) => write!(f, "remote call failed: {}", msg),
        }
    }
}

impl Error for ToolError {}

/// Trait for implementing tool execution protocols.
#[async_trait]
pub trait ToolProtocol: Send + Sync {
    /// Execute a tool with the given parameters.
    async fn execute(
        &self,
        tool_name: &str,
        parameters: serde_json::Value,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>>;

    /// Get metadata about the tools this protocol provides.
    fn list_tools(&self) -> Vec<ToolMetadata>;

    /// Protocol identifier (e.g. "arm", "custom").
    fn protocol_name(&self) -> &str;
}

/// Registry routing tool calls to the protocol that owns each tool.
#[derive(Default)]
pub struct ToolRegistry {
    protocols: HashMap<String, Arc<dyn ToolProtocol>>,
    metadata: Vec<ToolMetadata>,
}

impl ToolRegistry {
    /// Build an empty registry.
    pub fn empty() -> Self {
        Self {
            protocols: HashMap::new(),
            metadata: Vec::new(),
        }
    }

    /// Register every tool a protocol provides.
    ///
    /// Later registrations win on name collisions, mirroring how plugin
    /// imports shadow earlier ones.
    pub fn register(&mut self, protocol: Arc<dyn ToolProtocol>) {
        for meta in protocol.list_tools() {
            self.metadata.retain(|m| m.name != meta.name);
            self.protocols.insert(meta.name.clone(), protocol.clone());
            self.metadata.push(meta);
        }
    }

    /// True when no tools have been registered.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// List metadata for registered tools, in registration order.
    pub fn list_tools(&self) -> &[ToolMetadata] {
        &self.metadata
    }

    /// Execute a named tool with serialized parameters.
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: serde_json::Value,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        let protocol = self
            .protocols
            .get(tool_name)
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;
        protocol.execute(tool_name, parameters).await
    }

    /// Render the prompt block that declares the registered tools and the
    /// `{"tool_call": ...}` convention for requesting one.
    ///
    /// Returns an empty string when no tools are registered so callers can
    /// append it unconditionally.
    pub fn tool_documentation(&self) -> String {
        if self.metadata.is_empty() {
            return String::new();
        }

        let mut doc = String::from("\n\nYou have access to the following tools:\n");
        for meta in &self.metadata {
            doc.push_str(&format!("- {}: {}\n", meta.name, meta.description));
            if !meta.parameters.is_empty() {
                doc.push_str("  Parameters:\n");
                for param in &meta.parameters {
                    doc.push_str(&format!(
                        "    - {} ({:?}{}): {}\n",
                        param.name,
                        param.param_type,
                        if param.required { ", required" } else { "" },
                        param.description.as_deref().unwrap_or("No description")
                    ));
                }
            }
        }
        doc.push_str(
            "\nTo use a tool, respond with a JSON object in the following format:\n\
             {\"tool_call\": {\"name\": \"tool_name\", \"parameters\": {...}}}\n\
             After tool execution, the result will be provided and you can continue.\n",
        );
        doc
    }
}

#[derive(Deserialize)]
struct ToolCallEnvelope {
    tool_call: ToolCallRequest,
}

/// Scan a model reply for a `{"tool_call": ...}` fragment.
///
/// Uses brace counting from the first occurrence of the marker so that the
/// fragment can sit anywhere inside surrounding prose. Returns `None` when
/// no fragment is found or the fragment does not deserialize.
pub fn parse_tool_call(response: &str) -> Option<ToolCallRequest> {
    let start = response.find("{\"tool_call\"")?;

    let mut depth = 0usize;
    let mut end = None;
    for (offset, ch) in response[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    end = Some(start + offset + ch.len_utf8());
                    break;
                }
            }
            _ => {}
        }
    }

    let fragment = &response[start..end?];
    serde_json::from_str::<ToolCallEnvelope>(fragment)
        .ok()
        .map(|envelope| envelope.tool_call)
}
