//! Resource Graph query tool.
//!
//! Exposes a single tool, `resource_graph_query`, that runs a caller-supplied
//! Kusto query through [`ArmClient::resource_graph_query`] and returns the
//! service's JSON rows verbatim so the agent can reason over them.

use async_trait::async_trait;
use serde_json::json;
use std::error::Error;
use std::sync::Arc;

use crate::cloudcrew::tool_protocol::{
    ToolError, ToolMetadata, ToolParameter, ToolParameterType, ToolProtocol, ToolResult,
};
use crate::cloudcrew::tools::arm::ArmClient;

pub const RESOURCE_GRAPH_QUERY_TOOL: &str = "resource_graph_query";

/// Tool protocol wrapping Resource Graph queries.
pub struct ResourceGraphQueryTool {
    arm: Arc<ArmClient>,
}

impl ResourceGraphQueryTool {
    pub fn new(arm: Arc<ArmClient>) -> Self {
        Self { arm }
    }
}

#[async_trait]
impl ToolProtocol for ResourceGraphQueryTool {
    async fn execute(
        &self,
        tool_name: &str,
        parameters: serde_json::Value,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        if tool_name != RESOURCE_GRAPH_QUERY_TOOL {
            return Err(Box::new(ToolError::NotFound(tool_name.to_string())));
        }

        let query = parameters
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ToolError::InvalidParameters("missing required string parameter: query".to_string())
            })?;

        match self.arm.resource_graph_query(query).await {
            Ok(rows) => {
                // Keep the payload as structured JSON when the service sent
                // valid JSON, otherwise pass the body through as a string.
                let output = serde_json::from_str(&rows)
                    .unwrap_or_else(|_| json!({ "raw": rows }));
                Ok(ToolResult::success(output))
            }
            Err(err) => Ok(ToolResult::failure(err.to_string())),
        }
    }

    fn list_tools(&self) -> Vec<ToolMetadata> {
        vec![ToolMetadata::new(
            RESOURCE_GRAPH_QUERY_TOOL,
            "Execute the provided resource graph query from user",
        )
        .with_parameter(
            ToolParameter::new("query", ToolParameterType::String)
                .with_description("Resource graph query")
                .required(),
        )]
    }

    fn protocol_name(&self) -> &str {
        "arm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_declares_required_query_parameter() {
        let tool = ResourceGraphQueryTool::new(Arc::new(ArmClient::new("token".to_string())));
        let tools = tool.list_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, RESOURCE_GRAPH_QUERY_TOOL);
        assert_eq!(tools[0].parameters[0].name, "query");
        assert!(tools[0].parameters[0].required);
    }

    #[tokio::test]
    async fn missing_query_parameter_is_rejected() {
        let tool = ResourceGraphQueryTool::new(Arc::new(ArmClient::new("token".to_string())));
        let err = tool
            .execute(RESOURCE_GRAPH_QUERY_TOOL, json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("query"));
    }

    #[tokio::test]
    async fn wrong_tool_name_is_not_found() {
        let tool = ResourceGraphQueryTool::new(Arc::new(ArmClient::new("token".to_string())));
        let err = tool.execute("other", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
