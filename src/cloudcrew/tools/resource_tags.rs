//! Resource tagging tool.
//!
//! Exposes `add_resource_tag`, which merges a key/value tag onto a resource
//! through [`ArmClient::add_tag`].

use async_trait::async_trait;
use serde_json::json;
use std::error::Error;
use std::sync::Arc;

use crate::cloudcrew::tool_protocol::{
    ToolError, ToolMetadata, ToolParameter, ToolParameterType, ToolProtocol, ToolResult,
};
use crate::cloudcrew::tools::arm::ArmClient;

pub const ADD_RESOURCE_TAG_TOOL: &str = "add_resource_tag";

/// Tool protocol wrapping tag updates on ARM resources.
pub struct ResourceTagTool {
    arm: Arc<ArmClient>,
}

impl ResourceTagTool {
    pub fn new(arm: Arc<ArmClient>) -> Self {
        Self { arm }
    }

    fn required_str<'a>(
        parameters: &'a serde_json::Value,
        name: &str,
    ) -> Result<&'a str, ToolError> {
        parameters.get(name).and_then(|v| v.as_str()).ok_or_else(|| {
            ToolError::InvalidParameters(format!("missing required string parameter: {}", name))
        })
    }
}

#[async_trait]
impl ToolProtocol for ResourceTagTool {
    async fn execute(
        &self,
        tool_name: &str,
        parameters: serde_json::Value,
    ) -> Result<ToolResult, Box<dyn Error + Send + Sync>> {
        if tool_name != ADD_RESOURCE_TAG_TOOL {
            return Err(Box::new(ToolError::NotFound(tool_name.to_string())));
        }

        let resource_id = Self::required_str(&parameters, "resource_id")?;
        let key = Self::required_str(&parameters, "key")?;
        let value = Self::required_str(&parameters, "value")?;

        match self.arm.add_tag(resource_id, key, value).await {
            Ok(()) => Ok(ToolResult::success(json!({
                "resource_id": resource_id,
                "tag": { key: value },
                "status": "applied"
            }))),
            Err(err) => Ok(ToolResult::failure(err.to_string())),
        }
    }

    fn list_tools(&self) -> Vec<ToolMetadata> {
        vec![ToolMetadata::new(
            ADD_RESOURCE_TAG_TOOL,
            "Add tag to an azure resource based on resourceid and provided key and value",
        )
        .with_parameter(
            ToolParameter::new("resource_id", ToolParameterType::String)
                .with_description("ResourceId of the azure resource")
                .required(),
        )
        .with_parameter(
            ToolParameter::new("key", ToolParameterType::String)
                .with_description("key for the tag")
                .required(),
        )
        .with_parameter(
            ToolParameter::new("value", ToolParameterType::String)
                .with_description("value for the tag")
                .required(),
        )]
    }

    fn protocol_name(&self) -> &str {
        "arm"
    }
}
