//! # Azure Resource Manager Client
//!
//! Thin HTTP wrapper over the two management-plane operations the tools
//! need: running a Resource Graph query and merging a tag onto a resource.
//!
//! Authentication is a pre-acquired bearer token. The client does not run a
//! credential flow of its own; acquiring and refreshing the token is the
//! operator's problem (an `az account get-access-token` before launch is
//! enough for a demo session).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cloudcrew::tools::ArmClient;
//!
//! let arm = ArmClient::new("eyJ0eXAiOiJKV1Qi...".to_string());
//! let rows = arm
//!     .resource_graph_query("Resources | where type =~ 'microsoft.storage/storageaccounts' | project name, id")
//!     .await?;
//! println!("{}", rows);
//! ```

use log::{error, info};
use serde_json::json;

use crate::cloudcrew::tool_protocol::ToolError;

const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
const RESOURCE_GRAPH_API_VERSION: &str = "2022-10-01";
const TAGS_API_VERSION: &str = "2022-09-01";

/// HTTP client for the Azure Resource Manager REST API.
pub struct ArmClient {
    http: reqwest::Client,
    management_endpoint: String,
    bearer_token: String,
}

impl ArmClient {
    /// Build a client against the public management endpoint.
    pub fn new(bearer_token: String) -> Self {
        ArmClient {
            http: reqwest::Client::new(),
            management_endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            bearer_token,
        }
    }

    /// Point the client at a different management endpoint, e.g. a sovereign
    /// cloud or a local test server.
    pub fn with_management_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.management_endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Run a Resource Graph query across the tenant and return the raw JSON
    /// response body as a string.
    pub async fn resource_graph_query(&self, query: &str) -> Result<String, ToolError> {
        info!("resource graph query: {}", query);

        let url = format!(
            "{}/providers/Microsoft.ResourceGraph/resources?api-version={}",
            self.management_endpoint, RESOURCE_GRAPH_API_VERSION
        );
        let body = json!({ "query": query });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| ToolError::Remote(format!("resource graph request failed: {}", err)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| ToolError::Remote(format!("resource graph response unreadable: {}", err)))?;

        if !status.is_success() {
            error!("resource graph query returned HTTP {}: {}", status, text);
            return Err(ToolError::Remote(format!(
                "resource graph query returned HTTP {}: {}",
                status, text
            )));
        }

        Ok(text)
    }

    /// Merge a single tag onto the resource identified by `resource_id`.
    ///
    /// Uses the tags sub-resource with a `Merge` operation so existing tags
    /// on the resource survive.
    pub async fn add_tag(
        &self,
        resource_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ToolError> {
        info!("tagging {} with {}={}", resource_id, key, value);

        let url = format!(
            "{}{}/providers/Microsoft.Resources/tags/default?api-version={}",
            self.management_endpoint,
            resource_id,
            TAGS_API_VERSION
        );
        let body = json!({
            "operation": "Merge",
            "properties": { "tags": { key: value } }
        });

        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.bearer_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| ToolError::Remote(format!("tag request failed: {}", err)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("tagging {} returned HTTP {}: {}", resource_id, status, text);
            return Err(ToolError::Remote(format!(
                "tag update returned HTTP {}: {}",
                status, text
            )));
        }

        Ok(())
    }
}
