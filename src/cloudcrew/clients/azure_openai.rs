//! `AzureOpenAIClient` implements [`ClientWrapper`] for Azure OpenAI
//! chat-completion deployments, capturing both the assistant reply and the
//! token usage reported by the service.
//!
//! The endpoint speaks the standard OpenAI chat wire format behind an
//! `api-key` header and an `api-version` query parameter, so the client
//! talks to it directly over `reqwest` with `serde`-derived payloads.
//!
//! # Example
//!
//! ```rust,no_run
//! use cloudcrew::clients::azure_openai::AzureOpenAIClient;
//! use cloudcrew::client_wrapper::{ClientWrapper, Message};
//! use cloudcrew::config::AzureSettings;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let settings = AzureSettings::from_env()?;
//! let client = AzureOpenAIClient::new(&settings);
//!
//! let reply = client
//!     .send_message(&[
//!         Message::system("You are terse."),
//!         Message::user("List my storage accounts."),
//!     ])
//!     .await?;
//! println!("{}", reply.text());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use log::error;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::cloudcrew::client_wrapper::{ClientWrapper, Message, Role, SendError, TokenUsage};
use crate::cloudcrew::config::AzureSettings;

#[derive(Serialize)]
struct WireRequest {
    messages: Vec<WireMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireReplyMessage,
}

#[derive(Deserialize)]
struct WireReplyMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

/// Chat-completion client for an Azure OpenAI deployment.
pub struct AzureOpenAIClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
    temperature: f32,
    token_usage: Mutex<Option<TokenUsage>>,
}

impl AzureOpenAIClient {
    /// Build a client from resolved [`AzureSettings`].
    ///
    /// Temperature defaults to 0; the tools and the speaker selector both
    /// want deterministic replies.
    pub fn new(settings: &AzureSettings) -> Self {
        AzureOpenAIClient {
            http: reqwest::Client::new(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            deployment: settings.deployment.clone(),
            api_version: settings.api_version.clone(),
            temperature: 0.0,
            token_usage: Mutex::new(None),
        }
    }

    /// Override the sampling temperature (builder pattern).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    fn to_wire(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|msg| WireMessage {
                role: msg.role.as_str(),
                content: msg.content.to_prompt_text(),
                name: match msg.role {
                    // The wire only accepts `name` on assistant/user turns.
                    Role::System => None,
                    _ => msg.author_name.clone(),
                },
            })
            .collect()
    }
}

#[async_trait]
impl ClientWrapper for AzureOpenAIClient {
    async fn send_message(&self, messages: &[Message]) -> Result<Message, SendError> {
        let request = WireRequest {
            messages: Self::to_wire(messages),
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                error!("AzureOpenAIClient::send_message transport error: {}", err);
                Box::new(err) as SendError
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| Box::new(err) as SendError)?;

        if !status.is_success() {
            error!(
                "AzureOpenAIClient::send_message HTTP {} from deployment {}: {}",
                status, self.deployment, body
            );
            return Err(format!("chat completion failed with HTTP {}: {}", status, body).into());
        }

        let parsed: WireResponse = serde_json::from_str(&body)
            .map_err(|err| format!("malformed chat completion response: {}", err))?;

        if let Some(usage) = parsed.usage {
            let mut slot = self.token_usage.lock().await;
            *slot = Some(TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            });
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(Message::assistant(content))
    }

    fn model_name(&self) -> &str {
        &self.deployment
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}
