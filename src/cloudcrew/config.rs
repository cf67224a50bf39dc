//! Configuration for cloudcrew.
//!
//! Everything comes from environment variables read once at process start.
//! There is deliberately no config-file parsing here; the settings are three
//! endpoint strings and a token.
//!
//! | Variable | Meaning | Required |
//! |----------|---------|----------|
//! | `AZURE_OAI_ENDPOINT` | Base URL of the Azure OpenAI resource | yes |
//! | `AZURE_OAI_API_KEY` | API key for the chat-completion deployment | yes |
//! | `AZURE_OAI_DEPLOYMENT` | Deployment (model) identifier | yes |
//! | `AZURE_OAI_API_VERSION` | Chat API version | no (defaults) |
//! | `AZURE_ARM_TOKEN` | Bearer token for the Resource Manager API | no |
//!
//! A missing required variable is a fatal configuration error: the process
//! should report it and exit rather than limp along without credentials.

use std::env;
use std::error::Error;
use std::fmt;

/// Default chat-completions API version sent to the endpoint.
pub const DEFAULT_API_VERSION: &str = "2024-06-01";

/// Fatal configuration problems detected at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable was absent or empty.
    MissingVar(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar(name) => {
                write!(f, "required environment variable {} is not set", name)
            }
        }
    }
}

impl Error for ConfigError {}

/// Connection settings for the chat-completion service and the Resource
/// Manager API, resolved once at startup and passed around by reference.
#[derive(Debug, Clone)]
pub struct AzureSettings {
    /// Base URL of the Azure OpenAI resource (no trailing slash).
    pub endpoint: String,
    /// API key for the chat-completion deployment.
    pub api_key: String,
    /// Deployment/model identifier.
    pub deployment: String,
    /// Chat API version appended to every request.
    pub api_version: String,
    /// Optional bearer token for Resource Manager calls. Tools that talk to
    /// the management plane fail their invocations when this is absent; the
    /// rest of the app works without it.
    pub arm_token: Option<String>,
}

impl AzureSettings {
    /// Resolve settings from the process environment.
    ///
    /// Returns a [`ConfigError`] naming the first missing required variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve settings through an arbitrary lookup function.
    ///
    /// This is what [`from_env`](AzureSettings::from_env) delegates to; tests
    /// use it directly so they do not have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String, ConfigError> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(ConfigError::MissingVar(name.to_string())),
            }
        };

        let endpoint = required("AZURE_OAI_ENDPOINT")?;
        let api_key = required("AZURE_OAI_API_KEY")?;
        let deployment = required("AZURE_OAI_DEPLOYMENT")?;
        let api_version =
            lookup("AZURE_OAI_API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let arm_token = lookup("AZURE_ARM_TOKEN").filter(|t| !t.trim().is_empty());

        Ok(AzureSettings {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            deployment,
            api_version,
            arm_token,
        })
    }
}
