//! Process configuration: provider credentials and time limits.
//!
//! Keys are read from the environment under the variable names the
//! adapters declare (see [`CREDENTIAL_VARS`]). With the `yaml` feature a
//! [`BridgeConfig`] can also be loaded from a YAML document.

use crate::error::Result;
#[cfg(feature = "yaml")]
use crate::BridgeError;
#[cfg(feature = "yaml")]
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Environment variables holding provider API keys.
pub const CREDENTIAL_VARS: [&str; 8] = [
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "GEMINI_API_KEY",
    "GROK_API_KEY",
    "OPENROUTER_API_KEY",
    "COHERE_API_KEY",
    "HUGGINGFACE_API_KEY",
    "VERCEL_API_KEY",
];

/// Overrides the per-request HTTP timeout, in seconds.
pub const TIMEOUT_VAR: &str = "PROMPT_BRIDGE_TIMEOUT_SECS";
/// Sets a wall-clock limit for a whole pipeline execution, in seconds.
pub const DEADLINE_VAR: &str = "PROMPT_BRIDGE_DEADLINE_SECS";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// API keys by environment variable name.
#[derive(Clone, Default)]
pub struct Credentials {
    keys: HashMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every variable in [`CREDENTIAL_VARS`] that is set and non-empty.
    pub fn from_env() -> Self {
        let mut creds = Self::new();
        for var in CREDENTIAL_VARS {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    creds.keys.insert(var.to_string(), value);
                }
            }
        }
        creds
    }

    /// Insert a key (builder style).
    pub fn with_key(mut self, var: impl Into<String>, key: impl Into<String>) -> Self {
        self.keys.insert(var.into(), key.into());
        self
    }

    pub fn get(&self, var: &str) -> Option<&str> {
        self.keys.get(var).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.keys.keys().collect();
        names.sort();
        f.debug_struct("Credentials").field("configured", &names).finish()
    }
}

/// Runtime configuration for the HTTP client and executions.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Per-request HTTP timeout. Default: 60 seconds.
    pub request_timeout: Duration,
    /// Optional wall-clock limit for one pipeline execution.
    pub execution_deadline: Option<Duration>,
    pub credentials: Credentials,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            execution_deadline: None,
            credentials: Credentials::new(),
        }
    }
}

impl BridgeConfig {
    /// Credentials and limits from the process environment.
    ///
    /// Unparseable limit values are ignored with a warning.
    pub fn from_env() -> Self {
        Self {
            request_timeout: env_secs(TIMEOUT_VAR).unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            execution_deadline: env_secs(DEADLINE_VAR),
            credentials: Credentials::from_env(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_execution_deadline(mut self, deadline: Duration) -> Self {
        self.execution_deadline = Some(deadline);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Parse a YAML document of the form:
    ///
    /// ```yaml
    /// request_timeout_secs: 30
    /// execution_deadline_secs: 300
    /// credentials:
    ///   COHERE_API_KEY: "..."
    /// ```
    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct RawConfig {
            request_timeout_secs: Option<u64>,
            execution_deadline_secs: Option<u64>,
            #[serde(default)]
            credentials: HashMap<String, String>,
        }

        let raw: RawConfig = serde_yaml::from_str(text)
            .map_err(|e| BridgeError::Configuration(format!("invalid YAML config: {}", e)))?;

        Ok(Self {
            request_timeout: raw
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            execution_deadline: raw.execution_deadline_secs.map(Duration::from_secs),
            credentials: Credentials {
                keys: raw.credentials,
            },
        })
    }

    /// Build the shared HTTP client for this configuration.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()?)
    }
}

fn env_secs(var: &str) -> Option<Duration> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            tracing::warn!(var, value = %raw, "ignoring non-numeric duration");
            None
        }
    }
}
