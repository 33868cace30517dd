//! Execution context shared across provider calls.
//!
//! [`ExecCtx`] carries the HTTP client, provider credentials, cancellation
//! token, execution deadline, and optional event handler. Build it once and
//! hand it to the engine; per-run variations (a fresh cancellation token, a
//! tighter deadline) are cheap clones.

use crate::config::{BridgeConfig, Credentials};
use crate::error::Result;
use crate::events::EventHandler;
use crate::BridgeError;
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Shared execution context for provider calls.
///
/// # Example
///
/// ```
/// use prompt_bridge::ExecCtx;
/// use std::time::Duration;
///
/// let ctx = ExecCtx::builder()
///     .credential("COHERE_API_KEY", "co-...")
///     .execution_deadline(Duration::from_secs(120))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExecCtx {
    /// HTTP client (cheap to clone; uses `Arc` internally). Carries no
    /// provider-specific default headers.
    pub client: Client,
    pub credentials: Arc<Credentials>,
    /// Cancels in-flight provider calls and prevents further steps.
    pub cancellation: Option<CancellationToken>,
    /// Wall-clock limit for one execution, armed by [`arm_deadline`](Self::arm_deadline).
    pub execution_deadline: Option<Duration>,
    /// Optional event handler for lifecycle events.
    pub event_handler: Option<Arc<dyn EventHandler>>,
    deadline_at: Option<Instant>,
}

impl ExecCtx {
    /// Create a new builder.
    pub fn builder() -> ExecCtxBuilder {
        ExecCtxBuilder {
            client: None,
            config: BridgeConfig::default(),
            cancellation: None,
            event_handler: None,
        }
    }

    /// Builder seeded from a [`BridgeConfig`].
    pub fn from_config(config: BridgeConfig) -> ExecCtxBuilder {
        ExecCtxBuilder {
            config,
            ..Self::builder()
        }
    }

    /// A copy of this context using `token` for cancellation.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        let mut ctx = self.clone();
        ctx.cancellation = Some(token);
        ctx
    }

    /// A copy of this context whose deadline clock starts now.
    ///
    /// Without a configured execution deadline this is a plain clone.
    pub fn arm_deadline(&self) -> Self {
        let mut ctx = self.clone();
        ctx.deadline_at = self.execution_deadline.map(|d| Instant::now() + d);
        ctx
    }

    /// The instant the current execution must finish by, if armed.
    pub fn deadline_at(&self) -> Option<Instant> {
        self.deadline_at
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|c| c.is_cancelled())
    }

    /// Return an error if cancellation has been requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }
        Ok(())
    }

    /// Run `fut` unless cancellation or the armed deadline wins first.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check_cancelled()?;
        if self.deadline_at.is_some_and(|at| at <= Instant::now()) {
            return Err(BridgeError::DeadlineExceeded);
        }

        let cancelled = async {
            match &self.cancellation {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match self.deadline_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            result = fut => result,
            _ = cancelled => Err(BridgeError::Cancelled),
            _ = expired => Err(BridgeError::DeadlineExceeded),
        }
    }
}

impl std::fmt::Debug for ExecCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecCtx")
            .field("credentials", &self.credentials)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("execution_deadline", &self.execution_deadline)
            .field("deadline_armed", &self.deadline_at.is_some())
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

/// Builder for [`ExecCtx`].
pub struct ExecCtxBuilder {
    client: Option<Client>,
    config: BridgeConfig,
    cancellation: Option<CancellationToken>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl ExecCtxBuilder {
    /// Set the HTTP client. If not set, one is built with the configured timeout.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Replace all credentials.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = credentials;
        self
    }

    /// Insert a single API key under its environment variable name.
    pub fn credential(mut self, var: impl Into<String>, key: impl Into<String>) -> Self {
        self.config.credentials = self.config.credentials.with_key(var, key);
        self
    }

    /// Set the per-request timeout. Default: 60 seconds.
    ///
    /// Ignored when a custom `Client` is provided via `.client()`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Limit each pipeline execution to `deadline` of wall-clock time.
    pub fn execution_deadline(mut self, deadline: Duration) -> Self {
        self.config.execution_deadline = Some(deadline);
        self
    }

    /// Set the cancellation token.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set the event handler.
    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Build the execution context.
    pub fn build(self) -> Result<ExecCtx> {
        let client = match self.client {
            Some(client) => client,
            None => self.config.http_client()?,
        };
        Ok(ExecCtx {
            client,
            credentials: Arc::new(self.config.credentials),
            cancellation: self.cancellation,
            execution_deadline: self.config.execution_deadline,
            event_handler: self.event_handler,
            deadline_at: None,
        })
    }
}
