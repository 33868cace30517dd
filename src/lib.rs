//! # Prompt Bridge
//!
//! Multi-provider prompt pipelines: chain calls to several external
//! text-generation services, each step feeding its response into the next.
//!
//! A pipeline is an ordered list of steps. Each step names a provider and a
//! prompt template; the engine renders the template, sends it through the
//! provider's adapter, records the outcome, and hands the response to the
//! next step. The first failure stops the run.
//!
//! ## Core Concepts
//!
//! - **[`PipelineEngine`]**: loads a stored pipeline, drives its steps in
//!   order, and persists per-step and per-execution state.
//! - **[`ProviderRegistry`]**: resolves provider ids to adapters, rejects
//!   unknown or inactive providers, audits every call.
//! - **[`Backend`]**: one adapter per provider wire protocol (OpenAI-style
//!   chat completions, Anthropic, Gemini, Cohere, Hugging Face).
//! - **[`prompt::render`]**: pure template substitution
//!   (`{input}`, `{previousResponse}`, `{variable}`).
//! - **[`scoring::score`]**: 1-5 heuristic from latency and length.
//! - **[`Store`]**: storage interface; [`InMemoryStore`] for tests and demos.
//! - **[`ExecCtx`]**: HTTP client, credentials, cancellation, deadline and
//!   event handler shared by every provider call.
//!
//! ## Quick Start
//!
//! ```no_run
//! use prompt_bridge::{
//!     default_catalog, ExecCtx, InMemoryStore, PipelineDraft, PipelineEngine, PipelineLibrary,
//!     ProviderRegistry, StepDefinition, Variables,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryStore::with_providers(default_catalog()));
//!     let library = PipelineLibrary::new(store.clone());
//!     let pipeline = library
//!         .create_pipeline(
//!             1,
//!             PipelineDraft::new(
//!                 "summarize-then-translate",
//!                 vec![
//!                     StepDefinition::new(1, 6, "Summarize: {input}"),
//!                     StepDefinition::new(2, 3, "Translate to French: {previousResponse}"),
//!                 ],
//!             ),
//!         )
//!         .await?;
//!
//!     let ctx = ExecCtx::from_config(prompt_bridge::BridgeConfig::from_env()).build()?;
//!     let registry = ProviderRegistry::with_default_adapters(store.clone());
//!     let engine = PipelineEngine::new(store, registry, ctx);
//!
//!     let result = engine
//!         .execute(1, pipeline.id, "Rust is a systems language...", &Variables::new())
//!         .await?;
//!     println!("{:?}: {:?}", result.status, result.final_response);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod exec_ctx;
pub mod library;
pub mod pipeline;
pub mod prompt;
pub mod registry;
pub mod scoring;
pub mod step;
pub mod store;
pub mod types;

pub use backend::{Backend, LlmRequest, LlmResponse, MockBackend, MockReply};
pub use config::{BridgeConfig, Credentials};
pub use error::{BridgeError, Result};
pub use events::{Event, EventHandler, FnEventHandler};
pub use exec_ctx::{ExecCtx, ExecCtxBuilder};
pub use library::{PipelineDraft, PipelineLibrary, PipelineView};
pub use pipeline::PipelineEngine;
pub use registry::{default_catalog, ProviderRegistry};
pub use step::{StepCondition, StepDefinition, StepKind};
pub use store::{InMemoryStore, Store, StoreError};
pub use types::{
    CallStatus, ExecutionResult, ExecutionStatus, Pipeline, PipelineExecution, ProviderCall,
    ProviderRecord, StepReport, StepResult, StepStatus, Variables,
};
