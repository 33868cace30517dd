//! Runs a two-step pipeline against the real providers.
//!
//! Needs `COHERE_API_KEY` and `GEMINI_API_KEY` in the environment.
//! `PROMPT_BRIDGE_DEADLINE_SECS` bounds the whole run; Ctrl-C cancels it.

use prompt_bridge::{
    default_catalog, BridgeConfig, ExecCtx, InMemoryStore, PipelineDraft, PipelineEngine,
    PipelineLibrary, ProviderRegistry, StepDefinition, Variables,
};
use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prompt_bridge=debug")),
        )
        .init();

    let config = BridgeConfig::from_env();
    println!("credentials: {:?}", config.credentials);

    let store = Arc::new(InMemoryStore::with_providers(default_catalog()));
    let registry = ProviderRegistry::with_default_adapters(store.clone());
    for provider in registry.active_providers().await? {
        println!("active: {} ({})", provider.name, provider.base_url);
    }

    let pipeline = PipelineLibrary::new(store.clone())
        .create_pipeline(
            1,
            PipelineDraft::new(
                "explain-then-critique",
                vec![
                    StepDefinition::new(1, 6, "Explain briefly: {input}"),
                    StepDefinition::new(
                        2,
                        3,
                        "Point out one weakness in this explanation:\n\n{previousResponse}",
                    ),
                ],
            ),
        )
        .await?;

    let token = CancellationToken::new();
    let ctx = ExecCtx::from_config(config)
        .cancellation(token.clone())
        .build()
        .context("building the HTTP client")?;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let engine = PipelineEngine::new(store, registry, ctx);
    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "How does Rust's borrow checker prevent data races?".to_string());

    let result = engine
        .execute(1, pipeline.id, &prompt, &Variables::new())
        .await
        .with_context(|| format!("running pipeline {}", pipeline.id))?;

    for step in &result.step_results {
        println!(
            "\n--- step {} ({}) {:?}, {}ms, score {:?}",
            step.order, step.ai_provider_name, step.status, step.execution_time_ms, step.performance_score
        );
        if let Some(ref response) = step.response {
            println!("{}", response);
        }
    }
    if let Some(err) = result.error_message {
        println!("\nfailed: {}", err);
    }
    Ok(())
}
