use prompt_bridge::{
    default_catalog, Event, ExecCtx, FnEventHandler, InMemoryStore, MockBackend, PipelineDraft,
    PipelineEngine, PipelineLibrary, ProviderRegistry, StepDefinition, Variables,
};
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let store = Arc::new(InMemoryStore::with_providers(default_catalog()));

    // Canned adapters stand in for Cohere and Gemini.
    let registry = ProviderRegistry::new(store.clone())
        .register(
            "Cohere",
            Arc::new(MockBackend::fixed(
                "Rust gives you memory safety without a garbage collector.",
            )),
        )
        .register(
            "Google Gemini",
            Arc::new(MockBackend::fixed(
                "Rust vous offre la sûreté mémoire sans ramasse-miettes.",
            )),
        );

    let library = PipelineLibrary::new(store.clone());
    let pipeline = library
        .create_pipeline(
            1,
            PipelineDraft::new(
                "summarize-then-translate",
                vec![
                    StepDefinition::new(1, 6, "Summarize in one sentence: {input}"),
                    StepDefinition::new(2, 3, "Translate to {language}: {previousResponse}"),
                ],
            ),
        )
        .await?;

    let ctx = ExecCtx::builder()
        .event_handler(Arc::new(FnEventHandler(|event: Event| match event {
            Event::StepStart { order, provider_id, .. } => {
                println!("[step {}] calling provider {}", order, provider_id)
            }
            Event::StepEnd {
                order,
                status,
                elapsed_ms,
                ..
            } => println!("[step {}] {:?} in {}ms", order, status, elapsed_ms),
            _ => {}
        })))
        .build()?;
    let engine = PipelineEngine::new(store, registry, ctx);

    let mut vars = Variables::new();
    vars.insert("language".into(), serde_json::json!("French"));

    let result = engine
        .execute(
            1,
            pipeline.id,
            "Rust is a systems programming language focused on safety and performance.",
            &vars,
        )
        .await
        .context("running the mock pipeline")?;

    println!("\n{}", serde_json::to_string_pretty(&result)?);

    engine
        .rate_execution(1, result.execution_id, 5.0, Some("spot on".into()))
        .await?;
    Ok(())
}
