use crate::{
    error::Result,
    events::{emit, Event},
    exec_ctx::ExecCtx,
    prompt,
    registry::ProviderRegistry,
    scoring,
    step::{self, StepDefinition},
    store::Store,
    types::{
        ExecutionResult, ExecutionStatus, PipelineExecution, StepReport, StepResult, StepStatus,
        Variables,
    },
    BridgeError,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Executes stored pipelines against the provider registry.
///
/// Steps of one execution run strictly one after another, each receiving
/// the previous step's response. Distinct executions may run concurrently
/// on the same engine; they share the HTTP client and the store.
///
/// # Example
///
/// ```no_run
/// use prompt_bridge::{ExecCtx, InMemoryStore, PipelineEngine, ProviderRegistry, Variables};
/// use std::sync::Arc;
///
/// # async fn run() -> prompt_bridge::Result<()> {
/// let store = Arc::new(InMemoryStore::with_providers(prompt_bridge::default_catalog()));
/// let registry = ProviderRegistry::with_default_adapters(store.clone());
/// let engine = PipelineEngine::new(store, registry, ExecCtx::builder().build()?);
///
/// let result = engine.execute(1, 1, "Tell me about Rust", &Variables::new()).await?;
/// println!("{:?}", result.final_response);
/// # Ok(())
/// # }
/// ```
pub struct PipelineEngine {
    store: Arc<dyn Store>,
    registry: ProviderRegistry,
    ctx: ExecCtx,
}

impl std::fmt::Debug for PipelineEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineEngine")
            .field("registry", &self.registry)
            .field("ctx", &self.ctx)
            .finish()
    }
}

/// Mutable state of one execution while its steps run.
struct Run {
    reports: Vec<StepReport>,
    last_response: Option<String>,
    status: ExecutionStatus,
    error: Option<String>,
}

impl Run {
    fn new() -> Self {
        Self {
            reports: Vec::new(),
            last_response: None,
            status: ExecutionStatus::Running,
            error: None,
        }
    }

    fn fail(&mut self, err: &BridgeError) {
        self.status = match err {
            BridgeError::Cancelled => ExecutionStatus::Cancelled,
            _ => ExecutionStatus::Failed,
        };
        self.error = Some(err.to_string());
    }
}

impl PipelineEngine {
    pub fn new(store: Arc<dyn Store>, registry: ProviderRegistry, ctx: ExecCtx) -> Self {
        Self {
            store,
            registry,
            ctx,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// The default execution context.
    pub fn ctx(&self) -> &ExecCtx {
        &self.ctx
    }

    /// Run a stored pipeline with the engine's default context.
    ///
    /// Returns `Err` only when the pipeline cannot be started: it does not
    /// exist, the caller may not run it, or its stored step list is
    /// malformed. Step failures are reported through the returned
    /// [`ExecutionResult`] with `status` set to `Failed`.
    pub async fn execute(
        &self,
        owner_id: u64,
        pipeline_id: u64,
        initial_prompt: &str,
        variables: &Variables,
    ) -> Result<ExecutionResult> {
        self.execute_with(&self.ctx, owner_id, pipeline_id, initial_prompt, variables)
            .await
    }

    /// Like [`execute`](Self::execute) with a per-call context, typically
    /// carrying its own cancellation token.
    pub async fn execute_with(
        &self,
        ctx: &ExecCtx,
        owner_id: u64,
        pipeline_id: u64,
        initial_prompt: &str,
        variables: &Variables,
    ) -> Result<ExecutionResult> {
        let started = Instant::now();
        let ctx = ctx.arm_deadline();

        let pipeline = self
            .store
            .get_pipeline(pipeline_id)
            .await?
            .filter(|p| p.accessible_by(owner_id))
            .ok_or(BridgeError::Access { pipeline_id })?;
        let steps = step::ordered(step::parse_steps(&pipeline.configuration)?);

        let mut execution = self
            .store
            .insert_execution(PipelineExecution {
                id: 0,
                pipeline_id,
                owner_id,
                initial_prompt: initial_prompt.to_string(),
                status: ExecutionStatus::Running,
                final_response: None,
                started_at: Utc::now(),
                completed_at: None,
                total_execution_time_ms: None,
                error_message: None,
                satisfaction_score: None,
                feedback: None,
            })
            .await?;
        let execution_id = execution.id;

        tracing::info!(
            execution_id,
            pipeline_id,
            owner_id,
            steps = steps.len(),
            "pipeline execution started"
        );
        emit(
            &ctx.event_handler,
            Event::ExecutionStart {
                execution_id,
                pipeline_id,
                total_steps: steps.len(),
            },
        );

        let mut run = Run::new();
        if let Err(e) = self
            .run_steps(&ctx, execution_id, owner_id, &steps, initial_prompt, variables, &mut run)
            .await
        {
            tracing::error!(execution_id, error = %e, "store failure during execution");
            run.fail(&e);
        }
        if run.status == ExecutionStatus::Running {
            run.status = ExecutionStatus::Completed;
        }

        let total_ms = started.elapsed().as_millis() as u64;
        execution.status = run.status;
        execution.final_response = run.last_response.clone();
        execution.completed_at = Some(Utc::now());
        execution.total_execution_time_ms = Some(total_ms);
        execution.error_message = run.error.clone();
        self.store.update_execution(&execution).await.map_err(|e| {
            tracing::error!(execution_id, error = %e, "failed to finalize execution");
            e
        })?;

        if let Err(e) = self.store.touch_pipeline(pipeline_id, Utc::now()).await {
            tracing::warn!(pipeline_id, error = %e, "failed to update pipeline last-used time");
        }

        tracing::info!(
            execution_id,
            status = ?run.status,
            total_ms,
            "pipeline execution finished"
        );
        emit(
            &ctx.event_handler,
            Event::ExecutionEnd {
                execution_id,
                status: run.status,
                total_ms,
            },
        );

        Ok(ExecutionResult {
            execution_id,
            status: run.status,
            final_response: run.last_response,
            step_results: run.reports,
            total_execution_time_ms: total_ms,
            error_message: run.error,
        })
    }

    /// Drive `steps` in order, stopping at the first failure.
    ///
    /// Provider failures are recorded in `run`; only store failures are
    /// returned as `Err`.
    #[allow(clippy::too_many_arguments)]
    async fn run_steps(
        &self,
        ctx: &ExecCtx,
        execution_id: u64,
        owner_id: u64,
        steps: &[StepDefinition],
        initial_prompt: &str,
        variables: &Variables,
        run: &mut Run,
    ) -> Result<()> {
        for def in steps {
            if ctx.is_cancelled() {
                tracing::info!(execution_id, order = def.order, "execution cancelled before step");
                run.fail(&BridgeError::Cancelled);
                return Ok(());
            }

            let rendered = prompt::render(
                &def.prompt_template,
                initial_prompt,
                run.last_response.as_deref().unwrap_or(""),
                variables,
            );
            let provider_name = self.provider_name(def).await;

            let mut row = self
                .store
                .insert_step_result(StepResult {
                    id: 0,
                    execution_id,
                    order: def.order,
                    kind: def.step_type,
                    provider_id: def.provider_id,
                    provider_name,
                    prompt: rendered,
                    response: None,
                    status: StepStatus::Running,
                    started_at: Utc::now(),
                    completed_at: None,
                    execution_time_ms: None,
                    error_message: None,
                    performance_score: None,
                    condition_met: true,
                })
                .await?;

            tracing::debug!(
                execution_id,
                order = def.order,
                provider_id = def.provider_id,
                "running step"
            );
            emit(
                &ctx.event_handler,
                Event::StepStart {
                    execution_id,
                    order: def.order,
                    provider_id: def.provider_id,
                },
            );

            let step_started = Instant::now();
            let outcome = self
                .registry
                .send(ctx, def.provider_id, &row.prompt, owner_id)
                .await;
            let elapsed_ms = step_started.elapsed().as_millis() as u64;

            row.completed_at = Some(Utc::now());
            row.execution_time_ms = Some(elapsed_ms);
            let failed = match outcome {
                Ok(text) => {
                    row.status = StepStatus::Completed;
                    row.performance_score = Some(scoring::score_response(elapsed_ms, &text));
                    row.response = Some(text.clone());
                    run.last_response = Some(text);
                    false
                }
                Err(e) => {
                    tracing::warn!(
                        execution_id,
                        order = def.order,
                        provider_id = def.provider_id,
                        error = %e,
                        "step failed"
                    );
                    row.status = StepStatus::Failed;
                    row.error_message = Some(e.to_string());
                    run.fail(&e);
                    true
                }
            };

            self.store.update_step_result(&row).await?;
            run.reports.push(StepReport::from(&row));
            emit(
                &ctx.event_handler,
                Event::StepEnd {
                    execution_id,
                    order: def.order,
                    status: row.status,
                    elapsed_ms,
                },
            );

            if failed {
                return Ok(());
            }
        }
        Ok(())
    }

    /// The display name stored with the step, else the provider record's.
    async fn provider_name(&self, def: &StepDefinition) -> String {
        if !def.provider_name.is_empty() {
            return def.provider_name.clone();
        }
        match self.registry.provider(def.provider_id).await {
            Ok(Some(p)) => p.name,
            _ => String::new(),
        }
    }

    /// Step results of an execution, in step order.
    ///
    /// An execution that does not exist or belongs to another owner yields
    /// an empty list.
    pub async fn execution_details(
        &self,
        owner_id: u64,
        execution_id: u64,
    ) -> Result<Vec<StepReport>> {
        let owned = self
            .store
            .get_execution(execution_id)
            .await?
            .is_some_and(|e| e.owner_id == owner_id);
        if !owned {
            return Ok(Vec::new());
        }

        let mut steps = self.store.step_results(execution_id).await?;
        steps.sort_by_key(|s| s.order);

        let mut reports = Vec::with_capacity(steps.len());
        for step in &steps {
            let mut report = StepReport::from(step);
            if let Some(provider) = self.registry.provider(step.provider_id).await? {
                report.ai_provider_name = provider.name;
            }
            reports.push(report);
        }
        Ok(reports)
    }

    /// Attach a 1-5 satisfaction rating and optional feedback to an execution.
    ///
    /// Returns `false` if the execution does not exist or belongs to another
    /// owner.
    pub async fn rate_execution(
        &self,
        owner_id: u64,
        execution_id: u64,
        rating: f64,
        feedback: Option<String>,
    ) -> Result<bool> {
        if !(1.0..=5.0).contains(&rating) {
            return Err(BridgeError::InvalidInput(format!(
                "rating must be between 1 and 5, got {}",
                rating
            )));
        }

        let Some(mut execution) = self
            .store
            .get_execution(execution_id)
            .await?
            .filter(|e| e.owner_id == owner_id)
        else {
            return Ok(false);
        };

        execution.satisfaction_score = Some(rating);
        execution.feedback = feedback;
        self.store.update_execution(&execution).await?;
        tracing::debug!(execution_id, rating, "execution rated");
        Ok(true)
    }
}
