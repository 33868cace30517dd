//! Event system for execution lifecycle hooks.
//!
//! Provides an optional, non-intrusive way to observe pipeline runs. The
//! engine emits events when an execution starts and ends and around every
//! step; the registry emits one event per provider call. Implement
//! [`EventHandler`] to drive progress UIs or collect metrics.

use crate::types::{ExecutionStatus, StepStatus};
use std::sync::Arc;

/// Events emitted during pipeline execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// An execution record was created and steps are about to run.
    ExecutionStart {
        execution_id: u64,
        pipeline_id: u64,
        /// Number of steps parsed from the pipeline.
        total_steps: usize,
    },
    /// A step's prompt was rendered and its record created.
    StepStart {
        execution_id: u64,
        order: u32,
        provider_id: u64,
    },
    /// A step finished, successfully or not.
    StepEnd {
        execution_id: u64,
        order: u32,
        status: StepStatus,
        elapsed_ms: u64,
    },
    /// A provider call returned (or failed).
    ProviderCall {
        provider_id: u64,
        /// Adapter label (e.g. `"OpenAI"`, `"Gemini"`).
        provider: String,
        ok: bool,
        elapsed_ms: u64,
    },
    /// The execution was finalized.
    ExecutionEnd {
        execution_id: u64,
        status: ExecutionStatus,
        total_ms: u64,
    },
}

/// Handler for execution lifecycle events.
///
/// This is entirely optional -- the engine works without an event handler.
///
/// # Example
///
/// ```
/// use prompt_bridge::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         match event {
///             Event::StepStart { order, .. } => println!("[step {}] running", order),
///             Event::StepEnd { order, status, .. } => println!("[step {}] {:?}", order, status),
///             _ => {}
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called when the engine or registry emits an event.
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
///
/// # Example
///
/// ```
/// use prompt_bridge::events::{Event, FnEventHandler};
/// use std::sync::Arc;
///
/// let handler = Arc::new(FnEventHandler(|event: Event| {
///     if let Event::ExecutionEnd { status, .. } = event {
///         println!("finished: {:?}", status);
///     }
/// }));
/// ```
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}
