//! Storage interface consumed by the engine and the registry.
//!
//! The engine only needs row-level create/read/update operations; schema,
//! migrations and transactions belong to whichever implementation backs
//! [`Store`]. [`InMemoryStore`] is the reference implementation used by
//! tests and demos.

use crate::types::{
    Pipeline, PipelineExecution, ProviderCall, ProviderRecord, StepResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use thiserror::Error;

/// Storage failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("Internal store error: {0}")]
    Internal(String),
}

/// Row storage for pipelines, executions, step results, providers and
/// provider-call audit records.
///
/// `insert_*` methods ignore the `id` field of their argument and return
/// the stored row with its assigned id.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_pipeline(&self, id: u64) -> Result<Option<Pipeline>, StoreError>;
    async fn insert_pipeline(&self, pipeline: Pipeline) -> Result<Pipeline, StoreError>;
    async fn update_pipeline(&self, pipeline: &Pipeline) -> Result<(), StoreError>;
    /// Set only `last_used_at`, leaving every other column as stored.
    async fn touch_pipeline(&self, id: u64, at: DateTime<Utc>) -> Result<(), StoreError>;
    async fn delete_pipeline(&self, id: u64) -> Result<bool, StoreError>;
    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, StoreError>;

    async fn insert_execution(
        &self,
        execution: PipelineExecution,
    ) -> Result<PipelineExecution, StoreError>;
    async fn update_execution(&self, execution: &PipelineExecution) -> Result<(), StoreError>;
    async fn get_execution(&self, id: u64) -> Result<Option<PipelineExecution>, StoreError>;

    async fn insert_step_result(&self, step: StepResult) -> Result<StepResult, StoreError>;
    async fn update_step_result(&self, step: &StepResult) -> Result<(), StoreError>;
    /// Step results of one execution, in insertion order.
    async fn step_results(&self, execution_id: u64) -> Result<Vec<StepResult>, StoreError>;

    async fn get_provider(&self, id: u64) -> Result<Option<ProviderRecord>, StoreError>;
    async fn upsert_provider(&self, provider: ProviderRecord) -> Result<(), StoreError>;
    async fn list_providers(&self) -> Result<Vec<ProviderRecord>, StoreError>;

    async fn record_provider_call(&self, call: ProviderCall) -> Result<ProviderCall, StoreError>;
}

/// In-memory [`Store`] for development and testing.
///
/// Ids are assigned from one counter per table, starting at 1.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    pipelines: RwLock<HashMap<u64, Pipeline>>,
    executions: RwLock<HashMap<u64, PipelineExecution>>,
    steps: RwLock<Vec<StepResult>>,
    providers: RwLock<HashMap<u64, ProviderRecord>>,
    calls: RwLock<Vec<ProviderCall>>,
    next_pipeline: AtomicU64,
    next_execution: AtomicU64,
    next_step: AtomicU64,
    next_call: AtomicU64,
}

fn poisoned<T>(err: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Internal(err.to_string())
}

fn next_id(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::Relaxed) + 1
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with the given providers.
    pub fn with_providers(providers: impl IntoIterator<Item = ProviderRecord>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.providers.write() {
            for provider in providers {
                map.insert(provider.id, provider);
            }
        }
        store
    }

    /// Every audit record written so far.
    pub fn provider_calls(&self) -> Result<Vec<ProviderCall>, StoreError> {
        Ok(self.calls.read().map_err(poisoned)?.clone())
    }

    /// Every execution, ordered by id.
    pub fn executions(&self) -> Result<Vec<PipelineExecution>, StoreError> {
        let mut all: Vec<_> = self
            .executions
            .read()
            .map_err(poisoned)?
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|e| e.id);
        Ok(all)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_pipeline(&self, id: u64) -> Result<Option<Pipeline>, StoreError> {
        Ok(self.pipelines.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn insert_pipeline(&self, mut pipeline: Pipeline) -> Result<Pipeline, StoreError> {
        pipeline.id = next_id(&self.next_pipeline);
        self.pipelines
            .write()
            .map_err(poisoned)?
            .insert(pipeline.id, pipeline.clone());
        Ok(pipeline)
    }

    async fn update_pipeline(&self, pipeline: &Pipeline) -> Result<(), StoreError> {
        let mut pipelines = self.pipelines.write().map_err(poisoned)?;
        match pipelines.get_mut(&pipeline.id) {
            Some(existing) => {
                *existing = pipeline.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                kind: "pipeline",
                id: pipeline.id,
            }),
        }
    }

    async fn touch_pipeline(&self, id: u64, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut pipelines = self.pipelines.write().map_err(poisoned)?;
        let pipeline = pipelines.get_mut(&id).ok_or(StoreError::NotFound {
            kind: "pipeline",
            id,
        })?;
        pipeline.last_used_at = Some(at);
        Ok(())
    }

    async fn delete_pipeline(&self, id: u64) -> Result<bool, StoreError> {
        Ok(self.pipelines.write().map_err(poisoned)?.remove(&id).is_some())
    }

    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, StoreError> {
        let mut all: Vec<_> = self
            .pipelines
            .read()
            .map_err(poisoned)?
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|p| p.id);
        Ok(all)
    }

    async fn insert_execution(
        &self,
        mut execution: PipelineExecution,
    ) -> Result<PipelineExecution, StoreError> {
        execution.id = next_id(&self.next_execution);
        self.executions
            .write()
            .map_err(poisoned)?
            .insert(execution.id, execution.clone());
        Ok(execution)
    }

    async fn update_execution(&self, execution: &PipelineExecution) -> Result<(), StoreError> {
        let mut executions = self.executions.write().map_err(poisoned)?;
        match executions.get_mut(&execution.id) {
            Some(existing) => {
                *existing = execution.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                kind: "execution",
                id: execution.id,
            }),
        }
    }

    async fn get_execution(&self, id: u64) -> Result<Option<PipelineExecution>, StoreError> {
        Ok(self.executions.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn insert_step_result(&self, mut step: StepResult) -> Result<StepResult, StoreError> {
        step.id = next_id(&self.next_step);
        self.steps.write().map_err(poisoned)?.push(step.clone());
        Ok(step)
    }

    async fn update_step_result(&self, step: &StepResult) -> Result<(), StoreError> {
        let mut steps = self.steps.write().map_err(poisoned)?;
        match steps.iter_mut().find(|s| s.id == step.id) {
            Some(existing) => {
                *existing = step.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                kind: "step result",
                id: step.id,
            }),
        }
    }

    async fn step_results(&self, execution_id: u64) -> Result<Vec<StepResult>, StoreError> {
        Ok(self
            .steps
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|s| s.execution_id == execution_id)
            .cloned()
            .collect())
    }

    async fn get_provider(&self, id: u64) -> Result<Option<ProviderRecord>, StoreError> {
        Ok(self.providers.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn upsert_provider(&self, provider: ProviderRecord) -> Result<(), StoreError> {
        self.providers
            .write()
            .map_err(poisoned)?
            .insert(provider.id, provider);
        Ok(())
    }

    async fn list_providers(&self) -> Result<Vec<ProviderRecord>, StoreError> {
        let mut all: Vec<_> = self
            .providers
            .read()
            .map_err(poisoned)?
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|p| p.id);
        Ok(all)
    }

    async fn record_provider_call(
        &self,
        mut call: ProviderCall,
    ) -> Result<ProviderCall, StoreError> {
        call.id = next_id(&self.next_call);
        self.calls.write().map_err(poisoned)?.push(call.clone());
        Ok(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExecutionStatus;

    fn pipeline(name: &str) -> Pipeline {
        Pipeline {
            id: 0,
            owner_id: 1,
            name: name.into(),
            description: None,
            configuration: "[]".into(),
            is_active: true,
            is_template: false,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = InMemoryStore::new();
        let a = store.insert_pipeline(pipeline("a")).await.unwrap();
        let b = store.insert_pipeline(pipeline("b")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.get_pipeline(2).await.unwrap().unwrap().name, "b");
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let store = InMemoryStore::new();
        let mut p = pipeline("ghost");
        p.id = 42;
        let err = store.update_pipeline(&p).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 42, .. }));
    }

    #[tokio::test]
    async fn test_touch_sets_only_last_used() {
        let store = InMemoryStore::new();
        let p = store.insert_pipeline(pipeline("before")).await.unwrap();
        let mut renamed = p.clone();
        renamed.name = "after".into();
        store.update_pipeline(&renamed).await.unwrap();

        let at = Utc::now();
        store.touch_pipeline(p.id, at).await.unwrap();
        let stored = store.get_pipeline(p.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "after");
        assert_eq!(stored.last_used_at, Some(at));

        let err = store.touch_pipeline(99, at).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 99, .. }));
    }

    #[tokio::test]
    async fn test_delete_pipeline() {
        let store = InMemoryStore::new();
        let p = store.insert_pipeline(pipeline("doomed")).await.unwrap();
        assert!(store.delete_pipeline(p.id).await.unwrap());
        assert!(!store.delete_pipeline(p.id).await.unwrap());
        assert!(store.get_pipeline(p.id).await.unwrap().is_none());
    }

    #[test]
    fn test_upsert_provider_replaces_and_lists_by_id() {
        tokio_test::block_on(async {
            let store = InMemoryStore::new();
            for id in [6, 3] {
                store
                    .upsert_provider(ProviderRecord {
                        id,
                        name: format!("p{}", id),
                        base_url: "http://localhost".into(),
                        description: None,
                        is_active: true,
                    })
                    .await
                    .unwrap();
            }
            let mut cohere = store.get_provider(6).await.unwrap().unwrap();
            cohere.is_active = false;
            store.upsert_provider(cohere).await.unwrap();

            let all = store.list_providers().await.unwrap();
            let ids: Vec<u64> = all.iter().map(|p| p.id).collect();
            assert_eq!(ids, vec![3, 6]);
            assert!(!all[1].is_active);
        });
    }

    #[tokio::test]
    async fn test_execution_round_trip() {
        let store = InMemoryStore::new();
        let mut exec = store
            .insert_execution(PipelineExecution {
                id: 0,
                pipeline_id: 1,
                owner_id: 1,
                initial_prompt: "hi".into(),
                status: ExecutionStatus::Running,
                final_response: None,
                started_at: Utc::now(),
                completed_at: None,
                total_execution_time_ms: None,
                error_message: None,
                satisfaction_score: None,
                feedback: None,
            })
            .await
            .unwrap();

        exec.status = ExecutionStatus::Completed;
        store.update_execution(&exec).await.unwrap();

        let loaded = store.get_execution(exec.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ExecutionStatus::Completed);
        assert_eq!(store.executions().unwrap().len(), 1);
    }
}
