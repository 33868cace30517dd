//! Saving, listing and removing pipeline definitions.
//!
//! Step lists are validated here, at save time, so the engine can rely on
//! stored pipelines having contiguous step orders. Pipelines written to the
//! store by other means are still parsed leniently by the engine.

use crate::error::Result;
use crate::step::{self, StepDefinition};
use crate::store::Store;
use crate::types::Pipeline;
use crate::BridgeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What a caller submits to create or update a pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
    /// Only honoured on create.
    #[serde(default)]
    pub is_template: bool,
}

impl PipelineDraft {
    pub fn new(name: impl Into<String>, steps: Vec<StepDefinition>) -> Self {
        Self {
            name: name.into(),
            steps,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn as_template(mut self) -> Self {
        self.is_template = true;
        self
    }
}

/// A stored pipeline with its step list decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineView {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<StepDefinition>,
    pub is_template: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<&Pipeline> for PipelineView {
    /// Undecodable step lists show as empty.
    fn from(p: &Pipeline) -> Self {
        let steps = step::parse_steps(&p.configuration).unwrap_or_else(|e| {
            tracing::warn!(pipeline_id = p.id, error = %e, "stored step list is unreadable");
            Vec::new()
        });
        Self {
            id: p.id,
            name: p.name.clone(),
            description: p.description.clone(),
            steps,
            is_template: p.is_template,
            created_at: p.created_at,
            last_used_at: p.last_used_at,
        }
    }
}

/// CRUD over stored pipelines on behalf of an owner.
pub struct PipelineLibrary {
    store: Arc<dyn Store>,
}

impl PipelineLibrary {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Validate and store a new active pipeline owned by `owner_id`.
    pub async fn create_pipeline(&self, owner_id: u64, draft: PipelineDraft) -> Result<Pipeline> {
        check_name(&draft.name)?;
        step::validate_steps(&draft.steps)?;

        let pipeline = self
            .store
            .insert_pipeline(Pipeline {
                id: 0,
                owner_id,
                name: draft.name,
                description: draft.description,
                configuration: step::serialize_steps(&draft.steps)?,
                is_active: true,
                is_template: draft.is_template,
                created_at: Utc::now(),
                last_used_at: None,
            })
            .await?;
        tracing::info!(pipeline_id = pipeline.id, owner_id, "created pipeline {}", pipeline.name);
        Ok(pipeline)
    }

    /// Replace name, description and steps of a pipeline `owner_id` owns.
    ///
    /// The pipeline is re-activated. Its template flag is left as is.
    pub async fn update_pipeline(
        &self,
        owner_id: u64,
        pipeline_id: u64,
        draft: PipelineDraft,
    ) -> Result<Pipeline> {
        check_name(&draft.name)?;
        step::validate_steps(&draft.steps)?;

        let mut pipeline = self
            .owned(owner_id, pipeline_id)
            .await?
            .ok_or(BridgeError::Access { pipeline_id })?;
        pipeline.name = draft.name;
        pipeline.description = draft.description;
        pipeline.configuration = step::serialize_steps(&draft.steps)?;
        pipeline.is_active = true;

        self.store.update_pipeline(&pipeline).await?;
        tracing::info!(pipeline_id, owner_id, "updated pipeline");
        Ok(pipeline)
    }

    /// Remove a pipeline `owner_id` owns. `false` if there was none.
    pub async fn delete_pipeline(&self, owner_id: u64, pipeline_id: u64) -> Result<bool> {
        if self.owned(owner_id, pipeline_id).await?.is_none() {
            return Ok(false);
        }
        let deleted = self.store.delete_pipeline(pipeline_id).await?;
        tracing::info!(pipeline_id, owner_id, "deleted pipeline");
        Ok(deleted)
    }

    /// Pipelines owned by `owner_id`, most recently used (or created) first.
    pub async fn user_pipelines(&self, owner_id: u64) -> Result<Vec<PipelineView>> {
        let mut pipelines: Vec<_> = self
            .store
            .list_pipelines()
            .await?
            .into_iter()
            .filter(|p| p.owner_id == owner_id)
            .collect();
        pipelines.sort_by(|a, b| {
            let a = a.last_used_at.unwrap_or(a.created_at);
            let b = b.last_used_at.unwrap_or(b.created_at);
            b.cmp(&a)
        });
        Ok(pipelines.iter().map(PipelineView::from).collect())
    }

    /// Active shared templates, by name.
    pub async fn template_pipelines(&self) -> Result<Vec<PipelineView>> {
        let mut templates: Vec<_> = self
            .store
            .list_pipelines()
            .await?
            .into_iter()
            .filter(|p| p.is_template && p.is_active)
            .collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates.iter().map(PipelineView::from).collect())
    }

    async fn owned(&self, owner_id: u64, pipeline_id: u64) -> Result<Option<Pipeline>> {
        Ok(self
            .store
            .get_pipeline(pipeline_id)
            .await?
            .filter(|p| p.owner_id == owner_id))
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(BridgeError::InvalidPipeline(
            "pipeline name cannot be empty".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use chrono::Duration;

    fn library() -> (Arc<InMemoryStore>, PipelineLibrary) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), PipelineLibrary::new(store))
    }

    fn steps() -> Vec<StepDefinition> {
        vec![
            StepDefinition::new(1, 6, "Summarize: {input}"),
            StepDefinition::new(2, 3, "Translate: {previousResponse}"),
        ]
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (_, lib) = library();
        let created = lib
            .create_pipeline(1, PipelineDraft::new("Summarize", steps()).with_description("two steps"))
            .await
            .unwrap();
        assert!(created.is_active);
        assert!(!created.is_template);

        let listed = lib.user_pipelines(1).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].steps, steps());
        assert_eq!(listed[0].description.as_deref(), Some("two steps"));
        assert!(lib.user_pipelines(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_steps() {
        let (store, lib) = library();
        let gap = vec![
            StepDefinition::new(1, 6, "a"),
            StepDefinition::new(3, 6, "b"),
        ];
        let err = lib
            .create_pipeline(1, PipelineDraft::new("gap", gap))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidPipeline(_)));

        let err = lib
            .create_pipeline(1, PipelineDraft::new("  ", steps()))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidPipeline(_)));
        assert!(store.list_pipelines().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_owner_only_and_reactivates() {
        let (store, lib) = library();
        let created = lib
            .create_pipeline(1, PipelineDraft::new("v1", steps()).as_template())
            .await
            .unwrap();
        let mut inactive = created.clone();
        inactive.is_active = false;
        store.update_pipeline(&inactive).await.unwrap();

        let err = lib
            .update_pipeline(2, created.id, PipelineDraft::new("stolen", steps()))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Access { .. }));

        let updated = lib
            .update_pipeline(1, created.id, PipelineDraft::new("v2", vec![StepDefinition::new(1, 5, "{input}")]))
            .await
            .unwrap();
        assert_eq!(updated.name, "v2");
        assert!(updated.is_active);
        assert!(updated.is_template);
        assert_eq!(
            step::parse_steps(&updated.configuration).unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_delete_owner_only() {
        let (_, lib) = library();
        let created = lib
            .create_pipeline(1, PipelineDraft::new("p", steps()))
            .await
            .unwrap();
        assert!(!lib.delete_pipeline(2, created.id).await.unwrap());
        assert!(lib.delete_pipeline(1, created.id).await.unwrap());
        assert!(!lib.delete_pipeline(1, created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_pipelines_most_recent_first() {
        let (store, lib) = library();
        let old = lib.create_pipeline(1, PipelineDraft::new("old", steps())).await.unwrap();
        let new = lib.create_pipeline(1, PipelineDraft::new("new", steps())).await.unwrap();

        let mut used = old.clone();
        used.last_used_at = Some(new.created_at + Duration::seconds(60));
        store.update_pipeline(&used).await.unwrap();

        let names: Vec<_> = lib
            .user_pipelines(1)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["old", "new"]);
    }

    #[tokio::test]
    async fn test_templates_sorted_by_name() {
        let (store, lib) = library();
        lib.create_pipeline(1, PipelineDraft::new("Zeta", steps()).as_template())
            .await
            .unwrap();
        lib.create_pipeline(2, PipelineDraft::new("Alpha", steps()).as_template())
            .await
            .unwrap();
        let hidden = lib
            .create_pipeline(3, PipelineDraft::new("Beta", steps()).as_template())
            .await
            .unwrap();
        lib.create_pipeline(1, PipelineDraft::new("Private", steps()))
            .await
            .unwrap();

        let mut off = hidden.clone();
        off.is_active = false;
        store.update_pipeline(&off).await.unwrap();

        let names: Vec<_> = lib
            .template_pipelines()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn test_view_tolerates_bad_configuration() {
        let pipeline = Pipeline {
            id: 1,
            owner_id: 1,
            name: "broken".into(),
            description: None,
            configuration: "{oops".into(),
            is_active: true,
            is_template: false,
            created_at: Utc::now(),
            last_used_at: None,
        };
        assert!(PipelineView::from(&pipeline).steps.is_empty());
    }
}
