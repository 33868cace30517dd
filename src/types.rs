//! Persisted records and the result shapes returned to callers.

use crate::step::StepKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Caller-supplied template variables, keyed by placeholder name.
pub type Variables = HashMap<String, serde_json::Value>;

/// A stored pipeline definition.
///
/// `configuration` is the serialized step list. It is kept opaque here and
/// parsed fresh by the engine on every execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    pub owner_id: u64,
    pub name: String,
    pub description: Option<String>,
    pub configuration: String,
    pub is_active: bool,
    /// Shared templates may be executed by any caller.
    pub is_template: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Pipeline {
    /// Whether `owner_id` may execute this pipeline.
    pub fn accessible_by(&self, owner_id: u64) -> bool {
        self.owner_id == owner_id || self.is_template
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// One run of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineExecution {
    pub id: u64,
    pub pipeline_id: u64,
    pub owner_id: u64,
    pub initial_prompt: String,
    pub status: ExecutionStatus,
    pub final_response: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_execution_time_ms: Option<u64>,
    pub error_message: Option<String>,
    /// 1-5 rating attached after the fact.
    pub satisfaction_score: Option<f64>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// Declared for schema compatibility; the engine never assigns it.
    Skipped,
}

/// The persisted outcome of one step of one execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub id: u64,
    pub execution_id: u64,
    pub order: u32,
    pub kind: StepKind,
    pub provider_id: u64,
    pub provider_name: String,
    /// The rendered prompt actually sent.
    pub prompt: String,
    pub response: Option<String>,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub execution_time_ms: Option<u64>,
    pub error_message: Option<String>,
    pub performance_score: Option<u8>,
    /// Always true: step conditions are never evaluated.
    pub condition_met: bool,
}

/// A configured text-generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub id: u64,
    /// Matched case-insensitively against the adapter table.
    pub name: String,
    pub base_url: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallStatus {
    Completed,
    Failed,
}

/// Audit row written for every provider call, independent of pipelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCall {
    pub id: u64,
    pub caller_id: u64,
    pub provider_id: u64,
    pub prompt: String,
    pub response: Option<String>,
    pub status: CallStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub response_time_ms: u64,
    pub error_message: Option<String>,
}

/// Per-step entry of an [`ExecutionResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub order: u32,
    pub step_type: StepKind,
    pub ai_provider_name: String,
    pub prompt: String,
    pub response: Option<String>,
    pub status: StepStatus,
    pub execution_time_ms: u64,
    pub was_condition_met: bool,
    pub performance_score: Option<u8>,
}

impl From<&StepResult> for StepReport {
    fn from(step: &StepResult) -> Self {
        Self {
            order: step.order,
            step_type: step.kind,
            ai_provider_name: step.provider_name.clone(),
            prompt: step.prompt.clone(),
            response: step.response.clone(),
            status: step.status,
            execution_time_ms: step.execution_time_ms.unwrap_or(0),
            was_condition_met: step.condition_met,
            performance_score: step.performance_score,
        }
    }
}

/// What [`PipelineEngine::execute`](crate::PipelineEngine::execute) hands back.
///
/// Returned for failed runs too; check `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub execution_id: u64,
    pub status: ExecutionStatus,
    pub final_response: Option<String>,
    pub step_results: Vec<StepReport>,
    pub total_execution_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline(owner_id: u64, is_template: bool) -> Pipeline {
        Pipeline {
            id: 1,
            owner_id,
            name: "p".into(),
            description: None,
            configuration: "[]".into(),
            is_active: true,
            is_template,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    #[test]
    fn test_accessible_by_owner_or_template() {
        assert!(pipeline(7, false).accessible_by(7));
        assert!(!pipeline(7, false).accessible_by(8));
        assert!(pipeline(7, true).accessible_by(8));
    }

    #[test]
    fn test_execution_result_serializes_camel_case() {
        let result = ExecutionResult {
            execution_id: 3,
            status: ExecutionStatus::Completed,
            final_response: Some("done".into()),
            step_results: vec![StepReport {
                order: 1,
                step_type: StepKind::AiCall,
                ai_provider_name: "Cohere".into(),
                prompt: "hi".into(),
                response: Some("done".into()),
                status: StepStatus::Completed,
                execution_time_ms: 12,
                was_condition_met: true,
                performance_score: Some(3),
            }],
            total_execution_time_ms: 15,
            error_message: None,
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["executionId"], 3);
        assert_eq!(value["status"], "Completed");
        assert_eq!(value["stepResults"][0]["stepType"], "AI_CALL");
        assert_eq!(value["stepResults"][0]["wasConditionMet"], json!(true));
        assert!(value.get("errorMessage").is_none());
    }
}
