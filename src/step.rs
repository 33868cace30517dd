use crate::{error::Result, BridgeError};
use serde::{Deserialize, Deserializer, Serialize};

/// What a step is declared to do.
///
/// The engine dispatches every kind the same way (one provider call); the
/// kind is carried through to results for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    #[default]
    AiCall,
    Condition,
    Transform,
    Merge,
}

impl StepKind {
    /// Blank, `null` and unrecognized kinds read as [`StepKind::AiCall`].
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CONDITION" => Self::Condition,
            "TRANSFORM" => Self::Transform,
            "MERGE" => Self::Merge,
            _ => Self::AiCall,
        }
    }
}

impl<'de> Deserialize<'de> for StepKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::from_wire).unwrap_or_default())
    }
}

/// A single step in a stored pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    /// Position of the step. Steps run in ascending order.
    pub order: u32,

    #[serde(default)]
    pub step_type: StepKind,

    #[serde(rename = "aiProviderId")]
    pub provider_id: u64,

    /// Display name of the provider, as chosen when the pipeline was saved.
    #[serde(rename = "aiProviderName", default)]
    pub provider_name: String,

    /// Template with `{input}`, `{previousResponse}` and `{variable}` placeholders.
    pub prompt_template: String,

    /// Branch condition. Parsed and stored, never evaluated.
    #[serde(default, alias = "Condition", skip_serializing_if = "Option::is_none")]
    pub condition: Option<StepCondition>,
}

impl StepDefinition {
    /// Create an `AI_CALL` step.
    pub fn new(order: u32, provider_id: u64, prompt_template: impl Into<String>) -> Self {
        Self {
            order,
            step_type: StepKind::AiCall,
            provider_id,
            provider_name: String::new(),
            prompt_template: prompt_template.into(),
            condition: None,
        }
    }

    pub fn with_kind(mut self, kind: StepKind) -> Self {
        self.step_type = kind;
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = name.into();
        self
    }

    pub fn with_condition(mut self, condition: StepCondition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Branching condition attached to a step.
///
/// Kept for schema compatibility with stored pipelines. Nothing evaluates
/// it: `true_steps`/`false_steps` never run and every step result reports
/// its condition as met.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepCondition {
    #[serde(alias = "Type", default)]
    pub r#type: String,
    #[serde(alias = "Operator", default)]
    pub operator: String,
    #[serde(alias = "Value", default)]
    pub value: String,
    #[serde(alias = "TrueSteps", default)]
    pub true_steps: Vec<StepDefinition>,
    #[serde(alias = "FalseSteps", default)]
    pub false_steps: Vec<StepDefinition>,
}

/// Parse a pipeline's stored configuration into its step list.
///
/// An empty or `null` configuration is an empty pipeline.
pub fn parse_steps(configuration: &str) -> Result<Vec<StepDefinition>> {
    if configuration.trim().is_empty() {
        return Ok(Vec::new());
    }
    let steps: Option<Vec<StepDefinition>> = serde_json::from_str(configuration)
        .map_err(|e| BridgeError::Configuration(e.to_string()))?;
    Ok(steps.unwrap_or_default())
}

/// Serialize a step list into the stored configuration format.
pub fn serialize_steps(steps: &[StepDefinition]) -> Result<String> {
    Ok(serde_json::to_string(steps)?)
}

/// Sort steps by ascending order value. Ties keep their stored position.
pub fn ordered(mut steps: Vec<StepDefinition>) -> Vec<StepDefinition> {
    steps.sort_by_key(|s| s.order);
    steps
}

/// Reject step lists that would execute ambiguously.
///
/// Order values must be exactly `1..=N`: no duplicates, no gaps.
pub fn validate_steps(steps: &[StepDefinition]) -> Result<()> {
    let mut orders: Vec<u32> = steps.iter().map(|s| s.order).collect();
    orders.sort_unstable();

    for (idx, order) in orders.iter().enumerate() {
        let expected = idx as u32 + 1;
        if *order != expected {
            let reason = if idx > 0 && orders[idx - 1] == *order {
                format!("duplicate step order {}", order)
            } else {
                format!("step orders must be contiguous from 1; expected {}, found {}", expected, order)
            };
            return Err(BridgeError::InvalidPipeline(reason));
        }
    }

    for step in steps {
        if step.provider_id == 0 {
            return Err(BridgeError::InvalidPipeline(format!(
                "step {} has no AI provider",
                step.order
            )));
        }
        if step.prompt_template.trim().is_empty() {
            return Err(BridgeError::InvalidPipeline(format!(
                "step {} prompt template cannot be empty",
                step.order
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stored_configuration() {
        let stored = r#"[
            {"order":2,"stepType":"TRANSFORM","aiProviderId":6,"aiProviderName":"Cohere",
             "promptTemplate":"Summarize: {previousResponse}","Condition":null},
            {"order":1,"stepType":"AI_CALL","aiProviderId":3,"aiProviderName":"Google Gemini",
             "promptTemplate":"{input}"}
        ]"#;

        let steps = parse_steps(stored).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step_type, StepKind::Transform);
        assert_eq!(steps[0].provider_id, 6);
        assert_eq!(steps[1].provider_name, "Google Gemini");
        assert!(steps[0].condition.is_none());
    }

    #[test]
    fn test_parse_inert_condition() {
        let stored = r#"[{"order":1,"stepType":"CONDITION","aiProviderId":3,
            "promptTemplate":"{input}",
            "Condition":{"Type":"LENGTH","Operator":"GT","Value":"100",
                         "TrueSteps":[],"FalseSteps":[]}}]"#;

        let steps = parse_steps(stored).unwrap();
        let condition = steps[0].condition.as_ref().expect("condition");
        assert_eq!(condition.r#type, "LENGTH");
        assert_eq!(condition.operator, "GT");
        assert!(condition.true_steps.is_empty());
    }

    #[test]
    fn test_parse_blank_or_unknown_kind_as_ai_call() {
        let stored = r#"[
            {"order":1,"stepType":"","aiProviderId":3,"promptTemplate":"{input}"},
            {"order":2,"stepType":null,"aiProviderId":6,"promptTemplate":"{previousResponse}"},
            {"order":3,"stepType":"LOOP","aiProviderId":6,"promptTemplate":"{previousResponse}"},
            {"order":4,"stepType":"merge","aiProviderId":6,"promptTemplate":"{previousResponse}"}
        ]"#;

        let kinds: Vec<_> = parse_steps(stored)
            .unwrap()
            .into_iter()
            .map(|s| s.step_type)
            .collect();
        assert_eq!(
            kinds,
            vec![StepKind::AiCall, StepKind::AiCall, StepKind::AiCall, StepKind::Merge]
        );
    }

    #[test]
    fn test_parse_malformed_is_configuration_error() {
        let err = parse_steps("[{\"order\": \"one\"}]").unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));

        let err = parse_steps("not json").unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
    }

    #[test]
    fn test_parse_empty_and_null() {
        assert!(parse_steps("").unwrap().is_empty());
        assert!(parse_steps("null").unwrap().is_empty());
        assert!(parse_steps("[]").unwrap().is_empty());
    }

    #[test]
    fn test_serialize_round_trips_wire_names() {
        let steps = vec![StepDefinition::new(1, 3, "{input}").with_provider_name("Google Gemini")];
        let stored = serialize_steps(&steps).unwrap();
        assert!(stored.contains("\"aiProviderId\":3"));
        assert!(stored.contains("\"stepType\":\"AI_CALL\""));
        assert_eq!(parse_steps(&stored).unwrap(), steps);
    }

    #[test]
    fn test_ordered_is_stable_on_ties() {
        let steps = vec![
            StepDefinition::new(2, 1, "b"),
            StepDefinition::new(1, 1, "a1"),
            StepDefinition::new(1, 1, "a2"),
        ];
        let sorted: Vec<_> = ordered(steps).into_iter().map(|s| s.prompt_template).collect();
        assert_eq!(sorted, vec!["a1", "a2", "b"]);
    }

    #[test]
    fn test_validate_accepts_contiguous_orders() {
        let steps = vec![
            StepDefinition::new(2, 1, "b"),
            StepDefinition::new(1, 1, "a"),
            StepDefinition::new(3, 1, "c"),
        ];
        assert!(validate_steps(&steps).is_ok());
        assert!(validate_steps(&[]).is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let steps = vec![StepDefinition::new(1, 1, "a"), StepDefinition::new(1, 1, "b")];
        let err = validate_steps(&steps).unwrap_err();
        assert!(err.to_string().contains("duplicate step order 1"));
    }

    #[test]
    fn test_validate_rejects_gaps() {
        let steps = vec![StepDefinition::new(1, 1, "a"), StepDefinition::new(3, 1, "c")];
        let err = validate_steps(&steps).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidPipeline(_)));

        let steps = vec![StepDefinition::new(0, 1, "zero")];
        assert!(validate_steps(&steps).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_provider_and_empty_template() {
        assert!(validate_steps(&[StepDefinition::new(1, 0, "a")]).is_err());
        assert!(validate_steps(&[StepDefinition::new(1, 4, "  ")]).is_err());
    }
}
