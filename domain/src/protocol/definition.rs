//! Protocol definitions: metadata, variables and ordered phases of steps
//!
//! Loading validates structural shape only. Whether each step's tool
//! resolves is decided at execution time by the router.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Structural problems found while loading a protocol
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Protocol definition is malformed: {0}")]
    Malformed(String),

    #[error("metadata.name is required")]
    MissingName,

    #[error("Protocol '{0}' has no phases")]
    NoPhases(String),

    #[error("Phase #{index} has no name")]
    UnnamedPhase { index: usize },

    #[error("Step #{index} in phase '{phase}' has no name")]
    UnnamedStep { phase: String, index: usize },

    #[error("Step '{step}' in phase '{phase}' does not name a tool")]
    MissingTool { phase: String, step: String },
}

/// What to do when a step's dispatch fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Skip the step's output and carry on
    Continue,
    /// Stop the whole run
    #[default]
    Abort,
    /// Re-attempt with linear backoff, then abort
    Retry,
}

impl ErrorPolicy {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorPolicy::Continue => "continue",
            ErrorPolicy::Abort => "abort",
            ErrorPolicy::Retry => "retry",
        }
    }
}

impl std::fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_arguments() -> Value {
    Value::Object(Map::new())
}

/// Accept `version: 1.2` as well as `version: "1.2"`.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub version: String,
    #[serde(default)]
    pub description: String,
}

/// One tool invocation inside a phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub name: String,
    /// Flat tool name dispatched through the router
    #[serde(default)]
    pub tool: String,
    /// Argument template; may contain `{{ ... }}` placeholders at any depth
    #[serde(default = "default_arguments")]
    pub arguments: Value,
    /// Key under which a successful result is stored for later steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
    #[serde(default)]
    pub on_error: ErrorPolicy,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Step {
    pub fn new(name: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tool: tool.into(),
            arguments: default_arguments(),
            output_key: None,
            on_error: ErrorPolicy::default(),
            max_retries: default_max_retries(),
        }
    }

    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Total attempts this step may make under its policy.
    pub fn max_attempts(&self) -> u32 {
        match self.on_error {
            ErrorPolicy::Retry => self.max_retries.saturating_add(1),
            ErrorPolicy::Continue | ErrorPolicy::Abort => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Phase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

/// A declarative multi-phase, multi-step workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolDefinition {
    #[serde(default)]
    pub metadata: ProtocolMetadata,
    /// Variable defaults; callers may override any of them per run
    #[serde(default)]
    pub variables: Map<String, Value>,
    #[serde(default)]
    pub phases: Vec<Phase>,
}

impl ProtocolDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ProtocolMetadata {
                name: name.into(),
                ..ProtocolMetadata::default()
            },
            variables: Map::new(),
            phases: Vec::new(),
        }
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: Value) -> Self {
        self.variables.insert(key.into(), value);
        self
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Parse an already-decoded document and validate its shape.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let protocol: Self = serde_json::from_value(value)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        protocol.validate()?;
        Ok(protocol)
    }

    /// Check the structural invariants: a name, at least one phase, and
    /// named steps that each name a tool.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.metadata.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.phases.is_empty() {
            return Err(ValidationError::NoPhases(self.metadata.name.clone()));
        }

        for (index, phase) in self.phases.iter().enumerate() {
            if phase.name.trim().is_empty() {
                return Err(ValidationError::UnnamedPhase { index });
            }
            for (index, step) in phase.steps.iter().enumerate() {
                if step.name.trim().is_empty() {
                    return Err(ValidationError::UnnamedStep {
                        phase: phase.name.clone(),
                        index,
                    });
                }
                if step.tool.trim().is_empty() {
                    return Err(ValidationError::MissingTool {
                        phase: phase.name.clone(),
                        step: step.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn step_count(&self) -> usize {
        self.phases.iter().map(|p| p.steps.len()).sum()
    }

    /// Distinct tool names referenced by the steps, in first-use order.
    pub fn referenced_tools(&self) -> Vec<&str> {
        let mut tools: Vec<&str> = Vec::new();
        for step in self.phases.iter().flat_map(|p| p.steps.iter()) {
            if !tools.contains(&step.tool.as_str()) {
                tools.push(&step.tool);
            }
        }
        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "metadata": {"name": "research", "version": 2, "description": "Look things up"},
            "variables": {"topic": "rust"},
            "phases": [
                {
                    "name": "gather",
                    "steps": [
                        {
                            "name": "search",
                            "tool": "web_search",
                            "arguments": {"q": "{{topic}}"},
                            "output_key": "hits",
                            "on_error": "retry",
                            "max_retries": 2
                        }
                    ]
                },
                {
                    "name": "write",
                    "description": "Summarize",
                    "steps": [{"name": "store", "tool": "memory_store"}]
                }
            ]
        })
    }

    #[test]
    fn test_parse_full_document() {
        let protocol = ProtocolDefinition::from_value(sample()).unwrap();
        assert_eq!(protocol.name(), "research");
        assert_eq!(protocol.metadata.version, "2");
        assert_eq!(protocol.variables["topic"], "rust");
        assert_eq!(protocol.phases.len(), 2);
        assert_eq!(protocol.step_count(), 2);

        let search = &protocol.phases[0].steps[0];
        assert_eq!(search.on_error, ErrorPolicy::Retry);
        assert_eq!(search.max_retries, 2);
        assert_eq!(search.max_attempts(), 3);
        assert_eq!(search.output_key.as_deref(), Some("hits"));
    }

    #[test]
    fn test_step_defaults() {
        let protocol = ProtocolDefinition::from_value(sample()).unwrap();
        let store = &protocol.phases[1].steps[0];
        assert_eq!(store.on_error, ErrorPolicy::Abort);
        assert_eq!(store.max_retries, 3);
        assert_eq!(store.max_attempts(), 1);
        assert_eq!(store.arguments, json!({}));
        assert!(store.output_key.is_none());
    }

    #[test]
    fn test_missing_name_rejected() {
        let mut doc = sample();
        doc["metadata"]["name"] = json!("");
        assert_eq!(
            ProtocolDefinition::from_value(doc),
            Err(ValidationError::MissingName)
        );

        let mut doc = sample();
        doc.as_object_mut().unwrap().remove("metadata");
        assert_eq!(
            ProtocolDefinition::from_value(doc),
            Err(ValidationError::MissingName)
        );
    }

    #[test]
    fn test_empty_phases_rejected() {
        let mut doc = sample();
        doc["phases"] = json!([]);
        assert!(matches!(
            ProtocolDefinition::from_value(doc),
            Err(ValidationError::NoPhases(name)) if name == "research"
        ));
    }

    #[test]
    fn test_step_without_tool_rejected() {
        let mut doc = sample();
        doc["phases"][1]["steps"][0]["tool"] = json!("  ");
        assert!(matches!(
            ProtocolDefinition::from_value(doc),
            Err(ValidationError::MissingTool { step, .. }) if step == "store"
        ));
    }

    #[test]
    fn test_unknown_policy_is_malformed() {
        let mut doc = sample();
        doc["phases"][0]["steps"][0]["on_error"] = json!("explode");
        assert!(matches!(
            ProtocolDefinition::from_value(doc),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_unresolvable_tool_is_not_a_load_error() {
        let mut doc = sample();
        doc["phases"][0]["steps"][0]["tool"] = json!("does_not_exist_anywhere");
        assert!(ProtocolDefinition::from_value(doc).is_ok());
    }

    #[test]
    fn test_referenced_tools_in_first_use_order() {
        let protocol = ProtocolDefinition::new("p").with_phase(
            Phase::new("one")
                .with_step(Step::new("a", "echo"))
                .with_step(Step::new("b", "web_search"))
                .with_step(Step::new("c", "echo")),
        );
        assert_eq!(protocol.referenced_tools(), vec!["echo", "web_search"]);
    }
}
