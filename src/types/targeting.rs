//! Flag configuration records as seen by the evaluation engine.

use serde::{Deserialize, Serialize};

use crate::types::{FlagType, FlagValue};

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    In,
    NotIn,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    #[serde(alias = "regex")]
    Matches,
    NotMatches,
    StartsWith,
    EndsWith,
    /// An operator name this version does not know. Never matches.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    pub operator: Operator,
    #[serde(default = "null_value")]
    pub value: FlagValue,
}

fn null_value() -> FlagValue {
    FlagValue::Null
}

impl Condition {
    /// Create a condition on `attribute`.
    pub fn new(attribute: impl Into<String>, operator: Operator, value: impl Into<FlagValue>) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionLogic {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetingRule {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub condition_logic: ConditionLogic,
    pub variation_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout_percentage: Option<f64>,
}

impl TargetingRule {
    /// Create a rule serving `variation_key` when it matches.
    pub fn new(id: impl Into<String>, variation_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            conditions: Vec::new(),
            condition_logic: ConditionLogic::And,
            variation_key: variation_key.into(),
            rollout_percentage: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set how conditions combine.
    pub fn with_logic(mut self, logic: ConditionLogic) -> Self {
        self.condition_logic = logic;
        self
    }

    /// Serve the rule only to this percentage of matching contexts.
    pub fn with_rollout(mut self, percentage: f64) -> Self {
        self.rollout_percentage = Some(percentage);
        self
    }
}

/// Validated per-environment configuration of one flag.
///
/// Built from a [`RawEnvironmentFlagConfig`] by
/// [`ConfigLoader`](crate::engine::ConfigLoader); the evaluator assumes the
/// rule list is well formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentFlagConfig {
    pub enabled: bool,
    #[serde(default)]
    pub default_variation_key: Option<String>,
    #[serde(default)]
    pub fallback_variation_key: Option<String>,
    #[serde(default)]
    pub targeting_rules: Vec<TargetingRule>,
    #[serde(default)]
    pub rollout_percentage: Option<f64>,
}

impl EnvironmentFlagConfig {
    /// Create a config with no rules.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            default_variation_key: None,
            fallback_variation_key: None,
            targeting_rules: Vec::new(),
            rollout_percentage: None,
        }
    }

    /// Set the variation served when no rule matches.
    pub fn with_default_variation(mut self, key: impl Into<String>) -> Self {
        self.default_variation_key = Some(key.into());
        self
    }

    /// Set the variation served when the default is missing.
    pub fn with_fallback_variation(mut self, key: impl Into<String>) -> Self {
        self.fallback_variation_key = Some(key.into());
        self
    }

    /// Add a targeting rule.
    pub fn with_rule(mut self, rule: TargetingRule) -> Self {
        self.targeting_rules.push(rule);
        self
    }

    /// Set the global rollout percentage.
    pub fn with_rollout(mut self, percentage: f64) -> Self {
        self.rollout_percentage = Some(percentage);
        self
    }
}

/// Configuration record as handed over by the persistence layer.
///
/// `targeting_rules` is whatever was stored: a JSON array, a string holding
/// JSON, or anything else.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEnvironmentFlagConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub default_variation_key: Option<String>,
    #[serde(default)]
    pub fallback_variation_key: Option<String>,
    #[serde(default)]
    pub targeting_rules: serde_json::Value,
    #[serde(default)]
    pub rollout_percentage: Option<f64>,
}

/// One servable value of a flag, in its stored (string) form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    pub key: String,
    pub value: String,
}

impl Variation {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    pub key: String,
    pub flag_type: FlagType,
    #[serde(default)]
    pub variations: Vec<Variation>,
    #[serde(default)]
    pub archived: bool,
}

impl Flag {
    /// Create a flag with no variations.
    pub fn new(key: impl Into<String>, flag_type: FlagType) -> Self {
        Self {
            key: key.into(),
            flag_type,
            variations: Vec::new(),
            archived: false,
        }
    }

    /// A boolean flag with the conventional `true` / `false` variations.
    pub fn boolean(key: impl Into<String>) -> Self {
        Self::new(key, FlagType::Boolean)
            .with_variation("true", "true")
            .with_variation("false", "false")
    }

    /// Add a variation with its stored value.
    pub fn with_variation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variations.push(Variation::new(key, value));
        self
    }

    /// Mark the flag archived. Archived flags are never served.
    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = archived;
        self
    }
}
