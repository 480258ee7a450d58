use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

mod context;
mod targeting;

pub use context::{EvaluationContext, EvaluationContextBuilder};
pub use targeting::{
    Condition, ConditionLogic, EnvironmentFlagConfig, Flag, Operator, RawEnvironmentFlagConfig,
    TargetingRule, Variation,
};

/// Evaluated flag map for one environment, keyed by flag key.
pub type FlagSnapshot = HashMap<String, FlagEvaluationResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    Boolean,
    String,
    Number,
    Json,
}

/// A typed flag value, attribute value or condition operand.
///
/// Deserializes from plain JSON: `null`, booleans, strings and numbers map to
/// their scalar variants, arrays and objects land in `Json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Null,
    Bool(bool),
    String(String),
    Number(f64),
    Json(serde_json::Value),
}

impl FlagValue {
    /// Get as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as string.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FlagValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FlagValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as integer, truncating.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FlagValue::Number(n) => Some(*n as i64),
            _ => None,
        }
    }

    /// Get as an object or array.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            FlagValue::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Elements of an array value, if this is one.
    pub fn as_array(&self) -> Option<&[serde_json::Value]> {
        match self {
            FlagValue::Json(serde_json::Value::Array(items)) => Some(items),
            _ => None,
        }
    }

    /// Check if null.
    pub fn is_null(&self) -> bool {
        matches!(self, FlagValue::Null)
    }

    /// Compares against a raw JSON element, treating numbers by value.
    pub fn eq_json(&self, other: &serde_json::Value) -> bool {
        match (self, other) {
            (FlagValue::Null, serde_json::Value::Null) => true,
            (FlagValue::Bool(a), serde_json::Value::Bool(b)) => a == b,
            (FlagValue::String(a), serde_json::Value::String(b)) => a == b,
            (FlagValue::Number(a), serde_json::Value::Number(b)) => b.as_f64() == Some(*a),
            (FlagValue::Json(a), b) => a == b,
            _ => false,
        }
    }

    /// The flag type this value would have.
    pub fn inferred_type(&self) -> FlagType {
        match self {
            FlagValue::Bool(_) => FlagType::Boolean,
            FlagValue::String(_) => FlagType::String,
            FlagValue::Number(_) => FlagType::Number,
            FlagValue::Json(_) | FlagValue::Null => FlagType::Json,
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        FlagValue::String(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::String(value.to_string())
    }
}

impl From<f64> for FlagValue {
    fn from(value: f64) -> Self {
        FlagValue::Number(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Number(value as f64)
    }
}

impl From<i32> for FlagValue {
    fn from(value: i32) -> Self {
        FlagValue::Number(value as f64)
    }
}

impl From<serde_json::Value> for FlagValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => FlagValue::Bool(b),
            serde_json::Value::String(s) => FlagValue::String(s),
            serde_json::Value::Number(n) => FlagValue::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::Null => FlagValue::Null,
            other => FlagValue::Json(other),
        }
    }
}

const TARGETING_RULE_PREFIX: &str = "TARGETING_RULE:";
const ROLLOUT_SUFFIX: &str = ":ROLLOUT";

/// Why an evaluation produced its value.
///
/// The wire form is a single string such as `DEFAULT` or
/// `TARGETING_RULE:beta-users:ROLLOUT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EvaluationReason {
    Default,
    TargetingRule { rule_id: String, rollout: bool },
    RolloutIncluded,
    RolloutNotIncluded,
    Disabled,
    NoConfig,
    /// The flag has no variation that could be served.
    ConfigurationError,
}

impl EvaluationReason {
    /// A rule match without rollout.
    pub fn targeting_rule(rule_id: impl Into<String>) -> Self {
        EvaluationReason::TargetingRule {
            rule_id: rule_id.into(),
            rollout: false,
        }
    }

    /// A rule match that passed the rule's partial rollout.
    pub fn targeting_rule_rollout(rule_id: impl Into<String>) -> Self {
        EvaluationReason::TargetingRule {
            rule_id: rule_id.into(),
            rollout: true,
        }
    }

    /// The matched rule id, for `TARGETING_RULE` reasons.
    pub fn rule_id(&self) -> Option<&str> {
        match self {
            EvaluationReason::TargetingRule { rule_id, .. } => Some(rule_id),
            _ => None,
        }
    }
}

impl fmt::Display for EvaluationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationReason::Default => f.write_str("DEFAULT"),
            EvaluationReason::TargetingRule { rule_id, rollout } => {
                write!(f, "{}{}", TARGETING_RULE_PREFIX, rule_id)?;
                if *rollout {
                    f.write_str(ROLLOUT_SUFFIX)?;
                }
                Ok(())
            }
            EvaluationReason::RolloutIncluded => f.write_str("ROLLOUT_INCLUDED"),
            EvaluationReason::RolloutNotIncluded => f.write_str("ROLLOUT_NOT_INCLUDED"),
            EvaluationReason::Disabled => f.write_str("DISABLED"),
            EvaluationReason::NoConfig => f.write_str("NO_CONFIG"),
            EvaluationReason::ConfigurationError => f.write_str("CONFIGURATION_ERROR"),
        }
    }
}

impl FromStr for EvaluationReason {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "DEFAULT" => Ok(EvaluationReason::Default),
            "ROLLOUT_INCLUDED" => Ok(EvaluationReason::RolloutIncluded),
            "ROLLOUT_NOT_INCLUDED" => Ok(EvaluationReason::RolloutNotIncluded),
            "DISABLED" => Ok(EvaluationReason::Disabled),
            "NO_CONFIG" => Ok(EvaluationReason::NoConfig),
            "CONFIGURATION_ERROR" => Ok(EvaluationReason::ConfigurationError),
            other => {
                let rest = other
                    .strip_prefix(TARGETING_RULE_PREFIX)
                    .ok_or_else(|| format!("unknown evaluation reason: {}", other))?;
                let (rule_id, rollout) = match rest.strip_suffix(ROLLOUT_SUFFIX) {
                    Some(id) => (id, true),
                    None => (rest, false),
                };
                if rule_id.is_empty() {
                    return Err(format!("missing rule id in reason: {}", other));
                }
                Ok(EvaluationReason::TargetingRule {
                    rule_id: rule_id.to_string(),
                    rollout,
                })
            }
        }
    }
}

impl Serialize for EvaluationReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EvaluationReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The outcome of evaluating one flag for one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagEvaluationResult {
    pub flag_key: String,
    pub value: FlagValue,
    #[serde(default)]
    pub variation_key: Option<String>,
    pub enabled: bool,
    pub reason: EvaluationReason,
}

impl FlagEvaluationResult {
    pub fn new(
        flag_key: impl Into<String>,
        value: FlagValue,
        variation_key: Option<String>,
        enabled: bool,
        reason: EvaluationReason,
    ) -> Self {
        Self {
            flag_key: flag_key.into(),
            value,
            variation_key,
            enabled,
            reason,
        }
    }

    pub fn bool_value(&self) -> Option<bool> {
        self.value.as_bool()
    }

    pub fn string_value(&self) -> Option<&str> {
        self.value.as_string()
    }

    pub fn number_value(&self) -> Option<f64> {
        self.value.as_number()
    }

    pub fn json_value(&self) -> Option<&serde_json::Value> {
        self.value.as_json()
    }

    /// Whether the flag had nothing to serve.
    pub fn is_configuration_error(&self) -> bool {
        self.reason == EvaluationReason::ConfigurationError
    }
}
