//! Conversion of persisted flag configuration into evaluator input.
//!
//! Malformed targeting data never fails a load: an unreadable rule list
//! becomes empty, and individual rules that do not decode or validate are
//! dropped.

use std::collections::HashSet;

use crate::types::{EnvironmentFlagConfig, RawEnvironmentFlagConfig, TargetingRule};

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Create a loader.
    pub fn new() -> Self {
        Self
    }

    /// Convert a stored config into its evaluator form.
    pub fn load(&self, raw: RawEnvironmentFlagConfig) -> EnvironmentFlagConfig {
        let targeting_rules = self.parse_targeting_rules(&raw.targeting_rules);
        let rollout_percentage = raw
            .rollout_percentage
            .filter(|p| !p.is_nan())
            .map(|p| p.clamp(0.0, 100.0));

        EnvironmentFlagConfig {
            enabled: raw.enabled,
            default_variation_key: raw.default_variation_key,
            fallback_variation_key: raw.fallback_variation_key,
            targeting_rules,
            rollout_percentage,
        }
    }

    /// Decodes a stored rule list, keeping only well-formed rules in order.
    pub fn parse_targeting_rules(&self, raw: &serde_json::Value) -> Vec<TargetingRule> {
        let parsed;
        let items = match raw {
            serde_json::Value::Array(items) => items,
            serde_json::Value::String(text) => match serde_json::from_str(text) {
                Ok(serde_json::Value::Array(items)) => {
                    parsed = items;
                    &parsed
                }
                Ok(_) => {
                    tracing::warn!("Targeting rules text is not a JSON array, using no rules");
                    return Vec::new();
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Unparseable targeting rules, using no rules");
                    return Vec::new();
                }
            },
            serde_json::Value::Null => return Vec::new(),
            _ => {
                tracing::warn!("Targeting rules are not a list, using no rules");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let rule = match serde_json::from_value::<TargetingRule>(item.clone()) {
                Ok(rule) => rule,
                Err(err) => {
                    tracing::warn!(index, error = %err, "Dropping undecodable targeting rule");
                    continue;
                }
            };

            if let Err(problem) = validate_rule(&rule) {
                tracing::warn!(index, rule_id = %rule.id, problem, "Dropping invalid targeting rule");
                continue;
            }

            if !seen.insert(rule.id.clone()) {
                tracing::warn!(index, rule_id = %rule.id, "Dropping targeting rule with duplicate id");
                continue;
            }

            rules.push(rule);
        }

        rules
    }
}

fn validate_rule(rule: &TargetingRule) -> Result<(), &'static str> {
    if rule.id.trim().is_empty() {
        return Err("empty rule id");
    }
    if rule.variation_key.is_empty() {
        return Err("empty variation key");
    }
    if let Some(p) = rule.rollout_percentage {
        if !(0.0..=100.0).contains(&p) {
            return Err("rollout percentage outside 0..=100");
        }
    }
    if rule.conditions.iter().any(|c| c.attribute.is_empty()) {
        return Err("condition without attribute");
    }
    Ok(())
}
