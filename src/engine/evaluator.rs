use crate::engine::variation::{decode_value, resolve_variation};
use crate::engine::{RolloutBucketer, RuleEvaluator};
use crate::error::ErrorCode;
use crate::types::{
    EnvironmentFlagConfig, EvaluationContext, EvaluationReason, Flag, FlagEvaluationResult,
    FlagType, FlagValue, Variation,
};

/// Turns a flag's configuration and a context into a served value.
///
/// Decision order:
/// 1. no config: `NO_CONFIG`
/// 2. config disabled: `DISABLED`, serving the fallback variation
/// 3. first matching rule whose own rollout includes the user: `TARGETING_RULE:<id>`
/// 4. global rollout configured: `ROLLOUT_INCLUDED` / `ROLLOUT_NOT_INCLUDED`
/// 5. otherwise `DEFAULT`
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagEvaluator {
    rules: RuleEvaluator,
    bucketer: RolloutBucketer,
}

/// What the decision policy chose, before looking up the variation.
struct Decision<'a> {
    key: Option<&'a str>,
    sentinel: bool,
    enabled: bool,
    reason: EvaluationReason,
}

impl FlagEvaluator {
    /// Create an evaluator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates `flag` with its per-environment `config`, if one exists.
    pub fn evaluate_flag(
        &self,
        flag: &Flag,
        config: Option<&EnvironmentFlagConfig>,
        context: &EvaluationContext,
    ) -> FlagEvaluationResult {
        self.evaluate(config, &flag.key, flag.flag_type, &flag.variations, context)
    }

    /// Evaluates a flag given as its parts.
    ///
    /// A flag with no variations yields a `CONFIGURATION_ERROR` result with a
    /// null value, logged under `EVAL_CONFIGURATION_ERROR`.
    pub fn evaluate(
        &self,
        config: Option<&EnvironmentFlagConfig>,
        flag_key: &str,
        flag_type: FlagType,
        variations: &[Variation],
        context: &EvaluationContext,
    ) -> FlagEvaluationResult {
        let decision = self.decide(config, flag_key, context);
        let default_key = config.and_then(|c| c.default_variation_key.as_deref());

        match resolve_variation(variations, decision.key, default_key, decision.sentinel) {
            Some(variation) => FlagEvaluationResult {
                flag_key: flag_key.to_string(),
                value: decode_value(flag_type, &variation.value),
                variation_key: Some(variation.key.clone()),
                enabled: decision.enabled,
                reason: decision.reason,
            },
            None => {
                tracing::warn!(
                    flag_key,
                    code = %ErrorCode::EvalConfigurationError,
                    reason = %decision.reason,
                    "Flag has no variations to serve"
                );
                FlagEvaluationResult {
                    flag_key: flag_key.to_string(),
                    value: FlagValue::Null,
                    variation_key: None,
                    enabled: decision.enabled,
                    reason: EvaluationReason::ConfigurationError,
                }
            }
        }
    }

    fn decide<'a>(
        &self,
        config: Option<&'a EnvironmentFlagConfig>,
        flag_key: &str,
        context: &EvaluationContext,
    ) -> Decision<'a> {
        let Some(config) = config else {
            return Decision {
                key: None,
                sentinel: false,
                enabled: false,
                reason: EvaluationReason::NoConfig,
            };
        };

        if !config.enabled {
            return Decision {
                key: config.fallback_variation_key.as_deref(),
                sentinel: false,
                enabled: false,
                reason: EvaluationReason::Disabled,
            };
        }

        let user_id = context.user_id.as_deref();

        for rule in &config.targeting_rules {
            if !self.rules.evaluate(rule, context) {
                continue;
            }

            let reason = match rule.rollout_percentage {
                Some(p) if p < 100.0 => {
                    if !self.bucketer.is_in_rollout(flag_key, user_id, p) {
                        continue;
                    }
                    EvaluationReason::targeting_rule_rollout(rule.id.as_str())
                }
                _ => EvaluationReason::targeting_rule(rule.id.as_str()),
            };

            return Decision {
                key: Some(rule.variation_key.as_str()),
                sentinel: true,
                enabled: true,
                reason,
            };
        }

        let default_key = config.default_variation_key.as_deref();

        match config.rollout_percentage {
            Some(p) if p > 0.0 => {
                let included = self.bucketer.is_in_rollout(flag_key, user_id, p);
                Decision {
                    key: default_key,
                    sentinel: included,
                    // Excluded users still report enabled; see DESIGN.md.
                    enabled: true,
                    reason: if included {
                        EvaluationReason::RolloutIncluded
                    } else {
                        EvaluationReason::RolloutNotIncluded
                    },
                }
            }
            _ => Decision {
                key: default_key,
                sentinel: true,
                enabled: true,
                reason: EvaluationReason::Default,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Condition, Operator, TargetingRule};

    fn flag() -> Flag {
        Flag::boolean("checkout")
    }

    #[test]
    fn test_rule_rollout_zero_falls_through() {
        let config = EnvironmentFlagConfig::new(true)
            .with_rule(TargetingRule::new("never", "false").with_rollout(0.0))
            .with_default_variation("true");
        let result = FlagEvaluator::new().evaluate_flag(
            &flag(),
            Some(&config),
            &EvaluationContext::with_user_id("u1"),
        );
        assert_eq!(result.reason, EvaluationReason::Default);
    }

    #[test]
    fn test_rule_rollout_hundred_has_no_suffix() {
        let config = EnvironmentFlagConfig::new(true)
            .with_rule(TargetingRule::new("all", "true").with_rollout(100.0));
        let result = FlagEvaluator::new().evaluate_flag(
            &flag(),
            Some(&config),
            &EvaluationContext::new(),
        );
        assert_eq!(result.reason, EvaluationReason::targeting_rule("all"));
    }

    #[test]
    fn test_rule_rollout_without_user_is_excluded() {
        let config = EnvironmentFlagConfig::new(true)
            .with_rule(
                TargetingRule::new("half", "false")
                    .with_condition(Condition::new("plan", Operator::Equals, "pro"))
                    .with_rollout(50.0),
            );
        let context = EvaluationContext::new().attribute("plan", "pro");
        let result = FlagEvaluator::new().evaluate_flag(&flag(), Some(&config), &context);
        assert_eq!(result.reason, EvaluationReason::Default);
    }
}
