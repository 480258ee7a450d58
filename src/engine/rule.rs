use crate::engine::ConditionEvaluator;
use crate::types::{ConditionLogic, EvaluationContext, TargetingRule};

/// Combines a rule's conditions into a single match decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator {
    conditions: ConditionEvaluator,
}

impl RuleEvaluator {
    /// Create a rule evaluator.
    pub fn new() -> Self {
        Self::default()
    }

    /// A rule without conditions always matches.
    pub fn evaluate(&self, rule: &TargetingRule, context: &EvaluationContext) -> bool {
        if rule.conditions.is_empty() {
            return true;
        }

        let mut results = rule
            .conditions
            .iter()
            .map(|condition| self.conditions.evaluate(condition, context));

        match rule.condition_logic {
            ConditionLogic::And => results.all(|matched| matched),
            ConditionLogic::Or => results.any(|matched| matched),
        }
    }
}
