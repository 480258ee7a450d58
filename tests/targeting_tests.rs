use flagwise::{
    Condition, ConditionEvaluator, ConditionLogic, EvaluationContext, FlagValue, Operator,
    RuleEvaluator, TargetingRule,
};
use serde_json::json;

fn context() -> EvaluationContext {
    EvaluationContext::with_user_id("user-123")
        .attribute("email", "ana@example.com")
        .attribute("plan", "pro")
        .attribute("age", 30)
        .attribute("country", "NZ")
}

fn check(attribute: &str, operator: Operator, value: impl Into<FlagValue>) -> bool {
    ConditionEvaluator::new().evaluate(&Condition::new(attribute, operator, value), &context())
}

mod condition_tests {
    use super::*;

    #[test]
    fn test_equality() {
        assert!(check("plan", Operator::Equals, "pro"));
        assert!(!check("plan", Operator::Equals, "free"));
        assert!(check("plan", Operator::NotEquals, "free"));
        assert!(check("userId", Operator::Equals, "user-123"));
    }

    #[test]
    fn test_string_operators() {
        assert!(check("email", Operator::Contains, "@example"));
        assert!(check("email", Operator::NotContains, "@other"));
        assert!(check("email", Operator::StartsWith, "ana"));
        assert!(check("email", Operator::EndsWith, ".com"));
        assert!(!check("age", Operator::Contains, "3"));
    }

    #[test]
    fn test_membership() {
        assert!(check("country", Operator::In, json!(["NZ", "AU"])));
        assert!(!check("country", Operator::NotIn, json!(["NZ", "AU"])));
        assert!(check("age", Operator::In, json!([30, 40])));
        assert!(!check("country", Operator::In, "NZ"));
    }

    #[test]
    fn test_numeric_comparisons() {
        assert!(check("age", Operator::GreaterThan, 18));
        assert!(check("age", Operator::GreaterThanOrEqual, 30));
        assert!(check("age", Operator::LessThanOrEqual, 30));
        assert!(!check("age", Operator::LessThan, 30));
        assert!(!check("plan", Operator::GreaterThan, 1));
    }

    #[test]
    fn test_regex() {
        assert!(check("email", Operator::Matches, r"^[a-z]+@example\.com$"));
        assert!(check("email", Operator::NotMatches, r"^admin@"));
    }

    #[test]
    fn test_invalid_regex_is_non_match() {
        assert!(!check("email", Operator::Matches, "(unclosed"));
        assert!(!check("email", Operator::NotMatches, "(unclosed"));
    }

    #[test]
    fn test_missing_attribute_is_non_match() {
        assert!(!check("missing", Operator::Equals, "x"));
        assert!(!check("missing", Operator::NotEquals, "x"));
    }

    #[test]
    fn test_unknown_operator_is_non_match() {
        let condition: Condition = serde_json::from_value(json!({
            "attribute": "plan",
            "operator": "semverGreaterThan",
            "value": "pro",
        }))
        .unwrap();

        assert_eq!(condition.operator, Operator::Unknown);
        assert!(!ConditionEvaluator::new().evaluate(&condition, &context()));
    }

    #[test]
    fn test_regex_alias() {
        let condition: Condition = serde_json::from_value(json!({
            "attribute": "plan",
            "operator": "regex",
            "value": "^p",
        }))
        .unwrap();

        assert_eq!(condition.operator, Operator::Matches);
    }
}

mod rule_tests {
    use super::*;

    fn rule(logic: ConditionLogic, first: bool, second: bool) -> TargetingRule {
        let value = |matches: bool| if matches { "pro" } else { "free" };
        TargetingRule::new("r", "on")
            .with_logic(logic)
            .with_condition(Condition::new("plan", Operator::Equals, value(first)))
            .with_condition(Condition::new("plan", Operator::Equals, value(second)))
    }

    #[test]
    fn test_and_requires_all() {
        let evaluator = RuleEvaluator::new();
        for (a, b) in [(true, true), (true, false), (false, true), (false, false)] {
            assert_eq!(evaluator.evaluate(&rule(ConditionLogic::And, a, b), &context()), a && b);
        }
    }

    #[test]
    fn test_or_requires_any() {
        let evaluator = RuleEvaluator::new();
        for (a, b) in [(true, true), (true, false), (false, true), (false, false)] {
            assert_eq!(evaluator.evaluate(&rule(ConditionLogic::Or, a, b), &context()), a || b);
        }
    }

    #[test]
    fn test_empty_rule_always_matches() {
        let evaluator = RuleEvaluator::new();
        assert!(evaluator.evaluate(&TargetingRule::new("all", "on"), &EvaluationContext::new()));
        assert!(evaluator.evaluate(
            &TargetingRule::new("all", "on").with_logic(ConditionLogic::Or),
            &EvaluationContext::new()
        ));
    }

    #[test]
    fn test_logic_wire_names() {
        let rule: TargetingRule = serde_json::from_value(json!({
            "id": "r",
            "conditions": [],
            "conditionLogic": "OR",
            "variationKey": "on",
        }))
        .unwrap();
        assert_eq!(rule.condition_logic, ConditionLogic::Or);
    }
}
