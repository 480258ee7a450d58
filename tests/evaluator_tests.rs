use flagwise::{
    Condition, EnvironmentFlagConfig, EvaluationContext, EvaluationReason, Flag, FlagEvaluator,
    FlagType, FlagValue, Operator, TargetingRule,
};
use serde_json::json;

fn evaluate(flag: &Flag, config: Option<&EnvironmentFlagConfig>, context: &EvaluationContext) -> flagwise::FlagEvaluationResult {
    FlagEvaluator::new().evaluate_flag(flag, config, context)
}

#[test]
fn test_disabled_serves_fallback() {
    let flag = Flag::boolean("checkout");
    let config = EnvironmentFlagConfig::new(false).with_fallback_variation("false");

    let result = evaluate(&flag, Some(&config), &EvaluationContext::with_user_id("u1"));

    assert_eq!(result.reason, EvaluationReason::Disabled);
    assert!(!result.enabled);
    assert_eq!(result.variation_key.as_deref(), Some("false"));
    assert_eq!(result.value, FlagValue::Bool(false));
}

#[test]
fn test_disabled_ignores_matching_rules() {
    let flag = Flag::boolean("checkout");
    let config = EnvironmentFlagConfig::new(false).with_rule(TargetingRule::new("all", "true"));

    let result = evaluate(&flag, Some(&config), &EvaluationContext::new());

    assert_eq!(result.reason, EvaluationReason::Disabled);
    assert_eq!(result.variation_key.as_deref(), Some("false"));
}

#[test]
fn test_no_config() {
    let flag = Flag::boolean("checkout");
    let result = evaluate(&flag, None, &EvaluationContext::with_user_id("u1"));

    assert_eq!(result.reason, EvaluationReason::NoConfig);
    assert!(!result.enabled);
    assert_eq!(result.variation_key.as_deref(), Some("false"));
}

#[test]
fn test_user_id_rule_matches() {
    let flag = Flag::new("theme", FlagType::String)
        .with_variation("off", "classic")
        .with_variation("on", "dark");
    let config = EnvironmentFlagConfig::new(true)
        .with_default_variation("off")
        .with_rule(
            TargetingRule::new("r-user", "on")
                .with_condition(Condition::new("userId", Operator::Equals, "user-123")),
        );

    let result = evaluate(&flag, Some(&config), &EvaluationContext::with_user_id("user-123"));

    assert_eq!(result.reason.to_string(), "TARGETING_RULE:r-user");
    assert_eq!(result.variation_key.as_deref(), Some("on"));
    assert_eq!(result.value, FlagValue::String("dark".into()));
    assert!(result.enabled);

    let other = evaluate(&flag, Some(&config), &EvaluationContext::with_user_id("user-999"));
    assert_eq!(other.reason, EvaluationReason::Default);
    assert_eq!(other.variation_key.as_deref(), Some("off"));
}

#[test]
fn test_first_matching_rule_wins() {
    let flag = Flag::boolean("checkout");
    let config = EnvironmentFlagConfig::new(true)
        .with_rule(TargetingRule::new("R1", "true"))
        .with_rule(
            TargetingRule::new("R2", "false")
                .with_condition(Condition::new("plan", Operator::Equals, "pro")),
        );

    for context in [
        EvaluationContext::new(),
        EvaluationContext::with_user_id("u1").attribute("plan", "pro"),
    ] {
        let result = evaluate(&flag, Some(&config), &context);
        assert_eq!(result.reason, EvaluationReason::targeting_rule("R1"));
        assert_eq!(result.variation_key.as_deref(), Some("true"));
    }
}

#[test]
fn test_rule_rollout_excluded_falls_to_next_rule() {
    let flag = Flag::boolean("ruled");
    let config = EnvironmentFlagConfig::new(true)
        .with_rule(TargetingRule::new("canary", "true").with_rollout(20.0))
        .with_rule(TargetingRule::new("rest", "false"));

    // bucket("ruled:user-1") = 12, bucket("ruled:alice") = 21
    let included = evaluate(&flag, Some(&config), &EvaluationContext::with_user_id("user-1"));
    assert_eq!(included.reason.to_string(), "TARGETING_RULE:canary:ROLLOUT");
    assert_eq!(included.value, FlagValue::Bool(true));

    let excluded = evaluate(&flag, Some(&config), &EvaluationContext::with_user_id("alice"));
    assert_eq!(excluded.reason, EvaluationReason::targeting_rule("rest"));
    assert_eq!(excluded.value, FlagValue::Bool(false));
}

#[test]
fn test_global_rollout() {
    let flag = Flag::boolean("rollout-flag");
    let config = EnvironmentFlagConfig::new(true).with_rollout(50.0);

    // bucket("rollout-flag:user-1") = 16, bucket("rollout-flag:alice") = 55
    let included = evaluate(&flag, Some(&config), &EvaluationContext::with_user_id("user-1"));
    assert_eq!(included.reason, EvaluationReason::RolloutIncluded);
    assert_eq!(included.variation_key.as_deref(), Some("true"));

    let excluded = evaluate(&flag, Some(&config), &EvaluationContext::with_user_id("alice"));
    assert_eq!(excluded.reason, EvaluationReason::RolloutNotIncluded);
    assert_eq!(excluded.variation_key.as_deref(), Some("false"));
    assert!(excluded.enabled);
}

#[test]
fn test_global_rollout_without_user() {
    let flag = Flag::boolean("rollout-flag");
    let config = EnvironmentFlagConfig::new(true).with_rollout(100.0);

    let result = evaluate(&flag, Some(&config), &EvaluationContext::new());

    assert_eq!(result.reason, EvaluationReason::RolloutNotIncluded);
}

#[test]
fn test_zero_global_rollout_is_default() {
    let flag = Flag::boolean("rollout-flag");
    let config = EnvironmentFlagConfig::new(true).with_rollout(0.0);

    let result = evaluate(&flag, Some(&config), &EvaluationContext::with_user_id("u1"));

    assert_eq!(result.reason, EvaluationReason::Default);
    assert_eq!(result.value, FlagValue::Bool(true));
}

#[test]
fn test_default_variation_key_overrides_sentinel() {
    let flag = Flag::new("limits", FlagType::Json)
        .with_variation("small", r#"{"max": 10}"#)
        .with_variation("large", r#"{"max": 1000}"#);
    let config = EnvironmentFlagConfig::new(true).with_default_variation("large");

    let result = evaluate(&flag, Some(&config), &EvaluationContext::new());

    assert_eq!(result.variation_key.as_deref(), Some("large"));
    assert_eq!(result.value, FlagValue::Json(json!({"max": 1000})));
}

#[test]
fn test_unknown_key_falls_back_to_first_variation() {
    let flag = Flag::new("limit", FlagType::Number)
        .with_variation("low", "5")
        .with_variation("high", "50");
    let config = EnvironmentFlagConfig::new(true)
        .with_rule(TargetingRule::new("r", "missing"));

    let result = evaluate(&flag, Some(&config), &EvaluationContext::new());

    assert_eq!(result.reason, EvaluationReason::targeting_rule("r"));
    assert_eq!(result.variation_key.as_deref(), Some("low"));
    assert_eq!(result.value, FlagValue::Number(5.0));
}

#[test]
fn test_no_variations_is_configuration_error() {
    let flag = Flag::new("empty", FlagType::String);
    let config = EnvironmentFlagConfig::new(true);

    let result = evaluate(&flag, Some(&config), &EvaluationContext::new());

    assert!(result.is_configuration_error());
    assert!(result.value.is_null());
    assert!(result.variation_key.is_none());
}

#[test]
fn test_evaluator_is_shareable_across_threads() {
    let evaluator = FlagEvaluator::new();
    let flag = Flag::boolean("rollout-flag");
    let config = EnvironmentFlagConfig::new(true).with_rollout(50.0);

    std::thread::scope(|scope| {
        for i in 0..4 {
            let (evaluator, flag, config) = (&evaluator, &flag, &config);
            scope.spawn(move || {
                let context = EvaluationContext::with_user_id(format!("user-{}", i));
                let first = evaluator.evaluate_flag(flag, Some(config), &context);
                let second = evaluator.evaluate_flag(flag, Some(config), &context);
                assert_eq!(first, second);
            });
        }
    });
}

#[derive(Clone, Default)]
struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_configuration_error_is_logged_with_code() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    let flag = Flag::new("empty", FlagType::String);
    let result = tracing::subscriber::with_default(subscriber, || {
        evaluate(&flag, None, &EvaluationContext::new())
    });

    assert!(result.is_configuration_error());
    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("EVAL_CONFIGURATION_ERROR"), "{}", output);
    assert!(output.contains("empty"));
}
