use flagwise::{EvaluationContext, EvaluationContextBuilder, FlagValue};
use std::collections::HashMap;

#[test]
fn test_empty_context() {
    let context = EvaluationContext::new();

    assert!(context.user_id.is_none());
    assert!(context.session_id.is_none());
    assert!(context.attributes.is_empty());
    assert!(context.is_empty());
}

#[test]
fn test_context_with_user_id() {
    let context = EvaluationContext::with_user_id("user-123");

    assert_eq!(context.user_id, Some("user-123".to_string()));
    assert!(!context.is_empty());
}

#[test]
fn test_context_builder() {
    let context = EvaluationContextBuilder::new()
        .user_id("user-123")
        .session_id("sess-9")
        .attribute("plan", "premium")
        .attribute("beta", true)
        .build();

    assert_eq!(context.user_id.as_deref(), Some("user-123"));
    assert_eq!(context.session_id.as_deref(), Some("sess-9"));
    assert_eq!(context.get("plan"), Some(&FlagValue::from("premium")));
    assert_eq!(context.get("beta"), Some(&FlagValue::Bool(true)));
}

#[test]
fn test_context_chained_methods() {
    let context = EvaluationContext::new()
        .user_id("user-456")
        .attribute("role", "admin")
        .attribute("count", 10_i32);

    assert_eq!(context.user_id.as_deref(), Some("user-456"));
    assert_eq!(context.get("count").and_then(|v| v.as_number()), Some(10.0));
}

#[test]
fn test_attributes_extend() {
    let mut extra = HashMap::new();
    extra.insert("country".to_string(), FlagValue::from("NZ"));

    let context = EvaluationContext::new()
        .attribute("plan", "free")
        .attributes(extra);

    assert_eq!(context.attributes.len(), 2);
}

#[test]
fn test_resolve_identity_attributes() {
    let context = EvaluationContext::with_user_id("u1")
        .session_id("s1")
        .attribute("userId", "shadowed");

    assert_eq!(context.resolve("userId"), Some(FlagValue::from("u1")));
    assert_eq!(context.resolve("sessionId"), Some(FlagValue::from("s1")));
    assert_eq!(context.resolve("missing"), None);
}

#[test]
fn test_resolve_absent_identity() {
    let context = EvaluationContext::new().attribute("plan", "pro");

    assert_eq!(context.resolve("userId"), None);
    assert_eq!(context.resolve("plan"), Some(FlagValue::from("pro")));
}

#[test]
fn test_serialization_is_camel_case() {
    let context = EvaluationContext::with_user_id("u1").attribute("plan", "pro");
    let json = serde_json::to_value(&context).unwrap();

    assert_eq!(json["userId"], "u1");
    assert_eq!(json["attributes"]["plan"], "pro");
    assert!(json.get("sessionId").is_none());

    let back: EvaluationContext = serde_json::from_value(json).unwrap();
    assert_eq!(back, context);
}
