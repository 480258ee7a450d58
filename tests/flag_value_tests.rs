use flagwise::engine::variation::decode_value;
use flagwise::{FlagType, FlagValue};
use serde_json::json;

#[test]
fn test_bool_value() {
    let value = FlagValue::Bool(true);

    assert_eq!(value.as_bool(), Some(true));
    assert!(value.as_string().is_none());
    assert!(value.as_number().is_none());
}

#[test]
fn test_string_value() {
    let value = FlagValue::String("hello".to_string());

    assert_eq!(value.as_string(), Some("hello"));
    assert!(value.as_bool().is_none());
    assert!(value.as_number().is_none());
}

#[test]
fn test_number_value() {
    let value = FlagValue::Number(42.5);

    assert_eq!(value.as_number(), Some(42.5));
    assert_eq!(value.as_int(), Some(42));
    assert!(value.as_bool().is_none());
}

#[test]
fn test_json_value() {
    let json = json!({"key": "value"});
    let value = FlagValue::Json(json.clone());

    assert_eq!(value.as_json(), Some(&json));
    assert!(value.as_array().is_none());
}

#[test]
fn test_array_value() {
    let value = FlagValue::from(json!(["a", 1]));

    assert_eq!(value.as_array().map(|items| items.len()), Some(2));
}

#[test]
fn test_from_json_scalars() {
    assert_eq!(FlagValue::from(json!(true)), FlagValue::Bool(true));
    assert_eq!(FlagValue::from(json!("x")), FlagValue::String("x".into()));
    assert_eq!(FlagValue::from(json!(3)), FlagValue::Number(3.0));
    assert!(FlagValue::from(json!(null)).is_null());
}

#[test]
fn test_deserialize_untagged() {
    let values: Vec<FlagValue> = serde_json::from_str(r#"[null, false, "on", 1.5, {"a": 1}]"#).unwrap();

    assert_eq!(
        values,
        vec![
            FlagValue::Null,
            FlagValue::Bool(false),
            FlagValue::String("on".into()),
            FlagValue::Number(1.5),
            FlagValue::Json(json!({"a": 1})),
        ]
    );
}

#[test]
fn test_inferred_type() {
    assert_eq!(FlagValue::Bool(true).inferred_type(), FlagType::Boolean);
    assert_eq!(FlagValue::from("s").inferred_type(), FlagType::String);
    assert_eq!(FlagValue::from(1_i32).inferred_type(), FlagType::Number);
    assert_eq!(FlagValue::Json(json!([])).inferred_type(), FlagType::Json);
}

#[test]
fn test_eq_json_compares_numbers_by_value() {
    assert!(FlagValue::Number(5.0).eq_json(&json!(5)));
    assert!(!FlagValue::String("5".into()).eq_json(&json!(5)));
}

mod decode_tests {
    use super::*;

    #[test]
    fn test_decode_boolean() {
        assert_eq!(decode_value(FlagType::Boolean, "true"), FlagValue::Bool(true));
        assert_eq!(decode_value(FlagType::Boolean, " false "), FlagValue::Bool(false));
        assert_eq!(
            decode_value(FlagType::Boolean, "yes"),
            FlagValue::String("yes".into())
        );
    }

    #[test]
    fn test_decode_number() {
        assert_eq!(decode_value(FlagType::Number, "12.5"), FlagValue::Number(12.5));
        assert_eq!(decode_value(FlagType::Number, "abc"), FlagValue::String("abc".into()));
    }

    #[test]
    fn test_decode_string() {
        assert_eq!(decode_value(FlagType::String, "plain"), FlagValue::String("plain".into()));
        assert_eq!(
            decode_value(FlagType::String, "\"quoted\""),
            FlagValue::String("quoted".into())
        );
    }

    #[test]
    fn test_decode_json() {
        assert_eq!(
            decode_value(FlagType::Json, r#"{"limit": 10}"#),
            FlagValue::Json(json!({"limit": 10}))
        );
        assert!(decode_value(FlagType::Json, "null").is_null());
        assert_eq!(decode_value(FlagType::Json, "{oops"), FlagValue::String("{oops".into()));
    }
}
