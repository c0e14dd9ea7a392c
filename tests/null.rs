use jexl_engine::{evaluate, evaluate_with, Context, Error, Value};
use serde_json::json;

fn b(v: Value) -> bool {
    match v {
        Value::Boolean(b) => b,
        other => panic!("expected boolean, got {:?}", other),
    }
}

#[test]
fn test_falsy_values() {
    for falsy in ["null", "false", "0", "''", "[]", "{}"] {
        assert!(b(evaluate(&format!("!{}", falsy)).unwrap()), "{} should be falsy", falsy);
    }
    for truthy in ["true", "1", "-1", "'a'", "[0]", "{a: null}"] {
        assert!(!b(evaluate(&format!("!{}", truthy)).unwrap()), "{} should be truthy", truthy);
    }
}

#[test]
fn test_null_equality() {
    assert!(b(evaluate("null == null").unwrap()));
    assert!(!b(evaluate("null == 0").unwrap()));
    assert!(b(evaluate("null != ''").unwrap()));
}

#[test]
fn test_null_in_aggregates() {
    assert_eq!(evaluate("[null, 2, null, 5]|sum").unwrap(), Value::Number(7.0));
    assert_eq!(evaluate("[]|min").unwrap(), Value::Null);
    assert_eq!(evaluate("null|count").unwrap(), Value::Number(0.0));
    assert_eq!(evaluate("null|round").unwrap(), Value::Null);
}

#[test]
fn test_missing_identifier_is_an_error() {
    let err = evaluate("missing + 1").unwrap_err();
    assert_eq!(err, Error::UndefinedIdentifier("missing".into()));
    assert_eq!(err.to_string(), "Identifier 'missing' is not defined");
}

#[test]
fn test_null_coalescing_with_or() {
    let mut ctx = Context::new();
    ctx.insert("value".into(), Value::Null);
    assert_eq!(evaluate_with("value || 'default'", &ctx).unwrap(), Value::from("default"));
    ctx.insert("value".into(), Value::from(json!("set")));
    assert_eq!(evaluate_with("value || 'default'", &ctx).unwrap(), Value::from("set"));
}
