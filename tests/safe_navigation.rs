use jexl_engine::{evaluate, evaluate_with, Context, Error, Value};
use serde_json::json;

fn ctx(json: serde_json::Value) -> Context {
    match Value::from(json) {
        Value::Object(map) => map.into_iter().collect(),
        _ => Context::new(),
    }
}

#[test]
fn test_member_access_basic() {
    let vars = ctx(json!({"user": {"name": "John", "age": 30}}));
    assert_eq!(evaluate_with("user.name", &vars).unwrap(), Value::from("John"));
    assert_eq!(evaluate_with("user['age'] + 1", &vars).unwrap(), Value::Number(31.0));
}

#[test]
fn test_missing_property_is_null() {
    let vars = ctx(json!({"user": {"name": "John"}}));
    assert_eq!(evaluate_with("user.missing_property", &vars).unwrap(), Value::Null);
}

#[test]
fn test_property_of_null_is_null() {
    let vars = ctx(json!({"nothing": null}));
    assert_eq!(evaluate_with("nothing.anything", &vars).unwrap(), Value::Null);
    assert_eq!(evaluate_with("nothing.a.b.c", &vars).unwrap(), Value::Null);
}

#[test]
fn test_chained_and_indexed() {
    let vars = ctx(json!({"doc": {"rows": [{"profile": {"name": "Jane"}}, {"profile": null}]}}));
    assert_eq!(evaluate_with("doc.rows[0].profile.name", &vars).unwrap(), Value::from("Jane"));
    assert_eq!(evaluate_with("doc.rows[1].profile.name", &vars).unwrap(), Value::Null);
    assert_eq!(evaluate_with("doc.rows[7]", &vars).unwrap(), Value::Null);
    assert_eq!(evaluate_with("doc.rows[2 - 2].profile['na' + 'me']", &vars).unwrap(), Value::from("Jane"));
}

#[test]
fn test_property_of_scalar_is_a_type_error() {
    assert!(matches!(evaluate("(1).x"), Err(Error::TypeMismatch(_))));
    assert_eq!(evaluate("{a: {b: 2}}.a.b").unwrap(), Value::Number(2.0));
}
