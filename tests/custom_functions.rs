use jexl_engine::{Context, Error, Jexl, Registry, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn double(subject: &Value, _args: &[Value]) -> Result<Value, Error> {
    let num = subject
        .as_number()
        .ok_or_else(|| Error::type_mismatch("double expects a number"))?;
    Ok(Value::Number(num * 2.0))
}

fn prefix(subject: &Value, args: &[Value]) -> Result<Value, Error> {
    let text = subject.as_str().ok_or_else(|| Error::type_mismatch("prefix expects a string"))?;
    let prefix = args.first().and_then(Value::as_str).unwrap_or("");
    Ok(Value::String(format!("{}{}", prefix, text)))
}

fn engine() -> Jexl {
    let mut registry = Registry::standard();
    registry.register_transform("double", double).unwrap();
    registry.register_transform("prefix", prefix).unwrap();
    registry
        .register_binary_operator("=~", 20, |left, right| match (left, right) {
            (Value::String(l), Value::String(r)) => Ok(Value::Boolean(l.eq_ignore_ascii_case(r))),
            _ => Err(Error::type_mismatch("=~ compares strings")),
        })
        .unwrap();
    Jexl::new(registry)
}

#[test]
fn test_custom_transform_registration() {
    let jexl = engine();
    assert_eq!(jexl.evaluate("5|double", &Context::new()).unwrap(), Value::Number(10.0));
    assert_eq!(jexl.evaluate("5|double|double + 1", &Context::new()).unwrap(), Value::Number(21.0));
    assert_eq!(
        jexl.evaluate("'world'|prefix('hello ')", &Context::new()).unwrap(),
        Value::from("hello world")
    );
    assert!(matches!(jexl.evaluate("'x'|double", &Context::new()), Err(Error::TypeMismatch(_))));
}

#[test]
fn test_custom_operator_parses_with_declared_precedence() {
    let jexl = engine();
    // `+` binds tighter than `=~`, which binds tighter than `&&`
    let v = jexl.evaluate("'AB' =~ 'a' + 'b' && true", &Context::new()).unwrap();
    assert_eq!(v, Value::Boolean(true));
    // the standard engine does not know the token
    assert!(Jexl::standard().parse("'a' =~ 'b'").is_err());
}

#[test]
fn test_unknown_transform() {
    let err = Jexl::standard().evaluate("1|double", &Context::new()).unwrap_err();
    assert_eq!(err, Error::UnknownTransform("double".into()));
    assert_eq!(err.to_string(), "Transform 'double' is not defined");
}

#[test]
fn test_closures_can_capture_state() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let mut registry = Registry::standard();
    registry
        .register_transform("tick", move |subject, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(subject.clone())
        })
        .unwrap();
    let jexl = Jexl::new(registry);

    let v = jexl.evaluate("true ? 1|tick : 2|tick", &Context::new()).unwrap();
    assert_eq!(v, Value::Number(1.0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    jexl.evaluate("[1|tick, 2|tick, 3|tick]", &Context::new()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_invalid_registrations() {
    let mut registry = Registry::new();
    assert!(matches!(registry.register_transform("bad name", double), Err(Error::Config(_))));
    assert!(registry.register_binary_operator("!", 10, |_, _| Ok(Value::Null)).is_err());
    assert!(registry.register_binary_operator("<>", 0, |_, _| Ok(Value::Null)).is_err());
}

#[test]
fn test_operator_at_top_precedence() {
    let mut registry = Registry::standard();
    registry
        .register_binary_operator("max_op", u8::MAX, |left, right| match (left, right) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l.max(*r))),
            _ => Err(Error::type_mismatch("max_op compares numbers")),
        })
        .unwrap();
    let jexl = Jexl::new(registry);
    assert_eq!(jexl.evaluate("1 max_op 2", &Context::new()).unwrap(), Value::Number(2.0));
    // binds tighter than `^`: (2 max_op 3) ^ 2
    assert_eq!(jexl.evaluate("2 max_op 3 ^ 2", &Context::new()).unwrap(), Value::Number(9.0));
    assert_eq!(jexl.evaluate("5 max_op 1 max_op 3", &Context::new()).unwrap(), Value::Number(5.0));
}

#[test]
fn test_operators_cannot_shadow_negation() {
    let mut registry = Registry::standard();
    assert!(registry.register_binary_operator("!!", 20, |_, _| Ok(Value::Null)).is_err());
    assert!(registry.register_binary_operator("!~", 20, |_, _| Ok(Value::Null)).is_err());
    let jexl = Jexl::new(registry);
    assert_eq!(jexl.evaluate("!!1", &Context::new()).unwrap(), Value::Boolean(true));
}
