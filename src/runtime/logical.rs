use crate::error::Error;
use crate::types::Value;
use std::cmp::Ordering;

pub fn equal(a: &Value, b: &Value) -> Result<Value, Error> {
    Ok(Value::Boolean(a == b))
}

pub fn not_equal(a: &Value, b: &Value) -> Result<Value, Error> {
    Ok(Value::Boolean(a != b))
}

/// Numbers order numerically, strings lexicographically; other pairs fail.
fn compare(op: &str, a: &Value, b: &Value) -> Result<Ordering, Error> {
    let ordering = match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    };
    ordering.ok_or_else(|| {
        Error::type_mismatch(format!("Cannot compare {} {} {}", a.type_name(), op, b.type_name()))
    })
}

pub fn less(a: &Value, b: &Value) -> Result<Value, Error> {
    compare("<", a, b).map(|o| Value::Boolean(o == Ordering::Less))
}

pub fn less_equal(a: &Value, b: &Value) -> Result<Value, Error> {
    compare("<=", a, b).map(|o| Value::Boolean(o != Ordering::Greater))
}

pub fn greater(a: &Value, b: &Value) -> Result<Value, Error> {
    compare(">", a, b).map(|o| Value::Boolean(o == Ordering::Greater))
}

pub fn greater_equal(a: &Value, b: &Value) -> Result<Value, Error> {
    compare(">=", a, b).map(|o| Value::Boolean(o != Ordering::Less))
}

/// `needle in haystack`: substring, array element or object key.
pub fn contains(needle: &Value, haystack: &Value) -> Result<Value, Error> {
    let found = match (needle, haystack) {
        (Value::String(n), Value::String(h)) => h.contains(n.as_str()),
        (_, Value::Array(items)) => items.contains(needle),
        (Value::String(key), Value::Object(map)) => map.contains_key(key),
        (_, Value::Null) => false,
        _ => {
            return Err(Error::type_mismatch(format!(
                "Operator 'in' cannot look for {} in {}",
                needle.type_name(),
                haystack.type_name()
            )))
        }
    };
    Ok(Value::Boolean(found))
}
