use crate::error::Error;
use crate::types::Value;

/// Array element at a numeric property; fractional or negative indexes miss.
pub fn index_array(items: &[Value], index: f64) -> Option<&Value> {
    if index < 0.0 || index.fract() != 0.0 {
        return None;
    }
    items.get(index as usize)
}

/// Borrowing property lookup. `None` when the key or index is absent or the
/// target cannot be indexed by this property.
pub fn property_ref<'v>(target: &'v Value, property: &Value) -> Option<&'v Value> {
    match (target, property) {
        (Value::Object(map), Value::String(key)) => map.get(key),
        (Value::Array(items), Value::Number(n)) => index_array(items, *n),
        _ => None,
    }
}

/// `target[property]` on owned values. Missing keys and out of range
/// indexes yield `null`, as does any property of `null`.
pub fn member(target: Value, property: &Value) -> Result<Value, Error> {
    match (target, property) {
        (Value::Object(mut map), Value::String(key)) => Ok(map.remove(key).unwrap_or(Value::Null)),
        (Value::Array(items), Value::Number(n)) => Ok(index_array(&items, *n).cloned().unwrap_or(Value::Null)),
        (Value::Null, _) => Ok(Value::Null),
        (target, property) => Err(Error::type_mismatch(format!(
            "Cannot read property {} of {}",
            property,
            target.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn member_access() {
        let doc = Value::from(json!({"a": {"b": [10, 20]}}));
        let a = member(doc.clone(), &"a".into()).unwrap();
        let b = member(a, &"b".into()).unwrap();
        assert_eq!(member(b.clone(), &Value::Number(1.0)).unwrap(), Value::Number(20.0));
        assert_eq!(member(b.clone(), &Value::Number(5.0)).unwrap(), Value::Null);
        assert_eq!(member(doc.clone(), &"missing".into()).unwrap(), Value::Null);
        assert_eq!(member(Value::Null, &"x".into()).unwrap(), Value::Null);
        assert!(member(Value::Number(1.0), &"x".into()).is_err());
        assert_eq!(property_ref(&b, &Value::Number(0.0)), Some(&Value::Number(10.0)));
        assert_eq!(property_ref(&b, &Value::Number(-1.0)), None);
    }
}
