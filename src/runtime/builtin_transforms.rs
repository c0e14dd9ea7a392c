use crate::error::Error;
use crate::types::Value;

pub type BuiltinTransform = fn(&Value, &[Value]) -> Result<Value, Error>;

/// Core transforms every standard registry carries.
pub fn all() -> Vec<(&'static str, BuiltinTransform)> {
    vec![
        ("debug", debug as BuiltinTransform),
        ("min", min),
        ("max", max),
        ("sum", sum),
        ("round", round),
        ("ceil", ceil),
        ("floor", floor),
        ("count", count),
        ("stringify", stringify),
    ]
}

/// Logs the subject and hands it back unchanged.
pub fn debug(subject: &Value, args: &[Value]) -> Result<Value, Error> {
    let label = args.first().and_then(Value::as_str).unwrap_or("JEXL debug");
    log::debug!("{}: {}", label, subject);
    Ok(subject.clone())
}

/// Numbers of an array, skipping nulls. `None` for a null subject.
fn numbers(name: &str, subject: &Value) -> Result<Option<Vec<f64>>, Error> {
    let items = match subject {
        Value::Null => return Ok(None),
        Value::Array(items) => items,
        other => {
            return Err(Error::type_mismatch(format!(
                "Transform '{}' expects an array, got {}",
                name,
                other.type_name()
            )))
        }
    };
    items
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| {
            v.as_number().ok_or_else(|| {
                Error::type_mismatch(format!("Transform '{}' expects numbers, got {}", name, v.type_name()))
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

pub fn min(subject: &Value, _args: &[Value]) -> Result<Value, Error> {
    Ok(numbers("min", subject)?
        .and_then(|ns| ns.into_iter().reduce(f64::min))
        .map(Value::Number)
        .unwrap_or(Value::Null))
}

pub fn max(subject: &Value, _args: &[Value]) -> Result<Value, Error> {
    Ok(numbers("max", subject)?
        .and_then(|ns| ns.into_iter().reduce(f64::max))
        .map(Value::Number)
        .unwrap_or(Value::Null))
}

pub fn sum(subject: &Value, _args: &[Value]) -> Result<Value, Error> {
    let total = numbers("sum", subject)?.map(|ns| ns.into_iter().sum()).unwrap_or(0.0);
    Ok(Value::Number(total))
}

fn number(name: &str, subject: &Value) -> Result<Option<f64>, Error> {
    match subject {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(Some(*n)),
        other => Err(Error::type_mismatch(format!(
            "Transform '{}' expects a number, got {}",
            name,
            other.type_name()
        ))),
    }
}

/// `value|round` or `value|round(digits)`; halves round away from zero.
pub fn round(subject: &Value, args: &[Value]) -> Result<Value, Error> {
    let digits = match args.first() {
        None => 0,
        Some(Value::Number(d)) if d.fract() == 0.0 => *d as i32,
        Some(other) => {
            return Err(Error::type_mismatch(format!("Transform 'round' expects an integer digit count, got {}", other)))
        }
    };
    let factor = 10f64.powi(digits);
    Ok(number("round", subject)?
        .map(|n| Value::Number((n * factor).round() / factor))
        .unwrap_or(Value::Null))
}

pub fn ceil(subject: &Value, _args: &[Value]) -> Result<Value, Error> {
    Ok(number("ceil", subject)?.map(|n| Value::Number(n.ceil())).unwrap_or(Value::Null))
}

pub fn floor(subject: &Value, _args: &[Value]) -> Result<Value, Error> {
    Ok(number("floor", subject)?.map(|n| Value::Number(n.floor())).unwrap_or(Value::Null))
}

pub fn count(subject: &Value, _args: &[Value]) -> Result<Value, Error> {
    let len = match subject {
        Value::Null => 0,
        Value::Array(items) => items.len(),
        Value::String(s) => s.chars().count(),
        Value::Object(map) => map.len(),
        other => {
            return Err(Error::type_mismatch(format!("Transform 'count' cannot count a {}", other.type_name())))
        }
    };
    Ok(Value::Number(len as f64))
}

pub fn stringify(subject: &Value, _args: &[Value]) -> Result<Value, Error> {
    serde_json::to_string(&subject.to_json())
        .map(Value::String)
        .map_err(|e| Error::evaluation(format!("Failed to serialize value: {}", e)))
}
