use crate::error::Error;
use crate::types::Value;

fn numbers(op: &str, a: &Value, b: &Value) -> Result<(f64, f64), Error> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok((*x, *y)),
        _ => Err(Error::type_mismatch(format!(
            "Operator '{}' expects numbers, got {} and {}",
            op,
            a.type_name(),
            b.type_name()
        ))),
    }
}

/// Numbers add, strings concatenate.
pub fn add(a: &Value, b: &Value) -> Result<Value, Error> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Ok(Value::String(format!("{}{}", x, y))),
        _ => numbers("+", a, b).map(|(x, y)| Value::Number(x + y)),
    }
}

pub fn subtract(a: &Value, b: &Value) -> Result<Value, Error> {
    numbers("-", a, b).map(|(x, y)| Value::Number(x - y))
}

pub fn multiply(a: &Value, b: &Value) -> Result<Value, Error> {
    numbers("*", a, b).map(|(x, y)| Value::Number(x * y))
}

pub fn divide(a: &Value, b: &Value) -> Result<Value, Error> {
    let (x, y) = numbers("/", a, b)?;
    if y == 0.0 {
        return Err(Error::evaluation("Division by zero"));
    }
    Ok(Value::Number(x / y))
}

pub fn floor_divide(a: &Value, b: &Value) -> Result<Value, Error> {
    let (x, y) = numbers("//", a, b)?;
    if y == 0.0 {
        return Err(Error::evaluation("Division by zero"));
    }
    Ok(Value::Number((x / y).floor()))
}

/// Result takes the sign of the divisor: `-7 % 3 == 2`.
pub fn modulo(a: &Value, b: &Value) -> Result<Value, Error> {
    let (x, y) = numbers("%", a, b)?;
    if y == 0.0 {
        return Err(Error::evaluation("Modulo by zero"));
    }
    Ok(Value::Number(x - y * (x / y).floor()))
}

pub fn power(a: &Value, b: &Value) -> Result<Value, Error> {
    numbers("^", a, b).map(|(x, y)| Value::Number(x.powf(y)))
}
