//! The five specified scalars, with the coercion rules and messages of the reference GraphQL
//! implementation.

use std::sync::Arc;

use async_graphql_value::Value as AstValue;
use serde_json::{Number, Value};

use super::{resolver::LeafError, ScalarType};
use crate::response::inspect::inspect;

pub(crate) const SPECIFIED_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

pub(crate) fn is_specified_scalar(name: &str) -> bool {
    SPECIFIED_SCALARS.contains(&name)
}

pub(crate) fn specified_scalars() -> impl Iterator<Item = ScalarType> {
    [
        ScalarType {
            name: "Int".into(),
            serialize: Arc::new(serialize_int),
            parse_value: Arc::new(parse_int_value),
            parse_literal: Arc::new(parse_int_literal),
        },
        ScalarType {
            name: "Float".into(),
            serialize: Arc::new(serialize_float),
            parse_value: Arc::new(parse_float_value),
            parse_literal: Arc::new(parse_float_literal),
        },
        ScalarType {
            name: "String".into(),
            serialize: Arc::new(serialize_string),
            parse_value: Arc::new(parse_string_value),
            parse_literal: Arc::new(parse_string_literal),
        },
        ScalarType {
            name: "Boolean".into(),
            serialize: Arc::new(serialize_boolean),
            parse_value: Arc::new(parse_boolean_value),
            parse_literal: Arc::new(parse_boolean_literal),
        },
        ScalarType {
            name: "ID".into(),
            serialize: Arc::new(serialize_id),
            parse_value: Arc::new(parse_id_value),
            parse_literal: Arc::new(parse_id_literal),
        },
    ]
    .into_iter()
}

fn message(message: String) -> LeafError {
    LeafError::Message(message)
}

/// Numeric view of a value as the output coercion of `Int` and `Float` sees it.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn int_from_f64(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0).then_some(n as i64)
}

fn in_int_range(n: i64) -> bool {
    i64::from(i32::MIN) <= n && n <= i64::from(i32::MAX)
}

fn serialize_int(value: &Value) -> Result<Value, LeafError> {
    let Some(n) = numeric(value).and_then(int_from_f64) else {
        return Err(message(format!("Int cannot represent non-integer value: {}", inspect(value))));
    };
    if !in_int_range(n) {
        return Err(message(format!(
            "Int cannot represent non 32-bit signed integer value: {}",
            inspect(value)
        )));
    }
    Ok(Value::from(n))
}

fn parse_int_value(value: &Value) -> Result<Value, LeafError> {
    let Some(n) = value.as_f64().and_then(int_from_f64) else {
        return Err(message(format!("Int cannot represent non-integer value: {}", inspect(value))));
    };
    if !in_int_range(n) {
        return Err(message(format!(
            "Int cannot represent non 32-bit signed integer value: {}",
            inspect(value)
        )));
    }
    Ok(Value::from(n))
}

fn parse_int_literal(value: &AstValue) -> Result<Value, LeafError> {
    let AstValue::Number(n) = value else {
        return Err(message(format!("Int cannot represent non-integer value: {value}")));
    };
    match n.as_i64() {
        Some(n) if in_int_range(n) => Ok(Value::from(n)),
        Some(_) => Err(message(format!(
            "Int cannot represent non 32-bit signed integer value: {value}"
        ))),
        None => Err(message(format!("Int cannot represent non-integer value: {value}"))),
    }
}

fn float(n: f64) -> Result<Value, LeafError> {
    Number::from_f64(n).map(Value::Number).ok_or(LeafError::Invalid)
}

fn serialize_float(value: &Value) -> Result<Value, LeafError> {
    match value {
        Value::Number(n) => Ok(Value::Number(n.clone())),
        _ => match numeric(value) {
            Some(n) if n.is_finite() => float(n),
            _ => Err(message(format!(
                "Float cannot represent non numeric value: {}",
                inspect(value)
            ))),
        },
    }
}

fn parse_float_value(value: &Value) -> Result<Value, LeafError> {
    match value {
        Value::Number(n) => Ok(Value::Number(n.clone())),
        _ => Err(message(format!(
            "Float cannot represent non numeric value: {}",
            inspect(value)
        ))),
    }
}

fn parse_float_literal(value: &AstValue) -> Result<Value, LeafError> {
    match value {
        AstValue::Number(n) => Ok(Value::Number(n.clone())),
        _ => Err(message(format!("Float cannot represent non numeric value: {value}"))),
    }
}

fn serialize_string(value: &Value) -> Result<Value, LeafError> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        Value::Number(n) => Ok(Value::String(
            n.as_f64()
                .and_then(int_from_f64)
                .map(|n| n.to_string())
                .unwrap_or_else(|| n.to_string()),
        )),
        _ => Err(message(format!("String cannot represent value: {}", inspect(value)))),
    }
}

fn parse_string_value(value: &Value) -> Result<Value, LeafError> {
    match value {
        Value::String(_) => Ok(value.clone()),
        _ => Err(message(format!(
            "String cannot represent a non string value: {}",
            inspect(value)
        ))),
    }
}

fn parse_string_literal(value: &AstValue) -> Result<Value, LeafError> {
    match value {
        AstValue::String(s) => Ok(Value::String(s.clone())),
        _ => Err(message(format!("String cannot represent a non string value: {value}"))),
    }
}

fn serialize_boolean(value: &Value) -> Result<Value, LeafError> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::Number(n) => match n.as_f64() {
            Some(n) if n.is_finite() => Ok(Value::Bool(n != 0.0)),
            _ => Err(message(format!(
                "Boolean cannot represent a non boolean value: {}",
                inspect(value)
            ))),
        },
        _ => Err(message(format!(
            "Boolean cannot represent a non boolean value: {}",
            inspect(value)
        ))),
    }
}

fn parse_boolean_value(value: &Value) -> Result<Value, LeafError> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        _ => Err(message(format!(
            "Boolean cannot represent a non boolean value: {}",
            inspect(value)
        ))),
    }
}

fn parse_boolean_literal(value: &AstValue) -> Result<Value, LeafError> {
    match value {
        AstValue::Boolean(b) => Ok(Value::Bool(*b)),
        _ => Err(message(format!("Boolean cannot represent a non boolean value: {value}"))),
    }
}

fn id_from_number(n: &Number) -> Option<Value> {
    n.as_f64()
        .and_then(int_from_f64)
        .map(|n| Value::String(n.to_string()))
}

fn serialize_id(value: &Value) -> Result<Value, LeafError> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => id_from_number(n)
            .ok_or_else(|| message(format!("ID cannot represent value: {}", inspect(value)))),
        _ => Err(message(format!("ID cannot represent value: {}", inspect(value)))),
    }
}

fn parse_id_value(value: &Value) -> Result<Value, LeafError> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => id_from_number(n)
            .ok_or_else(|| message(format!("ID cannot represent value: {}", inspect(value)))),
        _ => Err(message(format!("ID cannot represent value: {}", inspect(value)))),
    }
}

fn parse_id_literal(value: &AstValue) -> Result<Value, LeafError> {
    match value {
        AstValue::String(s) => Ok(Value::String(s.clone())),
        AstValue::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::String(n.to_string())),
        _ => Err(message(format!(
            "ID cannot represent a non-string and non-integer value: {value}"
        ))),
    }
}
