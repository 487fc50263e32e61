//! Human readable rendering of runtime values for error messages.

use serde_json::Value;

const MAX_ARRAY_LENGTH: usize = 10;
const MAX_RECURSIVE_DEPTH: usize = 2;

/// Renders a value the way GraphQL error messages quote them: `{ id: 1, tags: ["a"] }`.
pub(crate) fn inspect(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0);
    out
}

/// Renders a value as it would appear when interpolated into a message: strings unquoted.
pub(crate) fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) => "[object Object]".to_owned(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => out.push_str(&value.to_string()),
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
            } else if depth > MAX_RECURSIVE_DEPTH {
                out.push_str("[Array]");
            } else {
                out.push('[');
                for (i, item) in items.iter().take(MAX_ARRAY_LENGTH).enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_value(out, item, depth + 1);
                }
                let remaining = items.len().saturating_sub(MAX_ARRAY_LENGTH);
                if remaining == 1 {
                    out.push_str(", ... 1 more item");
                } else if remaining > 1 {
                    out.push_str(&format!(", ... {remaining} more items"));
                }
                out.push(']');
            }
        }
        Value::Object(fields) => {
            if fields.is_empty() {
                out.push_str("{}");
            } else if depth > MAX_RECURSIVE_DEPTH {
                out.push_str("[Object]");
            } else {
                out.push_str("{ ");
                for (i, (key, field)) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(key);
                    out.push_str(": ");
                    write_value(out, field, depth + 1);
                }
                out.push_str(" }");
            }
        }
    }
}
