pub(crate) mod inspect;
mod path;
pub(crate) mod trim;

use error::GraphqlError;
use serde::ser::SerializeMap;
use serde_json::Value;

pub use path::{ResponsePath, ResponseValueId};

/// Result of one execution: `{data}`, `{data, errors}` or `{errors}`.
#[derive(Debug, Default)]
pub struct Response {
    /// `None` when execution never started, `Some(Value::Null)` when a null bubbled to the root.
    pub data: Option<Value>,
    pub errors: Vec<GraphqlError>,
}

impl Response {
    pub fn data(data: Value) -> Self {
        Response {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn errors(errors: impl IntoIterator<Item = GraphqlError>) -> Self {
        Response {
            data: None,
            errors: errors.into_iter().collect(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl serde::Serialize for Response {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        if let Some(data) = &self.data {
            map.serialize_entry("data", data)?;
        }
        if !self.errors.is_empty() {
            map.serialize_entry("errors", &self.errors)?;
        }
        map.end()
    }
}

/// Overwrites the value at `path`, the parents must already exist.
pub(crate) fn write_at(data: &mut Value, path: &ResponsePath, value: Value) {
    let mut current = data;
    for id in &path.to_vec() {
        let next = match (id, current) {
            (ResponseValueId::Field { key, .. }, Value::Object(object)) => object.get_mut(key.as_ref()),
            (ResponseValueId::Index { index, .. }, Value::Array(items)) => items.get_mut(*index),
            _ => None,
        };
        match next {
            Some(next) => current = next,
            None => {
                tracing::warn!(%path, "discarding a value without parent in the response");
                return;
            }
        }
    }
    *current = value;
}
