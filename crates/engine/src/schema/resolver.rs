use std::{any::Any, fmt, future::Future, sync::Arc};

use futures::{future::BoxFuture, stream::BoxStream, Stream};
use serde_json::{Map, Value};

use crate::ResolveInfo;

/// Opaque per-invocation value handed to every resolver.
pub type ContextValue = Arc<dyn Any + Send + Sync>;

/// Resolves a field from its parent value. A returned `Err` is treated like a thrown error.
pub type Resolver = Arc<
    dyn Fn(&Value, &Map<String, Value>, &ContextValue, &ResolveInfo<'_>) -> Result<ResolvedValue, FieldError>
        + Send
        + Sync,
>;

/// Resolves the concrete object type name of a value of an abstract type.
pub type TypeResolver =
    Arc<dyn Fn(&Value, &ContextValue, &ResolveInfo<'_>) -> Result<Option<String>, FieldError> + Send + Sync>;

/// Runtime membership check of an object type.
pub type IsTypeOf = Arc<dyn Fn(&Value, &ContextValue) -> bool + Send + Sync>;

/// Converts an internal leaf value into its response representation.
pub type LeafSerializer = Arc<dyn Fn(&Value) -> Result<Value, LeafError> + Send + Sync>;

pub type ParseLiteral = Arc<dyn Fn(&async_graphql_value::Value) -> Result<Value, LeafError> + Send + Sync>;

pub type ParseValue = Arc<dyn Fn(&Value) -> Result<Value, LeafError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LeafError {
    /// The value cannot be represented, without a more specific explanation.
    #[error("invalid value")]
    Invalid,
    #[error("{0}")]
    Message(String),
}

/// What a resolver produced for a field.
pub enum ResolvedValue {
    Value(Value),
    /// An error returned as the value itself rather than thrown.
    Error(FieldError),
    /// A list whose items may themselves be errors or still pending.
    List(Vec<ResolvedValue>),
    Pending(BoxFuture<'static, Result<ResolvedValue, FieldError>>),
    /// Event source of a subscription field.
    Stream(BoxStream<'static, Value>),
}

impl ResolvedValue {
    pub fn null() -> Self {
        ResolvedValue::Value(Value::Null)
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<ResolvedValue, FieldError>> + Send + 'static,
    {
        ResolvedValue::Pending(Box::pin(future))
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Value> + Send + 'static,
    {
        ResolvedValue::Stream(Box::pin(stream))
    }

    /// Flattens into a plain value when nothing is pending, failed or streamed.
    pub fn into_value(self) -> Result<Value, ResolvedValue> {
        if self.is_plain() {
            Ok(self.into_plain())
        } else {
            Err(self)
        }
    }

    fn is_plain(&self) -> bool {
        match self {
            ResolvedValue::Value(_) => true,
            ResolvedValue::List(items) => items.iter().all(Self::is_plain),
            _ => false,
        }
    }

    fn into_plain(self) -> Value {
        match self {
            ResolvedValue::Value(value) => value,
            ResolvedValue::List(items) => Value::Array(items.into_iter().map(Self::into_plain).collect()),
            _ => Value::Null,
        }
    }
}

impl fmt::Debug for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            ResolvedValue::Error(error) => f.debug_tuple("Error").field(error).finish(),
            ResolvedValue::List(items) => f.debug_tuple("List").field(items).finish(),
            ResolvedValue::Pending(_) => f.write_str("Pending"),
            ResolvedValue::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<Value> for ResolvedValue {
    fn from(value: Value) -> Self {
        ResolvedValue::Value(value)
    }
}

impl From<FieldError> for ResolvedValue {
    fn from(error: FieldError) -> Self {
        ResolvedValue::Error(error)
    }
}

impl From<Vec<ResolvedValue>> for ResolvedValue {
    fn from(items: Vec<ResolvedValue>) -> Self {
        ResolvedValue::List(items)
    }
}

/// Error raised by user code while resolving a field.
#[derive(Clone)]
pub struct FieldError {
    message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        FieldError {
            message: message.into(),
            source: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source(&self) -> Option<&Arc<dyn std::error::Error + Send + Sync>> {
        self.source.as_ref()
    }

    pub(crate) fn into_parts(self) -> (String, Option<Arc<dyn std::error::Error + Send + Sync>>) {
        (self.message, self.source)
    }
}

impl<E> From<E> for FieldError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        FieldError {
            message: error.to_string(),
            source: Some(Arc::new(error)),
        }
    }
}

impl fmt::Debug for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldError")
            .field("message", &self.message)
            .field("source", &self.source.as_ref().map(|source| source.to_string()))
            .finish()
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
