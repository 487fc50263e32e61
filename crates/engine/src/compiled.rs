use std::{fmt, sync::Arc};

use async_graphql_parser::types::{ExecutableDocument, OperationType};
use error::{ErrorCode, GraphqlError};
use itertools::Itertools;
use serde_json::{Map, Value};

use crate::{
    execution::{self, Execution, SubscriptionResponse},
    operation::{location, variables::VariableParser, OperationSource},
    plan::{compile_plan, shape::ResponseShape, Plan},
    schema::ContextValue,
    CompilerOptions, Response, Schema,
};

/// Why an operation could not be compiled.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{}", .0.iter().map(|error| &error.message).join("\n"))]
    Graphql(Vec<GraphqlError>),
    #[error("Unexpected input type: \"{name}\".")]
    UnexpectedInputType { name: String },
    #[error("unsupported type: {name}")]
    UnsupportedType { name: String },
}

impl CompileError {
    /// The errors to report to the client, as a `{errors}` response would carry them.
    pub fn errors(&self) -> Vec<GraphqlError> {
        match self {
            CompileError::Graphql(errors) => errors.clone(),
            other => vec![GraphqlError::new(other.to_string(), ErrorCode::InternalServerError)],
        }
    }

    pub fn into_response(self) -> Response {
        match self {
            CompileError::Graphql(errors) => Response::errors(errors),
            other => Response::errors(other.errors()),
        }
    }
}

/// Fatal failure while setting up a subscription.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Subscription field must return Async Iterable. Received: {received}.")]
    NotAStream { received: String },
    #[error("Cannot subscribe to a {kind} operation.")]
    NotASubscription { kind: String },
}

impl From<SubscriptionError> for GraphqlError {
    fn from(error: SubscriptionError) -> Self {
        GraphqlError::new(error.to_string(), ErrorCode::SubscriptionError)
    }
}

/// Everything an execution reads, shared by all executions of a compiled query.
pub(crate) struct CompiledInner {
    pub schema: Arc<Schema>,
    pub source: OperationSource,
    pub options: CompilerOptions,
    pub variables: VariableParser,
    pub plan: Plan,
    pub shape: Option<ResponseShape>,
    pub compilation: Option<String>,
}

/// An operation compiled against a schema, executable any number of times with different
/// root values, contexts and variables.
#[derive(Clone)]
pub struct CompiledQuery {
    inner: Arc<CompiledInner>,
}

impl CompiledQuery {
    pub fn compile(
        schema: Arc<Schema>,
        document: &ExecutableDocument,
        operation_name: Option<&str>,
        options: CompilerOptions,
    ) -> Result<Self, CompileError> {
        let source = OperationSource::select(document, operation_name)?;
        tracing::debug!(
            name = source.name.as_deref().unwrap_or_default(),
            kind = %source.definition().ty,
            "compiling operation"
        );
        let variables = VariableParser::new(&schema, &source.definition().variable_definitions)?;
        let plan = compile_plan(&schema, &source, &options)?;
        let shape = if options.custom_json_serializer {
            Some(ResponseShape::derive(&schema, &source)?)
        } else {
            None
        };
        let compilation = options.debug.then(|| plan.to_string());

        Ok(CompiledQuery {
            inner: Arc::new(CompiledInner {
                schema,
                source,
                options,
                variables,
                plan,
                shape,
                compilation,
            }),
        })
    }

    /// Parses `query` and compiles it, parse errors are reported like any other compile error.
    pub fn compile_str(
        schema: Arc<Schema>,
        query: &str,
        operation_name: Option<&str>,
        options: CompilerOptions,
    ) -> Result<Self, CompileError> {
        let document = async_graphql_parser::parse_query(query).map_err(|error| {
            let locations = error.positions().map(location).collect::<Vec<_>>();
            GraphqlError::new(error.to_string(), ErrorCode::OperationValidationError).with_locations(locations)
        })?;
        Self::compile(schema, &document, operation_name, options)
    }

    /// Name of the operation, `query` or `subscribe` for anonymous ones.
    pub fn name(&self) -> &str {
        match (&self.inner.source.name, self.kind()) {
            (Some(name), _) => name.as_str(),
            (None, OperationType::Subscription) => "subscribe",
            (None, _) => "query",
        }
    }

    pub fn kind(&self) -> OperationType {
        self.inner.plan.kind
    }

    /// Executes a query or mutation. For subscriptions this runs the selection once with
    /// `root_value` as the event.
    pub fn query(&self, root_value: Value, context_value: ContextValue, variables: &Map<String, Value>) -> Execution {
        execution::execute(self.inner.clone(), root_value, context_value, variables)
    }

    pub async fn subscribe(
        &self,
        root_value: Value,
        context_value: ContextValue,
        variables: &Map<String, Value>,
    ) -> Result<SubscriptionResponse, SubscriptionError> {
        let result = execution::subscribe(self.inner.clone(), root_value, context_value, variables).await;
        if let Err(error) = &result {
            tracing::debug!(%error, "subscription setup failed");
        }
        result
    }

    /// Serializes a response of this query.
    pub fn stringify(&self, response: &Response) -> String {
        match &self.inner.shape {
            Some(shape) => shape.serialize(response),
            None => serde_json::to_string(response).unwrap_or_default(),
        }
    }

    /// Dump of the compiled plan, kept only in debug mode.
    pub fn compilation(&self) -> Option<&str> {
        self.inner.compilation.as_deref()
    }

    /// JSON schema of the responses, derived only when the custom JSON serializer is enabled.
    pub fn json_schema(&self) -> Option<Value> {
        self.inner.shape.as_ref().map(ResponseShape::json_schema)
    }
}

impl fmt::Debug for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledQuery")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("registries", &self.inner.plan.registries)
            .finish_non_exhaustive()
    }
}
