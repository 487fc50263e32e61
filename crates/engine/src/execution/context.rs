use std::sync::Arc;

use error::{ErrorCode, GraphqlError, Location};
use serde_json::{Map, Value};

use crate::{
    compiled::CompiledInner,
    plan::{ConditionId, FieldSite, Registries, ResolveInfoScope},
    response::ResponsePath,
    schema::ContextValue,
};

/// Read-only state of one execution, shared by every value being completed.
pub(crate) struct ExecutionContext {
    pub query: Arc<CompiledInner>,
    pub root_value: Value,
    pub context_value: ContextValue,
    pub variables: Map<String, Value>,
    /// Whether each condition of the plan holds for these variables.
    included: Vec<bool>,
}

impl ExecutionContext {
    pub fn new(
        query: Arc<CompiledInner>,
        root_value: Value,
        context_value: ContextValue,
        variables: Map<String, Value>,
    ) -> Self {
        let included = query
            .plan
            .registries
            .conditions
            .iter()
            .map(|condition| condition.evaluate(&variables))
            .collect();
        ExecutionContext {
            query,
            root_value,
            context_value,
            variables,
            included,
        }
    }

    pub fn registries(&self) -> &Registries {
        &self.query.plan.registries
    }

    pub fn is_included(&self, condition: Option<ConditionId>) -> bool {
        match condition {
            Some(id) => self.included[usize::from(id)],
            None => true,
        }
    }

    pub fn scope(&self) -> ResolveInfoScope<'_> {
        ResolveInfoScope {
            schema: &self.query.schema,
            fragments: &self.query.source.fragments,
            operation: &self.query.source.operation,
            variable_values: &self.variables,
            root_value: &self.root_value,
        }
    }

    pub fn field_error(&self, site: &FieldSite, path: &ResponsePath, message: impl Into<String>) -> GraphqlError {
        self.error_at(site.locations.iter().copied(), path, message)
    }

    pub fn error_at(
        &self,
        locations: impl IntoIterator<Item = Location>,
        path: &ResponsePath,
        message: impl Into<String>,
    ) -> GraphqlError {
        let error = GraphqlError::new(message.into(), ErrorCode::FieldError)
            .with_locations(locations)
            .with_path(path.to_error_path());
        if self.query.options.disable_capturing_stack_errors {
            error
        } else {
            error.with_backtrace()
        }
    }
}
