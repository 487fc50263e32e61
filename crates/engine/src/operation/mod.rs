//! Everything derived from the operation document before plan compilation: operation selection,
//! field collection with inclusion conditions, argument coercion and variable parsing.

pub(crate) mod coercion;
pub(crate) mod collect;
pub(crate) mod condition;
pub(crate) mod variables;

use std::collections::HashMap;

use async_graphql_parser::{
    types::{DocumentOperations, ExecutableDocument, FragmentDefinition, OperationDefinition},
    Pos, Positioned,
};
use async_graphql_value::Name;
use error::{ErrorCode, GraphqlError, Location};

pub type Fragments = HashMap<Name, Positioned<FragmentDefinition>>;

/// The operation to execute and the fragments it may spread, owned by the compiled query.
#[derive(Debug)]
pub struct OperationSource {
    pub name: Option<String>,
    pub operation: Positioned<OperationDefinition>,
    pub fragments: Fragments,
}

impl OperationSource {
    /// Picks the operation named `operation_name`, or the only one of the document.
    pub fn select(document: &ExecutableDocument, operation_name: Option<&str>) -> Result<Self, GraphqlError> {
        let (name, operation) = match (&document.operations, operation_name) {
            (DocumentOperations::Single(operation), None) => (None, operation),
            (DocumentOperations::Single(_), Some(name)) => {
                return Err(validation_error(format!("Unknown operation named \"{name}\".")));
            }
            (DocumentOperations::Multiple(operations), Some(name)) => match operations.get(name) {
                Some(operation) => (Some(name.to_string()), operation),
                None => return Err(validation_error(format!("Unknown operation named \"{name}\"."))),
            },
            (DocumentOperations::Multiple(operations), None) => {
                let mut iter = operations.iter();
                match (iter.next(), iter.next()) {
                    (Some((name, operation)), None) => (Some(name.to_string()), operation),
                    (None, _) => return Err(validation_error("Must provide an operation.")),
                    (Some(_), Some(_)) => {
                        return Err(validation_error(
                            "Must provide operation name if query contains multiple operations.",
                        ))
                    }
                }
            }
        };
        Ok(OperationSource {
            name,
            operation: operation.clone(),
            fragments: document.fragments.clone(),
        })
    }

    pub fn definition(&self) -> &OperationDefinition {
        &self.operation.node
    }
}

pub(crate) fn validation_error(message: impl Into<std::borrow::Cow<'static, str>>) -> GraphqlError {
    GraphqlError::new(message, ErrorCode::OperationValidationError)
}

pub(crate) fn location(pos: Pos) -> Location {
    Location::new(pos.line, pos.column)
}
