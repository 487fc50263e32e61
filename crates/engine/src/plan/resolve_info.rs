use async_graphql_parser::{
    types::{Field, OperationDefinition},
    Positioned,
};
use serde_json::{Map, Value};

use crate::{operation::Fragments, response::ResponsePath, Schema, TypeRef};

/// What a resolver knows about the field it resolves.
#[derive(Clone, Copy)]
pub struct ResolveInfo<'a> {
    pub field_name: &'a str,
    pub field_nodes: &'a [Positioned<Field>],
    pub return_type: &'a TypeRef,
    pub parent_type: &'a str,
    pub path: &'a ResponsePath,
    pub schema: &'a Schema,
    pub fragments: &'a Fragments,
    pub operation: &'a Positioned<OperationDefinition>,
    pub variable_values: &'a Map<String, Value>,
    pub root_value: &'a Value,
    /// Produced by the configured resolver info enricher, if any.
    pub enrichment: Option<&'a Value>,
}

impl std::fmt::Debug for ResolveInfo<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveInfo")
            .field("field_name", &self.field_name)
            .field("return_type", &self.return_type.to_string())
            .field("parent_type", &self.parent_type)
            .field("path", &self.path)
            .field("enrichment", &self.enrichment)
            .finish_non_exhaustive()
    }
}

/// Static part of a [`ResolveInfo`], compiled once per field site.
#[derive(Debug)]
pub(crate) struct ResolveInfoTemplate {
    pub field_name: String,
    pub field_nodes: Vec<Positioned<Field>>,
    pub return_type: TypeRef,
    pub parent_type: String,
    pub enrichment: Option<Value>,
}

/// Per execution values completing a [`ResolveInfoTemplate`].
#[derive(Clone, Copy)]
pub(crate) struct ResolveInfoScope<'a> {
    pub schema: &'a Schema,
    pub fragments: &'a Fragments,
    pub operation: &'a Positioned<OperationDefinition>,
    pub variable_values: &'a Map<String, Value>,
    pub root_value: &'a Value,
}

impl ResolveInfoTemplate {
    pub fn build<'a>(&'a self, scope: ResolveInfoScope<'a>, path: &'a ResponsePath) -> ResolveInfo<'a> {
        ResolveInfo {
            field_name: &self.field_name,
            field_nodes: &self.field_nodes,
            return_type: &self.return_type,
            parent_type: &self.parent_type,
            path,
            schema: scope.schema,
            fragments: scope.fragments,
            operation: scope.operation,
            variable_values: scope.variable_values,
            root_value: scope.root_value,
            enrichment: self.enrichment.as_ref(),
        }
    }
}
