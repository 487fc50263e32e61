use std::sync::Arc;

use async_graphql_parser::types::OperationType;
use error::GraphqlError;
use serde_json::{Map, Value};

use super::{
    context::ExecutionContext,
    coordinator::{Coordinator, Settlement, SettlementTarget},
};
use crate::{
    operation::coercion::ArgumentError,
    plan::{AbstractNode, DeferredField, FieldKind, IsTypeOfId, LeafNode, Node, NodeKind, ObjectNode, TypeResolution},
    response::{
        inspect::{display, inspect},
        trim::{trim, BubblingError},
        write_at, Response, ResponsePath,
    },
    schema::{ContextValue, FieldError, IsTypeOf, LeafError, ResolvedValue},
};

/// Mutable state of one execution: the response being built and the outstanding work.
#[derive(Default)]
pub(crate) struct ExecutionState {
    data: Value,
    /// Errors nulling only their own field.
    errors: Vec<GraphqlError>,
    /// Errors of non-null fields, resolved once everything settled.
    bubbling: Vec<BubblingError>,
    coordinator: Coordinator,
}

impl ExecutionState {
    /// Builds the root object and starts its fields, all at once or one after the other for
    /// mutations.
    pub fn start(&mut self, ctx: &ExecutionContext) {
        let root = &ctx.query.plan.root;
        let mut data = Map::with_capacity(root.fields.len());
        let mut jobs = Vec::new();
        for (index, field) in root.fields.iter().enumerate() {
            if !ctx.is_included(field.condition) {
                continue;
            }
            let value = match &field.kind {
                FieldKind::Typename => Value::String(root.type_name.clone()),
                FieldKind::Inline { field_name, node } => {
                    let path = ResponsePath::root().field(field.key.clone(), node.is_nullable());
                    let value = ctx.root_value.get(field_name).unwrap_or(&Value::Null);
                    self.complete_value(ctx, node, value, &path)
                }
                FieldKind::Deferred(_) => {
                    jobs.push(index);
                    Value::Null
                }
            };
            data.insert(field.key.to_string(), value);
        }
        self.data = Value::Object(data);

        if ctx.query.plan.kind == OperationType::Mutation {
            self.coordinator.enqueue(jobs);
            self.run_queued(ctx);
        } else {
            for index in jobs {
                self.run_root_field(ctx, index);
            }
        }
    }

    pub fn is_settled(&self) -> bool {
        self.coordinator.is_settled()
    }

    pub async fn next_settlement(&mut self) -> Option<Settlement> {
        self.coordinator.next_settlement().await
    }

    pub fn settle(&mut self, ctx: &ExecutionContext, settlement: Settlement) {
        let Settlement {
            target: SettlementTarget { node, path },
            result,
        } = settlement;
        tracing::trace!(%path, ok = result.is_ok(), "settled");
        let value = match result {
            Ok(value) => self.complete(ctx, &node, value, &path),
            Err(error) => {
                self.resolver_error(ctx, &node, &path, error);
                Value::Null
            }
        };
        write_at(&mut self.data, &path, value);
        self.run_queued(ctx);
    }

    /// Applies the bubbling errors to the data and assembles the response.
    pub fn finish(self) -> Response {
        let ExecutionState {
            mut data,
            mut errors,
            bubbling,
            ..
        } = self;
        if !bubbling.is_empty() {
            errors.extend(trim(&mut data, bubbling));
        }
        Response {
            data: Some(data),
            errors,
        }
    }

    fn run_queued(&mut self, ctx: &ExecutionContext) {
        while let Some(index) = self.coordinator.next_job() {
            tracing::trace!(index, "starting mutation field");
            self.run_root_field(ctx, index);
        }
    }

    fn run_root_field(&mut self, ctx: &ExecutionContext, index: usize) {
        let Some(field) = ctx.query.plan.root.fields.get(index) else {
            return;
        };
        let FieldKind::Deferred(deferred) = &field.kind else {
            return;
        };
        let path = ResponsePath::root().field(field.key.clone(), deferred.node.is_nullable());
        let value = self.resolve_field(ctx, deferred, &ctx.root_value, &path);
        write_at(&mut self.data, &path, value);
    }

    /// Calls the resolver of a field and completes what it returned. Pending values are
    /// completed once settled and `null` stands in for them meanwhile.
    fn resolve_field(&mut self, ctx: &ExecutionContext, field: &DeferredField, parent: &Value, path: &ResponsePath) -> Value {
        let registries = ctx.registries();
        let arguments = match field.arguments.resolve(&ctx.variables) {
            Ok(arguments) => arguments,
            Err(errors) => {
                for ArgumentError { message, location } in errors {
                    let error = ctx.error_at([location], path, message);
                    self.push_error(&field.node, path, error);
                }
                return Value::Null;
            }
        };
        let info = registries[field.info].build(ctx.scope(), path);
        match (registries[field.resolver])(parent, &arguments, &ctx.context_value, &info) {
            Ok(value) => self.complete(ctx, &field.node, value, path),
            Err(error) => {
                self.resolver_error(ctx, &field.node, path, error);
                Value::Null
            }
        }
    }

    fn complete(&mut self, ctx: &ExecutionContext, node: &Arc<Node>, value: ResolvedValue, path: &ResponsePath) -> Value {
        match value {
            ResolvedValue::Value(value) => self.complete_value(ctx, node, &value, path),
            ResolvedValue::Error(error) => {
                self.resolver_error(ctx, node, path, error);
                Value::Null
            }
            ResolvedValue::Pending(future) => {
                let target = SettlementTarget {
                    node: node.clone(),
                    path: path.clone(),
                };
                self.coordinator.spawn(target, future);
                Value::Null
            }
            ResolvedValue::List(items) => match &node.kind {
                NodeKind::List(item_node) => Value::Array(
                    items
                        .into_iter()
                        .enumerate()
                        .map(|(index, item)| {
                            let item_path = path.index(index, item_node.is_nullable());
                            self.complete(ctx, item_node, item, &item_path)
                        })
                        .collect(),
                ),
                _ => {
                    let value = ResolvedValue::List(items).into_value().unwrap_or_default();
                    self.complete_value(ctx, node, &value, path)
                }
            },
            ResolvedValue::Stream(_) => {
                let site = &ctx.registries()[node.site];
                let message = match node.kind {
                    NodeKind::List(_) => format!(
                        "Expected Iterable, but did not find one for field {}.",
                        site.coordinate()
                    ),
                    _ => format!(
                        "Unexpected event stream for field {}, only subscription fields may return one.",
                        site.coordinate()
                    ),
                };
                let error = ctx.field_error(site, path, message);
                self.push_error(node, path, error);
                Value::Null
            }
        }
    }

    fn complete_value(&mut self, ctx: &ExecutionContext, node: &Arc<Node>, value: &Value, path: &ResponsePath) -> Value {
        if value.is_null() {
            if node.non_null {
                let site = &ctx.registries()[node.site];
                let message = format!("Cannot return null for non-nullable field {}.", site.coordinate());
                let error = ctx.field_error(site, path, message);
                self.push_error(node, path, error);
            }
            return Value::Null;
        }

        match &node.kind {
            NodeKind::Leaf(leaf) => self.serialize_leaf(ctx, node, leaf, value, path),
            NodeKind::Object(object) => self.complete_object(ctx, node, object, value, path),
            NodeKind::List(item_node) => {
                let Value::Array(items) = value else {
                    let site = &ctx.registries()[node.site];
                    let message = format!(
                        "Expected Iterable, but did not find one for field {}.",
                        site.coordinate()
                    );
                    let error = ctx.field_error(site, path, message);
                    self.push_error(node, path, error);
                    return Value::Null;
                };
                Value::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(index, item)| {
                            let item_path = path.index(index, item_node.is_nullable());
                            self.complete_value(ctx, item_node, item, &item_path)
                        })
                        .collect(),
                )
            }
            NodeKind::Abstract(abstract_node) => self.complete_abstract(ctx, node, abstract_node, value, path),
        }
    }

    fn serialize_leaf(
        &mut self,
        ctx: &ExecutionContext,
        node: &Node,
        leaf: &LeafNode,
        value: &Value,
        path: &ResponsePath,
    ) -> Value {
        let Some(serializer) = leaf.serializer else {
            return value.clone();
        };
        match (ctx.registries()[serializer])(value) {
            Ok(serialized) => serialized,
            Err(error) => {
                let message = match error {
                    LeafError::Invalid => format!(
                        "Expected a value of type \"{}\" but received: {}",
                        leaf.type_name,
                        display(value)
                    ),
                    LeafError::Message(message) => message,
                };
                let error = ctx.field_error(&ctx.registries()[node.site], path, message);
                self.push_error(node, path, error);
                Value::Null
            }
        }
    }

    fn complete_object(
        &mut self,
        ctx: &ExecutionContext,
        node: &Node,
        object: &ObjectNode,
        value: &Value,
        path: &ResponsePath,
    ) -> Value {
        if let Some(is_type_of) = object.is_type_of {
            if !is_of_type(ctx, is_type_of, value) {
                let message = format!(
                    "Expected value of type \"{}\" but got: {}.",
                    object.type_name,
                    inspect(value)
                );
                let error = ctx.field_error(&ctx.registries()[node.site], path, message);
                self.push_error(node, path, error);
                return Value::Null;
            }
        }

        let mut fields = Map::with_capacity(object.fields.len());
        for field in &object.fields {
            if !ctx.is_included(field.condition) {
                continue;
            }
            let field_value = match &field.kind {
                FieldKind::Typename => Value::String(object.type_name.clone()),
                FieldKind::Inline { field_name, node } => {
                    let field_path = path.field(field.key.clone(), node.is_nullable());
                    let source = value.get(field_name).unwrap_or(&Value::Null);
                    self.complete_value(ctx, node, source, &field_path)
                }
                FieldKind::Deferred(deferred) => {
                    let field_path = path.field(field.key.clone(), deferred.node.is_nullable());
                    self.resolve_field(ctx, deferred, value, &field_path)
                }
            };
            fields.insert(field.key.to_string(), field_value);
        }
        Value::Object(fields)
    }

    fn complete_abstract(
        &mut self,
        ctx: &ExecutionContext,
        node: &Node,
        abstract_node: &AbstractNode,
        value: &Value,
        path: &ResponsePath,
    ) -> Value {
        let registries = ctx.registries();
        let site = &registries[node.site];
        let resolved = match &registries[abstract_node.resolution] {
            TypeResolution::Custom(resolve_type) => {
                let info = registries[abstract_node.info].build(ctx.scope(), path);
                resolve_type(value, &ctx.context_value, &info)
            }
            TypeResolution::Default { possible_types } => {
                Ok(Some(default_type_name(value, &ctx.context_value, possible_types)))
            }
        };

        let message = match resolved {
            Ok(Some(type_name)) => match abstract_node.branches.get(&type_name) {
                Some(branch) => return self.complete_value(ctx, branch, value, path),
                None if type_name.is_empty() => format!(
                    "Abstract type {name} must resolve to an Object type at runtime for field {}. \
                     Either the {name} type should provide a \"resolveType\" function or each possible \
                     types should provide an \"isTypeOf\" function.",
                    site.coordinate(),
                    name = abstract_node.type_name,
                ),
                None => format!(
                    "Runtime Object type \"{type_name}\" is not a possible type for \"{}\".",
                    abstract_node.type_name
                ),
            },
            Ok(None) => format!(
                "Runtime Object type is not a possible type for \"{}\".",
                abstract_node.type_name
            ),
            Err(error) => {
                self.resolver_error(ctx, node, path, error);
                return Value::Null;
            }
        };
        let error = ctx.field_error(site, path, message);
        self.push_error(node, path, error);
        Value::Null
    }

    /// Error raised or returned by user code for the value at `path`.
    fn resolver_error(&mut self, ctx: &ExecutionContext, node: &Node, path: &ResponsePath, error: FieldError) {
        let (message, source) = error.into_parts();
        let mut error = ctx.field_error(&ctx.registries()[node.site], path, message);
        if let Some(source) = source {
            error = error.with_original_error(source);
        }
        self.push_error(node, path, error);
    }

    fn push_error(&mut self, node: &Node, path: &ResponsePath, error: GraphqlError) {
        if node.non_null {
            self.bubbling.push(BubblingError {
                error,
                path: path.clone(),
            });
        } else {
            self.errors.push(error);
        }
    }
}

fn is_of_type(ctx: &ExecutionContext, is_type_of: IsTypeOfId, value: &Value) -> bool {
    (ctx.registries()[is_type_of])(value, &ctx.context_value)
}

/// `__typename` of the value, then the first possible type accepting it. Empty when nothing
/// matches.
fn default_type_name(value: &Value, context_value: &ContextValue, possible_types: &[(String, Option<IsTypeOf>)]) -> String {
    if let Some(Value::String(type_name)) = value.get("__typename") {
        return type_name.clone();
    }
    possible_types
        .iter()
        .find(|(_, is_type_of)| {
            is_type_of
                .as_ref()
                .is_some_and(|is_type_of| is_type_of(value, context_value))
        })
        .map(|(type_name, _)| type_name.clone())
        .unwrap_or_default()
}
