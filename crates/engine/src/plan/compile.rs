use std::sync::Arc;

use async_graphql_parser::{
    types::{Field, OperationType},
    Positioned,
};
use fxhash::FxHashMap;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::*;
use crate::{
    operation::{
        coercion::{coerce_arguments, ArgumentTemplate},
        collect::{join_path, FieldCollector, FieldMap},
        condition::Condition,
        location, validation_error, OperationSource,
    },
    response::ResponsePath,
    schema::{LeafSerializer, ObjectType, ResolvedValue, Resolver, TypeDefinition},
    CompileError, CompilerOptions, Schema, TypeRef,
};

/// Compiles the selected operation into its plan.
pub(crate) fn compile_plan(
    schema: &Schema,
    source: &OperationSource,
    options: &CompilerOptions,
) -> Result<Plan, CompileError> {
    let operation = source.definition();
    let Some(root_type) = schema.root_type(operation.ty) else {
        return Err(validation_error(format!(
            "Schema is not configured to execute {} operation.",
            operation.ty
        ))
        .with_location(location(source.operation.pos))
        .into());
    };

    let mut compiler = PlanCompiler {
        schema,
        source,
        options,
        collector: FieldCollector::new(
            schema,
            &source.fragments,
            &operation.variable_definitions,
            options.use_experimental_path_based_skip_include,
        ),
        registries: Registries::default(),
        serializers: FxHashMap::default(),
        is_type_ofs: FxHashMap::default(),
        type_resolutions: FxHashMap::default(),
    };

    let fields = compiler
        .collector
        .collect_fields(&root_type.name, &operation.selection_set, "")?;
    let subscription = match operation.ty {
        OperationType::Subscription => Some(compiler.compile_subscription_root(root_type, &fields)?),
        _ => None,
    };
    // Root fields are always resolved, even without resolver, so that mutations can be queued.
    let root = compiler.compile_object(root_type, fields, "", true)?;

    tracing::debug!(
        kind = %operation.ty,
        name = source.name.as_deref().unwrap_or_default(),
        registries = ?compiler.registries,
        "compiled operation"
    );

    Ok(Plan {
        kind: operation.ty,
        root,
        registries: compiler.registries,
        subscription,
    })
}

struct PlanCompiler<'a> {
    schema: &'a Schema,
    source: &'a OperationSource,
    options: &'a CompilerOptions,
    collector: FieldCollector<'a>,
    registries: Registries,
    serializers: FxHashMap<&'a str, Option<SerializerId>>,
    is_type_ofs: FxHashMap<&'a str, IsTypeOfId>,
    type_resolutions: FxHashMap<&'a str, TypeResolutionId>,
}

impl<'a> PlanCompiler<'a> {
    fn compile_object(
        &mut self,
        object: &'a ObjectType,
        fields: FieldMap<'a>,
        path_key: &str,
        always_resolve: bool,
    ) -> Result<ObjectNode, CompileError> {
        let is_type_of = match &object.is_type_of {
            Some(is_type_of) if !always_resolve => Some(
                *self
                    .is_type_ofs
                    .entry(object.name.as_str())
                    .or_insert_with(|| self.registries.push_is_type_of(is_type_of.clone())),
            ),
            _ => None,
        };

        let mut object_fields = Vec::with_capacity(fields.len());
        for (key, nodes) in fields {
            let Some(first) = nodes.first() else {
                continue;
            };
            let field_name = first.node.name.node.as_str();
            let field_path = join_path(path_key, key);
            if field_name == "__typename" {
                object_fields.push(ObjectField {
                    key: key.into(),
                    condition: self.condition(&nodes, &field_path),
                    kind: FieldKind::Typename,
                });
                continue;
            }
            let Some(definition) = object.fields.get(field_name) else {
                continue;
            };
            let condition = self.condition(&nodes, &field_path);
            let site = self.registries.push_field_site(FieldSite::new(&object.name, &nodes));
            let node = self.compile_type(&object.name, &definition.ty, &nodes, site, &field_path)?;

            let resolver = match &definition.resolve {
                Some(resolver) => Some(resolver.clone()),
                None if always_resolve => Some(property_reader(field_name)),
                None => None,
            };
            let kind = match resolver {
                Some(resolver) => {
                    let arguments = coerce_arguments(self.schema, definition, first)?;
                    let info = self.resolve_info(&object.name, field_name, &definition.ty, &nodes);
                    FieldKind::Deferred(Arc::new(DeferredField {
                        field_name: field_name.to_string(),
                        resolver: self.registries.push_resolver(resolver),
                        arguments,
                        info,
                        node,
                    }))
                }
                None => FieldKind::Inline {
                    field_name: field_name.to_string(),
                    node,
                },
            };
            object_fields.push(ObjectField {
                key: key.into(),
                condition,
                kind,
            });
        }

        Ok(ObjectNode {
            type_name: object.name.clone(),
            is_type_of,
            fields: object_fields,
        })
    }

    fn compile_type(
        &mut self,
        parent_type: &str,
        ty: &TypeRef,
        nodes: &[&'a Positioned<Field>],
        site: FieldSiteId,
        path_key: &str,
    ) -> Result<Arc<Node>, CompileError> {
        let schema = self.schema;
        let (non_null, ty) = match ty {
            TypeRef::NonNull(inner) => (true, inner.as_ref()),
            other => (false, other),
        };
        let kind = match ty {
            TypeRef::List(item) => NodeKind::List(self.compile_type(parent_type, item, nodes, site, path_key)?),
            TypeRef::NonNull(_) => return self.compile_type(parent_type, ty, nodes, site, path_key),
            TypeRef::Named(name) => match schema.get(name) {
                Some(definition @ (TypeDefinition::Scalar(_) | TypeDefinition::Enum(_))) => {
                    NodeKind::Leaf(self.compile_leaf(definition))
                }
                Some(TypeDefinition::Object(object)) => {
                    let fields = self.collector.collect_subfields(name, nodes, path_key)?;
                    NodeKind::Object(self.compile_object(object, fields, path_key, false)?)
                }
                Some(definition @ (TypeDefinition::Interface(_) | TypeDefinition::Union(_))) => {
                    NodeKind::Abstract(self.compile_abstract(parent_type, definition, nodes, site, path_key)?)
                }
                Some(TypeDefinition::InputObject(_)) | None => {
                    return Err(CompileError::UnsupportedType { name: name.clone() })
                }
            },
        };
        Ok(Arc::new(Node { non_null, site, kind }))
    }

    fn compile_leaf(&mut self, definition: &'a TypeDefinition) -> LeafNode {
        let type_name = definition.name();
        if let Some(serializer) = self.serializers.get(type_name) {
            return LeafNode {
                type_name: type_name.to_string(),
                serializer: *serializer,
            };
        }

        let passthrough = self.options.disable_leaf_serialization
            && match definition {
                TypeDefinition::Enum(_) => true,
                TypeDefinition::Scalar(scalar) => scalar.is_specified(),
                _ => false,
            };
        let serializer = if passthrough {
            None
        } else {
            let serializer: LeafSerializer = match (self.options.custom_serializers.get(type_name), definition) {
                (Some(custom), _) => custom.clone(),
                (None, TypeDefinition::Scalar(scalar)) => scalar.serialize.clone(),
                (None, TypeDefinition::Enum(enum_type)) => {
                    let enum_type = enum_type.clone();
                    Arc::new(move |value: &Value| enum_type.serialize(value))
                }
                (None, _) => Arc::new(|value: &Value| Ok(value.clone())),
            };
            Some(self.registries.push_serializer(serializer))
        };
        self.serializers.insert(type_name, serializer);

        LeafNode {
            type_name: type_name.to_string(),
            serializer,
        }
    }

    fn compile_abstract(
        &mut self,
        parent_type: &str,
        definition: &'a TypeDefinition,
        nodes: &[&'a Positioned<Field>],
        site: FieldSiteId,
        path_key: &str,
    ) -> Result<AbstractNode, CompileError> {
        let schema = self.schema;
        let type_name = definition.name();
        let resolution = match self.type_resolutions.get(type_name) {
            Some(id) => *id,
            None => {
                let resolution = match definition.type_resolver() {
                    Some(resolve_type) => TypeResolution::Custom(resolve_type.clone()),
                    None => TypeResolution::Default {
                        possible_types: schema
                            .possible_types(type_name)
                            .iter()
                            .map(|name| {
                                let is_type_of = schema.object(name).and_then(|object| object.is_type_of.clone());
                                (name.clone(), is_type_of)
                            })
                            .collect(),
                    },
                };
                let id = self.registries.push_type_resolution(resolution);
                self.type_resolutions.insert(type_name, id);
                id
            }
        };
        let info = self.resolve_info(parent_type, type_name, &TypeRef::named(type_name), nodes);

        let mut branches = IndexMap::new();
        for object_name in schema.possible_types(type_name) {
            let Some(object) = schema.object(object_name) else {
                continue;
            };
            let fields = self.collector.collect_subfields(object_name, nodes, path_key)?;
            let object = self.compile_object(object, fields, path_key, false)?;
            branches.insert(
                object_name.clone(),
                Arc::new(Node {
                    non_null: false,
                    site,
                    kind: NodeKind::Object(object),
                }),
            );
        }

        Ok(AbstractNode {
            type_name: type_name.to_string(),
            resolution,
            info,
            branches,
        })
    }

    fn compile_subscription_root(
        &mut self,
        root_type: &'a ObjectType,
        fields: &FieldMap<'a>,
    ) -> Result<SubscriptionRoot, CompileError> {
        let Some((_, nodes)) = fields.first() else {
            return Err(validation_error("Subscription operations must select one field.").into());
        };
        let Some(first) = nodes.first() else {
            return Err(validation_error("Subscription operations must select one field.").into());
        };
        let field_name = first.node.name.node.as_str();
        let site = self.registries.push_field_site(FieldSite::new(&root_type.name, nodes));

        if field_name == "__typename" {
            let info = self.resolve_info(&root_type.name, field_name, &TypeRef::non_null(TypeRef::named("String")), nodes);
            return Ok(SubscriptionRoot {
                key: field_name.into(),
                field_name: field_name.to_string(),
                subscriber: None,
                arguments: ArgumentTemplate::default(),
                info,
                site,
                non_null: true,
            });
        }

        let Some(definition) = root_type.fields.get(field_name) else {
            let locations = nodes.iter().map(|node| location(node.pos));
            return Err(
                validation_error(format!("The subscription field \"{field_name}\" is not defined."))
                    .with_locations(locations)
                    .into(),
            );
        };
        let arguments = coerce_arguments(self.schema, definition, first)?;
        let info = self.resolve_info(&root_type.name, field_name, &definition.ty, nodes);
        let subscriber = definition
            .subscribe
            .clone()
            .map(|subscriber| self.registries.push_resolver(subscriber));
        Ok(SubscriptionRoot {
            key: field_name.into(),
            field_name: field_name.to_string(),
            subscriber,
            arguments,
            info,
            site,
            non_null: definition.ty.is_non_null(),
        })
    }

    /// Inclusion condition of the nodes merged under one response key.
    fn condition(&mut self, nodes: &[&'a Positioned<Field>], field_path: &str) -> Option<ConditionId> {
        let slot = self.collector.is_path_based().then_some(field_path);
        let conditions = self.collector.conditions();
        match Condition::merge(nodes.iter().map(|node| conditions.get(node, slot))) {
            Condition::Always => None,
            condition => Some(self.registries.push_condition(condition)),
        }
    }

    fn resolve_info(
        &mut self,
        parent_type: &str,
        field_name: &str,
        return_type: &TypeRef,
        nodes: &[&'a Positioned<Field>],
    ) -> ResolveInfoId {
        let mut template = ResolveInfoTemplate {
            field_name: field_name.to_string(),
            field_nodes: nodes.iter().map(|node| (*node).clone()).collect(),
            return_type: return_type.clone(),
            parent_type: parent_type.to_string(),
            enrichment: None,
        };
        if let Some(enricher) = &self.options.resolver_info_enricher {
            let variable_values = Map::new();
            let root_value = Value::Null;
            let path = ResponsePath::root();
            let scope = ResolveInfoScope {
                schema: self.schema,
                fragments: &self.source.fragments,
                operation: &self.source.operation,
                variable_values: &variable_values,
                root_value: &root_value,
            };
            let enrichment = enricher(&template.build(scope, &path));
            template.enrichment = Some(enrichment);
        }
        self.registries.push_resolve_info(template)
    }
}

/// Resolver of root fields without one: reads the property of the parent value.
fn property_reader(field_name: &str) -> Resolver {
    let field_name = field_name.to_string();
    Arc::new(move |parent, _, _, _| {
        Ok(ResolvedValue::Value(
            parent.get(&field_name).cloned().unwrap_or(Value::Null),
        ))
    })
}
