use std::sync::Arc;

use async_graphql_parser::types as ast;
use fxhash::FxHashMap;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{
    scalars, ContextValue, EnumType, EnumValue, FieldDefinition, FieldError, InputObjectType, InputValueDefinition,
    InterfaceType, ObjectType, ResolvedValue, ScalarType, Schema, TypeDefinition, TypeRef, UnionType,
};
use crate::ResolveInfo;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Could not parse the schema: {0}")]
    Parse(#[from] async_graphql_parser::Error),
    #[error("Type \"{0}\" is defined more than once.")]
    DuplicateType(String),
    #[error("Unknown type \"{0}\".")]
    UnknownType(String),
    #[error("Type \"{0}\" is not an object type.")]
    NotAnObject(String),
    #[error("Type \"{0}\" is neither an interface nor a union.")]
    NotAbstract(String),
    #[error("Type \"{0}\" is not an enum type.")]
    NotAnEnum(String),
    #[error("Field \"{type_name}.{field_name}\" does not exist.")]
    UnknownField { type_name: String, field_name: String },
    #[error("Enum \"{enum_name}\" has no value named \"{value}\".")]
    UnknownEnumValue { enum_name: String, value: String },
    #[error("The query root type \"{0}\" is missing.")]
    MissingQueryType(String),
}

/// Assembles a [`Schema`] from SDL type definitions and the behaviour attached to them.
///
/// Errors are recorded as they happen and the first one is returned by [`SchemaBuilder::build`],
/// so calls can be chained freely.
pub struct SchemaBuilder {
    types: IndexMap<String, TypeDefinition>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
    error: Option<SchemaError>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        let types = scalars::specified_scalars()
            .map(|scalar| (scalar.name.clone(), TypeDefinition::Scalar(scalar)))
            .collect();
        SchemaBuilder {
            types,
            query_type: None,
            mutation_type: None,
            subscription_type: None,
            error: None,
        }
    }
}

impl SchemaBuilder {
    pub fn from_sdl(sdl: &str) -> Self {
        let mut builder = SchemaBuilder::default();
        match async_graphql_parser::parse_schema(sdl) {
            Ok(document) => {
                for definition in document.definitions {
                    builder.ingest(definition);
                }
            }
            Err(err) => builder.record(err.into()),
        }
        builder
    }

    fn ingest(&mut self, definition: ast::TypeSystemDefinition) {
        match definition {
            ast::TypeSystemDefinition::Schema(schema) => {
                let schema = schema.node;
                if let Some(query) = schema.query {
                    self.query_type = Some(query.node.to_string());
                }
                if let Some(mutation) = schema.mutation {
                    self.mutation_type = Some(mutation.node.to_string());
                }
                if let Some(subscription) = schema.subscription {
                    self.subscription_type = Some(subscription.node.to_string());
                }
            }
            ast::TypeSystemDefinition::Type(definition) => {
                let definition = definition.node;
                let name = definition.name.node.to_string();
                let ty = match definition.kind {
                    ast::TypeKind::Scalar if scalars::is_specified_scalar(&name) => return,
                    ast::TypeKind::Scalar => TypeDefinition::Scalar(ScalarType::passthrough(name.clone())),
                    ast::TypeKind::Object(object) => TypeDefinition::Object(ObjectType {
                        name: name.clone(),
                        fields: convert_fields(object.fields),
                        interfaces: object.implements.into_iter().map(|name| name.node.to_string()).collect(),
                        is_type_of: None,
                    }),
                    ast::TypeKind::Interface(interface) => TypeDefinition::Interface(InterfaceType {
                        name: name.clone(),
                        fields: convert_fields(interface.fields),
                        interfaces: interface
                            .implements
                            .into_iter()
                            .map(|name| name.node.to_string())
                            .collect(),
                        resolve_type: None,
                    }),
                    ast::TypeKind::Union(union) => TypeDefinition::Union(UnionType {
                        name: name.clone(),
                        members: union.members.into_iter().map(|name| name.node.to_string()).collect(),
                        resolve_type: None,
                    }),
                    ast::TypeKind::Enum(enum_type) => TypeDefinition::Enum(EnumType {
                        name: name.clone(),
                        values: enum_type
                            .values
                            .into_iter()
                            .map(|value| {
                                let name = value.node.value.node.to_string();
                                let internal = Value::String(name.clone());
                                (name.clone(), EnumValue { name, value: internal })
                            })
                            .collect(),
                    }),
                    ast::TypeKind::InputObject(input) => TypeDefinition::InputObject(InputObjectType {
                        name: name.clone(),
                        fields: convert_input_values(input.fields),
                    }),
                };
                if self.types.insert(name.clone(), ty).is_some() {
                    self.record(SchemaError::DuplicateType(name));
                }
            }
            ast::TypeSystemDefinition::Directive(_) => {}
        }
    }

    /// Attaches the resolver of an object field.
    #[must_use]
    pub fn resolver<F>(self, type_name: &str, field_name: &str, resolver: F) -> Self
    where
        F: Fn(&Value, &Map<String, Value>, &ContextValue, &ResolveInfo<'_>) -> Result<ResolvedValue, FieldError>
            + Send
            + Sync
            + 'static,
    {
        self.with_field(type_name, field_name, |field| field.resolve = Some(Arc::new(resolver)))
    }

    /// Attaches the event source of a subscription field.
    #[must_use]
    pub fn subscriber<F>(self, type_name: &str, field_name: &str, subscriber: F) -> Self
    where
        F: Fn(&Value, &Map<String, Value>, &ContextValue, &ResolveInfo<'_>) -> Result<ResolvedValue, FieldError>
            + Send
            + Sync
            + 'static,
    {
        self.with_field(type_name, field_name, |field| field.subscribe = Some(Arc::new(subscriber)))
    }

    #[must_use]
    pub fn type_resolver<F>(mut self, abstract_type: &str, resolve_type: F) -> Self
    where
        F: Fn(&Value, &ContextValue, &ResolveInfo<'_>) -> Result<Option<String>, FieldError> + Send + Sync + 'static,
    {
        match self.types.get_mut(abstract_type) {
            Some(TypeDefinition::Interface(interface)) => interface.resolve_type = Some(Arc::new(resolve_type)),
            Some(TypeDefinition::Union(union)) => union.resolve_type = Some(Arc::new(resolve_type)),
            Some(_) => self.record(SchemaError::NotAbstract(abstract_type.to_string())),
            None => self.record(SchemaError::UnknownType(abstract_type.to_string())),
        }
        self
    }

    #[must_use]
    pub fn is_type_of<F>(mut self, object_type: &str, is_type_of: F) -> Self
    where
        F: Fn(&Value, &ContextValue) -> bool + Send + Sync + 'static,
    {
        match self.types.get_mut(object_type) {
            Some(TypeDefinition::Object(object)) => object.is_type_of = Some(Arc::new(is_type_of)),
            Some(_) => self.record(SchemaError::NotAnObject(object_type.to_string())),
            None => self.record(SchemaError::UnknownType(object_type.to_string())),
        }
        self
    }

    /// Defines or replaces a scalar, including the specified ones.
    #[must_use]
    pub fn scalar(mut self, scalar: ScalarType) -> Self {
        self.types.insert(scalar.name.clone(), TypeDefinition::Scalar(scalar));
        self
    }

    /// Sets the internal value resolvers use for an enum value. Defaults to the value's name.
    #[must_use]
    pub fn enum_value(mut self, enum_name: &str, value_name: &str, internal: Value) -> Self {
        match self.types.get_mut(enum_name) {
            Some(TypeDefinition::Enum(enum_type)) => match enum_type.values.get_mut(value_name) {
                Some(value) => value.value = internal,
                None => self.record(SchemaError::UnknownEnumValue {
                    enum_name: enum_name.to_string(),
                    value: value_name.to_string(),
                }),
            },
            Some(_) => self.record(SchemaError::NotAnEnum(enum_name.to_string())),
            None => self.record(SchemaError::UnknownType(enum_name.to_string())),
        }
        self
    }

    fn with_field(mut self, type_name: &str, field_name: &str, attach: impl FnOnce(&mut FieldDefinition)) -> Self {
        match self.types.get_mut(type_name) {
            Some(TypeDefinition::Object(object)) => match object.fields.get_mut(field_name) {
                Some(field) => attach(field),
                None => self.record(SchemaError::UnknownField {
                    type_name: type_name.to_string(),
                    field_name: field_name.to_string(),
                }),
            },
            Some(_) => self.record(SchemaError::NotAnObject(type_name.to_string())),
            None => self.record(SchemaError::UnknownType(type_name.to_string())),
        }
        self
    }

    fn record(&mut self, error: SchemaError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let SchemaBuilder {
            types,
            query_type,
            mutation_type,
            subscription_type,
            ..
        } = self;

        for ty in types.values() {
            let referenced: Vec<&str> = match ty {
                TypeDefinition::Object(object) => field_references(&object.fields)
                    .chain(object.interfaces.iter().map(String::as_str))
                    .collect(),
                TypeDefinition::Interface(interface) => field_references(&interface.fields)
                    .chain(interface.interfaces.iter().map(String::as_str))
                    .collect(),
                TypeDefinition::Union(union) => union.members.iter().map(String::as_str).collect(),
                TypeDefinition::InputObject(input) => input.fields.values().map(|field| field.ty.named_type()).collect(),
                TypeDefinition::Scalar(_) | TypeDefinition::Enum(_) => Vec::new(),
            };
            if let Some(unknown) = referenced.into_iter().find(|name| !types.contains_key(*name)) {
                return Err(SchemaError::UnknownType(unknown.to_string()));
            }
        }

        let mut possible_types: FxHashMap<String, Vec<String>> = FxHashMap::default();
        let mut sub_interfaces: FxHashMap<String, Vec<String>> = FxHashMap::default();
        for ty in types.values() {
            match ty {
                TypeDefinition::Object(object) => {
                    for interface in &object.interfaces {
                        possible_types
                            .entry(interface.clone())
                            .or_default()
                            .push(object.name.clone());
                    }
                }
                TypeDefinition::Interface(interface) => {
                    for parent in &interface.interfaces {
                        sub_interfaces
                            .entry(parent.clone())
                            .or_default()
                            .push(interface.name.clone());
                    }
                }
                TypeDefinition::Union(union) => {
                    if let Some(member) = union
                        .members
                        .iter()
                        .find(|member| !matches!(types.get(member.as_str()), Some(TypeDefinition::Object(_))))
                    {
                        return Err(SchemaError::NotAnObject(member.clone()));
                    }
                    possible_types.insert(union.name.clone(), union.members.clone());
                }
                _ => {}
            }
        }

        let is_object = |name: &str| matches!(types.get(name), Some(TypeDefinition::Object(_)));
        let query_type = query_type.unwrap_or_else(|| "Query".to_string());
        if !is_object(&query_type) {
            return Err(SchemaError::MissingQueryType(query_type));
        }
        let mutation_type = root_type_name(mutation_type, "Mutation", &is_object)?;
        let subscription_type = root_type_name(subscription_type, "Subscription", &is_object)?;

        tracing::debug!(types = types.len(), "built schema");

        Ok(Schema {
            types,
            query_type,
            mutation_type,
            subscription_type,
            possible_types,
            sub_interfaces,
        })
    }
}

/// Explicit root names must exist, implicit ones are only used when a type of that name exists.
fn root_type_name(
    explicit: Option<String>,
    default: &str,
    is_object: &impl Fn(&str) -> bool,
) -> Result<Option<String>, SchemaError> {
    match explicit {
        Some(name) if is_object(&name) => Ok(Some(name)),
        Some(name) => Err(SchemaError::NotAnObject(name)),
        None => Ok(is_object(default).then(|| default.to_string())),
    }
}

fn field_references(fields: &IndexMap<String, FieldDefinition>) -> impl Iterator<Item = &str> {
    fields.values().flat_map(|field| {
        std::iter::once(field.ty.named_type()).chain(field.arguments.values().map(|argument| argument.ty.named_type()))
    })
}

fn convert_fields(fields: Vec<async_graphql_parser::Positioned<ast::FieldDefinition>>) -> IndexMap<String, FieldDefinition> {
    fields
        .into_iter()
        .map(|field| {
            let field = field.node;
            let name = field.name.node.to_string();
            let definition = FieldDefinition {
                name: name.clone(),
                arguments: convert_input_values(field.arguments),
                ty: TypeRef::from_ast(&field.ty.node),
                resolve: None,
                subscribe: None,
            };
            (name, definition)
        })
        .collect()
}

fn convert_input_values(
    values: Vec<async_graphql_parser::Positioned<ast::InputValueDefinition>>,
) -> IndexMap<String, InputValueDefinition> {
    values
        .into_iter()
        .map(|value| {
            let value = value.node;
            let name = value.name.node.to_string();
            let definition = InputValueDefinition {
                name: name.clone(),
                ty: TypeRef::from_ast(&value.ty.node),
                default_value: value.default_value.map(|default| default.node),
            };
            (name, definition)
        })
        .collect()
}
