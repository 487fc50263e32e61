//! The type system an operation is compiled against.
//!
//! Only what the compiler consumes is modelled: named types, their fields and arguments, and the
//! behaviour attached to them (resolvers, type resolvers, membership checks and leaf coercion).
//! Build one with [`SchemaBuilder`].

mod builder;
pub(crate) mod resolver;
pub(crate) mod scalars;
mod types;

use std::sync::Arc;

use async_graphql_parser::types::OperationType;
use async_graphql_value::ConstValue;
use fxhash::FxHashMap;
use indexmap::IndexMap;
use serde_json::Value;

pub use builder::{SchemaBuilder, SchemaError};
pub use resolver::*;
pub use types::TypeRef;

use crate::response::inspect::inspect;

pub struct Schema {
    types: IndexMap<String, TypeDefinition>,
    query_type: String,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
    /// Object types implementing an interface or belonging to a union, in definition order.
    possible_types: FxHashMap<String, Vec<String>>,
    /// Interfaces implementing an interface.
    sub_interfaces: FxHashMap<String, Vec<String>>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        match self.types.get(name) {
            Some(TypeDefinition::Object(object)) => Some(object),
            _ => None,
        }
    }

    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    pub fn subscription_type(&self) -> Option<&str> {
        self.subscription_type.as_deref()
    }

    pub fn root_type(&self, operation_type: OperationType) -> Option<&ObjectType> {
        let name = match operation_type {
            OperationType::Query => Some(self.query_type.as_str()),
            OperationType::Mutation => self.mutation_type.as_deref(),
            OperationType::Subscription => self.subscription_type.as_deref(),
        };
        name.and_then(|name| self.object(name))
    }

    /// Concrete object types a value of the given abstract type may have.
    pub fn possible_types(&self, abstract_type: &str) -> &[String] {
        self.possible_types
            .get(abstract_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `maybe_sub_type`, an object or an interface, belongs to `abstract_type`.
    pub fn is_sub_type(&self, abstract_type: &str, maybe_sub_type: &str) -> bool {
        self.possible_types(abstract_type).iter().any(|name| name == maybe_sub_type)
            || self
                .sub_interfaces
                .get(abstract_type)
                .is_some_and(|interfaces| interfaces.iter().any(|name| name == maybe_sub_type))
    }

    pub fn is_possible_type(&self, abstract_type: &str, object_type: &str) -> bool {
        self.possible_types(abstract_type).iter().any(|name| name == object_type)
    }

    /// Field of an object or interface type.
    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDefinition> {
        match self.types.get(type_name)? {
            TypeDefinition::Object(object) => object.fields.get(field_name),
            TypeDefinition::Interface(interface) => interface.fields.get(field_name),
            _ => None,
        }
    }
}

pub enum TypeDefinition {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Scalar(ty) => &ty.name,
            TypeDefinition::Object(ty) => &ty.name,
            TypeDefinition::Interface(ty) => &ty.name,
            TypeDefinition::Union(ty) => &ty.name,
            TypeDefinition::Enum(ty) => &ty.name,
            TypeDefinition::InputObject(ty) => &ty.name,
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, TypeDefinition::Interface(_) | TypeDefinition::Union(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TypeDefinition::Scalar(_) | TypeDefinition::Enum(_))
    }

    /// Type resolver of an interface or union.
    pub fn type_resolver(&self) -> Option<&TypeResolver> {
        match self {
            TypeDefinition::Interface(ty) => ty.resolve_type.as_ref(),
            TypeDefinition::Union(ty) => ty.resolve_type.as_ref(),
            _ => None,
        }
    }
}

pub struct ScalarType {
    pub name: String,
    pub serialize: LeafSerializer,
    pub parse_value: ParseValue,
    pub parse_literal: ParseLiteral,
}

impl ScalarType {
    /// Scalar whose internal and external representations are identical.
    pub fn passthrough(name: impl Into<String>) -> Self {
        let name = name.into();
        let literal_name = name.clone();
        ScalarType {
            name,
            serialize: Arc::new(|value| Ok(value.clone())),
            parse_value: Arc::new(|value| Ok(value.clone())),
            parse_literal: Arc::new(move |literal| {
                let Some(value) = literal.clone().into_const() else {
                    return Err(LeafError::Message(format!(
                        "{literal_name} cannot contain variables: {literal}"
                    )));
                };
                value.into_json().map_err(|err| LeafError::Message(err.to_string()))
            }),
        }
    }

    pub fn is_specified(&self) -> bool {
        scalars::is_specified_scalar(&self.name)
    }
}

pub struct ObjectType {
    pub name: String,
    pub fields: IndexMap<String, FieldDefinition>,
    pub interfaces: Vec<String>,
    pub is_type_of: Option<IsTypeOf>,
}

pub struct InterfaceType {
    pub name: String,
    pub fields: IndexMap<String, FieldDefinition>,
    pub interfaces: Vec<String>,
    pub resolve_type: Option<TypeResolver>,
}

pub struct UnionType {
    pub name: String,
    pub members: Vec<String>,
    pub resolve_type: Option<TypeResolver>,
}

#[derive(Clone)]
pub struct EnumType {
    pub name: String,
    pub values: IndexMap<String, EnumValue>,
}

#[derive(Clone)]
pub struct EnumValue {
    pub name: String,
    /// Internal representation handed to and returned by resolvers.
    pub value: Value,
}

impl EnumType {
    pub fn value(&self, name: &str) -> Option<&EnumValue> {
        self.values.get(name)
    }

    /// Maps an internal value to the name of the enum value.
    pub fn serialize(&self, value: &Value) -> Result<Value, LeafError> {
        self.values
            .values()
            .find(|enum_value| &enum_value.value == value)
            .map(|enum_value| Value::String(enum_value.name.clone()))
            .ok_or_else(|| {
                LeafError::Message(format!(
                    "Enum \"{}\" cannot represent value: {}",
                    self.name,
                    inspect(value)
                ))
            })
    }
}

pub struct InputObjectType {
    pub name: String,
    pub fields: IndexMap<String, InputValueDefinition>,
}

pub struct FieldDefinition {
    pub name: String,
    pub arguments: IndexMap<String, InputValueDefinition>,
    pub ty: TypeRef,
    pub resolve: Option<Resolver>,
    pub subscribe: Option<Resolver>,
}

pub struct InputValueDefinition {
    pub name: String,
    pub ty: TypeRef,
    /// Literal default, coerced against `ty` wherever it is used.
    pub default_value: Option<ConstValue>,
}
