//! Compile time coercion of field arguments into templates patched with variable values at
//! execution time.

use async_graphql_parser::{types::Field, Positioned};
use async_graphql_value::{ConstValue, Value as AstValue};
use error::{GraphqlError, Location};
use serde_json::{Map, Value};

use super::{location, validation_error};
use crate::{
    schema::{FieldDefinition, TypeDefinition},
    CompileError, Schema, TypeRef,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TemplateSegment {
    Key(String),
    Index(usize),
}

/// Argument whose whole value is a variable.
#[derive(Debug, Clone)]
pub(crate) struct TopLevelArgument {
    pub name: String,
    pub ty: TypeRef,
    pub has_default: bool,
    pub location: Location,
}

/// Slot of the template to fill with the value of a variable.
#[derive(Debug, Clone)]
pub(crate) struct PendingSubstitution {
    pub path: Vec<TemplateSegment>,
    pub variable: String,
    pub argument: Option<TopLevelArgument>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ArgumentTemplate {
    pub values: Map<String, Value>,
    pub pending: Vec<PendingSubstitution>,
}

/// Runtime failure of an argument, reported at the field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArgumentError {
    pub message: String,
    pub location: Location,
}

impl ArgumentTemplate {
    /// Arguments for one execution, with variable values substituted.
    pub fn resolve(&self, variables: &Map<String, Value>) -> Result<Map<String, Value>, Vec<ArgumentError>> {
        let mut values = self.values.clone();
        let mut errors = Vec::new();
        for pending in &self.pending {
            match variables.get(&pending.variable) {
                Some(value) => {
                    if let Some(argument) = &pending.argument {
                        if argument.ty.is_non_null() && value.is_null() {
                            errors.push(ArgumentError {
                                message: format!(
                                    "Argument \"{}\" of non-null type \"{}\" must not be null.",
                                    argument.name, argument.ty
                                ),
                                location: argument.location,
                            });
                        }
                    }
                    set_at(&mut values, &pending.path, value.clone());
                }
                None => {
                    if let Some(argument) = &pending.argument {
                        if argument.ty.is_non_null() && !argument.has_default {
                            errors.push(ArgumentError {
                                message: format!(
                                    "Argument \"{}\" of required type \"{}\" was provided the variable \"${}\" which was not provided a runtime value.",
                                    argument.name, argument.ty, pending.variable
                                ),
                                location: argument.location,
                            });
                        }
                    }
                }
            }
        }
        if errors.is_empty() {
            Ok(values)
        } else {
            Err(errors)
        }
    }
}

fn set_at(values: &mut Map<String, Value>, path: &[TemplateSegment], value: Value) {
    let Some((TemplateSegment::Key(first), rest)) = path.split_first() else {
        return;
    };
    if rest.is_empty() {
        values.insert(first.clone(), value);
        return;
    }
    let Some(mut current) = values.get_mut(first) else {
        return;
    };
    for segment in rest {
        let next = match (segment, current) {
            (TemplateSegment::Key(key), Value::Object(object)) => object.get_mut(key),
            (TemplateSegment::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        };
        match next {
            Some(next) => current = next,
            None => return,
        }
    }
    *current = value;
}

struct Coerced {
    value: Value,
    /// Variables nested in the literal, with their path relative to it.
    variables: Vec<(Vec<TemplateSegment>, String)>,
}

impl Coerced {
    fn value(value: Value) -> Self {
        Coerced {
            value,
            variables: Vec::new(),
        }
    }

    fn nested_under(
        variables: Vec<(Vec<TemplateSegment>, String)>,
        segment: TemplateSegment,
    ) -> impl Iterator<Item = (Vec<TemplateSegment>, String)> {
        variables.into_iter().map(move |(mut path, variable)| {
            path.insert(0, segment.clone());
            (path, variable)
        })
    }
}

/// Builds the argument template of a field selection from the argument definitions.
pub(crate) fn coerce_arguments(
    schema: &Schema,
    definition: &FieldDefinition,
    node: &Positioned<Field>,
) -> Result<ArgumentTemplate, CompileError> {
    let mut template = ArgumentTemplate::default();
    for (name, argument) in &definition.arguments {
        if let Some(default) = &argument.default_value {
            if let Some(value) = coerce_default(schema, default, &argument.ty)? {
                template.values.insert(name.clone(), value);
            }
        }

        let provided = node.node.get_argument(name);
        let mut has_variables = false;
        if let Some(value) = provided {
            match &value.node {
                AstValue::Variable(variable) => {
                    has_variables = true;
                    template.pending.push(PendingSubstitution {
                        path: vec![TemplateSegment::Key(name.clone())],
                        variable: variable.to_string(),
                        argument: Some(TopLevelArgument {
                            name: name.clone(),
                            ty: argument.ty.clone(),
                            has_default: argument.default_value.is_some(),
                            location: location(value.pos),
                        }),
                    });
                }
                literal => {
                    let Some(coerced) = value_from_ast(schema, literal, &argument.ty)? else {
                        return Err(invalid_argument(name, &argument.ty, value));
                    };
                    let nested = Coerced::nested_under(coerced.variables, TemplateSegment::Key(name.clone()));
                    template.pending.extend(nested.map(|(path, variable)| PendingSubstitution {
                        path,
                        variable,
                        argument: None,
                    }));
                    template.values.insert(name.clone(), coerced.value);
                }
            }
        }

        if argument.ty.is_non_null() && !template.values.contains_key(name) && !has_variables {
            let message = if provided.is_some() {
                format!("Argument \"{name}\" of non-null type \"{}\" must not be null.", argument.ty)
            } else {
                format!("Argument \"{name}\" of required type \"{}\" was not provided.", argument.ty)
            };
            return Err(validation_error(message).with_location(location(node.pos)).into());
        }
    }
    Ok(template)
}

fn invalid_argument(name: &str, ty: &TypeRef, value: &Positioned<AstValue>) -> CompileError {
    validation_error(format!(
        "Argument \"{name}\" of type \"{ty}\" has invalid value {}.",
        value.node
    ))
    .with_location(location(value.pos))
    .into()
}

/// Coerces a default literal, which cannot contain variables.
pub(crate) fn coerce_default(schema: &Schema, default: &ConstValue, ty: &TypeRef) -> Result<Option<Value>, CompileError> {
    let literal = default.clone().into_value();
    Ok(value_from_ast(schema, &literal, ty)?.map(|coerced| coerced.value))
}

/// Type directed coercion of a literal. `None` when the literal is not a valid value of the type.
fn value_from_ast(schema: &Schema, literal: &AstValue, ty: &TypeRef) -> Result<Option<Coerced>, CompileError> {
    if let TypeRef::NonNull(inner) = ty {
        if matches!(literal, AstValue::Null) {
            return Ok(None);
        }
        return value_from_ast(schema, literal, inner);
    }
    match literal {
        AstValue::Null => return Ok(Some(Coerced::value(Value::Null))),
        AstValue::Variable(variable) => {
            return Ok(Some(Coerced {
                value: Value::Null,
                variables: vec![(Vec::new(), variable.to_string())],
            }))
        }
        _ => {}
    }

    let name = match ty {
        TypeRef::List(item_type) => return list_from_ast(schema, literal, item_type),
        TypeRef::Named(name) => name,
        TypeRef::NonNull(_) => return Ok(None),
    };

    match schema.get(name) {
        Some(TypeDefinition::InputObject(input)) => {
            let AstValue::Object(fields) = literal else {
                return Ok(None);
            };
            let mut object = Map::new();
            let mut variables = Vec::new();
            for (field_name, field) in &input.fields {
                if let Some(default) = &field.default_value {
                    if let Some(value) = coerce_default(schema, default, &field.ty)? {
                        object.insert(field_name.clone(), value);
                    }
                }
                let Some(field_literal) = fields.get(field_name.as_str()) else {
                    continue;
                };
                let Some(coerced) = value_from_ast(schema, field_literal, &field.ty)? else {
                    return Ok(None);
                };
                variables.extend(Coerced::nested_under(
                    coerced.variables,
                    TemplateSegment::Key(field_name.clone()),
                ));
                object.insert(field_name.clone(), coerced.value);
            }
            Ok(Some(Coerced {
                value: Value::Object(object),
                variables,
            }))
        }
        Some(TypeDefinition::Enum(enum_type)) => {
            let AstValue::Enum(value_name) = literal else {
                return Ok(None);
            };
            Ok(enum_type
                .value(value_name.as_str())
                .map(|value| Coerced::value(value.value.clone())))
        }
        Some(TypeDefinition::Scalar(scalar)) => Ok((scalar.parse_literal)(literal).ok().map(Coerced::value)),
        Some(other) => Err(CompileError::UnexpectedInputType {
            name: other.name().to_string(),
        }),
        None => Err(CompileError::UnexpectedInputType { name: name.clone() }),
    }
}

fn list_from_ast(schema: &Schema, literal: &AstValue, item_type: &TypeRef) -> Result<Option<Coerced>, CompileError> {
    let AstValue::List(items) = literal else {
        let Some(coerced) = value_from_ast(schema, literal, item_type)? else {
            return Ok(None);
        };
        return Ok(Some(Coerced {
            value: Value::Array(vec![coerced.value]),
            variables: Coerced::nested_under(coerced.variables, TemplateSegment::Index(0)).collect(),
        }));
    };
    let mut values = Vec::with_capacity(items.len());
    let mut variables = Vec::new();
    for (index, item) in items.iter().enumerate() {
        if let AstValue::Variable(variable) = item {
            values.push(Value::Null);
            variables.push((vec![TemplateSegment::Index(index)], variable.to_string()));
            continue;
        }
        let Some(coerced) = value_from_ast(schema, item, item_type)? else {
            return Ok(None);
        };
        values.push(coerced.value);
        variables.extend(Coerced::nested_under(coerced.variables, TemplateSegment::Index(index)));
    }
    Ok(Some(Coerced {
        value: Value::Array(values),
        variables,
    }))
}

impl From<GraphqlError> for CompileError {
    fn from(error: GraphqlError) -> Self {
        CompileError::Graphql(vec![error])
    }
}
