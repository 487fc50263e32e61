use async_graphql_parser::{types::VariableDefinition, Positioned};
use error::{ErrorCode, GraphqlError, Location};
use serde_json::{Map, Value};

use super::{coercion::coerce_default, location};
use crate::{
    response::inspect::inspect,
    schema::{LeafError, TypeDefinition},
    CompileError, Schema, TypeRef,
};

#[derive(Debug)]
struct VariableSpec {
    name: String,
    ty: TypeRef,
    default_value: Option<Value>,
    location: Location,
}

/// Coerces raw variables against the variable definitions of the operation.
#[derive(Debug, Default)]
pub(crate) struct VariableParser {
    variables: Vec<VariableSpec>,
}

#[derive(Debug, Clone, PartialEq)]
enum PathSegment {
    Key(String),
    Index(usize),
}

struct InputError {
    path: Vec<PathSegment>,
    value: Value,
    message: String,
}

impl VariableParser {
    pub fn new(schema: &Schema, definitions: &[Positioned<VariableDefinition>]) -> Result<Self, CompileError> {
        let mut variables = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let ty = TypeRef::from_ast(&definition.node.var_type.node);
            let default_value = match &definition.node.default_value {
                Some(default) => coerce_default(schema, &default.node, &ty)?,
                None => None,
            };
            variables.push(VariableSpec {
                name: definition.node.name.node.to_string(),
                ty,
                default_value,
                location: location(definition.pos),
            });
        }
        Ok(VariableParser { variables })
    }

    pub fn parse(&self, schema: &Schema, raw: &Map<String, Value>) -> Result<Map<String, Value>, Vec<GraphqlError>> {
        let mut coerced = Map::new();
        let mut errors = Vec::new();
        for spec in &self.variables {
            let error = |message: String| {
                GraphqlError::new(message, ErrorCode::VariableError).with_location(spec.location)
            };
            let is_input = schema
                .get(spec.ty.named_type())
                .is_some_and(|ty| matches!(ty, TypeDefinition::Scalar(_) | TypeDefinition::Enum(_) | TypeDefinition::InputObject(_)));
            if !is_input {
                errors.push(error(format!(
                    "Variable \"${}\" expected value of type \"{}\" which cannot be used as an input type.",
                    spec.name, spec.ty
                )));
                continue;
            }
            let Some(value) = raw.get(&spec.name) else {
                if let Some(default) = &spec.default_value {
                    coerced.insert(spec.name.clone(), default.clone());
                } else if spec.ty.is_non_null() {
                    errors.push(error(format!(
                        "Variable \"${}\" of required type \"{}\" was not provided.",
                        spec.name, spec.ty
                    )));
                }
                continue;
            };
            if value.is_null() && spec.ty.is_non_null() {
                errors.push(error(format!(
                    "Variable \"${}\" of non-null type \"{}\" must not be null.",
                    spec.name, spec.ty
                )));
                continue;
            }
            let mut input_errors = Vec::new();
            let value = coerce_input_value(schema, value, &spec.ty, &mut Vec::new(), &mut input_errors);
            if input_errors.is_empty() {
                coerced.insert(spec.name.clone(), value);
            }
            for InputError { path, value, message } in input_errors {
                let mut prefix = format!("Variable \"${}\" got invalid value {}", spec.name, inspect(&value));
                if !path.is_empty() {
                    prefix.push_str(&format!(" at \"{}{}\"", spec.name, print_path(&path)));
                }
                errors.push(error(format!("{prefix}; {message}")));
            }
        }
        if errors.is_empty() {
            Ok(coerced)
        } else {
            tracing::debug!(errors = errors.len(), "invalid variables");
            Err(errors)
        }
    }
}

fn print_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(|segment| match segment {
            PathSegment::Key(key) => format!(".{key}"),
            PathSegment::Index(index) => format!("[{index}]"),
        })
        .collect()
}

fn fail(errors: &mut Vec<InputError>, path: &[PathSegment], value: &Value, message: String) -> Value {
    errors.push(InputError {
        path: path.to_vec(),
        value: value.clone(),
        message,
    });
    Value::Null
}

fn coerce_input_value(
    schema: &Schema,
    value: &Value,
    ty: &TypeRef,
    path: &mut Vec<PathSegment>,
    errors: &mut Vec<InputError>,
) -> Value {
    let name = match ty {
        TypeRef::NonNull(inner) => {
            if value.is_null() {
                return fail(errors, path, value, format!("Expected non-nullable type \"{ty}\" not to be null."));
            }
            return coerce_input_value(schema, value, inner, path, errors);
        }
        _ if value.is_null() => return Value::Null,
        TypeRef::List(item_type) => {
            return match value {
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(index, item)| {
                            path.push(PathSegment::Index(index));
                            let item = coerce_input_value(schema, item, item_type, path, errors);
                            path.pop();
                            item
                        })
                        .collect(),
                ),
                single => Value::Array(vec![coerce_input_value(schema, single, item_type, path, errors)]),
            };
        }
        TypeRef::Named(name) => name,
    };

    match schema.get(name) {
        Some(TypeDefinition::InputObject(input)) => {
            let Value::Object(fields) = value else {
                return fail(errors, path, value, format!("Expected type \"{name}\" to be an object."));
            };
            let mut object = Map::new();
            for (field_name, field) in &input.fields {
                match fields.get(field_name) {
                    Some(field_value) => {
                        path.push(PathSegment::Key(field_name.clone()));
                        let coerced = coerce_input_value(schema, field_value, &field.ty, path, errors);
                        path.pop();
                        object.insert(field_name.clone(), coerced);
                    }
                    None => {
                        let default = match &field.default_value {
                            Some(default) => match coerce_default(schema, default, &field.ty) {
                                Ok(default) => default,
                                Err(error) => {
                                    path.push(PathSegment::Key(field_name.clone()));
                                    let value = fail(errors, path, &Value::Null, error.to_string());
                                    path.pop();
                                    return value;
                                }
                            },
                            None => None,
                        };
                        if let Some(default) = default {
                            object.insert(field_name.clone(), default);
                        } else if field.ty.is_non_null() {
                            let message = format!(
                                "Field \"{field_name}\" of required type \"{}\" was not provided.",
                                field.ty
                            );
                            return fail(errors, path, value, message);
                        }
                    }
                }
            }
            if let Some(unknown) = fields.keys().find(|key| !input.fields.contains_key(key.as_str())) {
                return fail(errors, path, value, format!("Field \"{unknown}\" is not defined by type \"{name}\"."));
            }
            Value::Object(object)
        }
        Some(TypeDefinition::Enum(enum_type)) => {
            let Value::String(value_name) = value else {
                return fail(
                    errors,
                    path,
                    value,
                    format!("Enum \"{name}\" cannot represent non-string value: {}.", inspect(value)),
                );
            };
            match enum_type.value(value_name) {
                Some(enum_value) => enum_value.value.clone(),
                None => fail(
                    errors,
                    path,
                    value,
                    format!("Value \"{value_name}\" does not exist in \"{name}\" enum."),
                ),
            }
        }
        Some(TypeDefinition::Scalar(scalar)) => match (scalar.parse_value)(value) {
            Ok(parsed) => parsed,
            Err(LeafError::Message(message)) => fail(errors, path, value, message),
            Err(LeafError::Invalid) => fail(errors, path, value, format!("Expected type \"{name}\".")),
        },
        _ => fail(errors, path, value, format!("Expected type \"{name}\".")),
    }
}

#[cfg(test)]
mod tests {
    use async_graphql_parser::types::DocumentOperations;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::SchemaBuilder;

    const SDL: &str = r#"
        enum Color { RED GREEN }
        input Filter { color: Color = RED tags: [String!] limit: Int! }
        type Point { x: Int }
        input Broken { point: Point = { x: 1 } label: String }
        type Query { a: Int }
    "#;

    fn parse(definitions: &str, raw: Value) -> Result<Value, Vec<String>> {
        let schema = SchemaBuilder::from_sdl(SDL).build().unwrap();
        let document = async_graphql_parser::parse_query(format!("query {definitions} {{ a }}")).unwrap();
        let DocumentOperations::Single(operation) = document.operations else {
            unreachable!()
        };
        let parser = VariableParser::new(&schema, &operation.node.variable_definitions).unwrap();
        parser
            .parse(&schema, raw.as_object().unwrap())
            .map(Value::Object)
            .map_err(|errors| errors.into_iter().map(|error| error.message.to_string()).collect())
    }

    #[test]
    fn defaults_and_absent_variables() {
        assert_eq!(
            parse("($a: Int = 3, $b: String, $c: Boolean)", json!({"c": null})),
            Ok(json!({"a": 3, "c": null}))
        );
        assert_eq!(
            parse("($f: Filter)", json!({"f": {"limit": 2, "tags": "x"}})),
            Ok(json!({"f": {"color": "RED", "tags": ["x"], "limit": 2}}))
        );
    }

    #[test]
    fn invalid_variables() {
        assert_eq!(
            parse("($a: Int!, $b: Int!)", json!({"b": null})),
            Err(vec![
                "Variable \"$a\" of required type \"Int!\" was not provided.".to_string(),
                "Variable \"$b\" of non-null type \"Int!\" must not be null.".to_string(),
            ])
        );
        assert_eq!(
            parse("($a: Int)", json!({"a": "x"})),
            Err(vec![
                "Variable \"$a\" got invalid value \"x\"; Int cannot represent non-integer value: \"x\"".to_string()
            ])
        );
        assert_eq!(
            parse("($f: Filter)", json!({"f": {"limit": 1, "tags": [null]}})),
            Err(vec![
                "Variable \"$f\" got invalid value null at \"f.tags[0]\"; Expected non-nullable type \"String!\" not to be null."
                    .to_string()
            ])
        );
        assert_eq!(
            parse("($f: Filter)", json!({"f": {"color": "BLUE", "limit": 1}})),
            Err(vec![
                "Variable \"$f\" got invalid value \"BLUE\" at \"f.color\"; Value \"BLUE\" does not exist in \"Color\" enum."
                    .to_string()
            ])
        );
    }

    #[test]
    fn failing_input_field_defaults_are_reported() {
        assert_eq!(
            parse("($b: Broken)", json!({"b": {"label": "x"}})),
            Err(vec![
                "Variable \"$b\" got invalid value null at \"b.point\"; Unexpected input type: \"Point\".".to_string()
            ])
        );
        assert_eq!(
            parse("($b: Broken)", json!({"b": {"point": null, "label": "x"}})),
            Ok(json!({"b": {"point": null, "label": "x"}}))
        );
    }
}
