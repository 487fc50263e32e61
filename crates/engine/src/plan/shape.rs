//! Structural description of the responses of an operation, used to publish a JSON schema of the
//! output and to serialize responses without looking at anything the operation did not select.

use async_graphql_parser::{types::Field, Positioned};
use error::{ErrorCode, GraphqlError};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::{
    operation::{
        collect::{FieldCollector, FieldMap},
        validation_error, OperationSource,
    },
    schema::{ObjectType, TypeDefinition},
    CompileError, Response, Schema, TypeRef,
};

#[derive(Debug, Clone, PartialEq, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum ShapeKind {
    Object(IndexMap<String, Shape>),
    Array(Box<Shape>),
    String,
    Integer,
    Number,
    Boolean,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Shape {
    pub kind: ShapeKind,
    pub nullable: bool,
}

impl Shape {
    fn nullable(kind: ShapeKind) -> Self {
        Shape { kind, nullable: true }
    }

    fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".into(), self.kind.as_ref().into());
        match &self.kind {
            ShapeKind::Object(properties) => {
                schema.insert("properties".into(), properties_schema(properties));
            }
            ShapeKind::Array(items) => {
                schema.insert("items".into(), items.json_schema());
            }
            _ => {}
        }
        schema.insert("nullable".into(), self.nullable.into());
        Value::Object(schema)
    }

    /// Keeps what the shape describes and coerces primitives to their declared kind.
    fn project(&self, value: &Value) -> Value {
        match (&self.kind, value) {
            (_, Value::Null) => Value::Null,
            (ShapeKind::Object(properties), Value::Object(object)) => Value::Object(
                properties
                    .iter()
                    .filter_map(|(key, shape)| Some((key.clone(), shape.project(object.get(key)?))))
                    .collect(),
            ),
            (ShapeKind::Array(items), Value::Array(values)) => {
                Value::Array(values.iter().map(|value| items.project(value)).collect())
            }
            (ShapeKind::String, Value::String(_)) => value.clone(),
            (ShapeKind::String, Value::Number(number)) => Value::String(number.to_string()),
            (ShapeKind::String, Value::Bool(boolean)) => Value::String(boolean.to_string()),
            // Same 32-bit range as the `Int` serializer.
            (ShapeKind::Integer, Value::Number(number)) => number
                .as_f64()
                .map(f64::trunc)
                .filter(|integer| (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(integer))
                .map_or(Value::Null, |integer| (integer as i64).into()),
            (ShapeKind::Integer, Value::Bool(boolean)) => i64::from(*boolean).into(),
            (ShapeKind::Number, Value::Number(_)) => value.clone(),
            (ShapeKind::Number, Value::Bool(boolean)) => i64::from(*boolean).into(),
            (ShapeKind::Boolean, Value::Bool(_)) => value.clone(),
            (ShapeKind::Boolean, Value::Number(number)) => (number.as_f64() != Some(0.0)).into(),
            (ShapeKind::Boolean, Value::String(string)) => (!string.is_empty()).into(),
            _ => Value::Null,
        }
    }
}

fn properties_schema(properties: &IndexMap<String, Shape>) -> Value {
    Value::Object(
        properties
            .iter()
            .map(|(key, shape)| (key.clone(), shape.json_schema()))
            .collect(),
    )
}

/// Shape of the `data` of every response to an operation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResponseShape {
    data: IndexMap<String, Shape>,
}

impl ResponseShape {
    pub fn derive(schema: &Schema, source: &OperationSource) -> Result<Self, CompileError> {
        let operation = source.definition();
        let Some(root_type) = schema.root_type(operation.ty) else {
            return Err(validation_error(format!(
                "Schema is not configured to execute {} operation.",
                operation.ty
            ))
            .into());
        };
        let mut deriver = ShapeDeriver {
            schema,
            collector: FieldCollector::new(schema, &source.fragments, &operation.variable_definitions, false),
        };
        let fields = deriver
            .collector
            .collect_fields(&root_type.name, &operation.selection_set, "")?;
        let data = deriver.properties(root_type, &fields)?;
        Ok(ResponseShape { data })
    }

    pub fn json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "data": {
                    "type": "object",
                    "properties": properties_schema(&self.data),
                    "nullable": true
                },
                "errors": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "additionalProperties": true,
                        "properties": {
                            "message": { "type": "string" },
                            "path": {
                                "type": "array",
                                "items": { "type": ["string", "number"] }
                            },
                            "locations": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "line": { "type": "number" },
                                        "column": { "type": "number" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    pub fn serialize(&self, response: &Response) -> String {
        let mut envelope = Map::new();
        if let Some(data) = &response.data {
            let data = Shape::nullable(ShapeKind::Object(self.data.clone())).project(data);
            envelope.insert("data".into(), data);
        }
        if !response.errors.is_empty() {
            envelope.insert(
                "errors".into(),
                serde_json::to_value(&response.errors).unwrap_or_default(),
            );
        }
        Value::Object(envelope).to_string()
    }
}

struct ShapeDeriver<'a> {
    schema: &'a Schema,
    collector: FieldCollector<'a>,
}

impl<'a> ShapeDeriver<'a> {
    fn properties(
        &mut self,
        object: &'a ObjectType,
        fields: &FieldMap<'a>,
    ) -> Result<IndexMap<String, Shape>, CompileError> {
        let mut properties = IndexMap::with_capacity(fields.len());
        for (key, nodes) in fields {
            let Some(first) = nodes.first() else {
                continue;
            };
            let field_name = first.node.name.node.as_str();
            let shape = if field_name == "__typename" {
                Shape {
                    kind: ShapeKind::String,
                    nullable: false,
                }
            } else {
                let Some(definition) = object.fields.get(field_name) else {
                    continue;
                };
                self.transform(nodes, &definition.ty)?
            };
            properties.insert(key.to_string(), shape);
        }
        Ok(properties)
    }

    fn transform(&mut self, nodes: &[&'a Positioned<Field>], ty: &TypeRef) -> Result<Shape, CompileError> {
        let schema = self.schema;
        let name = match ty {
            TypeRef::NonNull(inner) => {
                let mut shape = self.transform(nodes, inner)?;
                shape.nullable = false;
                return Ok(shape);
            }
            TypeRef::List(item) => return Ok(Shape::nullable(ShapeKind::Array(Box::new(self.transform(nodes, item)?)))),
            TypeRef::Named(name) => name,
        };
        let kind = match schema.get(name) {
            Some(TypeDefinition::Object(object)) => {
                let fields = self.collector.collect_subfields(name, nodes, "")?;
                ShapeKind::Object(self.properties(object, &fields)?)
            }
            Some(TypeDefinition::Enum(_)) => ShapeKind::String,
            Some(TypeDefinition::Scalar(_)) => match name.as_str() {
                "Int" => ShapeKind::Integer,
                "Float" => ShapeKind::Number,
                "String" | "ID" => ShapeKind::String,
                "Boolean" => ShapeKind::Boolean,
                _ => {
                    return Err(GraphqlError::new(
                        format!("Got unexpected PRIMITIVES type: {name}"),
                        ErrorCode::InternalServerError,
                    )
                    .into())
                }
            },
            Some(TypeDefinition::Interface(_) | TypeDefinition::Union(_)) => {
                let mut properties = IndexMap::new();
                for possible_type in schema.possible_types(name) {
                    let shape = self.transform(nodes, &TypeRef::named(possible_type.as_str()))?;
                    if let ShapeKind::Object(possible_properties) = shape.kind {
                        properties.extend(possible_properties);
                    }
                }
                ShapeKind::Object(properties)
            }
            Some(TypeDefinition::InputObject(_)) | None => {
                return Err(CompileError::UnsupportedType { name: name.clone() });
            }
        };
        Ok(Shape::nullable(kind))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::SchemaBuilder;

    const SDL: &str = r#"
        enum Color { RED }
        interface Named { name: String }
        type Dog implements Named { name: String barks: Boolean! }
        type Cat implements Named { name: String lives: Int }
        type Query { pets: [Named!] color: Color count: Int! date: Date }
        scalar Date
    "#;

    fn shape(query: &str) -> Result<ResponseShape, String> {
        let schema = SchemaBuilder::from_sdl(SDL).build().unwrap();
        let document = async_graphql_parser::parse_query(query).unwrap();
        let source = OperationSource::select(&document, None).unwrap();
        ResponseShape::derive(&schema, &source).map_err(|err| err.to_string())
    }

    #[test]
    fn data_schema_follows_the_selection() {
        let shape = shape("{ count color pets { __typename name ... on Dog { barks } ... on Cat { lives } } }").unwrap();
        let schema = shape.json_schema();
        insta::assert_json_snapshot!(schema["properties"]["data"], @r#"
        {
          "type": "object",
          "properties": {
            "count": {
              "type": "integer",
              "nullable": false
            },
            "color": {
              "type": "string",
              "nullable": true
            },
            "pets": {
              "type": "array",
              "items": {
                "type": "object",
                "properties": {
                  "__typename": {
                    "type": "string",
                    "nullable": false
                  },
                  "name": {
                    "type": "string",
                    "nullable": true
                  },
                  "barks": {
                    "type": "boolean",
                    "nullable": false
                  },
                  "lives": {
                    "type": "integer",
                    "nullable": true
                  }
                },
                "nullable": false
              },
              "nullable": true
            }
          },
          "nullable": true
        }
        "#);
    }

    #[test]
    fn custom_scalars_have_no_shape() {
        assert_eq!(shape("{ date }").unwrap_err(), "Got unexpected PRIMITIVES type: Date");
    }

    #[test]
    fn serialization_keeps_selected_properties_only() {
        let shape = shape("{ count pets { name } }").unwrap();
        let response = Response::data(json!({
            "count": 2.7,
            "pets": [{"name": "Rex", "secret": true}, null],
            "extra": 1
        }));
        assert_eq!(shape.serialize(&response), r#"{"data":{"count":2,"pets":[{"name":"Rex"},null]}}"#);
    }

    #[test]
    fn integers_outside_32_bits_are_null() {
        let shape = shape("{ count }").unwrap();
        for (count, expected) in [
            (json!(1e12), r#"{"data":{"count":null}}"#),
            (json!(-2147483649i64), r#"{"data":{"count":null}}"#),
            (json!(-2147483648i64), r#"{"data":{"count":-2147483648}}"#),
            (json!(-3.9), r#"{"data":{"count":-3}}"#),
        ] {
            let response = Response::data(json!({ "count": count }));
            assert_eq!(shape.serialize(&response), expected);
        }
    }
}
