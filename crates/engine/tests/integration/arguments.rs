use engine_jit::{ResolvedValue, SchemaBuilder};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::{compile, execute, schema};

const SDL: &str = r#"
    enum Color { RED GREEN }
    input Filter { color: Color = RED limit: Int }
    type Query {
        greet(name: String!): String
        echo(filter: Filter, tags: [String]): String
    }
"#;

fn echo_schema() -> std::sync::Arc<engine_jit::Schema> {
    schema(
        SchemaBuilder::from_sdl(SDL)
            .resolver("Query", "greet", |_, args, _, _| {
                let name = args.get("name").and_then(Value::as_str).unwrap_or("nobody");
                Ok(json!(format!("Hello {name}")).into())
            })
            .resolver("Query", "echo", |_, args, _, _| {
                Ok(ResolvedValue::Value(Value::String(Value::Object(args.clone()).to_string())))
            }),
    )
}

#[test]
fn literal_arguments_are_coerced_once() {
    let schema = echo_schema();
    let query = compile(&schema, r#"{ greet(name: "Ada") echo(filter: { limit: 2 }, tags: "a") }"#).unwrap();

    let response = execute(&query, json!({}));
    assert_eq!(
        response,
        json!({"data": {
            "greet": "Hello Ada",
            "echo": r#"{"filter":{"color":"RED","limit":2},"tags":["a"]}"#
        }})
    );
}

#[test]
fn variables_are_substituted_for_every_execution() {
    let schema = echo_schema();
    let query = compile(&schema, "query ($name: String!) { greet(name: $name) }").unwrap();

    assert_eq!(
        execute(&query, json!({"name": "Ada"})),
        json!({"data": {"greet": "Hello Ada"}})
    );
    assert_eq!(
        execute(&query, json!({"name": "Grace"})),
        json!({"data": {"greet": "Hello Grace"}})
    );
}

#[test]
fn missing_variable_for_a_required_argument() {
    let schema = echo_schema();
    let query = compile(&schema, "query ($name: String) { greet(name: $name) }").unwrap();

    let response = execute(&query, json!({}));
    assert_eq!(response["data"], json!({"greet": null}));
    assert_eq!(
        response["errors"][0]["message"],
        json!(
            "Argument \"name\" of required type \"String!\" was provided the variable \"$name\" which was not provided a runtime value."
        )
    );
    assert_eq!(response["errors"][0]["path"], json!(["greet"]));
}

#[test]
fn null_variable_for_a_required_argument() {
    let schema = echo_schema();
    let query = compile(&schema, "query ($name: String) { greet(name: $name) }").unwrap();

    let response = execute(&query, json!({"name": null}));
    assert_eq!(
        response["errors"][0]["message"],
        json!("Argument \"name\" of non-null type \"String!\" must not be null.")
    );
}

#[test]
fn invalid_variables_prevent_execution() {
    let schema = echo_schema();
    let query = compile(&schema, "query ($name: String!) { greet(name: $name) }").unwrap();

    let response = execute(&query, json!({}));
    assert_eq!(response.get("data"), None);
    assert_eq!(
        response["errors"][0]["message"],
        json!("Variable \"$name\" of required type \"String!\" was not provided.")
    );
}

#[test]
fn unknown_operation_name() {
    let schema = echo_schema();
    let error = engine_jit::CompiledQuery::compile_str(
        schema,
        "query A { greet(name: \"a\") } query B { greet(name: \"b\") }",
        Some("C"),
        Default::default(),
    )
    .unwrap_err();

    assert_eq!(error.to_string(), "Unknown operation named \"C\".");
}
