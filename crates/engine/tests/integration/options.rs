use engine_jit::{CompilerOptions, FieldError, LeafError, Response, SchemaBuilder};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::{compile, compile_with, context, execute, runtime, schema};

const SDL: &str = r#"
    enum Color { RED GREEN }
    type Query { color: Color count: Int label: String }
"#;

fn color_schema() -> std::sync::Arc<engine_jit::Schema> {
    schema(
        SchemaBuilder::from_sdl(SDL)
            .enum_value("Color", "RED", json!(0))
            .enum_value("Color", "GREEN", json!(1))
            .resolver("Query", "color", |_, _, _, _| Ok(json!(1).into()))
            .resolver("Query", "count", |_, _, _, _| Ok(json!(4).into()))
            .resolver("Query", "label", |_, _, _, _| Ok(json!("x").into())),
    )
}

#[test]
fn enum_values_are_serialized_by_name() {
    let query = compile(&color_schema(), "{ color }").unwrap();
    assert_eq!(execute(&query, json!({})), json!({"data": {"color": "GREEN"}}));
}

#[test]
fn disabled_leaf_serialization_writes_internal_values() {
    let options = CompilerOptions::default().with_leaf_serialization_disabled();
    let query = compile_with(&color_schema(), "{ color count }", options).unwrap();
    assert_eq!(execute(&query, json!({})), json!({"data": {"color": 1, "count": 4}}));
}

#[test]
fn custom_serializers_replace_the_type_serializer() {
    let options = CompilerOptions::default()
        .with_custom_serializer("Int", |value: &Value| Ok(json!(value.as_i64().unwrap_or_default() * 10)))
        .with_custom_serializer("String", |_: &Value| Err(LeafError::Invalid));
    let query = compile_with(&color_schema(), "{ count label }", options).unwrap();

    let response = execute(&query, json!({}));
    assert_eq!(response["data"], json!({"count": 40, "label": null}));
    assert_eq!(
        response["errors"][0]["message"],
        json!("Expected a value of type \"String\" but received: x")
    );
}

#[test]
fn resolver_info_enricher_is_exposed_to_resolvers() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { site: String }").resolver("Query", "site", |_, _, _, info| {
            Ok(info.enrichment.cloned().unwrap_or_default().into())
        }),
    );
    let options = CompilerOptions::default()
        .with_resolver_info_enricher(|info| json!(format!("{}.{}", info.parent_type, info.field_name)));
    let query = compile_with(&schema, "{ site }", options).unwrap();

    assert_eq!(execute(&query, json!({})), json!({"data": {"site": "Query.site"}}));
}

#[test]
fn debug_keeps_the_compiled_plan() {
    let schema = color_schema();
    assert_eq!(compile(&schema, "{ color }").unwrap().compilation(), None);

    let query = compile_with(&schema, "{ color }", CompilerOptions::default().with_debug()).unwrap();
    let compilation = query.compilation().unwrap_or_default();
    assert!(compilation.starts_with("query Query"), "{compilation}");
    assert!(compilation.contains("color: resolve color Color"), "{compilation}");
}

#[test]
fn custom_json_serializer_follows_the_operation_shape() {
    let options = CompilerOptions::default().with_custom_json_serializer();
    let query = compile_with(&color_schema(), "{ count label }", options).unwrap();

    let schema = query.json_schema().unwrap_or_default();
    assert_eq!(schema["properties"]["data"]["properties"]["count"], json!({"type": "integer", "nullable": true}));

    let response = Response::data(json!({"count": 4, "label": "x", "other": true}));
    assert_eq!(query.stringify(&response), r#"{"data":{"count":4,"label":"x"}}"#);
}

#[test]
fn options_are_read_from_configuration() {
    let options: CompilerOptions = serde_json::from_value(json!({
        "disableLeafSerialization": true,
        "customJSONSerializer": true,
        "disablingCapturingStackErrors": true
    }))
    .unwrap();

    assert!(options.disable_leaf_serialization);
    assert!(options.custom_json_serializer);
    assert!(options.disable_capturing_stack_errors);
    assert!(!options.debug);
}

#[test]
fn backtraces_are_captured_unless_disabled() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { fail: Int }")
            .resolver("Query", "fail", |_, _, _, _| Err(FieldError::new("boom"))),
    );
    let run = |options: CompilerOptions| {
        let query = compile_with(&schema, "{ fail }", options).unwrap();
        runtime().block_on(async { query.query(Value::Null, context(), &Default::default()).await })
    };

    let response = run(CompilerOptions::default());
    assert!(response.errors[0].backtrace.is_some());

    let response = run(CompilerOptions::default().without_backtraces());
    assert_eq!(response.errors[0].message, "boom");
    assert!(response.errors[0].backtrace.is_none());
}
