use std::time::Duration;

use engine_jit::{FieldError, ResolvedValue, SchemaBuilder};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{compile, execute, schema};

#[test]
fn hello_world() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { hello: String }")
            .resolver("Query", "hello", |_, _, _, _| Ok(json!("world").into())),
    );
    let query = compile(&schema, "{ hello }").unwrap();

    let response = execute(&query, json!({}));
    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "hello": "world"
      }
    }
    "#);
}

#[test]
fn rejected_value_nulls_its_field_only() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { a: String b: String }")
            .resolver("Query", "a", |_, _, _, _| {
                Ok(ResolvedValue::pending(async { Err(FieldError::new("boom")) }))
            })
            .resolver("Query", "b", |_, _, _, _| Ok(json!("ok").into())),
    );
    let query = compile(&schema, "{ a b }").unwrap();

    let response = execute(&query, json!({}));
    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "a": null,
        "b": "ok"
      },
      "errors": [
        {
          "message": "boom",
          "locations": [
            {
              "line": 1,
              "column": 3
            }
          ],
          "path": [
            "a"
          ]
        }
      ]
    }
    "#);
}

#[test]
fn returned_error_is_reported_like_a_thrown_one() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { a: String b: String }")
            .resolver("Query", "a", |_, _, _, _| Err(FieldError::new("thrown")))
            .resolver("Query", "b", |_, _, _, _| Ok(FieldError::new("returned").into())),
    );
    let query = compile(&schema, "{ a b }").unwrap();

    let response = execute(&query, json!({}));
    assert_eq!(response["data"], json!({"a": null, "b": null}));
    let messages: Vec<_> = response["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|error| error["message"].clone())
        .collect();
    assert_eq!(messages, vec![json!("thrown"), json!("returned")]);
}

#[test]
fn null_in_non_null_root_field_nulls_data() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { req: String! other: String }")
            .resolver("Query", "req", |_, _, _, _| Ok(ResolvedValue::null()))
            .resolver("Query", "other", |_, _, _, _| Ok(json!("fine").into())),
    );
    let query = compile(&schema, "{ req other }").unwrap();

    let response = execute(&query, json!({}));
    insta::assert_json_snapshot!(response, @r#"
    {
      "data": null,
      "errors": [
        {
          "message": "Cannot return null for non-nullable field Query.req.",
          "locations": [
            {
              "line": 1,
              "column": 3
            }
          ],
          "path": [
            "req"
          ]
        }
      ]
    }
    "#);
}

#[test]
fn null_bubbles_to_the_nearest_nullable_parent() {
    let schema = schema(
        SchemaBuilder::from_sdl("type User { name: String! age: Int } type Query { user: User }")
            .resolver("Query", "user", |_, _, _, _| Ok(json!({"age": 3}).into())),
    );
    let query = compile(&schema, "{ user { name age } }").unwrap();

    let response = execute(&query, json!({}));
    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "user": null
      },
      "errors": [
        {
          "message": "Cannot return null for non-nullable field User.name.",
          "locations": [
            {
              "line": 1,
              "column": 10
            }
          ],
          "path": [
            "user",
            "name"
          ]
        }
      ]
    }
    "#);
}

#[test]
fn list_items_keep_their_position_whatever_the_settlement_order() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { numbers: [Int] }").resolver("Query", "numbers", |_, _, _, _| {
            let delayed = |millis: u64, value: i64| {
                ResolvedValue::pending(async move {
                    tokio::time::sleep(Duration::from_millis(millis)).await;
                    Ok(json!(value).into())
                })
            };
            Ok(ResolvedValue::List(vec![
                delayed(30, 1),
                delayed(10, 2),
                json!(3).into(),
            ]))
        }),
    );
    let query = compile(&schema, "{ numbers }").unwrap();

    let response = execute(&query, json!({}));
    assert_eq!(response, json!({"data": {"numbers": [1, 2, 3]}}));
}

#[test]
fn rejected_list_item_is_located_at_its_index() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { numbers: [Int] }").resolver("Query", "numbers", |_, _, _, _| {
            Ok(ResolvedValue::List(vec![
                json!(1).into(),
                ResolvedValue::pending(async { Err(FieldError::new("second")) }),
            ]))
        }),
    );
    let query = compile(&schema, "{ numbers }").unwrap();

    let response = execute(&query, json!({}));
    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "numbers": [
          1,
          null
        ]
      },
      "errors": [
        {
          "message": "second",
          "locations": [
            {
              "line": 1,
              "column": 3
            }
          ],
          "path": [
            "numbers",
            1
          ]
        }
      ]
    }
    "#);
}

#[test]
fn non_list_value_for_a_list_field() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { numbers: [Int] }")
            .resolver("Query", "numbers", |_, _, _, _| Ok(json!(7).into())),
    );
    let query = compile(&schema, "{ numbers }").unwrap();

    let response = execute(&query, json!({}));
    assert_eq!(response["data"], json!({"numbers": null}));
    assert_eq!(
        response["errors"][0]["message"],
        json!("Expected Iterable, but did not find one for field Query.numbers.")
    );
}

#[test]
fn invalid_leaf_value() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { count: Int }")
            .resolver("Query", "count", |_, _, _, _| Ok(json!("many").into())),
    );
    let query = compile(&schema, "{ count }").unwrap();

    let response = execute(&query, json!({}));
    assert_eq!(response["data"], json!({"count": null}));
    assert_eq!(
        response["errors"][0]["message"],
        json!("Int cannot represent non-integer value: \"many\"")
    );
}

#[test]
fn skip_and_include_of_merged_nodes_are_alternatives() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { hello: String }")
            .resolver("Query", "hello", |_, _, _, _| Ok(json!("world").into())),
    );
    let query = compile(
        &schema,
        "query ($a: Boolean!, $b: Boolean!) { hello @include(if: $a) ... on Query { hello @include(if: $b) } }",
    )
    .unwrap();

    assert_eq!(
        execute(&query, json!({"a": false, "b": true})),
        json!({"data": {"hello": "world"}})
    );
    assert_eq!(execute(&query, json!({"a": false, "b": false})), json!({"data": {}}));
    assert_eq!(
        execute(&query, json!({"a": true, "b": false})),
        json!({"data": {"hello": "world"}})
    );
}

#[test]
fn nullable_variable_in_include_is_rejected_at_compile_time() {
    let schema = schema(SchemaBuilder::from_sdl("type Query { hello: String }"));
    let error = compile(&schema, "query ($flag: Boolean) { hello @include(if: $flag) }").unwrap_err();

    assert_eq!(
        error.to_string(),
        "Variable 'flag' of type 'Boolean' used in position expecting type 'Boolean!'"
    );
}

#[test]
fn executions_of_a_compiled_query_are_independent() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { hello: String count: Int }")
            .resolver("Query", "hello", |_, _, _, _| Ok(json!("world").into()))
            .resolver("Query", "count", |_, _, _, _| {
                Ok(ResolvedValue::pending(async { Ok(json!(1).into()) }))
            }),
    );
    let query = compile(&schema, "{ hello count }").unwrap();

    let first = execute(&query, json!({}));
    let second = execute(&query, json!({}));
    assert_eq!(first, second);
    assert_eq!(first, json!({"data": {"hello": "world", "count": 1}}));
}

#[test]
fn typename_and_aliases() {
    let schema = schema(
        SchemaBuilder::from_sdl("type User { name: String } type Query { user: User }")
            .resolver("Query", "user", |_, _, _, _| Ok(json!({"name": "Ada"}).into())),
    );
    let query = compile(&schema, "{ __typename me: user { kind: __typename name } }").unwrap();

    let response = execute(&query, json!({}));
    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "__typename": "Query",
        "me": {
          "kind": "User",
          "name": "Ada"
        }
      }
    }
    "#);
}

#[test]
fn synchronous_results_are_ready_without_polling() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { hello: String }")
            .resolver("Query", "hello", |_, _, _, _| Ok(json!("world").into())),
    );
    let query = compile(&schema, "{ hello }").unwrap();

    let execution = query.query(json!(null), crate::context(), &Default::default());
    assert!(execution.is_ready());
}

#[test]
fn event_streams_are_not_lists() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { numbers: [Int] count: Int! }")
            .resolver("Query", "numbers", |_, _, _, _| {
                Ok(ResolvedValue::stream(futures::stream::iter([json!(1), json!(2)])))
            })
            .resolver("Query", "count", |_, _, _, _| {
                Ok(ResolvedValue::stream(futures::stream::iter([json!(1)])))
            }),
    );

    let query = compile(&schema, "{ numbers }").unwrap();
    let response = execute(&query, json!({}));
    assert_eq!(response["data"], json!({"numbers": null}));
    assert_eq!(
        response["errors"][0]["message"],
        json!("Expected Iterable, but did not find one for field Query.numbers.")
    );
    assert_eq!(response["errors"][0]["path"], json!(["numbers"]));

    let query = compile(&schema, "{ count }").unwrap();
    let response = execute(&query, json!({}));
    assert_eq!(response["data"], json!(null));
    assert_eq!(
        response["errors"][0]["message"],
        json!("Unexpected event stream for field Query.count, only subscription fields may return one.")
    );
}

#[test]
fn skipped_fields_are_left_out() {
    let schema = schema(
        SchemaBuilder::from_sdl("type Query { a: String b: String }")
            .resolver("Query", "a", |_, _, _, _| Ok(json!("a").into()))
            .resolver("Query", "b", |_, _, _, _| Ok(json!("b").into())),
    );
    let query = compile(&schema, "{ a @skip(if: true) b }").unwrap();

    assert_eq!(execute(&query, json!({})), json!({"data": {"b": "b"}}));
}
