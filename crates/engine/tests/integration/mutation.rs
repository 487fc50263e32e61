use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use engine_jit::{ResolvedValue, SchemaBuilder};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{compile, execute, schema};

const SDL: &str = r#"
    type Query { noop: Int }
    type Mutation { first: Int second: Int third(value: Int!): Int }
"#;

#[test]
fn root_fields_run_one_after_the_other() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (first_log, second_log) = (log.clone(), log.clone());
    let schema = schema(
        SchemaBuilder::from_sdl(SDL)
            .resolver("Mutation", "first", move |_, _, _, _| {
                first_log.lock().unwrap().push("first started");
                let log = first_log.clone();
                Ok(ResolvedValue::pending(async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    log.lock().unwrap().push("first done");
                    Ok(json!(1).into())
                }))
            })
            .resolver("Mutation", "second", move |_, _, _, _| {
                second_log.lock().unwrap().push("second started");
                Ok(json!(2).into())
            }),
    );
    let query = compile(&schema, "mutation { first second }").unwrap();

    let response = execute(&query, json!({}));
    assert_eq!(response, json!({"data": {"first": 1, "second": 2}}));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["first started", "first done", "second started"]
    );
}

#[test]
fn invalid_arguments_do_not_stall_the_queue() {
    let schema = schema(
        SchemaBuilder::from_sdl(SDL)
            .resolver("Mutation", "third", |_, args, _, _| Ok(args["value"].clone().into()))
            .resolver("Mutation", "second", |_, _, _, _| {
                Ok(ResolvedValue::pending(async { Ok(json!(2).into()) }))
            }),
    );
    let query = compile(&schema, "mutation ($v: Int) { third(value: $v) second }").unwrap();

    let response = execute(&query, json!({}));
    assert_eq!(response["data"], json!({"third": null, "second": 2}));
    assert_eq!(response["errors"].as_array().map(Vec::len), Some(1));
}

#[test]
fn fields_without_resolver_read_the_root_value() {
    let schema = schema(SchemaBuilder::from_sdl(SDL));
    let query = compile(&schema, "mutation { first }").unwrap();

    let response = crate::runtime().block_on(async {
        query
            .query(json!({"first": 5}), crate::context(), &Default::default())
            .await
    });
    assert_eq!(response.to_json(), json!({"data": {"first": 5}}));
}

#[test]
fn nested_pending_values_hold_the_next_root_field() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (a_log, inner_log, b_log) = (log.clone(), log.clone(), log.clone());
    let schema = schema(
        SchemaBuilder::from_sdl("type R { inner: Int } type Query { noop: Int } type Mutation { a: R b: Int }")
            .resolver("Mutation", "a", move |_, _, _, _| {
                a_log.lock().unwrap().push("a");
                Ok(json!({}).into())
            })
            .resolver("R", "inner", move |_, _, _, _| {
                let log = inner_log.clone();
                Ok(ResolvedValue::pending(async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    log.lock().unwrap().push("inner done");
                    Ok(json!(1).into())
                }))
            })
            .resolver("Mutation", "b", move |_, _, _, _| {
                b_log.lock().unwrap().push("b");
                Ok(json!(2).into())
            }),
    );
    let query = compile(&schema, "mutation { a { inner } b }").unwrap();

    let response = execute(&query, json!({}));
    assert_eq!(response, json!({"data": {"a": {"inner": 1}, "b": 2}}));
    assert_eq!(*log.lock().unwrap(), vec!["a", "inner done", "b"]);
}
