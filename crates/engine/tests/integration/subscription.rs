use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use engine_jit::{FieldError, ResolvedValue, SchemaBuilder, SubscriptionError, SubscriptionResponse};
use futures::{stream, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::{compile, context, runtime, schema};

const SDL: &str = r#"
    type Query { noop: Int }
    type Subscription { count(from: Int!): Int }
"#;

fn subscribe(query: &engine_jit::CompiledQuery) -> Result<SubscriptionResponse, SubscriptionError> {
    runtime().block_on(query.subscribe(Value::Null, context(), &Default::default()))
}

#[test]
fn every_event_executes_the_selection() {
    let schema = schema(SchemaBuilder::from_sdl(SDL).subscriber("Subscription", "count", |_, args, _, _| {
        let from = args["from"].as_i64().unwrap_or_default();
        Ok(ResolvedValue::stream(stream::iter(
            (from..from + 3).map(|count| json!({"count": count})),
        )))
    }));
    let query = compile(&schema, "subscription { count(from: 1) }").unwrap();
    assert_eq!(query.name(), "subscribe");

    let Ok(SubscriptionResponse::Stream(events)) = subscribe(&query) else {
        unreachable!("expected an event stream");
    };
    let responses: Vec<_> = runtime().block_on(events.map(|response| response.to_json()).collect());
    assert_eq!(
        responses,
        vec![
            json!({"data": {"count": 1}}),
            json!({"data": {"count": 2}}),
            json!({"data": {"count": 3}}),
        ]
    );
}

#[test]
fn dropping_the_stream_drops_the_source() {
    let dropped = Arc::new(AtomicBool::new(false));
    let flag = dropped.clone();
    let schema = schema(SchemaBuilder::from_sdl(SDL).subscriber("Subscription", "count", move |_, _, _, _| {
        struct Guard(Arc<AtomicBool>);
        impl Drop for Guard {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }
        let guard = Guard(flag.clone());
        Ok(ResolvedValue::stream(stream::repeat(json!({"count": 1})).map(move |event| {
            let _guard = &guard;
            event
        })))
    }));
    let query = compile(&schema, "subscription { count(from: 0) }").unwrap();

    let Ok(SubscriptionResponse::Stream(mut events)) = subscribe(&query) else {
        unreachable!("expected an event stream");
    };
    let first = runtime().block_on(events.next()).map(|response| response.to_json());
    assert_eq!(first, Some(json!({"data": {"count": 1}})));
    assert!(!dropped.load(Ordering::SeqCst));

    drop(events);
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn setup_errors_are_returned_as_a_response() {
    let schema = schema(
        SchemaBuilder::from_sdl(SDL)
            .subscriber("Subscription", "count", |_, _, _, _| Err(FieldError::new("not allowed"))),
    );
    let query = compile(&schema, "subscription { count(from: 0) }").unwrap();

    let Ok(SubscriptionResponse::Response(response)) = subscribe(&query) else {
        unreachable!("expected a response");
    };
    insta::assert_json_snapshot!(response, @r#"
    {
      "errors": [
        {
          "message": "not allowed",
          "locations": [
            {
              "line": 1,
              "column": 16
            }
          ],
          "path": [
            "count"
          ]
        }
      ]
    }
    "#);
}

#[test]
fn subscriber_must_return_a_stream() {
    let schema = schema(
        SchemaBuilder::from_sdl(SDL).subscriber("Subscription", "count", |_, _, _, _| Ok(json!(1).into())),
    );
    let query = compile(&schema, "subscription { count(from: 0) }").unwrap();

    let error = subscribe(&query).unwrap_err();
    assert_eq!(
        error.to_string(),
        "Subscription field must return Async Iterable. Received: 1."
    );
}

#[test]
fn unknown_subscription_field() {
    let schema = schema(SchemaBuilder::from_sdl(SDL));
    let error = compile(&schema, "subscription { missing }").unwrap_err();

    assert_eq!(error.to_string(), "The subscription field \"missing\" is not defined.");
}
