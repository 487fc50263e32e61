use std::{
    future::IntoFuture,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use error::GraphqlError;
use futures::{stream::BoxStream, Stream, StreamExt};
use serde_json::{Map, Value};

use super::{run, ExecutionContext};
use crate::{
    compiled::CompiledInner,
    plan::FieldSite,
    response::{inspect::inspect, ResponsePath},
    schema::{ContextValue, FieldError, ResolvedValue},
    Response, SubscriptionError,
};

/// Either the errors preventing the subscription or the stream of its responses.
pub enum SubscriptionResponse {
    Response(Response),
    Stream(EventStream),
}

impl std::fmt::Debug for SubscriptionResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionResponse::Response(response) => f.debug_tuple("Response").field(response).finish(),
            SubscriptionResponse::Stream(stream) => f.debug_tuple("Stream").field(&stream.field_name).finish(),
        }
    }
}

/// One response per event of the subscribed field. Dropping it drops the source stream.
pub struct EventStream {
    field_name: String,
    inner: BoxStream<'static, Response>,
}

impl Stream for EventStream {
    type Item = Response;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Response>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        tracing::debug!(field = %self.field_name, "subscription closed");
    }
}

/// Sets up the event source of the subscription field, then executes the operation once per
/// event with the event as root value.
pub(crate) async fn subscribe(
    query: Arc<CompiledInner>,
    root_value: Value,
    context_value: ContextValue,
    raw_variables: &Map<String, Value>,
) -> Result<SubscriptionResponse, SubscriptionError> {
    let Some(root) = &query.plan.subscription else {
        return Err(SubscriptionError::NotASubscription {
            kind: query.plan.kind.to_string(),
        });
    };
    let variables = match query.variables.parse(&query.schema, raw_variables) {
        Ok(variables) => variables,
        Err(errors) => return Ok(SubscriptionResponse::Response(Response::errors(errors))),
    };
    let field_name = root.field_name.clone();
    let ctx = ExecutionContext::new(query.clone(), root_value, context_value, variables);
    let path = ResponsePath::root().field(root.key.clone(), !root.non_null);
    let site = &ctx.registries()[root.site];

    let arguments = match root.arguments.resolve(&ctx.variables) {
        Ok(arguments) => arguments,
        Err(errors) => {
            let errors = errors
                .into_iter()
                .map(|error| ctx.error_at([error.location], &path, error.message));
            return Ok(SubscriptionResponse::Response(Response::errors(errors)));
        }
    };

    let mut resolved = match root.subscriber {
        Some(subscriber) => {
            let info = ctx.registries()[root.info].build(ctx.scope(), &path);
            (ctx.registries()[subscriber])(&ctx.root_value, &arguments, &ctx.context_value, &info)
        }
        None => Ok(ResolvedValue::Value(
            ctx.root_value.get(&field_name).cloned().unwrap_or_default(),
        )),
    };

    let source = loop {
        match resolved {
            Ok(ResolvedValue::Stream(stream)) => break stream,
            Ok(ResolvedValue::Pending(future)) => resolved = future.await,
            Ok(ResolvedValue::Error(error)) | Err(error) => {
                let error = setup_error(&ctx, site, &path, error);
                return Ok(SubscriptionResponse::Response(Response::errors([error])));
            }
            Ok(other) => {
                let received = match other.into_value() {
                    Ok(value) => inspect(&value),
                    Err(_) => "[object]".to_string(),
                };
                return Err(SubscriptionError::NotAStream { received });
            }
        }
    };
    tracing::debug!(field = %field_name, "subscription started");

    let context_value = ctx.context_value.clone();
    let variables = ctx.variables.clone();
    let inner = source
        .then(move |event| {
            let ctx = ExecutionContext::new(query.clone(), event, context_value.clone(), variables.clone());
            run(ctx).into_future()
        })
        .boxed();
    Ok(SubscriptionResponse::Stream(EventStream { field_name, inner }))
}

fn setup_error(ctx: &ExecutionContext, site: &FieldSite, path: &ResponsePath, error: FieldError) -> GraphqlError {
    let (message, source) = error.into_parts();
    let error = ctx.field_error(site, path, message);
    match source {
        Some(source) => error.with_original_error(source),
        None => error,
    }
}
