mod context;
mod coordinator;
mod executor;
mod subscription;

use std::{
    future::{Future, IntoFuture},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use error::ErrorCodeCounter;
use futures::{future::BoxFuture, FutureExt};
use serde_json::{Map, Value};

pub(crate) use context::ExecutionContext;
use executor::ExecutionState;
pub(crate) use subscription::subscribe;
pub use subscription::{EventStream, SubscriptionResponse};

use crate::{compiled::CompiledInner, schema::ContextValue, Response};

/// Outcome of a query or mutation. Ready right away when no resolver returned a pending value.
pub enum Execution {
    Ready(Response),
    Pending(BoxFuture<'static, Response>),
}

impl Execution {
    pub fn is_ready(&self) -> bool {
        matches!(self, Execution::Ready(_))
    }

    /// The response if nothing had to be awaited.
    pub fn now_or_never(self) -> Option<Response> {
        match self {
            Execution::Ready(response) => Some(response),
            Execution::Pending(_) => None,
        }
    }
}

impl IntoFuture for Execution {
    type Output = Response;
    type IntoFuture = ExecutionFuture;

    fn into_future(self) -> Self::IntoFuture {
        ExecutionFuture(Some(self))
    }
}

pub struct ExecutionFuture(Option<Execution>);

impl Future for ExecutionFuture {
    type Output = Response;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Response> {
        match self.0.take() {
            Some(Execution::Ready(response)) => Poll::Ready(response),
            Some(Execution::Pending(mut future)) => match future.poll_unpin(cx) {
                Poll::Ready(response) => Poll::Ready(response),
                Poll::Pending => {
                    self.0 = Some(Execution::Pending(future));
                    Poll::Pending
                }
            },
            None => Poll::Ready(Response::default()),
        }
    }
}

impl std::fmt::Debug for Execution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Execution::Ready(response) => f.debug_tuple("Ready").field(response).finish(),
            Execution::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Coerces the raw variables and executes the query or mutation plan.
pub(crate) fn execute(
    query: Arc<CompiledInner>,
    root_value: Value,
    context_value: ContextValue,
    raw_variables: &Map<String, Value>,
) -> Execution {
    match query.variables.parse(&query.schema, raw_variables) {
        Ok(variables) => run(ExecutionContext::new(query, root_value, context_value, variables)),
        Err(errors) => {
            tracing::debug!(count = errors.len(), "invalid variables");
            Execution::Ready(Response::errors(errors))
        }
    }
}

/// Runs the plan with already coerced variables.
pub(crate) fn run(ctx: ExecutionContext) -> Execution {
    let mut state = ExecutionState::default();
    state.start(&ctx);
    if state.is_settled() {
        return Execution::Ready(finished(state.finish()));
    }

    Execution::Pending(
        async move {
            while let Some(settlement) = state.next_settlement().await {
                state.settle(&ctx, settlement);
            }
            finished(state.finish())
        }
        .boxed(),
    )
}

fn finished(response: Response) -> Response {
    if response.has_errors() {
        let counter = ErrorCodeCounter::from_errors(&response.errors);
        tracing::debug!(
            errors = counter.count(),
            codes = ?counter.iter().collect::<Vec<_>>(),
            "execution finished with errors"
        );
    }
    response
}
