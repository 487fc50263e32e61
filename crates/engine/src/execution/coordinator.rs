use std::{collections::VecDeque, sync::Arc};

use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};

use crate::{
    plan::Node,
    response::ResponsePath,
    schema::{FieldError, ResolvedValue},
};

/// Where a pending value lands once settled.
pub(crate) struct SettlementTarget {
    pub node: Arc<Node>,
    pub path: ResponsePath,
}

pub(crate) struct Settlement {
    pub target: SettlementTarget,
    pub result: Result<ResolvedValue, FieldError>,
}

/// Tracks the work still outstanding for one execution.
///
/// Pending values are polled together and settle in any order. Mutation root fields wait in a
/// queue and a job only starts once everything started before it has settled.
#[derive(Default)]
pub(crate) struct Coordinator {
    pending: FuturesUnordered<BoxFuture<'static, Settlement>>,
    queue: VecDeque<usize>,
}

impl Coordinator {
    pub fn spawn(&mut self, target: SettlementTarget, future: BoxFuture<'static, Result<ResolvedValue, FieldError>>) {
        tracing::trace!(path = %target.path, outstanding = self.pending.len() + 1, "pending value");
        self.pending
            .push(future.map(move |result| Settlement { target, result }).boxed());
    }

    pub fn enqueue(&mut self, jobs: impl IntoIterator<Item = usize>) {
        self.queue.extend(jobs);
    }

    /// Next queued job, only once nothing is outstanding anymore.
    pub fn next_job(&mut self) -> Option<usize> {
        if self.pending.is_empty() {
            self.queue.pop_front()
        } else {
            None
        }
    }

    pub fn is_settled(&self) -> bool {
        self.pending.is_empty() && self.queue.is_empty()
    }

    pub async fn next_settlement(&mut self) -> Option<Settlement> {
        self.pending.next().await
    }
}
