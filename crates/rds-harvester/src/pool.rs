//! Bounded task groups: submit every item, await all, collect.
//!
//! At most `limit` tasks are in flight. Results arrive in completion order,
//! so callers must not rely on input order.

use std::future::Future;

use futures::stream::{self, Stream, StreamExt};

/// Stream of task results, yielded as each task completes.
pub fn bounded<I, F, Fut>(items: I, limit: usize, f: F) -> impl Stream<Item = Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    stream::iter(items).map(f).buffer_unordered(limit.max(1))
}

/// Run every task and collect the results in completion order.
pub async fn run_bounded<I, F, Fut>(items: I, limit: usize, f: F) -> Vec<Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    bounded(items, limit, f).collect().await
}
