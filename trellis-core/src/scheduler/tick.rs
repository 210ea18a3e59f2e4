//! Flush triggering and `next_tick`.
//!
//! Queueing work marks a flush as pending. What runs it depends on the
//! configured [`FlushMode`](crate::FlushMode):
//!
//! - `Manual`: the host calls [`flush_pending`] or awaits [`next_tick`].
//! - `SpawnLocal`: a task is also spawned on the current tokio `LocalSet`,
//!   so the flush runs as soon as the synchronous code that queued it yields.
//!
//! Either way a burst of synchronous writes collapses into one flush.

use std::future::Future;
use std::marker::PhantomData;
use std::panic;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use super::queue::{flush_jobs, is_flush_pending, is_flushing, with_state};
use crate::error::{Diagnostic, Result};
use crate::reactive::Runtime;

/// Run the pending flush, if there is one.
///
/// Returns an error left behind by a spawned flush that nobody awaited
/// before anything else.
pub fn flush_pending() -> Result<()> {
    if let Some(err) = with_state(|s| s.deferred_error.take()) {
        return Err(err);
    }
    if is_flushing() || !is_flush_pending() {
        return Ok(());
    }
    flush_jobs()
}

/// Future returned by [`next_tick`].
///
/// Resolves once no flush is pending or running. Polled from inside a job,
/// it waits for the running chain to finish.
#[must_use = "futures do nothing unless awaited"]
pub struct NextTick {
    _not_send: PhantomData<Rc<()>>,
}

impl Future for NextTick {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if is_flushing() {
            with_state(|s| s.waiters.push(cx.waker().clone()));
            return Poll::Pending;
        }
        Poll::Ready(flush_pending())
    }
}

/// Wait until every pending reaction has settled.
pub fn next_tick() -> NextTick {
    NextTick {
        _not_send: PhantomData,
    }
}

/// Run `f` after every pending reaction has settled.
pub async fn next_tick_then<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> R,
{
    next_tick().await?;
    Ok(f())
}

/// Spawn the pending flush onto the current `LocalSet`.
///
/// Returns `false` when this thread has no `LocalSet` to spawn on; the flush
/// then stays pending for [`flush_pending`] or [`next_tick`].
pub(super) fn spawn_flush() -> bool {
    let spawned = tokio::runtime::Handle::try_current().is_ok()
        && panic::catch_unwind(|| {
            tokio::task::spawn_local(async {
                if let Err(err) = flush_pending() {
                    tracing::debug!(%err, "spawned flush failed, deferring error");
                    with_state(|s| s.deferred_error = Some(err));
                }
            });
        })
        .is_ok();
    if !spawned {
        tracing::debug!("no LocalSet to spawn the flush on, leaving it pending");
        Runtime::warn(Diagnostic::NoLocalSet);
    }
    spawned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FlushMode, RuntimeConfig};
    use crate::observe::Object;
    use crate::reactive::{Effect, EffectOptions, Scheduling};
    use crate::scheduler::{queue_job, Job};
    use futures_util::FutureExt;
    use std::cell::{Cell, RefCell};

    #[test]
    fn next_tick_runs_the_pending_flush() {
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        queue_job(Job::new(move || runs_clone.set(runs_clone.get() + 1)));

        assert_eq!(runs.get(), 0);
        next_tick().now_or_never().unwrap().unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn next_tick_then_runs_after_flush() {
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        queue_job(Job::new(move || runs_clone.set(runs_clone.get() + 1)));

        let seen = next_tick_then(|| runs.get()).now_or_never().unwrap().unwrap();
        assert_eq!(seen, 1);
    }

    #[test]
    fn flush_pending_without_work_is_ok() {
        flush_pending().unwrap();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn spawn_local_flushes_after_yield() {
        Runtime::configure(RuntimeConfig::default().with_flush_mode(FlushMode::SpawnLocal));
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let runs = Rc::new(Cell::new(0));
                let runs_clone = runs.clone();
                queue_job(Job::new(move || runs_clone.set(runs_clone.get() + 1)));
                assert_eq!(runs.get(), 0);

                tokio::task::yield_now().await;
                assert_eq!(runs.get(), 1);
                assert!(!is_flush_pending());
            })
            .await;
    }

    #[test]
    fn spawn_local_without_a_runtime_leaves_the_flush_pending() {
        Runtime::configure(
            RuntimeConfig::default()
                .with_dev_mode(true)
                .with_flush_mode(FlushMode::SpawnLocal),
        );
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        Runtime::set_warn_handler(move |diag| sink.borrow_mut().push(diag.clone()));

        let state = Object::new_record([("count", 0)]).to_reactive();
        let runs = Rc::new(Cell::new(0));
        let _effects: Vec<Effect> = (0..2)
            .map(|_| {
                let state = state.clone();
                let runs = runs.clone();
                Effect::with_options(
                    move || {
                        state.get("count");
                        runs.set(runs.get() + 1);
                    },
                    EffectOptions::default().scheduling(Scheduling::Queue),
                )
            })
            .collect();
        assert_eq!(runs.get(), 2);

        state.set("count", 1);
        assert!(is_flush_pending());
        assert!(!seen.borrow().is_empty());
        assert!(seen.borrow().iter().all(|diag| *diag == Diagnostic::NoLocalSet));

        flush_pending().unwrap();
        assert_eq!(runs.get(), 4);
        assert!(!is_flush_pending());
        Runtime::clear_handlers();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn spawn_local_outside_a_local_set_leaves_the_flush_pending() {
        Runtime::configure(RuntimeConfig::default().with_flush_mode(FlushMode::SpawnLocal));
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        queue_job(Job::new(move || runs_clone.set(runs_clone.get() + 1)));
        assert!(is_flush_pending());

        tokio::task::yield_now().await;
        assert_eq!(runs.get(), 0);

        next_tick().await.unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn entering_a_local_set_retries_the_spawn() {
        Runtime::configure(RuntimeConfig::default().with_flush_mode(FlushMode::SpawnLocal));
        let runs = Rc::new(Cell::new(0));
        let job = {
            let runs = runs.clone();
            Job::new(move || runs.set(runs.get() + 1))
        };
        queue_job(job.clone());
        assert_eq!(runs.get(), 0);

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let runs_clone = runs.clone();
                queue_job(Job::new(move || runs_clone.set(runs_clone.get() + 1)));
                tokio::task::yield_now().await;
                assert_eq!(runs.get(), 2);
            })
            .await;
    }
}
