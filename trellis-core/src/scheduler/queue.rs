//! Job queues and the flush algorithm.
//!
//! # Algorithm
//!
//! One flush chain runs as repeated passes until nothing is left:
//!
//! 1. Drain the pre-flush callbacks, repeating while callbacks queue more.
//! 2. Sort the main queue by ascending job id (jobs without an id last).
//! 3. Run the main queue in order. Jobs queued during the pass are appended
//!    and run in the same pass.
//! 4. Run the post-flush callbacks, deduplicated and sorted by id.
//! 5. If any of the above queued more work, start another pass.
//!
//! Queue state lives in the runtime and is never borrowed while a job runs,
//! so jobs may freely queue, invalidate, or flush.

use std::task::Waker;

use indexmap::IndexSet;

use super::job::{Job, RecursionGuard};
use crate::config::FlushMode;
use crate::error::Result;
use crate::reactive::Runtime;

/// Per-thread scheduler state.
#[derive(Default)]
pub(crate) struct SchedulerState {
    is_flushing: bool,
    is_flush_pending: bool,
    /// A spawned task will run the pending flush.
    is_flush_spawned: bool,

    /// Main queue. Invalidated jobs leave a `None` hole so indices stay valid.
    queue: Vec<Option<Job>>,
    flush_index: usize,

    pending_pre: Vec<Job>,
    active_pre: Option<Vec<Job>>,
    pre_index: usize,
    current_pre_parent: Option<Job>,

    pending_post: Vec<Job>,
    active_post: Option<Vec<Job>>,
    post_index: usize,

    /// Error from a flush nobody was awaiting, kept for the next `next_tick`.
    pub(super) deferred_error: Option<crate::error::ReactiveError>,
    pub(super) waiters: Vec<Waker>,
}

impl SchedulerState {
    fn reset(&mut self) {
        let deferred_error = self.deferred_error.take();
        let waiters = std::mem::take(&mut self.waiters);
        *self = Self {
            deferred_error,
            waiters,
            ..Self::default()
        };
    }
}

pub(super) fn with_state<R>(f: impl FnOnce(&mut SchedulerState) -> R) -> R {
    Runtime::with(|rt| f(&mut rt.scheduler.borrow_mut()))
}

#[derive(Clone, Copy)]
enum Phase {
    Pre,
    Post,
}

/// Add a job to the main queue.
///
/// The job is skipped if it is already queued at or after the flush cursor.
/// A job that allows recursion is only compared against the jobs after the
/// one currently running, so it can queue itself again.
pub fn queue_job(job: Job) {
    let queued = with_state(|s| {
        let start = if s.is_flushing && job.allow_recurse() {
            s.flush_index + 1
        } else {
            s.flush_index
        };
        let present = s
            .queue
            .iter()
            .skip(start)
            .any(|slot| slot.as_ref().is_some_and(|queued| queued.ptr_eq(&job)));
        let is_pre_parent = s
            .current_pre_parent
            .as_ref()
            .is_some_and(|parent| parent.ptr_eq(&job));
        if present || is_pre_parent {
            return false;
        }
        s.queue.push(Some(job));
        true
    });
    if queued {
        queue_flush();
    }
}

/// Remove a queued job before it runs. No-op if it is not queued.
pub fn invalidate_job(job: &Job) {
    with_state(|s| {
        let slot = s
            .queue
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|queued| queued.ptr_eq(job)));
        if let Some(slot) = slot {
            *slot = None;
        }
    });
}

/// Queue a callback for the pre-flush phase.
pub fn queue_pre_flush_cb(job: Job) {
    queue_cb(job, Phase::Pre);
}

/// Queue a callback for the post-flush phase.
pub fn queue_post_flush_cb(job: Job) {
    queue_cb(job, Phase::Post);
}

/// Queue several post-flush callbacks at once, without the duplicate check.
pub fn queue_post_flush_cbs(jobs: impl IntoIterator<Item = Job>) {
    with_state(|s| s.pending_post.extend(jobs));
    queue_flush();
}

fn queue_cb(job: Job, phase: Phase) {
    with_state(|s| {
        let (active, pending, index) = match phase {
            Phase::Pre => (&s.active_pre, &mut s.pending_pre, s.pre_index),
            Phase::Post => (&s.active_post, &mut s.pending_post, s.post_index),
        };
        let start = if job.allow_recurse() { index + 1 } else { index };
        let present = active
            .as_ref()
            .is_some_and(|active| active.iter().skip(start).any(|queued| queued.ptr_eq(&job)));
        if !present {
            pending.push(job);
        }
    });
    queue_flush();
}

fn queue_flush() {
    let unspawned = with_state(|s| {
        if s.is_flushing {
            return false;
        }
        s.is_flush_pending = true;
        !s.is_flush_spawned
    });
    if unspawned
        && Runtime::config().flush_mode == FlushMode::SpawnLocal
        && super::tick::spawn_flush()
    {
        with_state(|s| s.is_flush_spawned = true);
    }
}

pub(crate) fn is_flush_pending() -> bool {
    with_state(|s| s.is_flush_pending)
}

pub(crate) fn is_flushing() -> bool {
    with_state(|s| s.is_flushing)
}

/// Run the pre-flush callbacks until none remain.
///
/// While they run, `parent` cannot be queued on the main queue.
pub fn flush_pre_flush_cbs(parent: Option<&Job>) -> Result<()> {
    let mut guard = RecursionGuard::new();
    abort_on_error(drain_pre(&mut guard, parent))
}

/// Run the pending post-flush callbacks in id order.
pub fn flush_post_flush_cbs() -> Result<()> {
    let mut guard = RecursionGuard::new();
    abort_on_error(drain_post(&mut guard))
}

/// Run a full flush chain now.
///
/// A no-op when a flush is already running further up the stack. On a
/// recursion-limit error every queue is cleared.
pub fn flush_jobs() -> Result<()> {
    if is_flushing() {
        return Ok(());
    }
    tracing::debug!("flush started");
    let mut guard = RecursionGuard::new();
    let result = abort_on_error(run_chain(&mut guard));
    tracing::debug!(ok = result.is_ok(), "flush finished");

    let waiters = with_state(|s| std::mem::take(&mut s.waiters));
    for waiter in waiters {
        waiter.wake();
    }
    result
}

fn abort_on_error(result: Result<()>) -> Result<()> {
    if let Err(err) = &result {
        tracing::debug!(%err, "flush aborted, clearing queues");
        with_state(SchedulerState::reset);
    }
    result
}

fn run_chain(guard: &mut RecursionGuard) -> Result<()> {
    loop {
        with_state(|s| {
            s.is_flush_pending = false;
            s.is_flush_spawned = false;
            s.is_flushing = true;
        });

        drain_pre(guard, None)?;

        with_state(|s| {
            // invalidated jobs leave `None` holes, which sort last
            s.queue
                .sort_by_key(|slot| slot.as_ref().map_or(u64::MAX, Job::sort_key));
        });

        let mut index = 0;
        loop {
            let slot = with_state(|s| {
                s.flush_index = index;
                s.queue.get(index).cloned()
            });
            let Some(slot) = slot else {
                break;
            };
            if let Some(job) = slot {
                guard.check(&job)?;
                job.invoke();
            }
            index += 1;
        }

        with_state(|s| {
            s.flush_index = 0;
            s.queue.clear();
        });

        drain_post(guard)?;

        let more = with_state(|s| {
            s.is_flushing = false;
            !s.queue.is_empty() || !s.pending_post.is_empty() || !s.pending_pre.is_empty()
        });
        if !more {
            return Ok(());
        }
    }
}

fn drain_pre(guard: &mut RecursionGuard, parent: Option<&Job>) -> Result<()> {
    loop {
        let started = with_state(|s| {
            if s.pending_pre.is_empty() {
                return false;
            }
            s.current_pre_parent = parent.cloned();
            let deduped: IndexSet<Job> = s.pending_pre.drain(..).collect();
            s.active_pre = Some(deduped.into_iter().collect());
            true
        });
        if !started {
            return Ok(());
        }

        let mut index = 0;
        loop {
            let job = with_state(|s| {
                s.pre_index = index;
                s.active_pre.as_ref().and_then(|active| active.get(index).cloned())
            });
            let Some(job) = job else {
                break;
            };
            guard.check(&job)?;
            job.invoke();
            index += 1;
        }

        with_state(|s| {
            s.active_pre = None;
            s.pre_index = 0;
            s.current_pre_parent = None;
        });
    }
}

fn drain_post(guard: &mut RecursionGuard) -> Result<()> {
    let started = with_state(|s| {
        if s.pending_post.is_empty() {
            return false;
        }
        let deduped: IndexSet<Job> = s.pending_post.drain(..).collect();
        if let Some(active) = s.active_post.as_mut() {
            // nested flush: the outer drain picks these up
            active.extend(deduped);
            return false;
        }
        let mut active: Vec<Job> = deduped.into_iter().collect();
        active.sort_by_key(Job::sort_key);
        s.active_post = Some(active);
        true
    });
    if !started {
        return Ok(());
    }

    let mut index = 0;
    loop {
        let job = with_state(|s| {
            s.post_index = index;
            s.active_post.as_ref().and_then(|active| active.get(index).cloned())
        });
        let Some(job) = job else {
            break;
        };
        guard.check(&job)?;
        job.invoke();
        index += 1;
    }

    with_state(|s| {
        s.active_post = None;
        s.post_index = 0;
    });
    Ok(())
}
