//! Job Scheduler
//!
//! The scheduler batches re-runs. Writes that trigger queued effects only
//! enqueue their jobs; the jobs run later in one flush, in a stable order.
//!
//! # Queues
//!
//! - The **main queue** holds ordinary jobs, deduplicated, sorted by id
//!   before each pass so that effects created earlier run first.
//! - The **pre-flush** queue runs before the main queue.
//! - The **post-flush** queue runs after it.
//!
//! # Recursion
//!
//! In dev mode a flush chain counts the runs of each job and aborts with
//! [`ReactiveError::RecursionLimitExceeded`] once one job exceeds the
//! configured limit. That is the one failure that stops a flush; a job that
//! panics is reported to the error handler and its siblings keep running.
//!
//! [`ReactiveError::RecursionLimitExceeded`]: crate::ReactiveError::RecursionLimitExceeded

mod job;
mod queue;
mod tick;

pub(crate) use queue::SchedulerState;

pub use job::Job;
pub use queue::{
    flush_jobs, flush_post_flush_cbs, flush_pre_flush_cbs, invalidate_job, queue_job,
    queue_post_flush_cb, queue_post_flush_cbs, queue_pre_flush_cb,
};
pub use tick::{flush_pending, next_tick, next_tick_then, NextTick};
