//! Scheduler jobs.
//!
//! A [`Job`] is a shared callback with an optional ordering id. Jobs compare
//! and hash by identity, so queueing the same job twice is detected no
//! matter how many handles to it exist.

use std::any::Any;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::{ReactiveError, Result};
use crate::reactive::Runtime;

struct JobInner {
    id: Option<u64>,
    allow_recurse: Cell<bool>,
    callback: Box<dyn Fn()>,
}

/// A unit of work for the scheduler.
#[derive(Clone)]
pub struct Job(Rc<JobInner>);

impl Job {
    /// A job without an ordering id. It sorts after every job that has one.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::build(None, Box::new(callback))
    }

    /// A job that sorts by `id` within a flush.
    pub fn with_id<F>(id: u64, callback: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::build(Some(id), Box::new(callback))
    }

    fn build(id: Option<u64>, callback: Box<dyn Fn()>) -> Self {
        Self(Rc::new(JobInner {
            id,
            allow_recurse: Cell::new(false),
            callback,
        }))
    }

    pub fn id(&self) -> Option<u64> {
        self.0.id
    }

    pub fn allow_recurse(&self) -> bool {
        self.0.allow_recurse.get()
    }

    /// Allow the job to queue itself again while it is running.
    pub fn set_allow_recurse(&self, allow: bool) {
        self.0.allow_recurse.set(allow);
    }

    pub fn ptr_eq(&self, other: &Job) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn sort_key(&self) -> u64 {
        self.0.id.unwrap_or(u64::MAX)
    }

    /// Run the callback. A panic is caught and sent to the runtime's error
    /// handler instead of unwinding through the flush.
    pub(crate) fn invoke(&self) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.0.callback)()));
        if let Err(payload) = outcome {
            let message = panic_message(payload.as_ref());
            tracing::debug!(job = ?self.id(), %message, "job panicked");
            Runtime::report_error(ReactiveError::JobPanicked {
                job: self.id(),
                message,
            });
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Job {}

impl Hash for Job {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.0.id)
            .field("allow_recurse", &self.allow_recurse())
            .finish()
    }
}

/// Counts runs per job across one flush chain.
///
/// Disabled outside dev mode. The counted jobs are kept alive for the length
/// of the chain so their addresses cannot be reused by a new job.
pub(crate) struct RecursionGuard {
    limit: Option<u32>,
    counts: HashMap<Job, u32>,
}

impl RecursionGuard {
    pub(crate) fn new() -> Self {
        let config = Runtime::config();
        Self {
            limit: config.dev_mode.then_some(config.recursion_limit),
            counts: HashMap::new(),
        }
    }

    pub(crate) fn check(&mut self, job: &Job) -> Result<()> {
        let Some(limit) = self.limit else {
            return Ok(());
        };
        let count = self.counts.entry(job.clone()).or_insert(0);
        if *count > limit {
            return Err(ReactiveError::RecursionLimitExceeded { job: job.id(), limit });
        }
        *count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use std::cell::RefCell;

    #[test]
    fn jobs_compare_by_identity() {
        let a = Job::new(|| {});
        let b = Job::new(|| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn jobs_without_id_sort_last() {
        assert!(Job::with_id(7, || {}).sort_key() < Job::new(|| {}).sort_key());
    }

    #[test]
    fn invoke_reports_panics() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        Runtime::set_error_handler(move |err| sink.borrow_mut().push(err.clone()));

        Job::with_id(3, || panic!("boom")).invoke();

        assert_eq!(
            seen.borrow().as_slice(),
            &[ReactiveError::JobPanicked { job: Some(3), message: "boom".to_string() }]
        );
        Runtime::clear_handlers();
    }

    #[test]
    fn recursion_guard_trips_past_limit() {
        Runtime::configure(RuntimeConfig::default().with_dev_mode(true).with_recursion_limit(3));
        let job = Job::new(|| {});
        let mut guard = RecursionGuard::new();

        for _ in 0..4 {
            guard.check(&job).unwrap();
        }
        assert!(matches!(
            guard.check(&job),
            Err(ReactiveError::RecursionLimitExceeded { limit: 3, .. })
        ));
    }

    #[test]
    fn recursion_guard_is_off_outside_dev_mode() {
        Runtime::configure(RuntimeConfig::default().with_dev_mode(false).with_recursion_limit(1));
        let job = Job::new(|| {});
        let mut guard = RecursionGuard::new();
        for _ in 0..10 {
            guard.check(&job).unwrap();
        }
    }
}
