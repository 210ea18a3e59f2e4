//! Effect Implementation
//!
//! An Effect wraps a user computation and re-runs it whenever state it read
//! during its last run changes.
//!
//! # How Effects Work
//!
//! 1. Unless created lazy, the effect runs its function immediately to
//!    establish initial dependencies.
//!
//! 2. Every observed read during a run subscribes the effect to the
//!    `(target, key)` dep that was read.
//!
//! 3. Before re-running, the effect removes itself from every dep it joined
//!    last time, so dependencies that are no longer read stop triggering it.
//!
//! 4. When a dep is triggered, the effect is handed to its [`Scheduling`]
//!    strategy: run now, queue it, or call a custom scheduler.
//!
//! # Lifetime
//!
//! A dep holds its subscribers strongly, so an effect stays alive for as long
//! as it is subscribed to something, even when every user handle is dropped.
//! [`Effect::stop`] (or dropping the observed targets) releases it.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::subscriber::EffectId;
use crate::graph::{DebugHook, DebuggerEvent, Dep, TargetId};
use crate::observe::Key;
use crate::scheduler::{self, Job};

/// What happens when one of an effect's dependencies changes.
#[derive(Clone, Default)]
pub enum Scheduling {
    /// Re-run synchronously inside the write that triggered it.
    #[default]
    Sync,
    /// Queue the effect's job on the main job queue.
    Queue,
    /// Queue the effect's job as a pre-flush callback.
    PreFlush,
    /// Queue the effect's job as a post-flush callback.
    PostFlush,
    /// Hand the effect to a custom scheduler instead of running it.
    Custom(Rc<dyn Fn(&Effect)>),
}

impl fmt::Debug for Scheduling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheduling::Sync => f.write_str("Sync"),
            Scheduling::Queue => f.write_str("Queue"),
            Scheduling::PreFlush => f.write_str("PreFlush"),
            Scheduling::PostFlush => f.write_str("PostFlush"),
            Scheduling::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Options fixed when an effect is created.
#[derive(Clone, Default)]
pub struct EffectOptions {
    /// Skip the initial run.
    pub lazy: bool,
    pub scheduling: Scheduling,
    /// Let the effect retrigger itself while it is running.
    pub allow_recurse: bool,
    pub on_track: Option<DebugHook>,
    pub on_trigger: Option<DebugHook>,
    pub on_stop: Option<Rc<dyn Fn()>>,
}

impl EffectOptions {
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn scheduling(mut self, scheduling: Scheduling) -> Self {
        self.scheduling = scheduling;
        self
    }

    /// Shorthand for [`Scheduling::Custom`].
    pub fn scheduler<F>(self, scheduler: F) -> Self
    where
        F: Fn(&Effect) + 'static,
    {
        self.scheduling(Scheduling::Custom(Rc::new(scheduler)))
    }

    pub fn allow_recurse(mut self, allow: bool) -> Self {
        self.allow_recurse = allow;
        self
    }

    pub fn on_track<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DebuggerEvent) + 'static,
    {
        self.on_track = Some(Rc::new(hook));
        self
    }

    pub fn on_trigger<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DebuggerEvent) + 'static,
    {
        self.on_trigger = Some(Rc::new(hook));
        self
    }

    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.on_stop = Some(Rc::new(hook));
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("scheduling", &self.scheduling)
            .field("allow_recurse", &self.allow_recurse)
            .field("on_track", &self.on_track.is_some())
            .field("on_trigger", &self.on_trigger.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

struct EffectInner {
    id: EffectId,
    raw: Rc<dyn Fn()>,
    active: Cell<bool>,
    deps: RefCell<SmallVec<[Dep; 4]>>,
    options: EffectOptions,
    on_stop: RefCell<Option<Rc<dyn Fn()>>>,
    run_count: Cell<usize>,
    job: OnceCell<Job>,
}

/// A computation that re-runs when the state it read changes.
///
/// Cloning an `Effect` clones the handle, not the computation.
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive_record([("count", 0)]);
///
/// let effect = Effect::new({
///     let state = state.clone();
///     move || println!("count is {}", state.get("count"))
/// });
///
/// state.set("count", 5); // prints "count is 5"
/// effect.stop();
/// ```
#[derive(Clone)]
pub struct Effect(Rc<EffectInner>);

impl Effect {
    /// Create an effect and run it immediately.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::with_options(f, EffectOptions::default())
    }

    /// Create an effect without running it.
    pub fn new_lazy<F>(f: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::with_options(f, EffectOptions::default().lazy(true))
    }

    pub fn with_options<F>(f: F, options: EffectOptions) -> Self
    where
        F: Fn() + 'static,
    {
        let lazy = options.lazy;
        let effect = Self(Rc::new(EffectInner {
            id: EffectId::new(),
            raw: Rc::new(f),
            active: Cell::new(true),
            deps: RefCell::new(SmallVec::new()),
            on_stop: RefCell::new(options.on_stop.clone()),
            options,
            run_count: Cell::new(0),
            job: OnceCell::new(),
        }));

        tracing::trace!(effect = effect.id().raw(), lazy, "effect created");

        if !lazy {
            effect.run();
        }
        effect
    }

    pub fn id(&self) -> EffectId {
        self.0.id
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    pub fn options(&self) -> &EffectOptions {
        &self.0.options
    }

    /// The user computation, callable without any tracking side effects.
    pub fn raw(&self) -> Rc<dyn Fn()> {
        self.0.raw.clone()
    }

    /// Number of tracked runs so far.
    pub fn run_count(&self) -> usize {
        self.0.run_count.get()
    }

    /// The `(target, key)` pairs this effect is currently subscribed to.
    pub fn deps(&self) -> Vec<(TargetId, Key)> {
        self.0
            .deps
            .borrow()
            .iter()
            .map(|dep| (dep.target(), dep.key().clone()))
            .collect()
    }

    pub fn dependency_count(&self) -> usize {
        self.0.deps.borrow().len()
    }

    /// Run the computation, re-collecting its dependencies.
    ///
    /// A stopped effect without a scheduler still calls its function, but
    /// tracks nothing. An effect that is already running somewhere up the
    /// stack is not re-entered.
    pub fn run(&self) {
        if !self.is_active() {
            if matches!(self.0.options.scheduling, Scheduling::Sync) {
                (self.0.raw)();
            }
            return;
        }
        if ReactiveContext::contains(self.id()) {
            return;
        }

        self.cleanup();
        let _ctx = ReactiveContext::enter(self);
        self.0.run_count.set(self.0.run_count.get() + 1);
        (self.0.raw)();
    }

    /// Unsubscribe from everything and deactivate. Idempotent.
    pub fn stop(&self) {
        if !self.is_active() {
            return;
        }
        self.cleanup();
        let on_stop = self.0.on_stop.borrow().clone();
        if let Some(on_stop) = on_stop {
            on_stop();
        }
        self.0.active.set(false);
        tracing::debug!(effect = self.id().raw(), "effect stopped");
    }

    /// Replace the stop hook.
    pub fn set_on_stop<F>(&self, hook: F)
    where
        F: Fn() + 'static,
    {
        *self.0.on_stop.borrow_mut() = Some(Rc::new(hook));
    }

    /// React to a triggered dependency according to the effect's scheduling.
    pub fn schedule(&self) {
        match &self.0.options.scheduling {
            Scheduling::Sync => self.run(),
            Scheduling::Queue => scheduler::queue_job(self.job()),
            Scheduling::PreFlush => scheduler::queue_pre_flush_cb(self.job()),
            Scheduling::PostFlush => scheduler::queue_post_flush_cb(self.job()),
            Scheduling::Custom(scheduler) => scheduler(self),
        }
    }

    /// The scheduler job that runs this effect.
    ///
    /// The job is created once and reused, so queueing the same effect twice
    /// is deduplicated by the scheduler. It holds the effect weakly.
    pub fn job(&self) -> Job {
        self.0
            .job
            .get_or_init(|| {
                let weak = self.downgrade();
                let job = Job::with_id(self.id().raw(), move || {
                    if let Some(effect) = weak.upgrade() {
                        effect.run();
                    }
                });
                job.set_allow_recurse(self.0.options.allow_recurse);
                job
            })
            .clone()
    }

    pub(crate) fn downgrade(&self) -> WeakEffect {
        WeakEffect(Rc::downgrade(&self.0))
    }

    pub(crate) fn add_dep(&self, dep: Dep) {
        self.0.deps.borrow_mut().push(dep);
    }

    fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.0.deps.borrow_mut());
        for dep in deps {
            // the removed handle is `self`, dropped after the borrow ends
            let _removed = dep.remove(self.id());
        }
    }
}

impl PartialEq for Effect {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Effect {}

/// A handle that does not keep the effect alive.
#[derive(Clone)]
pub(crate) struct WeakEffect(Weak<EffectInner>);

impl WeakEffect {
    pub(crate) fn upgrade(&self) -> Option<Effect> {
        self.0.upgrade().map(Effect)
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.0.id.raw())
            .field("active", &self.is_active())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
