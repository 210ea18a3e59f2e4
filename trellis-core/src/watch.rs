//! Watchers
//!
//! A watcher is a lazy effect whose scheduler queues a callback job instead
//! of re-running the effect directly. [`watch`] evaluates a source and calls
//! back with the new and previous values when it changes; [`watch_effect`]
//! simply re-runs a function whenever what it read changes.
//!
//! # Flush timing
//!
//! - [`Flush::Pre`] (default): the job is a pre-flush callback, so it runs
//!   before the queued jobs of the same flush.
//! - [`Flush::Post`]: the job is a post-flush callback and runs after them.
//! - [`Flush::Sync`]: the job runs inside the write that triggered it.
//!
//! # Invalidation
//!
//! Callbacks receive an [`OnInvalidate`] registrar. The function registered
//! there runs once, before the next callback or when the watcher is stopped,
//! whichever comes first. It is the place to cancel work a callback started.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::error::Diagnostic;
use crate::graph::{DebugHook, DebuggerEvent, TargetId};
use crate::observe::{has_changed, Object, Ref, Value};
use crate::reactive::{Computed, Effect, EffectOptions, Runtime, WeakEffect};
use crate::scheduler::{self, Job};

/// When a triggered watcher's job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flush {
    #[default]
    Pre,
    Post,
    Sync,
}

#[derive(Clone, Default)]
pub struct WatchOptions {
    /// Call back once at creation, with no previous value.
    pub immediate: bool,
    /// Read every nested property of the source so nested writes notify.
    pub deep: bool,
    pub flush: Flush,
    pub on_track: Option<DebugHook>,
    pub on_trigger: Option<DebugHook>,
}

impl WatchOptions {
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }

    pub fn flush(mut self, flush: Flush) -> Self {
        self.flush = flush;
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
}

impl fmt::Debug for WatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchOptions")
            .field("immediate", &self.immediate)
            .field("deep", &self.deep)
            .field("flush", &self.flush)
            .finish_non_exhaustive()
    }
}

/// What a watcher observes.
#[derive(Clone)]
pub enum WatchSource {
    /// The ref's value. Every trigger of the ref calls back.
    Ref(Ref),
    /// A reactive object, always watched deeply.
    Reactive(Object),
    Computed(Computed<Value>),
    Getter(Rc<dyn Fn() -> Value>),
    /// Several sources, compared element by element.
    Many(Vec<WatchSource>),
}

impl WatchSource {
    pub fn getter<F>(getter: F) -> Self
    where
        F: Fn() -> Value + 'static,
    {
        WatchSource::Getter(Rc::new(getter))
    }

    /// Refs and computeds call back on every trigger; so do deep watchers.
    fn forces_callback(&self) -> bool {
        matches!(self, WatchSource::Ref(_) | WatchSource::Computed(_))
    }

    fn read(&self) -> Value {
        match self {
            WatchSource::Ref(cell) => cell.get(),
            WatchSource::Reactive(object) if object.is_reactive() => Value::Object(object.clone()),
            WatchSource::Computed(computed) => computed.get(),
            WatchSource::Getter(getter) => getter(),
            WatchSource::Reactive(_) | WatchSource::Many(_) => {
                Runtime::warn(Diagnostic::InvalidWatchSource {
                    source: format!("{self:?}"),
                });
                Value::Undefined
            }
        }
    }

    fn evaluate(&self) -> Watched {
        match self {
            WatchSource::Many(sources) => Watched::Many(
                sources
                    .iter()
                    .map(|source| match source {
                        WatchSource::Reactive(object) if object.is_reactive() => {
                            traverse(Value::Object(object.clone()))
                        }
                        source => source.read(),
                    })
                    .collect(),
            ),
            source => Watched::One(source.read()),
        }
    }
}

impl From<Ref> for WatchSource {
    fn from(cell: Ref) -> Self {
        WatchSource::Ref(cell)
    }
}

impl From<Object> for WatchSource {
    fn from(object: Object) -> Self {
        WatchSource::Reactive(object)
    }
}

impl From<Computed<Value>> for WatchSource {
    fn from(computed: Computed<Value>) -> Self {
        WatchSource::Computed(computed)
    }
}

impl From<Vec<WatchSource>> for WatchSource {
    fn from(sources: Vec<WatchSource>) -> Self {
        WatchSource::Many(sources)
    }
}

impl fmt::Debug for WatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchSource::Ref(cell) => f.debug_tuple("Ref").field(&cell.id()).finish(),
            WatchSource::Reactive(object) => f.debug_tuple("Reactive").field(object).finish(),
            WatchSource::Computed(computed) => f.debug_tuple("Computed").field(&computed.id()).finish(),
            WatchSource::Getter(_) => f.write_str("Getter(..)"),
            WatchSource::Many(sources) => f.debug_list().entries(sources).finish(),
        }
    }
}

/// The evaluated form of a [`WatchSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum Watched {
    One(Value),
    Many(Vec<Value>),
}

impl Watched {
    /// The single value, or the first of many.
    pub fn value(&self) -> Value {
        match self {
            Watched::One(value) => value.clone(),
            Watched::Many(values) => values.first().cloned().unwrap_or_default(),
        }
    }

    pub fn values(&self) -> &[Value] {
        match self {
            Watched::One(value) => std::slice::from_ref(value),
            Watched::Many(values) => values,
        }
    }

    fn changed_from(&self, old: &Watched) -> bool {
        match (self, old) {
            (Watched::One(new), Watched::One(old)) => has_changed(new, old),
            (Watched::Many(new), Watched::Many(old)) => {
                new.len() != old.len() || new.iter().zip(old).any(|(a, b)| has_changed(a, b))
            }
            _ => true,
        }
    }
}

/// Registrar for a watcher's invalidation callback.
#[derive(Clone, Default)]
pub struct OnInvalidate(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

impl OnInvalidate {
    /// Run `cleanup` before the next callback, or when the watcher stops.
    /// Replaces any cleanup registered earlier.
    pub fn register<F>(&self, cleanup: F)
    where
        F: FnOnce() + 'static,
    {
        let previous = self.0.borrow_mut().replace(Box::new(cleanup));
        drop(previous);
    }

    fn run(&self) {
        let cleanup = self.0.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }
}

impl fmt::Debug for OnInvalidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnInvalidate")
            .field("registered", &self.0.borrow().is_some())
            .finish()
    }
}

/// Handle to a running watcher.
///
/// Dropping the handle does not stop the watcher.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    effect: Effect,
}

impl WatchHandle {
    /// Stop watching and run any pending invalidation callback.
    pub fn stop(&self) {
        self.effect.stop();
    }

    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    /// The underlying lazy effect.
    pub fn effect(&self) -> &Effect {
        &self.effect
    }
}

type Callback = Rc<dyn Fn(&Watched, Option<&Watched>, &OnInvalidate)>;

/// Call `callback(new, old, on_invalidate)` whenever `source` changes.
///
/// Without `immediate` the source is evaluated once at creation to record
/// the first old value and the callback does not run until a change.
pub fn watch<S, F>(source: S, callback: F, options: WatchOptions) -> WatchHandle
where
    S: Into<WatchSource>,
    F: Fn(&Watched, Option<&Watched>, &OnInvalidate) + 'static,
{
    let source = source.into();
    let deep = options.deep || matches!(source, WatchSource::Reactive(_));
    let forced = deep || source.forces_callback();
    let getter: Box<dyn Fn() -> Watched> = if deep {
        Box::new(move || match source.evaluate() {
            Watched::One(value) => Watched::One(traverse(value)),
            Watched::Many(values) => Watched::Many(values.into_iter().map(traverse).collect()),
        })
    } else {
        Box::new(move || source.evaluate())
    };
    build(getter, Some((Rc::new(callback), forced)), options)
}

/// Run `f` now and again whenever anything it read changes.
///
/// `immediate` and `deep` have no meaning here and are ignored. With
/// [`Flush::Post`] the first run is queued as a post-flush callback.
pub fn watch_effect<F>(f: F, options: WatchOptions) -> WatchHandle
where
    F: Fn(&OnInvalidate) + 'static,
{
    let invalidate = OnInvalidate::default();
    let registrar = invalidate.clone();
    let getter: Box<dyn Fn() -> Watched> = Box::new(move || {
        registrar.run();
        f(&registrar);
        Watched::One(Value::Undefined)
    });
    build_with(getter, None, options, invalidate)
}

fn build(
    getter: Box<dyn Fn() -> Watched>,
    callback: Option<(Callback, bool)>,
    options: WatchOptions,
) -> WatchHandle {
    build_with(getter, callback, options, OnInvalidate::default())
}

fn build_with(
    getter: Box<dyn Fn() -> Watched>,
    callback: Option<(Callback, bool)>,
    options: WatchOptions,
    invalidate: OnInvalidate,
) -> WatchHandle {
    let latest: Rc<RefCell<Option<Watched>>> = Rc::default();
    let old: Rc<RefCell<Option<Watched>>> = Rc::default();
    let runner_slot: Rc<RefCell<Option<WeakEffect>>> = Rc::default();

    let job = Job::new({
        let latest = latest.clone();
        let old = old.clone();
        let runner_slot = runner_slot.clone();
        let invalidate = invalidate.clone();
        let callback = callback.clone();
        move || {
            let runner = runner_slot.borrow().as_ref().and_then(WeakEffect::upgrade);
            let Some(runner) = runner else {
                return;
            };
            if !runner.is_active() {
                return;
            }
            runner.run();
            let Some((callback, forced)) = &callback else {
                return;
            };
            let Some(new_value) = latest.borrow_mut().take() else {
                return;
            };
            let previous = old.borrow().clone();
            let changed = previous.as_ref().map_or(true, |previous| new_value.changed_from(previous));
            if *forced || changed {
                invalidate.run();
                callback(&new_value, previous.as_ref(), &invalidate);
                *old.borrow_mut() = Some(new_value);
            }
        }
    });
    job.set_allow_recurse(callback.is_some());

    let flush = options.flush;
    let effect_options = EffectOptions {
        lazy: true,
        on_track: options.on_track.clone(),
        on_trigger: options.on_trigger.clone(),
        on_stop: Some(Rc::new({
            let invalidate = invalidate.clone();
            move || invalidate.run()
        })),
        ..EffectOptions::default()
    }
    .scheduler({
        let job = job.clone();
        move |_| match flush {
            Flush::Sync => job.invoke(),
            Flush::Post => scheduler::queue_post_flush_cb(job.clone()),
            Flush::Pre => scheduler::queue_pre_flush_cb(job.clone()),
        }
    });

    let runner = Effect::with_options(
        {
            let latest = latest.clone();
            move || {
                let value = getter();
                *latest.borrow_mut() = Some(value);
            }
        },
        effect_options,
    );
    *runner_slot.borrow_mut() = Some(runner.downgrade());

    match (&callback, options.immediate, flush) {
        (Some(_), true, _) => job.invoke(),
        (Some(_), false, _) => {
            runner.run();
            *old.borrow_mut() = latest.borrow_mut().take();
        }
        (None, _, Flush::Post) => scheduler::queue_post_flush_cb(job),
        (None, _, _) => runner.run(),
    }

    tracing::trace!(effect = runner.id().raw(), ?flush, "watcher created");
    WatchHandle { effect: runner }
}

/// Read every nested property of `value` so the running effect depends on
/// all of them.
pub fn traverse(value: Value) -> Value {
    let mut seen = HashSet::new();
    visit(&value, &mut seen);
    value
}

fn visit(value: &Value, seen: &mut HashSet<TargetId>) {
    match value {
        Value::Ref(cell) => {
            if seen.insert(cell.id()) {
                visit(&cell.get(), seen);
            }
        }
        Value::Object(object) => {
            if seen.insert(object.id()) {
                for child in object.values() {
                    visit(&child, seen);
                }
            }
        }
        _ => {}
    }
}
