//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when it is
//! read after one of its dependencies changed.
//!
//! # How Computeds Work
//!
//! 1. The getter is wrapped in a lazy effect whose scheduler never runs it.
//!    Instead, a triggered dependency marks the cache dirty and notifies
//!    whoever read the computed's `value`.
//!
//! 2. Reading the value re-runs the getter only when the cache is dirty,
//!    then records a dependency on the computed itself.
//!
//! # Why This Matters
//!
//! - A dependency changes many times
//! - The computed is marked dirty once and notifies its readers once
//! - Nothing recomputes until somebody reads it
//!
//! Readers of a computed are notified *that* it changed, not *whether* the
//! new value differs; a computed whose getter returns the same value still
//! wakes its readers.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::context::untracked;
use super::effect::{Effect, EffectOptions, Scheduling};
use super::runtime::Runtime;
use crate::error::{Diagnostic, ReactiveError, Result};
use crate::graph::{release, track, trigger, DebugHook, DebuggerEvent, TargetId, TrackOp, TriggerOp};
use crate::observe::{Key, TargetKind};

const VALUE_KEY: &str = "value";

/// Debug hooks forwarded to a computed's internal effect.
#[derive(Clone, Default)]
pub struct ComputedOptions {
    pub on_track: Option<DebugHook>,
    pub on_trigger: Option<DebugHook>,
}

impl ComputedOptions {
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

struct ComputedInner<T> {
    id: TargetId,
    getter: Rc<dyn Fn() -> T>,
    setter: Option<Box<dyn Fn(T)>>,
    value: RefCell<Option<T>>,
    dirty: Cell<bool>,
    effect: Effect,
}

impl<T> ComputedInner<T> {
    fn invalidate(&self) {
        if !self.dirty.get() {
            self.dirty.set(true);
            trigger(
                self.id,
                TargetKind::Record,
                TriggerOp::Set,
                Some(&Key::from(VALUE_KEY)),
                None,
                None,
            );
        }
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.effect.stop();
        release(self.id);
    }
}

/// A lazily evaluated, cached derived value.
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(1);
/// let doubled = Computed::new({
///     let count = count.clone();
///     move || count.get().as_f64().unwrap_or(0.0) * 2.0
/// });
///
/// assert_eq!(doubled.get(), 2.0);
/// count.set(5);
/// assert_eq!(doubled.get(), 10.0);
/// ```
pub struct Computed<T: 'static>(Rc<ComputedInner<T>>);

impl<T: Clone + 'static> Computed<T> {
    /// Create a read-only computed.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(Rc::new(getter), None, ComputedOptions::default())
    }

    /// Create a writable computed. Writes are forwarded to `setter`.
    pub fn with_setter<F, S>(getter: F, setter: S) -> Self
    where
        F: Fn() -> T + 'static,
        S: Fn(T) + 'static,
    {
        Self::build(Rc::new(getter), Some(Box::new(setter)), ComputedOptions::default())
    }

    pub fn with_options<F>(getter: F, options: ComputedOptions) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(Rc::new(getter), None, options)
    }

    fn build(
        getter: Rc<dyn Fn() -> T>,
        setter: Option<Box<dyn Fn(T)>>,
        options: ComputedOptions,
    ) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let run_weak = weak.clone();
            let run_getter = getter.clone();
            let dirty_weak = weak.clone();

            let effect_options = EffectOptions {
                lazy: true,
                scheduling: Scheduling::Custom(Rc::new(move |_| {
                    if let Some(inner) = dirty_weak.upgrade() {
                        inner.invalidate();
                    }
                })),
                on_track: options.on_track,
                on_trigger: options.on_trigger,
                ..EffectOptions::default()
            };
            let effect = Effect::with_options(
                move || {
                    let value = run_getter();
                    if let Some(inner) = run_weak.upgrade() {
                        *inner.value.borrow_mut() = Some(value);
                    }
                },
                effect_options,
            );

            ComputedInner {
                id: TargetId::new(),
                getter,
                setter,
                value: RefCell::new(None),
                dirty: Cell::new(true),
                effect,
            }
        });
        Self(inner)
    }

    /// Read the value, recomputing it first if it is dirty.
    ///
    /// # Panics
    ///
    /// Panics if the getter reads this same computed before it has ever
    /// produced a value. Use [`Computed::try_get`] to observe that case.
    pub fn get(&self) -> T {
        self.try_get()
            .expect("computed value was read by its own getter before it produced a value")
    }

    /// Read the value, or `None` when the getter re-entered this computed
    /// during its very first evaluation.
    pub fn try_get(&self) -> Option<T> {
        let inner = &self.0;
        if !inner.effect.is_active() {
            // a stopped computed never hears about changes, so it cannot cache
            return Some(untracked(|| (inner.getter)()));
        }
        if inner.dirty.get() {
            inner.effect.run();
            inner.dirty.set(false);
        }
        track(inner.id, TrackOp::Get, Key::from(VALUE_KEY));
        inner.value.borrow().clone()
    }

    /// Write through the setter.
    ///
    /// A read-only computed rejects the write with
    /// [`ReactiveError::ReadonlyComputed`] and a dev-mode diagnostic.
    pub fn set(&self, value: T) -> Result<()> {
        match &self.0.setter {
            Some(setter) => {
                setter(value);
                Ok(())
            }
            None => {
                Runtime::warn(Diagnostic::ReadonlyComputed);
                Err(ReactiveError::ReadonlyComputed)
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.0.dirty.get()
    }

    pub fn is_readonly(&self) -> bool {
        self.0.setter.is_none()
    }

    /// The effect that evaluates the getter.
    pub fn effect(&self) -> &Effect {
        &self.0.effect
    }

    /// The identity readers subscribe to.
    pub fn id(&self) -> TargetId {
        self.0.id
    }

    /// Stop tracking. The computed keeps working as an uncached getter.
    pub fn stop(&self) {
        self.0.effect.stop();
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.0.id)
            .field("dirty", &self.0.dirty.get())
            .field("value", &self.0.value.borrow())
            .field("readonly", &self.0.setter.is_none())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
