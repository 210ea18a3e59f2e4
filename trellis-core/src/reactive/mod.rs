//! Reactive Primitives
//!
//! This module implements the effect runtime: effects, computed values, and
//! the per-thread context that attributes reads to the running effect.
//!
//! # Concepts
//!
//! ## Effects
//!
//! An Effect is a computation that re-runs whenever state it read during its
//! last run changes. Effects are used to synchronize reactive state with the
//! outside world. How a triggered effect re-runs is chosen per effect through
//! [`Scheduling`].
//!
//! ## Computeds
//!
//! A Computed is a derived value that caches its result. It re-evaluates only
//! when it is read after one of its dependencies changed.
//!
//! # Implementation Notes
//!
//! The runtime uses a thread-local context to detect dependencies
//! automatically. When observed state is read, the graph asks the context for
//! the running effect and, if tracking is on, subscribes it.

mod computed;
mod context;
mod effect;
mod runtime;
mod subscriber;

pub use computed::{Computed, ComputedOptions};
pub use context::{
    enable_tracking, is_tracking, pause_tracking, reset_tracking, untracked, ReactiveContext,
};
pub use effect::{Effect, EffectOptions, Scheduling};
pub use runtime::Runtime;
pub use subscriber::EffectId;

pub(crate) use context::pause_tracking_scoped;
pub(crate) use effect::WeakEffect;

/// Create an effect with options and return its handle.
///
/// Equivalent to [`Effect::with_options`].
pub fn effect<F>(f: F, options: EffectOptions) -> Effect
where
    F: Fn() + 'static,
{
    Effect::with_options(f, options)
}

/// Stop an effect. Equivalent to [`Effect::stop`].
pub fn stop(effect: &Effect) {
    effect.stop();
}

/// Create a read-only computed value.
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Computed::new(getter)
}
