//! Reactive Context
//!
//! The reactive context tracks which effect is currently running and whether
//! reads should be recorded at all.
//!
//! # Implementation
//!
//! The runtime keeps a stack of running effects. Entering an effect pushes it
//! and forces tracking on; the returned guard pops it and restores the prior
//! tracking state when dropped, so the stack stays balanced even if the
//! computation panics.
//!
//! Tracking itself is a nestable boolean stack. Code that must not become a
//! dependency (setup code, length-mutating sequence methods) pauses tracking
//! and then resets it, restoring exactly the state it found.

use super::effect::Effect;
use super::subscriber::EffectId;
use super::runtime::Runtime;

/// Per-thread execution context state.
#[derive(Debug)]
pub(crate) struct ContextState {
    stack: Vec<Effect>,
    should_track: bool,
    track_stack: Vec<bool>,
}

impl Default for ContextState {
    fn default() -> Self {
        Self {
            stack: Vec::new(),
            should_track: true,
            track_stack: Vec::new(),
        }
    }
}

impl ContextState {
    fn pause(&mut self) {
        self.track_stack.push(self.should_track);
        self.should_track = false;
    }

    fn enable(&mut self) {
        self.track_stack.push(self.should_track);
        self.should_track = true;
    }

    fn reset(&mut self) {
        self.should_track = self.track_stack.pop().unwrap_or(true);
    }
}

/// Guard for one running effect.
///
/// While this guard is alive, reads are attributed to its effect.
pub struct ReactiveContext {
    effect: EffectId,
}

impl ReactiveContext {
    /// Push `effect` as the running effect and enable tracking.
    pub(crate) fn enter(effect: &Effect) -> Self {
        Runtime::with(|rt| {
            let mut ctx = rt.context.borrow_mut();
            ctx.enable();
            ctx.stack.push(effect.clone());
        });
        Self { effect: effect.id() }
    }

    /// Whether any effect is running.
    pub fn is_active() -> bool {
        Runtime::with(|rt| !rt.context.borrow().stack.is_empty())
    }

    /// The innermost running effect.
    pub fn active_effect() -> Option<Effect> {
        Runtime::with(|rt| rt.context.borrow().stack.last().cloned())
    }

    /// The effect reads should be attributed to, if tracking is on.
    pub(crate) fn tracking_effect() -> Option<Effect> {
        Runtime::with(|rt| {
            let ctx = rt.context.borrow();
            if ctx.should_track {
                ctx.stack.last().cloned()
            } else {
                None
            }
        })
    }

    /// Whether the effect is anywhere on the execution stack.
    pub fn contains(effect: EffectId) -> bool {
        Runtime::with(|rt| rt.context.borrow().stack.iter().any(|e| e.id() == effect))
    }

    /// Number of nested running effects.
    pub fn depth() -> usize {
        Runtime::with(|rt| rt.context.borrow().stack.len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = Runtime::try_with(|rt| {
            let mut ctx = rt.context.borrow_mut();
            let popped = ctx.stack.pop();
            ctx.reset();
            popped
        })
        .flatten();

        if let Some(popped) = popped {
            debug_assert_eq!(
                popped.id(),
                self.effect,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.effect,
                popped.id()
            );
        }
    }
}

/// Stop recording reads until the matching [`reset_tracking`].
pub fn pause_tracking() {
    Runtime::with(|rt| rt.context.borrow_mut().pause());
}

/// Force reads to be recorded until the matching [`reset_tracking`].
pub fn enable_tracking() {
    Runtime::with(|rt| rt.context.borrow_mut().enable());
}

/// Restore the tracking state saved by the last pause or enable.
pub fn reset_tracking() {
    Runtime::with(|rt| rt.context.borrow_mut().reset());
}

/// Whether a read right now would be recorded.
pub fn is_tracking() -> bool {
    Runtime::with(|rt| {
        let ctx = rt.context.borrow();
        ctx.should_track && !ctx.stack.is_empty()
    })
}

/// Guard returned by [`pause_tracking_scoped`]; resets tracking on drop.
pub(crate) struct PausedTracking(());

impl Drop for PausedTracking {
    fn drop(&mut self) {
        Runtime::try_with(|rt| rt.context.borrow_mut().reset());
    }
}

pub(crate) fn pause_tracking_scoped() -> PausedTracking {
    pause_tracking();
    PausedTracking(())
}

/// Run `f` without recording any reads it makes.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _paused = pause_tracking_scoped();
    f()
}
