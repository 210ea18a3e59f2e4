//! Reactive Runtime
//!
//! The runtime is the single per-thread context object that owns every piece
//! of mutable reactive state:
//!
//! - the active-effect stack and the tracking stack ([`ReactiveContext`])
//! - the `target → key → dep` graph
//! - the scheduler queues
//! - configuration and the error / diagnostic channels
//!
//! # Thread Safety
//!
//! The reactive model is single-threaded and cooperative, so the state lives
//! in a thread-local and is constructed lazily on first use. Handles built on
//! top of it (`Effect`, `Object`, `Ref`, ...) are `!Send`. The only
//! process-wide piece is the default configuration that new threads copy
//! when their runtime is constructed.
//!
//! [`ReactiveContext`]: super::ReactiveContext

use std::cell::RefCell;
use std::rc::Rc;

use parking_lot::RwLock;

use super::context::ContextState;
use crate::config::RuntimeConfig;
use crate::error::{Diagnostic, ReactiveError};
use crate::graph::Graph;
use crate::scheduler::SchedulerState;

type ErrorHandler = Rc<dyn Fn(&ReactiveError)>;
type WarnHandler = Rc<dyn Fn(&Diagnostic)>;

/// Default configuration for runtimes constructed after it is set.
static DEFAULT_CONFIG: RwLock<Option<RuntimeConfig>> = parking_lot::const_rwlock(None);

thread_local! {
    static RUNTIME: RuntimeState = RuntimeState::new();
}

/// Per-thread reactive state.
pub(crate) struct RuntimeState {
    pub(crate) context: RefCell<ContextState>,
    pub(crate) graph: RefCell<Graph>,
    pub(crate) scheduler: RefCell<SchedulerState>,
    config: RefCell<RuntimeConfig>,
    error_handler: RefCell<Option<ErrorHandler>>,
    warn_handler: RefCell<Option<WarnHandler>>,
}

impl RuntimeState {
    fn new() -> Self {
        Self {
            context: RefCell::new(ContextState::default()),
            graph: RefCell::new(Graph::default()),
            scheduler: RefCell::new(SchedulerState::default()),
            config: RefCell::new(Runtime::default_config()),
            error_handler: RefCell::new(None),
            warn_handler: RefCell::new(None),
        }
    }
}

/// Entry point to the current thread's reactive runtime.
pub struct Runtime;

impl Runtime {
    pub(crate) fn with<R>(f: impl FnOnce(&RuntimeState) -> R) -> R {
        RUNTIME.with(f)
    }

    /// Like [`Runtime::with`], but returns `None` once the thread-local has
    /// been torn down. Used from `Drop` impls.
    pub(crate) fn try_with<R>(f: impl FnOnce(&RuntimeState) -> R) -> Option<R> {
        RUNTIME.try_with(f).ok()
    }

    /// Replace the current thread's configuration.
    pub fn configure(config: RuntimeConfig) {
        tracing::debug!(?config, "runtime configured");
        Self::with(|rt| *rt.config.borrow_mut() = config);
    }

    /// The current thread's configuration.
    pub fn config() -> RuntimeConfig {
        Self::with(|rt| rt.config.borrow().clone())
    }

    pub fn dev_mode() -> bool {
        Self::with(|rt| rt.config.borrow().dev_mode)
    }

    /// Set the configuration that runtimes constructed from now on start with.
    ///
    /// Threads whose runtime already exists are unaffected.
    pub fn set_default_config(config: RuntimeConfig) {
        *DEFAULT_CONFIG.write() = Some(config);
    }

    pub fn default_config() -> RuntimeConfig {
        DEFAULT_CONFIG.read().clone().unwrap_or_default()
    }

    /// Install the channel that receives job failures.
    ///
    /// Without a handler, errors are logged with `tracing::error!`.
    pub fn set_error_handler<F>(handler: F)
    where
        F: Fn(&ReactiveError) + 'static,
    {
        Self::with(|rt| *rt.error_handler.borrow_mut() = Some(Rc::new(handler)));
    }

    /// Install the channel that receives dev-mode diagnostics.
    ///
    /// Without a handler, diagnostics are logged with `tracing::warn!`.
    pub fn set_warn_handler<F>(handler: F)
    where
        F: Fn(&Diagnostic) + 'static,
    {
        Self::with(|rt| *rt.warn_handler.borrow_mut() = Some(Rc::new(handler)));
    }

    /// Remove any installed error and warn handlers.
    pub fn clear_handlers() {
        Self::with(|rt| {
            rt.error_handler.borrow_mut().take();
            rt.warn_handler.borrow_mut().take();
        });
    }

    pub(crate) fn report_error(error: ReactiveError) {
        let handler = Self::with(|rt| rt.error_handler.borrow().clone());
        match handler {
            Some(handler) => handler(&error),
            None => tracing::error!(%error, "unhandled error in scheduled job"),
        }
    }

    /// Emit a diagnostic. Dropped outside dev mode.
    pub(crate) fn warn(diagnostic: Diagnostic) {
        let Some(handler) = Self::with(|rt| {
            rt.config
                .borrow()
                .dev_mode
                .then(|| rt.warn_handler.borrow().clone())
        }) else {
            return;
        };
        match handler {
            Some(handler) => handler(&diagnostic),
            None => tracing::warn!("{diagnostic}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn configure_is_per_thread() {
        Runtime::configure(RuntimeConfig::default().with_recursion_limit(7));
        assert_eq!(Runtime::config().recursion_limit, 7);

        let other = std::thread::spawn(|| Runtime::config().recursion_limit)
            .join()
            .unwrap();
        assert_eq!(other, Runtime::default_config().recursion_limit);
    }

    #[test]
    fn warn_respects_dev_mode() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        Runtime::set_warn_handler(move |diag| sink.borrow_mut().push(diag.clone()));

        Runtime::configure(RuntimeConfig::default().with_dev_mode(false));
        Runtime::warn(Diagnostic::ReadonlyComputed);
        assert!(seen.borrow().is_empty());

        Runtime::configure(RuntimeConfig::default().with_dev_mode(true));
        Runtime::warn(Diagnostic::ReadonlyComputed);
        assert_eq!(seen.borrow().as_slice(), &[Diagnostic::ReadonlyComputed]);

        Runtime::clear_handlers();
    }

    #[test]
    fn report_error_uses_handler() {
        let seen = Rc::new(RefCell::new(0));
        let sink = seen.clone();
        Runtime::set_error_handler(move |_| *sink.borrow_mut() += 1);
        Runtime::report_error(ReactiveError::ReadonlyComputed);
        assert_eq!(*seen.borrow(), 1);
        Runtime::clear_handlers();
    }
}
