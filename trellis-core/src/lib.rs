//! Trellis Core
//!
//! This crate provides fine-grained reactive dependency tracking. Reads of
//! observed state are recorded against the computation that is running, and
//! later writes re-run exactly the computations that read the written
//! location.
//!
//! It implements:
//!
//! - Observed state: records, sequences, maps and sets behind facades, plus
//!   single-value refs
//! - A dependency graph with `track` / `trigger`
//! - Effects and cached computed values
//! - A batched pre / main / post job scheduler
//! - Watchers built on top of effects and the scheduler
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `observe`: targets, facades, refs and the values stored in them
//! - `graph`: the `target → key → dep` registry
//! - `reactive`: effects, computeds and the per-thread runtime
//! - `scheduler`: job queues and flushing
//! - `watch`: `watch` and `watch_effect`
//!
//! # Example
//!
//! ```rust
//! use trellis_core::observe::{Object, Value};
//! use trellis_core::reactive::{Computed, Effect};
//!
//! let state = Object::new_record([("count", 0)]).to_reactive();
//!
//! let doubled = Computed::new({
//!     let state = state.clone();
//!     move || state.get("count").as_f64().unwrap_or(0.0) * 2.0
//! });
//!
//! let _effect = Effect::new({
//!     let doubled = doubled.clone();
//!     move || println!("doubled: {}", doubled.get())
//! });
//!
//! state.set("count", 5);
//! // Effect automatically runs, prints: "doubled: 10"
//! assert_eq!(state.get("count"), Value::from(5));
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod observe;
pub mod reactive;
pub mod scheduler;
pub mod watch;

pub use config::{FlushMode, RuntimeConfig};
pub use error::{Diagnostic, MutationKind, ReactiveError, Result};
pub use observe::{
    is_proxy, is_reactive, is_readonly, is_ref, mark_skip, reactive, readonly, shallow_reactive,
    shallow_readonly, to_raw, unref, Key, Object, Ref, Value,
};
pub use reactive::{computed, effect, stop, Computed, Effect, EffectOptions, Runtime};
pub use scheduler::{next_tick, next_tick_then};
pub use watch::{watch, watch_effect, Flush, WatchHandle, WatchOptions, WatchSource};

/// Crate version, as recorded in the manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
