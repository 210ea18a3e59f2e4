//! Dependency Graph
//!
//! This module implements the registry that connects observed state to the
//! effects that read it.
//!
//! # Overview
//!
//! The graph maps `target → key → dep`, where a dep is the set of effects
//! that read that key during their last run:
//!
//! - [`track`] is called on every observed read and subscribes the running
//!   effect to the `(target, key)` dep.
//! - [`trigger`] is called on every observed write and hands each affected
//!   effect to its scheduling strategy.
//!
//! # Design Decisions
//!
//! 1. Deps are shared sets. The node holds one, and each subscribed effect
//!    holds a clone, so clearing an effect before it re-runs costs
//!    O(deps of that effect) instead of a scan of the whole graph.
//!
//! 2. Targets are keyed by [`TargetId`], never by value. A target releases
//!    its node when it is dropped.
//!
//! 3. Enumeration is modelled with sentinel keys ([`Key::Iterate`],
//!    [`Key::MapKeyIterate`]) so that adding or removing keys can reach
//!    effects that never read the key itself.
//!
//! [`Key::Iterate`]: crate::observe::Key::Iterate
//! [`Key::MapKeyIterate`]: crate::observe::Key::MapKeyIterate

mod dep;
mod node;
mod ops;
mod tracker;

pub(crate) use dep::Dep;
pub(crate) use tracker::{release, Graph};

pub use node::TargetId;
pub use ops::{DebugHook, DebuggerEvent, Operation, TrackOp, TriggerOp};
pub use tracker::{is_tracked, subscriber_count, track, trigger};
