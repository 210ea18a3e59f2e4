//! Graph Nodes
//!
//! One node exists per observed identity (a target, a ref, or a computed
//! value) that has been read at least once inside an effect. The node maps
//! each key that was read to the [`Dep`] set of effects that read it.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::dep::Dep;
use crate::observe::Key;

/// Identity of an observable in the dependency graph.
///
/// Targets, refs and computed values each take one when they are created.
/// Identity, not value, keys the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(u64);

impl TargetId {
    /// Generate a new unique target ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

/// The key → dep association of one target.
#[derive(Debug, Default)]
pub(crate) struct Node {
    deps: IndexMap<Key, Dep>,
}

impl Node {
    /// Fetch the dep for `key`, creating it on first use.
    pub(crate) fn dep_for(&mut self, target: TargetId, key: Key) -> Dep {
        self.deps
            .entry(key)
            .or_insert_with_key(|key| Dep::new(target, key.clone()))
            .clone()
    }

    pub(crate) fn get(&self, key: &Key) -> Option<&Dep> {
        self.deps.get(key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Key, &Dep)> {
        self.deps.iter()
    }

    pub(crate) fn into_deps(self) -> impl Iterator<Item = Dep> {
        self.deps.into_values()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.deps.len()
    }
}
