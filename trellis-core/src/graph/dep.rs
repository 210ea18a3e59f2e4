//! Dependency sets.
//!
//! A [`Dep`] is the set of effects subscribed to one `(target, key)` pair.
//! It is shared: the graph node holds it, and every subscribed effect holds
//! a clone so that it can remove itself before re-running.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::node::TargetId;
use crate::observe::Key;
use crate::reactive::{Effect, EffectId};

#[derive(Clone)]
pub(crate) struct Dep(Rc<DepInner>);

struct DepInner {
    target: TargetId,
    key: Key,
    /// Insertion-ordered so that triggering is deterministic.
    subscribers: RefCell<IndexMap<EffectId, Effect>>,
}

impl Dep {
    pub(crate) fn new(target: TargetId, key: Key) -> Self {
        Self(Rc::new(DepInner {
            target,
            key,
            subscribers: RefCell::new(IndexMap::new()),
        }))
    }

    pub(crate) fn target(&self) -> TargetId {
        self.0.target
    }

    pub(crate) fn key(&self) -> &Key {
        &self.0.key
    }

    /// Subscribe `effect`. Returns `false` if it was already subscribed.
    pub(crate) fn insert(&self, effect: &Effect) -> bool {
        let mut subscribers = self.0.subscribers.borrow_mut();
        if subscribers.contains_key(&effect.id()) {
            return false;
        }
        subscribers.insert(effect.id(), effect.clone());
        true
    }

    /// Unsubscribe an effect, handing it back so the caller can drop it
    /// after the borrow ends.
    pub(crate) fn remove(&self, id: EffectId) -> Option<Effect> {
        self.0.subscribers.borrow_mut().shift_remove(&id)
    }

    /// Visit every subscriber in subscription order.
    pub(crate) fn for_each(&self, mut f: impl FnMut(&Effect)) {
        for effect in self.0.subscribers.borrow().values() {
            f(effect);
        }
    }

    /// Remove every subscriber, returning them to the caller.
    pub(crate) fn drain(&self) -> IndexMap<EffectId, Effect> {
        std::mem::take(&mut *self.0.subscribers.borrow_mut())
    }

    pub(crate) fn len(&self) -> usize {
        self.0.subscribers.borrow().len()
    }

    #[cfg(test)]
    pub(crate) fn ptr_eq(&self, other: &Dep) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("target", &self.0.target)
            .field("key", &self.0.key)
            .field("subscribers", &self.len())
            .finish()
    }
}
