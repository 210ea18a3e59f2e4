//! Operation kinds and debugger events.

use std::fmt;
use std::rc::Rc;

use super::node::TargetId;
use crate::observe::{Key, Value};
use crate::reactive::Effect;

/// Kind of read that created a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackOp {
    /// A value read of one key.
    Get,
    /// An existence check of one key.
    Has,
    /// An enumeration of keys.
    Iterate,
}

/// Kind of write that notifies subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerOp {
    /// An existing key changed value.
    Set,
    /// A new key appeared.
    Add,
    /// A key was removed.
    Delete,
    /// A collection was emptied.
    Clear,
}

/// Either side of a debugger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Track(TrackOp),
    Trigger(TriggerOp),
}

/// Payload handed to `on_track` / `on_trigger` hooks.
#[derive(Clone)]
pub struct DebuggerEvent {
    /// The effect that was subscribed or notified.
    pub effect: Effect,
    /// Graph identity of the observed target.
    pub target: TargetId,
    /// The key involved, if any (`Clear` carries none).
    pub key: Option<Key>,
    pub op: Operation,
    pub new_value: Option<Value>,
    pub old_value: Option<Value>,
}

impl fmt::Debug for DebuggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebuggerEvent")
            .field("effect", &self.effect.id())
            .field("target", &self.target)
            .field("key", &self.key)
            .field("op", &self.op)
            .field("new_value", &self.new_value)
            .field("old_value", &self.old_value)
            .finish()
    }
}

/// Debug hook signature.
pub type DebugHook = Rc<dyn Fn(&DebuggerEvent)>;
