//! Raw targets.
//!
//! A [`Target`] is the underlying mutable value a facade observes. Its
//! operations here are the plain, untracked ones; facades add tracking and
//! triggering on top.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use super::facade::{FacadeSlots, Object};
use super::key::Key;
use super::value::Value;
use crate::graph::{release, TargetId};

/// Shape of a target. Selects both storage and trigger rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Ordered named and symbol-keyed properties, with an optional prototype.
    Record,
    /// Indexed elements (possibly with holes), a `length`, and extra named
    /// properties.
    Sequence,
    Map,
    Set,
    /// A value of a type that is never observed.
    Opaque(&'static str),
}

impl TargetKind {
    pub fn is_collection(&self) -> bool {
        matches!(self, TargetKind::Map | TargetKind::Set)
    }

    pub fn is_observable(&self) -> bool {
        !matches!(self, TargetKind::Opaque(_))
    }

    /// The canonical form of `key` on this kind of target, used both for
    /// storage and for the dependency graph.
    pub(crate) fn normalize(&self, key: &Key) -> Key {
        match self {
            TargetKind::Record => key.for_record(),
            TargetKind::Sequence => key.for_sequence(),
            _ => key.clone(),
        }
    }
}

pub(crate) enum TargetData {
    Record(IndexMap<Key, Value>),
    /// Elements are stored sparsely: a hole is an index below `len` with no
    /// entry.
    Sequence {
        items: BTreeMap<usize, Value>,
        len: usize,
        props: IndexMap<Key, Value>,
    },
    Map(IndexMap<Key, Value>),
    Set(IndexSet<Key>),
    Opaque(&'static str),
}

pub(crate) struct TargetInner {
    id: TargetId,
    data: RefCell<TargetData>,
    proto: RefCell<Option<Object>>,
    skip: Cell<bool>,
    extensible: Cell<bool>,
    pub(crate) slots: FacadeSlots,
}

impl Drop for TargetInner {
    fn drop(&mut self) {
        release(self.id);
    }
}

/// A raw observable value.
#[derive(Clone)]
pub struct Target(Rc<TargetInner>);

impl Target {
    pub(crate) fn new(data: TargetData) -> Self {
        Self(Rc::new(TargetInner {
            id: TargetId::new(),
            data: RefCell::new(data),
            proto: RefCell::new(None),
            skip: Cell::new(false),
            extensible: Cell::new(true),
            slots: FacadeSlots::default(),
        }))
    }

    pub fn id(&self) -> TargetId {
        self.0.id
    }

    pub fn kind(&self) -> TargetKind {
        match &*self.0.data.borrow() {
            TargetData::Record(_) => TargetKind::Record,
            TargetData::Sequence { .. } => TargetKind::Sequence,
            TargetData::Map(_) => TargetKind::Map,
            TargetData::Set(_) => TargetKind::Set,
            TargetData::Opaque(name) => TargetKind::Opaque(*name),
        }
    }

    pub fn ptr_eq(&self, other: &Target) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn slots(&self) -> &FacadeSlots {
        &self.0.slots
    }

    pub fn is_skipped(&self) -> bool {
        self.0.skip.get()
    }

    pub(crate) fn mark_skip(&self) {
        self.0.skip.set(true);
    }

    pub fn is_extensible(&self) -> bool {
        self.0.extensible.get()
    }

    pub(crate) fn prevent_extensions(&self) {
        self.0.extensible.set(false);
    }

    pub fn prototype(&self) -> Option<Object> {
        self.0.proto.borrow().clone()
    }

    pub(crate) fn set_prototype(&self, proto: Option<Object>) {
        let _previous = std::mem::replace(&mut *self.0.proto.borrow_mut(), proto);
    }

    /// Own property lookup. Keys must already be normalized for this kind.
    pub(crate) fn get_own(&self, key: &Key) -> Option<Value> {
        match &*self.0.data.borrow() {
            TargetData::Record(props) => props.get(key).cloned(),
            TargetData::Sequence { items, len, props } => match key {
                Key::Index(index) => items.get(index).cloned(),
                key if key.is_length() => Some(Value::from(*len)),
                key => props.get(key).cloned(),
            },
            TargetData::Map(entries) => entries.get(key).cloned(),
            TargetData::Set(_) | TargetData::Opaque(_) => None,
        }
    }

    /// Lookup through the prototype chain.
    pub(crate) fn get(&self, key: &Key) -> Value {
        if let Some(value) = self.get_own(key) {
            return value;
        }
        match self.inherits() {
            Some(proto) => proto.get(key.clone()),
            None => Value::Undefined,
        }
    }

    pub(crate) fn has_own(&self, key: &Key) -> bool {
        match &*self.0.data.borrow() {
            TargetData::Record(props) => props.contains_key(key),
            TargetData::Sequence { items, props, .. } => match key {
                Key::Index(index) => items.contains_key(index),
                key if key.is_length() => true,
                key => props.contains_key(key),
            },
            TargetData::Map(entries) => entries.contains_key(key),
            TargetData::Set(members) => members.contains(key),
            TargetData::Opaque(_) => false,
        }
    }

    pub(crate) fn has(&self, key: &Key) -> bool {
        if self.has_own(key) {
            return true;
        }
        self.inherits().is_some_and(|proto| proto.has(key.clone()))
    }

    /// The prototype, if this kind of target consults one.
    fn inherits(&self) -> Option<Object> {
        match self.kind() {
            TargetKind::Record | TargetKind::Sequence => self.prototype(),
            _ => None,
        }
    }

    /// Store an own property. Returns `false` when the write is refused: a
    /// new key on a non-extensible target, an invalid `length`, or a target
    /// kind without keyed storage.
    pub(crate) fn set_own(&self, key: Key, value: Value) -> bool {
        let extensible = self.is_extensible();
        let mut data = self.0.data.borrow_mut();
        let previous = match &mut *data {
            TargetData::Record(props) | TargetData::Map(props) => {
                if !extensible && !props.contains_key(&key) {
                    return false;
                }
                props.insert(key, value)
            }
            TargetData::Sequence { items, len, props } => match key {
                Key::Index(index) => {
                    if index >= *len {
                        if !extensible {
                            return false;
                        }
                        *len = index + 1;
                    }
                    items.insert(index, value)
                }
                key if key.is_length() => {
                    let Some(new_len) = value.as_length() else {
                        return false;
                    };
                    let removed = items.split_off(&new_len);
                    *len = new_len;
                    drop(data);
                    drop(removed);
                    return true;
                }
                key => {
                    if !extensible && !props.contains_key(&key) {
                        return false;
                    }
                    props.insert(key, value)
                }
            },
            TargetData::Set(_) | TargetData::Opaque(_) => return false,
        };
        drop(data);
        drop(previous);
        true
    }

    /// Remove an own property. Deleting a missing key succeeds; `length` can
    /// never be deleted. A deleted sequence element leaves a hole.
    pub(crate) fn delete_own(&self, key: &Key) -> bool {
        let mut data = self.0.data.borrow_mut();
        let removed = match &mut *data {
            TargetData::Record(props) | TargetData::Map(props) => props.shift_remove(key),
            TargetData::Sequence { items, props, .. } => match key {
                Key::Index(index) => items.remove(index),
                key if key.is_length() => return false,
                key => props.shift_remove(key),
            },
            TargetData::Set(members) => {
                members.shift_remove(key);
                None
            }
            TargetData::Opaque(_) => return false,
        };
        drop(data);
        drop(removed);
        true
    }

    /// Add a set member. Returns `false` if it was already present.
    pub(crate) fn add_member(&self, key: Key) -> bool {
        match &mut *self.0.data.borrow_mut() {
            TargetData::Set(members) => members.insert(key),
            _ => false,
        }
    }

    /// Empty a collection.
    pub(crate) fn clear(&self) {
        let mut data = self.0.data.borrow_mut();
        let removed = match &mut *data {
            TargetData::Map(entries) => std::mem::take(entries),
            TargetData::Set(members) => {
                members.clear();
                IndexMap::new()
            }
            _ => IndexMap::new(),
        };
        drop(data);
        drop(removed);
    }

    /// Own keys in enumeration order.
    ///
    /// Records list integer-like names in ascending order, then other names
    /// in insertion order, then symbols. Sequences list their present
    /// indices, then their named properties; their `length` is not listed.
    pub(crate) fn own_keys(&self) -> Vec<Key> {
        match &*self.0.data.borrow() {
            TargetData::Record(props) => ordered_keys(props.keys()),
            TargetData::Sequence { items, props, .. } => items
                .keys()
                .map(|index| Key::Index(*index))
                .chain(ordered_keys(props.keys()))
                .collect(),
            TargetData::Map(entries) => entries.keys().cloned().collect(),
            TargetData::Set(members) => members.iter().cloned().collect(),
            TargetData::Opaque(_) => Vec::new(),
        }
    }

    /// Snapshot of a sequence's length and its present elements, in index
    /// order.
    pub(crate) fn elements(&self) -> (usize, Vec<(usize, Value)>) {
        match &*self.0.data.borrow() {
            TargetData::Sequence { items, len, .. } => (
                *len,
                items.iter().map(|(index, value)| (*index, value.clone())).collect(),
            ),
            _ => (0, Vec::new()),
        }
    }

    /// Record key count, sequence length, or collection size.
    pub(crate) fn size(&self) -> usize {
        match &*self.0.data.borrow() {
            TargetData::Record(props) | TargetData::Map(props) => props.len(),
            TargetData::Sequence { len, .. } => *len,
            TargetData::Set(members) => members.len(),
            TargetData::Opaque(_) => 0,
        }
    }
}

fn ordered_keys<'a>(keys: impl Iterator<Item = &'a Key>) -> Vec<Key> {
    let mut indices = Vec::new();
    let mut names = Vec::new();
    let mut symbols = Vec::new();
    for key in keys {
        match key {
            Key::Symbol(_) => symbols.push(key.clone()),
            key => match key.as_index() {
                Some(index) => indices.push((index, key.clone())),
                None => names.push(key.clone()),
            },
        }
    }
    indices.sort_by_key(|(index, _)| *index);
    indices
        .into_iter()
        .map(|(_, key)| key)
        .chain(names)
        .chain(symbols)
        .collect()
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("id", &self.0.id)
            .field("kind", &self.kind())
            .finish()
    }
}
