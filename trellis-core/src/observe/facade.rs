//! Facades and the `Object` handle.
//!
//! A [`Facade`] presents a target through one of four modes. Every read
//! through a non-readonly facade is tracked; every effective write through a
//! reactive facade is triggered. A facade wraps either a raw target or, for
//! readonly-over-reactive, another facade; raw reads go to that source, so a
//! readonly view of a reactive object still tracks through the inner facade.
//!
//! [`Object`] is the handle stored in values: either a raw target or a
//! facade. All property operations are methods on `Object` and behave
//! according to what the handle is.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use super::collection;
use super::key::Key;
use super::target::{Target, TargetData, TargetKind};
use super::value::{has_changed, Value};
use crate::error::{Diagnostic, MutationKind};
use crate::graph::{track, trigger, TargetId, TrackOp, TriggerOp};
use crate::reactive::Runtime;

/// How a facade presents its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacadeMode {
    /// Tracks reads, triggers writes, wraps nested objects, unwraps refs.
    Reactive,
    /// Tracks and triggers only at the top level.
    ShallowReactive,
    /// Refuses writes, wraps nested objects as readonly, tracks nothing.
    Readonly,
    /// Refuses top-level writes only.
    ShallowReadonly,
}

impl FacadeMode {
    pub fn is_readonly(self) -> bool {
        matches!(self, FacadeMode::Readonly | FacadeMode::ShallowReadonly)
    }

    pub fn is_shallow(self) -> bool {
        matches!(self, FacadeMode::ShallowReactive | FacadeMode::ShallowReadonly)
    }
}

/// Weak caches of the facades created over one source.
///
/// Reactive and shallow-reactive facades share a slot, as do readonly and
/// shallow-readonly ones.
#[derive(Default)]
pub(crate) struct FacadeSlots {
    reactive: RefCell<Weak<FacadeInner>>,
    readonly: RefCell<Weak<FacadeInner>>,
}

impl FacadeSlots {
    fn slot(&self, mode: FacadeMode) -> &RefCell<Weak<FacadeInner>> {
        if mode.is_readonly() {
            &self.readonly
        } else {
            &self.reactive
        }
    }
}

pub(crate) struct FacadeInner {
    source: Object,
    mode: FacadeMode,
    slots: FacadeSlots,
}

/// An observing view of a target.
#[derive(Clone)]
pub struct Facade(Rc<FacadeInner>);

impl Facade {
    pub fn mode(&self) -> FacadeMode {
        self.0.mode
    }

    /// What this facade wraps: the raw target, or the reactive facade a
    /// readonly facade was created over.
    pub fn source(&self) -> &Object {
        &self.0.source
    }

    pub fn ptr_eq(&self, other: &Facade) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn target(&self) -> Target {
        self.0.source.raw_target()
    }

    /// Whether reads through this facade reach the dependency graph.
    pub(crate) fn tracks(&self) -> bool {
        !self.0.mode.is_readonly() || self.0.source.tracks()
    }

    /// Wrap a value read through this facade.
    pub(crate) fn wrap_child(&self, value: Value) -> Value {
        if self.0.mode.is_shallow() || !value.is_object() {
            return value;
        }
        let mode = if self.0.mode.is_readonly() {
            FacadeMode::Readonly
        } else {
            FacadeMode::Reactive
        };
        observe(value, mode)
    }

    /// Refuse a mutation on a readonly facade. Returns `true` when refused.
    pub(crate) fn refuse(&self, op: MutationKind, key: Option<&Key>) -> bool {
        if !self.0.mode.is_readonly() {
            return false;
        }
        Runtime::warn(Diagnostic::ReadonlyMutation {
            op,
            key: key.cloned(),
        });
        true
    }

    fn get(&self, key: Key) -> Value {
        let target = self.target();
        let kind = target.kind();
        if kind.is_collection() {
            return collection::get(self, &target, key);
        }

        let key = kind.normalize(&key);
        let value = self.0.source.get(key.clone());
        if key.is_untracked() {
            return value;
        }
        if !self.0.mode.is_readonly() {
            track(target.id(), TrackOp::Get, key.clone());
        }
        if self.0.mode.is_shallow() {
            return value;
        }
        if let Value::Ref(cell) = &value {
            // sequence elements keep their refs
            if kind == TargetKind::Sequence && key.is_integer_key() {
                return value;
            }
            return cell.get();
        }
        self.wrap_child(value)
    }

    fn set(&self, key: Key, value: Value) -> bool {
        if self.refuse(MutationKind::Set, Some(&key)) {
            return true;
        }
        let target = self.target();
        let kind = target.kind();
        if kind.is_collection() {
            return collection::set(&target, key, value);
        }

        let key = kind.normalize(&key);
        let old_value = target.get(&key);
        let mut value = value;
        if !self.0.mode.is_shallow() {
            value = value.to_raw();
            if kind != TargetKind::Sequence {
                if let (Value::Ref(cell), false) = (&old_value, matches!(value, Value::Ref(_))) {
                    cell.set(value);
                    return true;
                }
            }
        }

        let had_key = match (kind, key.as_index()) {
            (TargetKind::Sequence, Some(index)) => index < target.size(),
            _ => target.has_own(&key),
        };
        // the write always lands on this facade's own target, never on a
        // prototype ancestor, so only this target is triggered
        if !target.set_own(key.clone(), value.clone()) {
            return false;
        }
        if !had_key {
            trigger(target.id(), kind, TriggerOp::Add, Some(&key), Some(&value), None);
        } else if has_changed(&value, &old_value) {
            trigger(
                target.id(),
                kind,
                TriggerOp::Set,
                Some(&key),
                Some(&value),
                Some(&old_value),
            );
        }
        true
    }

    fn delete(&self, key: Key) -> bool {
        if self.refuse(MutationKind::Delete, Some(&key)) {
            return true;
        }
        let target = self.target();
        let kind = target.kind();
        if kind.is_collection() {
            return collection::delete(&target, key);
        }

        let key = kind.normalize(&key);
        let had_key = target.has_own(&key);
        let old_value = target.get_own(&key).unwrap_or_default();
        let deleted = target.delete_own(&key);
        if deleted && had_key {
            trigger(target.id(), kind, TriggerOp::Delete, Some(&key), None, Some(&old_value));
        }
        deleted
    }

    fn has(&self, key: Key) -> bool {
        let target = self.target();
        let kind = target.kind();
        if kind.is_collection() {
            return collection::has(self, &target, key);
        }

        let key = kind.normalize(&key);
        let result = self.0.source.has(key.clone());
        let well_known = matches!(&key, Key::Symbol(sym) if sym.is_well_known());
        if !self.0.mode.is_readonly() && !well_known {
            track(target.id(), TrackOp::Has, key);
        }
        result
    }

    fn keys(&self) -> Vec<Key> {
        let target = self.target();
        let kind = target.kind();
        if kind.is_collection() {
            return collection::keys(self, &target);
        }
        if !self.0.mode.is_readonly() {
            let key = if kind == TargetKind::Sequence {
                Key::length()
            } else {
                Key::Iterate
            };
            track(target.id(), TrackOp::Iterate, key);
        }
        self.0.source.keys()
    }
}

/// A handle to an observable value: a raw target or a facade over one.
///
/// Property operations through a raw handle are plain reads and writes.
/// Through a facade they are tracked and triggered according to its mode.
#[derive(Clone)]
pub enum Object {
    Raw(Target),
    Facade(Facade),
}

impl Object {
    /// A raw record with the given properties, in order.
    pub fn new_record<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        let props: IndexMap<Key, Value> = entries
            .into_iter()
            .map(|(key, value)| (key.into().for_record(), value.into()))
            .collect();
        Object::Raw(Target::new(TargetData::Record(props)))
    }

    /// A raw sequence with the given elements.
    pub fn new_sequence<V>(items: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<Value>,
    {
        let items: BTreeMap<usize, Value> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index, item.into()))
            .collect();
        Object::Raw(Target::new(TargetData::Sequence {
            len: items.len(),
            items,
            props: IndexMap::new(),
        }))
    }

    pub fn new_map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        Object::Raw(Target::new(TargetData::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )))
    }

    pub fn new_set<K>(members: impl IntoIterator<Item = K>) -> Self
    where
        K: Into<Key>,
    {
        let members: IndexSet<Key> = members.into_iter().map(Into::into).collect();
        Object::Raw(Target::new(TargetData::Set(members)))
    }

    /// A value of a type that is never observed, such as a date or a regex.
    pub fn new_opaque(type_name: &'static str) -> Self {
        Object::Raw(Target::new(TargetData::Opaque(type_name)))
    }

    pub(crate) fn raw_target(&self) -> Target {
        match self {
            Object::Raw(target) => target.clone(),
            Object::Facade(facade) => facade.target(),
        }
    }

    /// Graph identity of the underlying target.
    pub fn id(&self) -> TargetId {
        match self {
            Object::Raw(target) => target.id(),
            Object::Facade(facade) => facade.target().id(),
        }
    }

    pub fn kind(&self) -> TargetKind {
        self.raw_target().kind()
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Raw(a), Object::Raw(b)) => a.ptr_eq(b),
            (Object::Facade(a), Object::Facade(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, Object::Facade(_))
    }

    /// Whether this is a reactive facade, or a readonly facade over one.
    pub fn is_reactive(&self) -> bool {
        match self {
            Object::Raw(_) => false,
            Object::Facade(facade) if facade.mode().is_readonly() => facade.source().is_reactive(),
            Object::Facade(_) => true,
        }
    }

    pub fn is_readonly(&self) -> bool {
        matches!(self, Object::Facade(facade) if facade.mode().is_readonly())
    }

    pub fn is_shallow(&self) -> bool {
        matches!(self, Object::Facade(facade) if facade.mode().is_shallow())
    }

    /// The innermost raw target, through any number of facades.
    pub fn to_raw(&self) -> Object {
        Object::Raw(self.raw_target())
    }

    pub(crate) fn tracks(&self) -> bool {
        match self {
            Object::Raw(_) => false,
            Object::Facade(facade) => facade.tracks(),
        }
    }

    pub fn to_reactive(&self) -> Object {
        self.observe(FacadeMode::Reactive)
    }

    pub fn to_shallow_reactive(&self) -> Object {
        self.observe(FacadeMode::ShallowReactive)
    }

    pub fn to_readonly(&self) -> Object {
        self.observe(FacadeMode::Readonly)
    }

    pub fn to_shallow_readonly(&self) -> Object {
        self.observe(FacadeMode::ShallowReadonly)
    }

    fn slots(&self) -> &FacadeSlots {
        match self {
            Object::Raw(target) => target.slots(),
            Object::Facade(facade) => &facade.0.slots,
        }
    }

    /// The facade of `mode` over this object, reusing a live cached one.
    ///
    /// Facades are returned unchanged, except that a readonly facade may be
    /// layered over a reactive one. Skip-marked, non-extensible and opaque
    /// targets are returned unchanged.
    pub(crate) fn observe(&self, mode: FacadeMode) -> Object {
        if let Object::Facade(facade) = self {
            let layers_readonly = mode.is_readonly() && !facade.mode().is_readonly();
            if !layers_readonly {
                return self.clone();
            }
        }

        let target = self.raw_target();
        if target.is_skipped() || !target.is_extensible() || !target.kind().is_observable() {
            return self.clone();
        }

        let slot = self.slots().slot(mode);
        if let Some(existing) = slot.borrow().upgrade() {
            return Object::Facade(Facade(existing));
        }

        let facade = Facade(Rc::new(FacadeInner {
            source: self.clone(),
            mode,
            slots: FacadeSlots::default(),
        }));
        *slot.borrow_mut() = Rc::downgrade(&facade.0);
        tracing::trace!(target_id = target.id().raw(), ?mode, "facade created");
        Object::Facade(facade)
    }

    /// Opt the underlying target out of ever being wrapped.
    pub fn mark_skip(&self) {
        self.raw_target().mark_skip();
    }

    /// Forbid new keys on the underlying target.
    pub fn prevent_extensions(&self) {
        self.raw_target().prevent_extensions();
    }

    pub fn prototype(&self) -> Option<Object> {
        self.raw_target().prototype()
    }

    /// Set the prototype consulted for missing keys on records and sequences.
    pub fn set_prototype(&self, proto: Option<Object>) {
        self.raw_target().set_prototype(proto);
    }

    /// Read a property, map entry, or sequence element.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        let key = key.into();
        match self {
            Object::Raw(target) => {
                let key = target.kind().normalize(&key);
                target.get(&key)
            }
            Object::Facade(facade) => facade.get(key),
        }
    }

    /// Write a property, map entry, or sequence element.
    ///
    /// Returns `false` when the target refused the write. Readonly facades
    /// refuse with a diagnostic but report success.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        match self {
            Object::Raw(target) => {
                let key = target.kind().normalize(&key);
                target.set_own(key, value)
            }
            Object::Facade(facade) => facade.set(key, value),
        }
    }

    /// Remove a property, map entry or set member. Sequence elements become
    /// holes.
    pub fn delete(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        match self {
            Object::Raw(target) => {
                let key = target.kind().normalize(&key);
                target.delete_own(&key)
            }
            Object::Facade(facade) => facade.delete(key),
        }
    }

    /// Existence check, including the prototype chain.
    pub fn has(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        match self {
            Object::Raw(target) => {
                let key = target.kind().normalize(&key);
                target.has(&key)
            }
            Object::Facade(facade) => facade.has(key),
        }
    }

    /// Own keys in enumeration order (map keys, set members).
    pub fn keys(&self) -> Vec<Key> {
        match self {
            Object::Raw(target) => target.own_keys(),
            Object::Facade(facade) => facade.keys(),
        }
    }

    /// Values in enumeration order.
    pub fn values(&self) -> Vec<Value> {
        self.entries().into_iter().map(|(_, value)| value).collect()
    }

    /// Key/value pairs in enumeration order. Set members pair with
    /// themselves.
    pub fn entries(&self) -> Vec<(Key, Value)> {
        if self.kind().is_collection() {
            return match self {
                Object::Raw(target) => collection::raw_entries(target),
                Object::Facade(facade) => collection::entries(facade, &facade.target()),
            };
        }
        self.keys()
            .into_iter()
            .map(|key| {
                let value = self.get(key.clone());
                (key, value)
            })
            .collect()
    }

    /// Key count of a record, length of a sequence, or size of a collection.
    pub fn len(&self) -> usize {
        match self.kind() {
            TargetKind::Sequence => self.get(Key::length()).as_length().unwrap_or(0),
            TargetKind::Map | TargetKind::Set => match self {
                Object::Raw(target) => target.size(),
                Object::Facade(facade) => collection::size(facade, &facade.target()),
            },
            _ => self.keys().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a set member.
    pub fn add(&self, member: impl Into<Key>) -> bool {
        let member = member.into();
        match self {
            Object::Raw(target) => target.add_member(member),
            Object::Facade(facade) => {
                if facade.refuse(MutationKind::Add, Some(&member)) {
                    return true;
                }
                collection::add(&facade.target(), member)
            }
        }
    }

    /// Empty a map or set. Returns whether anything was removed.
    pub fn clear(&self) -> bool {
        match self {
            Object::Raw(target) => {
                let had_items = target.kind().is_collection() && target.size() > 0;
                target.clear();
                had_items
            }
            Object::Facade(facade) => {
                if facade.refuse(MutationKind::Clear, None) {
                    return true;
                }
                collection::clear(&facade.target())
            }
        }
    }
}

/// Wrap `value` in a facade of `mode`. Non-objects are returned unchanged
/// with a diagnostic.
pub(crate) fn observe(value: Value, mode: FacadeMode) -> Value {
    match value {
        Value::Object(object) => Value::Object(object.observe(mode)),
        other => {
            Runtime::warn(Diagnostic::InvalidTarget {
                value: other.to_string(),
            });
            other
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Raw(target) => f
                .debug_struct("Raw")
                .field("id", &target.id())
                .field("kind", &target.kind())
                .finish(),
            Object::Facade(facade) => f
                .debug_struct("Facade")
                .field("id", &facade.target().id())
                .field("kind", &facade.target().kind())
                .field("mode", &facade.mode())
                .finish(),
        }
    }
}

impl fmt::Debug for Facade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Object::Facade(self.clone()).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::subscriber_count;
    use crate::observe::{Ref, WellKnownSymbol};
    use crate::reactive::Effect;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let runs = Rc::new(Cell::new(0));
        (runs.clone(), runs)
    }

    #[test]
    fn facades_are_cached_per_target() {
        let raw = Object::new_record([("a", 1)]);
        let first = raw.to_reactive();
        let second = raw.to_reactive();
        assert!(first.ptr_eq(&second));
        assert!(first.to_reactive().ptr_eq(&first));
        assert!(!raw.to_readonly().ptr_eq(&first));
    }

    #[test]
    fn readonly_over_reactive_layers() {
        let raw = Object::new_record([("a", 1)]);
        let state = raw.to_reactive();
        let view = state.to_readonly();

        assert!(view.is_readonly());
        assert!(view.is_reactive());
        assert!(view.to_raw().ptr_eq(&raw));
        assert!(view.to_reactive().ptr_eq(&view));
        assert!(view.to_readonly().ptr_eq(&view));
    }

    #[test]
    fn skipped_and_opaque_targets_are_not_wrapped() {
        let skipped = Object::new_record([("a", 1)]);
        skipped.mark_skip();
        assert!(!skipped.to_reactive().is_proxy());

        let frozen = Object::new_record([("a", 1)]);
        frozen.prevent_extensions();
        assert!(!frozen.to_reactive().is_proxy());

        assert!(!Object::new_opaque("Date").to_reactive().is_proxy());
    }

    #[test]
    fn reads_track_and_writes_trigger() {
        let state = Object::new_record([("count", 0)]).to_reactive();
        let (runs, runs_clone) = counter();
        let _effect = Effect::new({
            let state = state.clone();
            move || {
                runs_clone.set(runs_clone.get() + 1);
                state.get("count");
            }
        });
        assert_eq!(subscriber_count(state.id(), &Key::from("count")), 1);

        state.set("count", 1);
        assert_eq!(runs.get(), 2);
        state.set("count", 1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn nan_write_over_nan_does_not_trigger() {
        let state = Object::new_record([("n", f64::NAN)]).to_reactive();
        let (runs, runs_clone) = counter();
        let _effect = Effect::new({
            let state = state.clone();
            move || {
                runs_clone.set(runs_clone.get() + 1);
                state.get("n");
            }
        });
        state.set("n", f64::NAN);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn well_known_symbols_are_not_tracked() {
        let state = Object::new_record([("a", 1)]).to_reactive();
        let _effect = Effect::new({
            let state = state.clone();
            move || {
                state.get(WellKnownSymbol::Iterator);
                state.has(WellKnownSymbol::Iterator);
                state.get("__proto__");
            }
        });
        assert!(!crate::graph::is_tracked(state.id()));
    }

    #[test]
    fn nested_objects_are_wrapped_lazily() {
        let inner = Object::new_record([("x", 1)]);
        let state = Object::new_record([("inner", inner.clone())]).to_reactive();

        let read = state.get("inner");
        let read = read.as_object().unwrap();
        assert!(read.is_reactive());
        assert!(read.to_raw().ptr_eq(&inner));
        assert!(read.ptr_eq(state.get("inner").as_object().unwrap()));

        let view = state.to_readonly();
        assert!(view.get("inner").as_object().unwrap().is_readonly());
    }

    #[test]
    fn shallow_facades_do_not_wrap() {
        let inner = Object::new_record([("x", 1)]);
        let state = Object::new_record([("inner", inner.clone())]).to_shallow_reactive();
        assert!(state.get("inner").as_object().unwrap().ptr_eq(&inner));
    }

    #[test]
    fn writes_store_raw_values() {
        let inner = Object::new_record([("x", 1)]);
        let state = Object::new_record::<&str, Value>([]).to_reactive();
        state.set("inner", inner.to_reactive());

        let stored = state.to_raw().get("inner");
        assert!(stored.as_object().unwrap().ptr_eq(&inner));
    }

    #[test]
    fn refs_unwrap_and_assign_through_on_records() {
        let count = Ref::new(1);
        let state = Object::new_record([("count", count.clone())]).to_reactive();

        assert_eq!(state.get("count"), Value::from(1));
        state.set("count", 5);
        assert_eq!(count.get(), Value::from(5));
        assert!(state.to_raw().get("count").as_ref_cell().is_some());
    }

    #[test]
    fn refs_in_sequences_are_kept() {
        let count = Ref::new(1);
        let list = Object::new_sequence([Value::from(count.clone())]).to_reactive();

        assert!(list.get(0).as_ref_cell().is_some_and(|cell| cell.ptr_eq(&count)));
        list.set(0, 7);
        assert_eq!(list.get(0), Value::from(7));
        assert_eq!(count.get(), Value::from(1));
    }

    #[test]
    fn readonly_refuses_writes_with_diagnostic() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        Runtime::configure(crate::RuntimeConfig::default().with_dev_mode(true));
        Runtime::set_warn_handler(move |diag| sink.borrow_mut().push(diag.clone()));

        let view = Object::new_record([("a", 1)]).to_readonly();
        assert!(view.set("a", 2));
        assert!(view.delete("a"));
        assert_eq!(view.get("a"), Value::from(1));
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(
            seen.borrow()[0],
            Diagnostic::ReadonlyMutation { op: MutationKind::Set, key: Some(Key::from("a")) }
        );
        Runtime::clear_handlers();
    }

    #[test]
    fn readonly_never_tracks() {
        let view = Object::new_record([("a", 1)]).to_readonly();
        let _effect = Effect::new({
            let view = view.clone();
            move || {
                view.get("a");
                view.has("a");
                view.keys();
            }
        });
        assert!(!crate::graph::is_tracked(view.id()));
    }

    #[test]
    fn readonly_over_reactive_tracks_through() {
        let state = Object::new_record([("a", 1)]).to_reactive();
        let view = state.to_readonly();
        let (runs, runs_clone) = counter();
        let _effect = Effect::new({
            let view = view.clone();
            move || {
                runs_clone.set(runs_clone.get() + 1);
                view.get("a");
            }
        });
        state.set("a", 2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn enumeration_reacts_to_add_and_delete() {
        let state = Object::new_record([("a", 1)]).to_reactive();
        let (runs, runs_clone) = counter();
        let _effect = Effect::new({
            let state = state.clone();
            move || {
                runs_clone.set(runs_clone.get() + 1);
                state.keys();
            }
        });

        state.set("a", 2);
        assert_eq!(runs.get(), 1);
        state.set("b", 1);
        assert_eq!(runs.get(), 2);
        state.delete("b");
        assert_eq!(runs.get(), 3);
        // deleting a missing key changes nothing
        state.delete("missing");
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn has_tracks_existence() {
        let state = Object::new_record::<&str, Value>([]).to_reactive();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _effect = Effect::new({
            let state = state.clone();
            let seen = seen.clone();
            move || seen.borrow_mut().push(state.has("a"))
        });
        state.set("a", 1);
        assert_eq!(seen.borrow().as_slice(), &[false, true]);
    }

    #[test]
    fn writes_on_a_child_do_not_trigger_the_prototype() {
        let parent = Object::new_record([("shared", 1)]).to_reactive();
        let child = Object::new_record::<&str, Value>([]).to_reactive();
        child.set_prototype(Some(parent.clone()));

        let (parent_runs, parent_runs_clone) = counter();
        let _parent_effect = Effect::new({
            let parent = parent.clone();
            move || {
                parent_runs_clone.set(parent_runs_clone.get() + 1);
                parent.get("shared");
            }
        });
        let (child_runs, child_runs_clone) = counter();
        let _child_effect = Effect::new({
            let child = child.clone();
            move || {
                child_runs_clone.set(child_runs_clone.get() + 1);
                child.get("shared");
            }
        });

        assert_eq!(child.get("shared"), Value::from(1));
        child.set("shared", 2);
        assert_eq!(parent_runs.get(), 1);
        assert_eq!(child_runs.get(), 2);
        assert_eq!(parent.get("shared"), Value::from(1));
        assert_eq!(child.get("shared"), Value::from(2));
    }

    #[test]
    fn non_objects_produce_a_diagnostic() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        Runtime::configure(crate::RuntimeConfig::default().with_dev_mode(true));
        Runtime::set_warn_handler(move |diag| sink.borrow_mut().push(diag.clone()));

        let out = observe(Value::from(1), FacadeMode::Reactive);
        assert_eq!(out, Value::from(1));
        assert_eq!(
            seen.borrow().as_slice(),
            &[Diagnostic::InvalidTarget { value: "1".to_string() }]
        );
        Runtime::clear_handlers();
    }
}
