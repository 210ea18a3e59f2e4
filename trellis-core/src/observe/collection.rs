//! Map and set operations through a facade.
//!
//! Collections are keyed by [`Key`]: map keys and set members are stored as
//! keys, so a facade never needs to strip a wrapper off them. Values stored
//! in maps are stripped to raw on write and wrapped again on read, but refs
//! are never unwrapped.

use super::facade::Facade;
use super::key::Key;
use super::target::{Target, TargetKind};
use super::value::{has_changed, Value};
use crate::graph::{track, trigger, TrackOp, TriggerOp};

fn tracks(facade: &Facade) -> bool {
    !facade.mode().is_readonly()
}

pub(crate) fn get(facade: &Facade, target: &Target, key: Key) -> Value {
    let value = facade.source().get(key.clone());
    if tracks(facade) {
        track(target.id(), TrackOp::Get, key);
    }
    facade.wrap_child(value)
}

pub(crate) fn has(facade: &Facade, target: &Target, key: Key) -> bool {
    let result = facade.source().has(key.clone());
    if tracks(facade) {
        track(target.id(), TrackOp::Has, key);
    }
    result
}

pub(crate) fn size(facade: &Facade, target: &Target) -> usize {
    if tracks(facade) {
        track(target.id(), TrackOp::Iterate, Key::Iterate);
    }
    facade.source().len()
}

/// Map keys only depend on key-set changes; set members are their values.
pub(crate) fn keys(facade: &Facade, target: &Target) -> Vec<Key> {
    if tracks(facade) {
        let sentinel = match target.kind() {
            TargetKind::Map => Key::MapKeyIterate,
            _ => Key::Iterate,
        };
        track(target.id(), TrackOp::Iterate, sentinel);
    }
    facade.source().keys()
}

pub(crate) fn entries(facade: &Facade, target: &Target) -> Vec<(Key, Value)> {
    if tracks(facade) {
        track(target.id(), TrackOp::Iterate, Key::Iterate);
    }
    facade
        .source()
        .entries()
        .into_iter()
        .map(|(key, value)| (key, facade.wrap_child(value)))
        .collect()
}

pub(crate) fn raw_entries(target: &Target) -> Vec<(Key, Value)> {
    target
        .own_keys()
        .into_iter()
        .map(|key| {
            let value = match target.kind() {
                TargetKind::Set => Value::from(key.clone()),
                _ => target.get_own(&key).unwrap_or_default(),
            };
            (key, value)
        })
        .collect()
}

pub(crate) fn set(target: &Target, key: Key, value: Value) -> bool {
    let value = value.to_raw();
    let had_key = target.has_own(&key);
    let old_value = target.get_own(&key).unwrap_or_default();
    if !target.set_own(key.clone(), value.clone()) {
        return false;
    }

    if !had_key {
        trigger(target.id(), target.kind(), TriggerOp::Add, Some(&key), Some(&value), None);
    } else if has_changed(&value, &old_value) {
        trigger(
            target.id(),
            target.kind(),
            TriggerOp::Set,
            Some(&key),
            Some(&value),
            Some(&old_value),
        );
    }
    true
}

/// Returns whether the member was new.
pub(crate) fn add(target: &Target, member: Key) -> bool {
    if !target.add_member(member.clone()) {
        return false;
    }
    let value = Value::from(member.clone());
    trigger(target.id(), target.kind(), TriggerOp::Add, Some(&member), Some(&value), None);
    true
}

/// Returns whether the key was present.
pub(crate) fn delete(target: &Target, key: Key) -> bool {
    let had_key = target.has_own(&key);
    let old_value = match target.kind() {
        TargetKind::Set => Value::from(key.clone()),
        _ => target.get_own(&key).unwrap_or_default(),
    };
    target.delete_own(&key);
    if had_key {
        trigger(target.id(), target.kind(), TriggerOp::Delete, Some(&key), None, Some(&old_value));
    }
    had_key
}

/// Returns whether anything was removed.
pub(crate) fn clear(target: &Target) -> bool {
    let had_items = target.size() > 0;
    target.clear();
    if had_items {
        trigger(target.id(), target.kind(), TriggerOp::Clear, None, None, None);
    }
    had_items
}
