//! Track / Trigger
//!
//! `track` records that the running effect read `(target, key)`; `trigger`
//! collects every effect subscribed to the keys a write affects and hands
//! each one to its scheduling strategy.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::dep::Dep;
use super::node::{Node, TargetId};
use super::ops::{DebuggerEvent, Operation, TrackOp, TriggerOp};
use crate::observe::{Key, TargetKind, Value};
use crate::reactive::{Effect, EffectId, ReactiveContext, Runtime};

/// The global `target → key → dep` registry.
#[derive(Debug, Default)]
pub(crate) struct Graph {
    nodes: HashMap<TargetId, Node>,
}

impl Graph {
    fn dep_for(&mut self, target: TargetId, key: Key) -> Dep {
        self.nodes.entry(target).or_default().dep_for(target, key)
    }
}

/// Record a read of `(target, key)` by the running effect.
///
/// No-op when tracking is paused, when no effect is running, or when the
/// running effect has been stopped.
pub fn track(target: TargetId, op: TrackOp, key: Key) {
    let Some(effect) = ReactiveContext::tracking_effect() else {
        return;
    };
    if !effect.is_active() {
        return;
    }

    let dep = Runtime::with(|rt| rt.graph.borrow_mut().dep_for(target, key));
    if !dep.insert(&effect) {
        return;
    }
    effect.add_dep(dep.clone());

    tracing::trace!(target_id = target.raw(), key = %dep.key(), effect = effect.id().raw(), ?op, "track");

    if let Some(hook) = effect.options().on_track.clone() {
        hook(&DebuggerEvent {
            effect: effect.clone(),
            target,
            key: Some(dep.key().clone()),
            op: Operation::Track(op),
            new_value: None,
            old_value: None,
        });
    }
}

/// Notify the effects affected by a write.
///
/// `kind` selects the collection rules: sequences route index additions to
/// `length` subscribers and `length` writes to truncated indices, maps route
/// every write to their iteration sentinels.
pub fn trigger(
    target: TargetId,
    kind: TargetKind,
    op: TriggerOp,
    key: Option<&Key>,
    new_value: Option<&Value>,
    old_value: Option<&Value>,
) {
    let active = ReactiveContext::active_effect().map(|effect| effect.id());
    let Some(effects) = Runtime::with(|rt| {
        let graph = rt.graph.borrow();
        let node = graph.nodes.get(&target)?;
        Some(collect_effects(node, kind, op, key, new_value, active))
    }) else {
        // never tracked
        return;
    };

    tracing::trace!(target_id = target.raw(), ?op, ?key, effects = effects.len(), "trigger");

    for effect in effects.values() {
        if let Some(hook) = effect.options().on_trigger.clone() {
            hook(&DebuggerEvent {
                effect: effect.clone(),
                target,
                key: key.cloned(),
                op: Operation::Trigger(op),
                new_value: new_value.cloned(),
                old_value: old_value.cloned(),
            });
        }
        effect.schedule();
    }
}

fn collect_effects(
    node: &Node,
    kind: TargetKind,
    op: TriggerOp,
    key: Option<&Key>,
    new_value: Option<&Value>,
    active: Option<EffectId>,
) -> IndexMap<EffectId, Effect> {
    let mut effects = IndexMap::new();
    let mut add = |dep: Option<&Dep>| {
        if let Some(dep) = dep {
            dep.for_each(|effect| {
                if Some(effect.id()) != active || effect.options().allow_recurse {
                    effects.insert(effect.id(), effect.clone());
                }
            });
        }
    };

    if op == TriggerOp::Clear {
        for (_, dep) in node.iter() {
            add(Some(dep));
        }
    } else if kind == TargetKind::Sequence && key.is_some_and(Key::is_length) {
        let new_len = new_value.and_then(Value::as_length).unwrap_or(0);
        for (dep_key, dep) in node.iter() {
            if dep_key.is_length() || dep_key.as_index().is_some_and(|index| index >= new_len) {
                add(Some(dep));
            }
        }
    } else {
        if let Some(key) = key {
            add(node.get(key));
        }

        match op {
            TriggerOp::Add => {
                if kind != TargetKind::Sequence {
                    add(node.get(&Key::Iterate));
                    if kind == TargetKind::Map {
                        add(node.get(&Key::MapKeyIterate));
                    }
                } else if key.is_some_and(Key::is_integer_key) {
                    // new index added to a sequence -> length changes
                    add(node.get(&Key::length()));
                }
            }
            TriggerOp::Delete => {
                if kind != TargetKind::Sequence {
                    add(node.get(&Key::Iterate));
                    if kind == TargetKind::Map {
                        add(node.get(&Key::MapKeyIterate));
                    }
                }
            }
            TriggerOp::Set => {
                if kind == TargetKind::Map {
                    add(node.get(&Key::Iterate));
                }
            }
            TriggerOp::Clear => {}
        }
    }

    effects
}

/// Drop the graph node of a target that no longer exists.
///
/// The node's deps are emptied so the effects they held are released even
/// though each effect still holds a back-reference to the (now empty) dep.
pub(crate) fn release(target: TargetId) {
    let node = Runtime::try_with(|rt| {
        rt.graph
            .try_borrow_mut()
            .ok()
            .and_then(|mut graph| graph.nodes.remove(&target))
    })
    .flatten();

    if let Some(node) = node {
        for dep in node.into_deps() {
            let drained = dep.drain();
            drop(drained);
        }
    }
}

/// Number of effects currently subscribed to `(target, key)`.
pub fn subscriber_count(target: TargetId, key: &Key) -> usize {
    Runtime::with(|rt| {
        rt.graph
            .borrow()
            .nodes
            .get(&target)
            .and_then(|node| node.get(key))
            .map_or(0, Dep::len)
    })
}

/// Whether `target` has a graph node (has ever been read inside an effect
/// and not yet released).
pub fn is_tracked(target: TargetId) -> bool {
    Runtime::with(|rt| rt.graph.borrow().nodes.contains_key(&target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::graph::DebuggerEvent;
    use crate::observe::Object;
    use crate::reactive::EffectOptions;

    fn counting_effect(target: TargetId, key: Key, runs: Rc<Cell<u32>>) -> Effect {
        Effect::new(move || {
            runs.set(runs.get() + 1);
            track(target, TrackOp::Get, key.clone());
        })
    }

    #[test]
    fn track_outside_effect_is_noop() {
        let target = TargetId::new();
        track(target, TrackOp::Get, Key::from("a"));
        assert!(!is_tracked(target));
    }

    #[test]
    fn trigger_runs_subscribers_once() {
        let target = TargetId::new();
        let runs = Rc::new(Cell::new(0));
        let effect = counting_effect(target, Key::from("a"), runs.clone());

        assert_eq!(runs.get(), 1);
        assert_eq!(subscriber_count(target, &Key::from("a")), 1);
        assert_eq!(effect.deps().len(), 1);

        trigger(target, TargetKind::Record, TriggerOp::Set, Some(&Key::from("a")), None, None);
        assert_eq!(runs.get(), 2);
        // re-run re-subscribes exactly once
        assert_eq!(subscriber_count(target, &Key::from("a")), 1);
    }

    #[test]
    fn trigger_on_untracked_target_is_noop() {
        let target = TargetId::new();
        trigger(target, TargetKind::Record, TriggerOp::Add, Some(&Key::from("x")), None, None);
        assert!(!is_tracked(target));
    }

    #[test]
    fn add_reaches_iteration_subscribers() {
        let target = TargetId::new();
        let runs = Rc::new(Cell::new(0));
        let _effect = counting_effect(target, Key::Iterate, runs.clone());

        trigger(target, TargetKind::Record, TriggerOp::Set, Some(&Key::from("x")), None, None);
        assert_eq!(runs.get(), 1);

        trigger(target, TargetKind::Record, TriggerOp::Add, Some(&Key::from("x")), None, None);
        assert_eq!(runs.get(), 2);

        trigger(target, TargetKind::Record, TriggerOp::Delete, Some(&Key::from("x")), None, None);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn map_set_reaches_iteration_but_not_key_iteration() {
        let target = TargetId::new();
        let iterate_runs = Rc::new(Cell::new(0));
        let key_runs = Rc::new(Cell::new(0));
        let _values = counting_effect(target, Key::Iterate, iterate_runs.clone());
        let _keys = counting_effect(target, Key::MapKeyIterate, key_runs.clone());

        trigger(target, TargetKind::Map, TriggerOp::Set, Some(&Key::from("k")), None, None);
        assert_eq!(iterate_runs.get(), 2);
        assert_eq!(key_runs.get(), 1);

        trigger(target, TargetKind::Map, TriggerOp::Add, Some(&Key::from("j")), None, None);
        assert_eq!(iterate_runs.get(), 3);
        assert_eq!(key_runs.get(), 2);
    }

    #[test]
    fn sequence_index_add_reaches_length() {
        let target = TargetId::new();
        let runs = Rc::new(Cell::new(0));
        let _effect = counting_effect(target, Key::length(), runs.clone());

        trigger(target, TargetKind::Sequence, TriggerOp::Add, Some(&Key::Index(3)), None, None);
        assert_eq!(runs.get(), 2);

        // deleting from a sequence does not touch length
        trigger(target, TargetKind::Sequence, TriggerOp::Delete, Some(&Key::Index(3)), None, None);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn length_write_reaches_truncated_indices() {
        let target = TargetId::new();
        let low = Rc::new(Cell::new(0));
        let high = Rc::new(Cell::new(0));
        let _low = counting_effect(target, Key::Index(1), low.clone());
        let _high = counting_effect(target, Key::Index(4), high.clone());

        let new_len = Value::from(2);
        trigger(target, TargetKind::Sequence, TriggerOp::Set, Some(&Key::length()), Some(&new_len), None);
        assert_eq!(low.get(), 1);
        assert_eq!(high.get(), 2);
    }

    #[test]
    fn clear_reaches_every_key() {
        let target = TargetId::new();
        let a = Rc::new(Cell::new(0));
        let b = Rc::new(Cell::new(0));
        let _a = counting_effect(target, Key::from("a"), a.clone());
        let _b = counting_effect(target, Key::from("b"), b.clone());

        trigger(target, TargetKind::Map, TriggerOp::Clear, None, None, None);
        assert_eq!(a.get(), 2);
        assert_eq!(b.get(), 2);
    }

    #[test]
    fn running_effect_is_not_retriggered() {
        let target = TargetId::new();
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let _effect = Effect::new(move || {
            runs_clone.set(runs_clone.get() + 1);
            track(target, TrackOp::Get, Key::from("n"));
            trigger(target, TargetKind::Record, TriggerOp::Set, Some(&Key::from("n")), None, None);
        });
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn release_empties_deps() {
        let target = TargetId::new();
        let runs = Rc::new(Cell::new(0));
        let effect = counting_effect(target, Key::from("a"), runs.clone());
        assert!(is_tracked(target));

        release(target);
        assert!(!is_tracked(target));
        assert_eq!(subscriber_count(target, &Key::from("a")), 0);
        assert!(effect.is_active());
    }

    #[test]
    fn stopped_effect_is_never_subscribed() {
        let target = TargetId::new();
        let effect = Effect::with_options(
            move || {
                track(target, TrackOp::Get, Key::from("a"));
            },
            EffectOptions::default().lazy(true),
        );
        effect.stop();
        effect.run();
        assert_eq!(subscriber_count(target, &Key::from("a")), 0);
    }

    type Logged = (Operation, TargetId, Option<Key>, Option<Value>, Option<Value>);

    fn recorder(log: &Rc<RefCell<Vec<Logged>>>) -> impl Fn(&DebuggerEvent) + 'static {
        let log = log.clone();
        move |event: &DebuggerEvent| {
            log.borrow_mut().push((
                event.op,
                event.target,
                event.key.clone(),
                event.new_value.clone(),
                event.old_value.clone(),
            ))
        }
    }

    #[test]
    fn debugger_events_carry_keys_and_values() {
        let state = Object::new_record([("a", 1)]).to_reactive();
        let id = state.id();
        let tracked = Rc::new(RefCell::new(Vec::new()));
        let triggered = Rc::new(RefCell::new(Vec::new()));
        let _effect = Effect::with_options(
            {
                let state = state.clone();
                move || {
                    state.get("a");
                    state.has("b");
                    state.keys();
                }
            },
            EffectOptions::default()
                .on_track(recorder(&tracked))
                .on_trigger(recorder(&triggered)),
        );

        assert_eq!(
            *tracked.borrow(),
            vec![
                (Operation::Track(TrackOp::Get), id, Some(Key::from("a")), None, None),
                (Operation::Track(TrackOp::Has), id, Some(Key::from("b")), None, None),
                (Operation::Track(TrackOp::Iterate), id, Some(Key::Iterate), None, None),
            ]
        );

        state.set("a", 2);
        state.delete("a");
        state.set("b", 3);

        assert_eq!(
            *triggered.borrow(),
            vec![
                (
                    Operation::Trigger(TriggerOp::Set),
                    id,
                    Some(Key::from("a")),
                    Some(Value::from(2)),
                    Some(Value::from(1)),
                ),
                (
                    Operation::Trigger(TriggerOp::Delete),
                    id,
                    Some(Key::from("a")),
                    None,
                    Some(Value::from(2)),
                ),
                (
                    Operation::Trigger(TriggerOp::Add),
                    id,
                    Some(Key::from("b")),
                    Some(Value::from(3)),
                    None,
                ),
            ]
        );
    }
}
