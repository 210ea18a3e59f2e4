//! Refs: single observable cells.
//!
//! A [`Ref`] has its own graph identity and one key, `value`. Reading it
//! tracks that key; writing a different value triggers it. A ref holding a
//! record or sequence stores its reactive facade, so nested reads through the
//! ref are tracked too.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::facade::{observe, FacadeMode};
use super::key::Key;
use super::target::TargetKind;
use super::value::{has_changed, Value};
use crate::graph::{release, track, trigger, TargetId, TrackOp, TriggerOp};

const VALUE_KEY: &str = "value";

struct RefInner {
    id: TargetId,
    /// Raw form of the last written value, used for change detection.
    raw: RefCell<Value>,
    value: RefCell<Value>,
    shallow: bool,
}

impl Drop for RefInner {
    fn drop(&mut self) {
        release(self.id);
    }
}

/// An observable mutable cell.
#[derive(Clone)]
pub struct Ref(Rc<RefInner>);

impl Ref {
    /// Create a ref. Passing a ref returns that same ref.
    pub fn new(value: impl Into<Value>) -> Self {
        Self::create(value.into(), false)
    }

    /// Create a ref that stores values as given, without converting objects.
    pub fn shallow(value: impl Into<Value>) -> Self {
        Self::create(value.into(), true)
    }

    fn create(value: Value, shallow: bool) -> Self {
        if let Value::Ref(existing) = value {
            return existing;
        }
        let (raw, value) = if shallow {
            (value.clone(), value)
        } else {
            (value.to_raw(), convert(value))
        };
        Self(Rc::new(RefInner {
            id: TargetId::new(),
            raw: RefCell::new(raw),
            value: RefCell::new(value),
            shallow,
        }))
    }

    pub fn id(&self) -> TargetId {
        self.0.id
    }

    pub fn is_shallow(&self) -> bool {
        self.0.shallow
    }

    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Read the current value, subscribing the running effect.
    pub fn get(&self) -> Value {
        track(self.0.id, TrackOp::Get, Key::from(VALUE_KEY));
        self.0.value.borrow().clone()
    }

    /// Read the current value without subscribing.
    pub fn peek(&self) -> Value {
        self.0.value.borrow().clone()
    }

    /// Write a value. Subscribers re-run only when the raw value changed.
    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into();
        let raw = if self.0.shallow { value.clone() } else { value.to_raw() };
        if !has_changed(&raw, &self.0.raw.borrow()) {
            return;
        }

        let stored = if self.0.shallow { value } else { convert(value) };
        let old_value = self.0.value.replace(stored.clone());
        drop(self.0.raw.replace(raw));
        trigger(
            self.0.id,
            TargetKind::Record,
            TriggerOp::Set,
            Some(&Key::from(VALUE_KEY)),
            Some(&stored),
            Some(&old_value),
        );
    }

    /// Notify subscribers unconditionally, for shallow refs whose contents
    /// were mutated in place.
    pub fn trigger_ref(&self) {
        let value = self.peek();
        trigger(
            self.0.id,
            TargetKind::Record,
            TriggerOp::Set,
            Some(&Key::from(VALUE_KEY)),
            Some(&value),
            None,
        );
    }
}

fn convert(value: Value) -> Value {
    if value.is_object() {
        observe(value, FacadeMode::Reactive)
    } else {
        value
    }
}

pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_))
}

/// The inner value of a ref (tracked), or the value itself.
pub fn unref(value: &Value) -> Value {
    match value {
        Value::Ref(cell) => cell.get(),
        other => other.clone(),
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("id", &self.0.id)
            .field("value", &*self.0.value.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::Object;
    use crate::reactive::Effect;
    use std::cell::Cell;

    #[test]
    fn ref_of_ref_is_identity() {
        let cell = Ref::new(1);
        let again = Ref::new(cell.clone());
        assert!(cell.ptr_eq(&again));
    }

    #[test]
    fn set_triggers_only_on_change() {
        let cell = Ref::new(1);
        let runs = Rc::new(Cell::new(0));
        let _effect = Effect::new({
            let cell = cell.clone();
            let runs = runs.clone();
            move || {
                runs.set(runs.get() + 1);
                cell.get();
            }
        });

        cell.set(1);
        assert_eq!(runs.get(), 1);
        cell.set(2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn objects_become_reactive() {
        let raw = Object::new_record([("n", 1)]);
        let cell = Ref::new(raw.clone());
        let stored = cell.peek();
        assert!(stored.as_object().is_some_and(Object::is_reactive));

        // writing the facade of the same target is not a change
        let runs = Rc::new(Cell::new(0));
        let _effect = Effect::new({
            let cell = cell.clone();
            let runs = runs.clone();
            move || {
                runs.set(runs.get() + 1);
                cell.get();
            }
        });
        cell.set(raw.to_reactive());
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn nested_reads_through_a_ref_are_tracked() {
        let cell = Ref::new(Object::new_record([("n", 1)]));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _effect = Effect::new({
            let cell = cell.clone();
            let seen = seen.clone();
            move || {
                let state = cell.get();
                if let Some(state) = state.as_object() {
                    seen.borrow_mut().push(state.get("n"));
                }
            }
        });
        if let Some(state) = cell.peek().as_object() {
            state.set("n", 2);
        }
        assert_eq!(seen.borrow().as_slice(), &[Value::from(1), Value::from(2)]);
    }

    #[test]
    fn shallow_ref_needs_manual_trigger() {
        let raw = Object::new_record([("n", 1)]);
        let cell = Ref::shallow(raw.clone());
        assert!(cell.peek().as_object().is_some_and(|o| o.ptr_eq(&raw)));

        let runs = Rc::new(Cell::new(0));
        let _effect = Effect::new({
            let cell = cell.clone();
            let runs = runs.clone();
            move || {
                runs.set(runs.get() + 1);
                cell.get();
            }
        });
        raw.set("n", 2);
        assert_eq!(runs.get(), 1);
        cell.trigger_ref();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn unref_and_is_ref() {
        let cell = Value::from(Ref::new(3));
        assert!(is_ref(&cell));
        assert_eq!(unref(&cell), Value::from(3));
        assert_eq!(unref(&Value::from(4)), Value::from(4));
        assert!(!is_ref(&Value::from(4)));
    }
}
