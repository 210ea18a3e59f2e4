//! Sequence methods.
//!
//! Searches scan the raw elements but subscribe to every index and to
//! `length`, so any change that could alter the answer re-runs the caller.
//! A needle that is a facade is retried as its raw target, so searching a
//! reactive sequence for a value read out of it finds it.
//!
//! Mutators follow the script engine algorithms step by step through the
//! ordinary get/set/delete operations, so each step triggers exactly what a
//! direct write would. They run with tracking paused: an effect that pushes
//! onto a sequence must not subscribe to that sequence's `length`, or it
//! would re-trigger itself.

use super::facade::Object;
use super::key::Key;
use super::target::TargetKind;
use super::value::{same_value_zero, Value};
use crate::graph::{track, TrackOp};
use crate::reactive::pause_tracking_scoped;

impl Object {
    fn is_sequence(&self) -> bool {
        self.kind() == TargetKind::Sequence
    }

    fn length(&self) -> usize {
        self.get(Key::length()).as_length().unwrap_or(0)
    }

    /// Raw length and present elements for a search, after subscribing to
    /// all of them.
    fn search_items(&self) -> (usize, Vec<(usize, Value)>) {
        let target = self.raw_target();
        let (len, items) = target.elements();
        if self.tracks() {
            track(target.id(), TrackOp::Get, Key::length());
            for index in 0..len {
                track(target.id(), TrackOp::Get, Key::Index(index));
            }
        }
        (len, items)
    }

    fn search(
        &self,
        needle: Value,
        find: impl Fn(usize, &[(usize, Value)], &Value) -> Option<usize>,
    ) -> Option<usize> {
        if !self.is_sequence() {
            return None;
        }
        let (len, items) = self.search_items();
        find(len, &items, &needle).or_else(|| {
            let raw = needle.to_raw();
            if needle.is_object() {
                find(len, &items, &raw)
            } else {
                None
            }
        })
    }

    /// Whether any element is `needle`, with `NaN` matching `NaN` and holes
    /// matching `undefined`.
    pub fn includes(&self, needle: impl Into<Value>) -> bool {
        self.search(needle.into(), |len, items, needle| {
            let found = items
                .iter()
                .find(|(_, item)| same_value_zero(item, needle))
                .map(|(index, _)| *index);
            found.or_else(|| first_hole(len, items).filter(|_| needle.is_undefined()))
        })
        .is_some()
    }

    /// First index holding `needle` under strict equality. Holes are skipped.
    pub fn index_of(&self, needle: impl Into<Value>) -> Option<usize> {
        self.search(needle.into(), |_, items, needle| {
            items
                .iter()
                .find(|(_, item)| item == needle)
                .map(|(index, _)| *index)
        })
    }

    /// Last index holding `needle` under strict equality. Holes are skipped.
    pub fn last_index_of(&self, needle: impl Into<Value>) -> Option<usize> {
        self.search(needle.into(), |_, items, needle| {
            items
                .iter()
                .rev()
                .find(|(_, item)| item == needle)
                .map(|(index, _)| *index)
        })
    }

    /// Set `length`, truncating or extending with holes.
    pub fn set_len(&self, len: usize) -> bool {
        self.set(Key::length(), len)
    }

    /// Copy element `from` to `to`, or delete `to` if `from` is a hole.
    fn move_element(&self, from: usize, to: usize) {
        if self.has(from) {
            let value = self.get(from);
            self.set(to, value);
        } else {
            self.delete(to);
        }
    }

    /// Append elements. Returns the new length.
    pub fn push<V: Into<Value>>(&self, items: impl IntoIterator<Item = V>) -> usize {
        if !self.is_sequence() {
            return 0;
        }
        let _paused = pause_tracking_scoped();
        let mut len = self.length();
        for item in items {
            self.set(len, item);
            len += 1;
        }
        self.set_len(len);
        len
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Value {
        if !self.is_sequence() {
            return Value::Undefined;
        }
        let _paused = pause_tracking_scoped();
        let len = self.length();
        if len == 0 {
            self.set_len(0);
            return Value::Undefined;
        }
        let last = self.get(len - 1);
        self.delete(len - 1);
        self.set_len(len - 1);
        last
    }

    /// Remove and return the first element, shifting the rest down.
    pub fn shift(&self) -> Value {
        if !self.is_sequence() {
            return Value::Undefined;
        }
        let _paused = pause_tracking_scoped();
        let len = self.length();
        if len == 0 {
            self.set_len(0);
            return Value::Undefined;
        }
        let first = self.get(0);
        for from in 1..len {
            self.move_element(from, from - 1);
        }
        self.delete(len - 1);
        self.set_len(len - 1);
        first
    }

    /// Prepend elements, shifting the rest up. Returns the new length.
    pub fn unshift<V: Into<Value>>(&self, items: impl IntoIterator<Item = V>) -> usize {
        if !self.is_sequence() {
            return 0;
        }
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        let _paused = pause_tracking_scoped();
        let len = self.length();
        let count = items.len();
        if count > 0 {
            for from in (0..len).rev() {
                self.move_element(from, from + count);
            }
            for (index, item) in items.into_iter().enumerate() {
                self.set(index, item);
            }
        }
        self.set_len(len + count);
        len + count
    }

    /// Remove `delete_count` elements starting at `start` and insert `items`
    /// in their place. A negative `start` counts from the end; a missing
    /// `delete_count` removes everything after `start`. Returns the removed
    /// elements.
    pub fn splice<V: Into<Value>>(
        &self,
        start: isize,
        delete_count: Option<usize>,
        items: impl IntoIterator<Item = V>,
    ) -> Vec<Value> {
        if !self.is_sequence() {
            return Vec::new();
        }
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        let _paused = pause_tracking_scoped();
        let len = self.length();

        let start = if start < 0 {
            len.saturating_sub(start.unsigned_abs())
        } else {
            start.unsigned_abs().min(len)
        };
        let delete_count = delete_count.map_or(len - start, |count| count.min(len - start));
        let item_count = items.len();

        let removed: Vec<Value> = (start..start + delete_count)
            .map(|index| self.get(index))
            .collect();

        if item_count < delete_count {
            for index in start..len - delete_count {
                self.move_element(index + delete_count, index + item_count);
            }
            for index in (len - delete_count + item_count..len).rev() {
                self.delete(index);
            }
        } else if item_count > delete_count {
            for index in (start..len - delete_count).rev() {
                self.move_element(index + delete_count, index + item_count);
            }
        }
        for (offset, item) in items.into_iter().enumerate() {
            self.set(start + offset, item);
        }
        self.set_len(len - delete_count + item_count);
        removed
    }
}

/// Lowest index below `len` with no element. `items` is in index order.
fn first_hole(len: usize, items: &[(usize, Value)]) -> Option<usize> {
    let hole = items
        .iter()
        .enumerate()
        .find(|(position, (index, _))| position != index)
        .map_or(items.len(), |(position, _)| position);
    (hole < len).then_some(hole)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::observe::{Key, Object, Value, MAX_INDEX, MAX_LENGTH};
    use crate::reactive::Effect;

    fn numbers(list: &Object) -> Vec<f64> {
        list.to_raw()
            .values()
            .iter()
            .map(|value| value.as_f64().unwrap_or(f64::NAN))
            .collect()
    }

    #[test]
    fn push_pop_shift_unshift() {
        let list = Object::new_sequence([1, 2, 3]).to_reactive();
        assert_eq!(list.push([4, 5]), 5);
        assert_eq!(list.pop(), Value::from(5));
        assert_eq!(list.shift(), Value::from(1));
        assert_eq!(list.unshift([0, 1]), 5);
        assert_eq!(numbers(&list), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn pop_and_shift_on_empty() {
        let list = Object::new_sequence::<Value>([]).to_reactive();
        assert_eq!(list.pop(), Value::Undefined);
        assert_eq!(list.shift(), Value::Undefined);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn splice_removes_and_inserts() {
        let list = Object::new_sequence([1, 2, 3, 4, 5]).to_reactive();

        let removed = list.splice(1, Some(2), [9]);
        assert_eq!(removed, vec![Value::from(2), Value::from(3)]);
        assert_eq!(numbers(&list), vec![1.0, 9.0, 4.0, 5.0]);

        let removed = list.splice(-1, None, [7, 8]);
        assert_eq!(removed, vec![Value::from(5)]);
        assert_eq!(numbers(&list), vec![1.0, 9.0, 4.0, 7.0, 8.0]);

        let removed = list.splice(0, Some(0), [0]);
        assert!(removed.is_empty());
        assert_eq!(numbers(&list), vec![0.0, 1.0, 9.0, 4.0, 7.0, 8.0]);
    }

    #[test]
    fn push_inside_an_effect_does_not_track_length() {
        let list = Object::new_sequence::<Value>([]).to_reactive();
        let runs = Rc::new(Cell::new(0));
        let _first = Effect::new({
            let list = list.clone();
            let runs = runs.clone();
            move || {
                runs.set(runs.get() + 1);
                list.push([1]);
            }
        });
        let _second = Effect::new({
            let list = list.clone();
            move || {
                list.push([2]);
            }
        });
        assert_eq!(runs.get(), 1);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn push_triggers_length_readers() {
        let list = Object::new_sequence([1]).to_reactive();
        let lengths = Rc::new(RefCell::new(Vec::new()));
        let _effect = Effect::new({
            let list = list.clone();
            let lengths = lengths.clone();
            move || lengths.borrow_mut().push(list.len())
        });
        list.push([2]);
        list.set_len(0);
        assert_eq!(lengths.borrow().as_slice(), &[1, 2, 0]);
    }

    #[test]
    fn searches_track_every_index() {
        let list = Object::new_sequence([1, 2, 3]).to_reactive();
        let found = Rc::new(RefCell::new(Vec::new()));
        let _effect = Effect::new({
            let list = list.clone();
            let found = found.clone();
            move || found.borrow_mut().push(list.includes(4))
        });
        list.set(2, 4);
        assert_eq!(found.borrow().as_slice(), &[false, true]);
    }

    #[test]
    fn searches_retry_with_raw_needle() {
        let item = Object::new_record([("id", 1)]);
        let list = Object::new_sequence([Value::from(item.clone())]).to_reactive();
        let wrapped = list.get(0);

        assert!(wrapped.as_object().is_some_and(Object::is_reactive));
        assert!(list.includes(wrapped.clone()));
        assert_eq!(list.index_of(wrapped), Some(0));
        assert_eq!(list.index_of(item), Some(0));
    }

    #[test]
    fn search_equality_rules() {
        let list = Object::new_sequence([Value::from(f64::NAN), Value::from(1), Value::from(1)]);
        assert!(list.includes(f64::NAN));
        assert_eq!(list.index_of(f64::NAN), None);
        assert_eq!(list.last_index_of(1), Some(2));

        list.set(5, 0);
        assert!(list.includes(Value::Undefined));
        assert_eq!(list.index_of(Value::Undefined), None);
    }

    #[test]
    fn out_of_range_indices_are_named_properties() {
        for list in [Object::new_sequence([1, 2]), Object::new_sequence([1, 2]).to_reactive()] {
            assert!(list.set(usize::MAX, 1));
            assert!(list.set("18446744073709551615", 2));
            assert!(list.set("4294967295", 3));
            assert_eq!(list.len(), 2);
            assert_eq!(list.get(usize::MAX), Value::from(2));
            assert_eq!(
                list.keys(),
                vec![
                    Key::Index(0),
                    Key::Index(1),
                    Key::from("18446744073709551615"),
                    Key::from("4294967295"),
                ]
            );
        }
    }

    #[test]
    fn large_lengths_stay_sparse() {
        let list = Object::new_sequence([1, 2]).to_reactive();
        let lengths = Rc::new(RefCell::new(Vec::new()));
        let _effect = Effect::new({
            let list = list.clone();
            let lengths = lengths.clone();
            move || lengths.borrow_mut().push(list.len())
        });

        assert!(list.set(MAX_INDEX, "last"));
        assert_eq!(list.len(), MAX_LENGTH);
        assert_eq!(list.get(MAX_INDEX), Value::from("last"));
        assert!(!list.set("length", MAX_LENGTH as f64 + 1.0));
        assert!(list.set_len(1));
        assert_eq!(list.keys(), vec![Key::Index(0)]);
        assert_eq!(*lengths.borrow(), vec![2, MAX_LENGTH, 1]);
    }
}
