//! Observation Layer
//!
//! Targets are plain mutable values: records, sequences, maps and sets.
//! Wrapping one in a facade makes reads through the facade record
//! dependencies and writes through it notify them.
//!
//! ```
//! use trellis_core::observe::Object;
//! use trellis_core::reactive::Effect;
//!
//! let state = Object::new_record([("count", 0)]).to_reactive();
//! let _effect = Effect::new({
//!     let state = state.clone();
//!     move || println!("count = {}", state.get("count"))
//! });
//! state.set("count", 1); // prints "count = 1"
//! ```
//!
//! Facades are created lazily: a nested object is wrapped when it is read,
//! not when its parent is wrapped. Each target has at most one live
//! reactive-class facade and one readonly-class facade.

mod collection;
mod facade;
mod key;
mod reference;
mod sequence;
mod target;
mod value;

pub use facade::{Facade, FacadeMode, Object};
pub use key::{Key, Symbol, WellKnownSymbol, LENGTH, MAX_INDEX, MAX_LENGTH};
pub use reference::{is_ref, unref, Ref};
pub use target::{Target, TargetKind};
pub use value::{has_changed, same_value_zero, Value};

/// Deeply reactive view of `value`. Non-objects are returned unchanged.
pub fn reactive(value: impl Into<Value>) -> Value {
    facade::observe(value.into(), FacadeMode::Reactive)
}

/// Reactive only at the top level.
pub fn shallow_reactive(value: impl Into<Value>) -> Value {
    facade::observe(value.into(), FacadeMode::ShallowReactive)
}

/// Deeply readonly view of `value`.
pub fn readonly(value: impl Into<Value>) -> Value {
    facade::observe(value.into(), FacadeMode::Readonly)
}

/// Readonly only at the top level.
pub fn shallow_readonly(value: impl Into<Value>) -> Value {
    facade::observe(value.into(), FacadeMode::ShallowReadonly)
}

pub fn is_reactive(value: &Value) -> bool {
    value.as_object().is_some_and(Object::is_reactive)
}

pub fn is_readonly(value: &Value) -> bool {
    value.as_object().is_some_and(Object::is_readonly)
}

pub fn is_proxy(value: &Value) -> bool {
    value.as_object().is_some_and(Object::is_proxy)
}

/// Strip every facade layer.
pub fn to_raw(value: &Value) -> Value {
    value.to_raw()
}

/// Opt an object out of observation. Other values are returned unchanged.
pub fn mark_skip(value: Value) -> Value {
    if let Some(object) = value.as_object() {
        object.mark_skip();
    }
    value
}
