//! Property keys.
//!
//! A [`Key`] addresses one slot of a target: a named property, a sequence
//! index, or a symbol. Two extra variants, [`Key::Iterate`] and
//! [`Key::MapKeyIterate`], are sentinels used only by the dependency graph
//! to represent "the set of keys" of a target; they are never stored.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Name of the length property of sequences.
pub const LENGTH: &str = "length";

/// Largest sequence length, `2^32 - 1`.
pub const MAX_LENGTH: usize = u32::MAX as usize;

/// Largest sequence index. Integer keys above it are plain names.
pub const MAX_INDEX: usize = MAX_LENGTH - 1;

/// Names that are never tracked when read through a facade.
const UNTRACKED_NAMES: [&str; 2] = ["__proto__", "__v_isRef"];

/// Built-in symbols. Reads and existence checks keyed by these are passed
/// through without tracking, since they are typically incidental lookups
/// made by generic code rather than real data dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownSymbol {
    AsyncIterator,
    HasInstance,
    IsConcatSpreadable,
    Iterator,
    Match,
    MatchAll,
    Replace,
    Search,
    Species,
    Split,
    ToPrimitive,
    ToStringTag,
    Unscopables,
}

impl WellKnownSymbol {
    pub fn name(&self) -> &'static str {
        match self {
            WellKnownSymbol::AsyncIterator => "Symbol.asyncIterator",
            WellKnownSymbol::HasInstance => "Symbol.hasInstance",
            WellKnownSymbol::IsConcatSpreadable => "Symbol.isConcatSpreadable",
            WellKnownSymbol::Iterator => "Symbol.iterator",
            WellKnownSymbol::Match => "Symbol.match",
            WellKnownSymbol::MatchAll => "Symbol.matchAll",
            WellKnownSymbol::Replace => "Symbol.replace",
            WellKnownSymbol::Search => "Symbol.search",
            WellKnownSymbol::Species => "Symbol.species",
            WellKnownSymbol::Split => "Symbol.split",
            WellKnownSymbol::ToPrimitive => "Symbol.toPrimitive",
            WellKnownSymbol::ToStringTag => "Symbol.toStringTag",
            WellKnownSymbol::Unscopables => "Symbol.unscopables",
        }
    }
}

/// A symbolic key: either built-in or unique.
///
/// Unique symbols compare by identity: two symbols created with the same
/// description are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    WellKnown(WellKnownSymbol),
    Unique { id: u64, description: Rc<str> },
}

impl Symbol {
    /// Create a new unique symbol.
    pub fn new(description: &str) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Symbol::Unique {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            description: Rc::from(description),
        }
    }

    pub fn is_well_known(&self) -> bool {
        matches!(self, Symbol::WellKnown(_))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::WellKnown(sym) => f.write_str(sym.name()),
            Symbol::Unique { description, .. } => write!(f, "Symbol({description})"),
        }
    }
}

/// A property key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A named property.
    Name(Rc<str>),
    /// An integer index. On records this is normalized to its decimal name.
    Index(usize),
    /// A symbol-keyed property.
    Symbol(Symbol),
    /// Sentinel: the enumeration of a target's keys (and map values).
    Iterate,
    /// Sentinel: the enumeration of a map's keys only.
    MapKeyIterate,
}

impl Key {
    /// The `length` key of sequences.
    pub fn length() -> Self {
        Key::Name(Rc::from(LENGTH))
    }

    pub fn is_length(&self) -> bool {
        matches!(self, Key::Name(name) if &**name == LENGTH)
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Key::Iterate | Key::MapKeyIterate)
    }

    /// The index this key addresses, if it is an integer key.
    ///
    /// Canonical decimal names (`"3"`, but not `"03"`) count as integer keys.
    /// Anything above [`MAX_INDEX`] does not.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index).filter(|index| *index <= MAX_INDEX),
            Key::Name(name) => parse_canonical_index(name),
            _ => None,
        }
    }

    pub fn is_integer_key(&self) -> bool {
        self.as_index().is_some()
    }

    /// Keys that a facade reads through without recording a dependency.
    pub(crate) fn is_untracked(&self) -> bool {
        match self {
            Key::Symbol(sym) => sym.is_well_known(),
            Key::Name(name) => UNTRACKED_NAMES.contains(&&**name),
            _ => false,
        }
    }

    /// Normalized form used by records and collections: indices become names.
    pub(crate) fn for_record(&self) -> Key {
        match self {
            Key::Index(index) => Key::Name(Rc::from(index.to_string())),
            other => other.clone(),
        }
    }

    /// Normalized form used by sequences: canonical integer names become indices.
    pub(crate) fn for_sequence(&self) -> Key {
        match (self.as_index(), self) {
            (Some(index), _) => Key::Index(index),
            (None, Key::Index(index)) => Key::Name(Rc::from(index.to_string())),
            (None, key) => key.clone(),
        }
    }
}

fn parse_canonical_index(name: &str) -> Option<usize> {
    if name.is_empty() || (name.len() > 1 && name.starts_with('0')) {
        return None;
    }
    if !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse::<usize>().ok().filter(|index| *index <= MAX_INDEX)
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Index(index) => write!(f, "{index}"),
            Key::Symbol(sym) => write!(f, "{sym}"),
            Key::Iterate => f.write_str("<iterate>"),
            Key::MapKeyIterate => f.write_str("<map key iterate>"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(Rc::from(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(Rc::from(name))
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<Symbol> for Key {
    fn from(sym: Symbol) -> Self {
        Key::Symbol(sym)
    }
}

impl From<WellKnownSymbol> for Key {
    fn from(sym: WellKnownSymbol) -> Self {
        Key::Symbol(Symbol::WellKnown(sym))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_indices() {
        assert_eq!(Key::from("3").as_index(), Some(3));
        assert_eq!(Key::from("0").as_index(), Some(0));
        assert_eq!(Key::from("03").as_index(), None);
        assert_eq!(Key::from("-1").as_index(), None);
        assert_eq!(Key::from("length").as_index(), None);
        assert_eq!(Key::Index(7).as_index(), Some(7));
        assert_eq!(Key::from("4294967294").as_index(), Some(MAX_INDEX));
        assert_eq!(Key::from("4294967295").as_index(), None);
        assert_eq!(Key::from("18446744073709551615").as_index(), None);
        assert_eq!(Key::Index(usize::MAX).as_index(), None);
    }

    #[test]
    fn normalization() {
        assert_eq!(Key::Index(2).for_record(), Key::from("2"));
        assert_eq!(Key::from("2").for_sequence(), Key::Index(2));
        assert_eq!(Key::from("name").for_sequence(), Key::from("name"));
        assert_eq!(
            Key::Index(usize::MAX).for_sequence(),
            Key::from(usize::MAX.to_string())
        );
    }

    #[test]
    fn unique_symbols_differ() {
        let a = Symbol::new("tag");
        let b = Symbol::new("tag");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn untracked_keys() {
        assert!(Key::from(WellKnownSymbol::Iterator).is_untracked());
        assert!(Key::from("__proto__").is_untracked());
        assert!(!Key::from(Symbol::new("mine")).is_untracked());
        assert!(!Key::from("count").is_untracked());
    }
}
