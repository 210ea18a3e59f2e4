//! Error and diagnostic types.
//!
//! Two channels exist:
//!
//! - [`ReactiveError`] is returned (or reported through the runtime's error
//!   handler) when something actually failed: a job panicked, a flush chain
//!   ran away, a readonly computed was written, or a configuration could not
//!   be parsed.
//! - [`Diagnostic`] is a non-fatal report emitted only in dev mode. The
//!   operation that produced it degrades gracefully (returns its input, or
//!   refuses a write) and execution continues.

use std::fmt;

use thiserror::Error;

use crate::observe::Key;

/// Errors produced by the reactive runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A job or callback re-ran more often than the configured limit within a
    /// single flush chain.
    #[error(
        "Maximum recursive updates exceeded (limit {limit}, job {job:?}). \
         This means a reactive effect is mutating its own dependencies and \
         thus recursively triggering itself."
    )]
    RecursionLimitExceeded {
        /// Ordering id of the offending job, if it had one.
        job: Option<u64>,
        /// The limit that was exceeded.
        limit: u32,
    },

    /// A scheduled job panicked. Sibling jobs in the same flush still ran.
    #[error("scheduled job {job:?} panicked: {message}")]
    JobPanicked {
        /// Ordering id of the job, if it had one.
        job: Option<u64>,
        /// The panic payload, rendered as text.
        message: String,
    },

    /// A computed value without a setter was written.
    #[error("write operation failed: computed value is readonly")]
    ReadonlyComputed,

    /// Runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for ReactiveError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReactiveError>;

/// Kind of mutation that was refused by a readonly facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Set,
    Delete,
    Add,
    Clear,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationKind::Set => "Set",
            MutationKind::Delete => "Delete",
            MutationKind::Add => "Add",
            MutationKind::Clear => "Clear",
        };
        f.write_str(name)
    }
}

/// Non-fatal development diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A value that cannot be observed was passed to a wrapping function.
    InvalidTarget {
        /// Short description of the rejected value.
        value: String,
    },

    /// A readonly facade refused a mutation.
    ReadonlyMutation {
        op: MutationKind,
        key: Option<Key>,
    },

    /// A computed value without a setter was written.
    ReadonlyComputed,

    /// The flush mode asks for spawned flushes but the thread has no tokio
    /// `LocalSet`.
    NoLocalSet,

    /// A watch source that is neither a ref, a reactive object, a computed
    /// nor a getter.
    InvalidWatchSource {
        /// Short description of the rejected source.
        source: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InvalidTarget { value } => {
                write!(f, "value cannot be made reactive: {value}")
            }
            Diagnostic::ReadonlyMutation { op, key: Some(key) } => {
                write!(f, "{op} operation on key \"{key}\" failed: target is readonly.")
            }
            Diagnostic::ReadonlyMutation { op, key: None } => {
                write!(f, "{op} operation failed: target is readonly.")
            }
            Diagnostic::ReadonlyComputed => {
                f.write_str("Write operation failed: computed value is readonly")
            }
            Diagnostic::NoLocalSet => f.write_str(
                "No tokio LocalSet is running on this thread: the pending flush \
                 runs on the next flush_pending() or next_tick() instead.",
            ),
            Diagnostic::InvalidWatchSource { source } => write!(
                f,
                "Invalid watch source: {source}. A watch source can only be a getter, \
                 a ref, a computed, a reactive object, or a list of these."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recursion_error_mentions_limit() {
        let err = ReactiveError::RecursionLimitExceeded { job: Some(3), limit: 100 };
        let text = err.to_string();
        assert!(text.contains("Maximum recursive updates exceeded"));
        assert!(text.contains("100"));
    }

    #[test]
    fn readonly_mutation_renders_key() {
        let diag = Diagnostic::ReadonlyMutation {
            op: MutationKind::Set,
            key: Some(Key::from("count")),
        };
        assert_eq!(
            diag.to_string(),
            "Set operation on key \"count\" failed: target is readonly."
        );
    }

    #[test]
    fn json_errors_become_invalid_config() {
        let err: ReactiveError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ReactiveError::InvalidConfig(_)));
    }
}
