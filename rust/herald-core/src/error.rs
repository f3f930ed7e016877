//! Command error taxonomy.
//!
//! Every failure the engine can surface to a command source is one of these
//! variants. Domain failures come from redirect and leaf closures supplied by
//! the host; the two limit variants are raised by the engine itself when a
//! resolution exceeds its resource ceilings.

use thiserror::Error;

/// An error reported to a command source's error sink.
///
/// Errors never unwind the engine's drain loop — they are delivered through
/// [`CommandSource::handle_error`](crate::source::CommandSource::handle_error)
/// and execution of unrelated work continues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// A redirect or leaf command failed for domain reasons (bad target,
    /// unmet predicate, etc.). The message is host-supplied and shown to the
    /// originating source.
    #[error("{0}")]
    Failed(String),

    /// A single chain resolution produced enough sources to reach the fork
    /// ceiling. Carries the configured limit. Reported exactly once, to the
    /// original source of the resolution.
    #[error("maximum number of contexts ({0}) reached")]
    ForkLimit(usize),

    /// The per-invocation command budget was exhausted. Carries the
    /// configured limit. Reported exactly once per execution context.
    #[error("maximum number of commands ({0}) reached")]
    CommandLimit(usize),
}

impl CommandError {
    /// Convenience constructor for host-side domain failures.
    pub fn failed(message: impl Into<String>) -> Self {
        CommandError::Failed(message.into())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
