//! The command-source abstraction.
//!
//! A source is "who or where a command executes as": it carries whatever
//! position, permission, and world data the host's leaf commands need, none
//! of which the engine inspects. The engine only requires the error sink and
//! the per-source result callback defined here.

use crate::callback::ResultCallback;
use crate::error::CommandError;

/// Host-supplied execution source.
///
/// A chain resolution starts from exactly one source and may fork into many;
/// sources are therefore cheap-to-clone value objects. The engine clones a
/// source once per queued continuation bound to it.
pub trait CommandSource: Clone + 'static {
    /// Report an error to this source's error sink.
    ///
    /// `forked` is true when the failure happened inside an already-forked
    /// resolution, where siblings keep running; hosts typically suppress
    /// chat feedback for forked failures and only record statistics.
    fn handle_error(&self, error: CommandError, forked: bool);

    /// The result sink attached to this source.
    fn callback(&self) -> ResultCallback;

    /// A copy of this source with its result sink replaced.
    ///
    /// Used by the engine to chain a returning resolution's result into the
    /// owning frame's callback.
    fn with_callback(&self, callback: ResultCallback) -> Self;
}
