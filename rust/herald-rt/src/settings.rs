//! Engine settings and the one-shot submission entry points.
//!
//! Hosts that want per-run observability (a profiler or trace sink) build an
//! [`ExecutionContext`] themselves; these helpers cover the common case of
//! "run this to completion with the configured ceilings".

use std::rc::Rc;

use herald_core::{CommandSource, ResultCallback};
use serde::{Deserialize, Serialize};

use crate::chain::ResolvedChain;
use crate::context::ExecutionContext;
use crate::function::FunctionBody;

/// Default per-invocation command budget.
pub const DEFAULT_COMMAND_LIMIT: usize = 65_536;

/// Default fork ceiling per chain resolution.
pub const DEFAULT_FORK_LIMIT: usize = 65_536;

/// Resource ceilings for one execution context.
///
/// Serializable so hosts can load them from server configuration alongside
/// their other game rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Cost units available to one invocation. Consumed once per redirect
    /// stage and once per function call.
    pub command_limit: usize,
    /// Maximum source fan-out one chain resolution may accumulate.
    pub fork_limit: usize,
}

impl EngineSettings {
    pub fn new(command_limit: usize, fork_limit: usize) -> Self {
        Self {
            command_limit,
            fork_limit,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            command_limit: DEFAULT_COMMAND_LIMIT,
            fork_limit: DEFAULT_FORK_LIMIT,
        }
    }
}

/// Run one command chain to completion.
///
/// Builds a fresh context, queues the chain at depth 0, and drains the
/// queue. Results surface only through the source's sinks and `callback`.
pub fn execute_command<T: CommandSource>(
    chain: ResolvedChain<T>,
    source: T,
    callback: ResultCallback,
    settings: EngineSettings,
) {
    let mut ctx = ExecutionContext::new(settings);
    ctx.queue_initial_command(chain, source, callback);
    ctx.run_queue();
}

/// Run one stored function to completion.
pub fn execute_function<T: CommandSource>(
    body: Rc<FunctionBody<T>>,
    source: T,
    callback: ResultCallback,
    settings: EngineSettings,
) {
    let mut ctx = ExecutionContext::new(settings);
    ctx.queue_initial_function(body, source, callback);
    ctx.run_queue();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
