//! Herald Runtime
//!
//! Trampoline-based command execution: chain resolution with entity
//! forking, stored-function expansion, and per-invocation resource
//! ceilings, all driven by a single FIFO queue so native stack depth
//! stays O(1).

pub mod chain;
pub mod context;
pub mod control;
pub mod frame;
pub mod function;
pub mod settings;
pub mod task;
pub mod trace;
pub mod walker;

#[cfg(test)]
mod testutil;

pub use chain::{
    ChainBuilder, ChainModifiers, ExecuteFn, RedirectFn, ResolvedChain, Stage, StageModifier,
    TerminalAction,
};
pub use context::{ExecutionContext, MAX_QUEUE_LENGTH};
pub use control::{CustomExecutor, CustomModifier, ExecutionControl};
pub use frame::{Frame, FrameControl};
pub use function::{call_action, chain_action, command_action, invoke_function, FunctionBody};
pub use settings::{
    execute_command, execute_function, EngineSettings, DEFAULT_COMMAND_LIMIT, DEFAULT_FORK_LIMIT,
};
pub use task::{bind, QueueEntry, Task, UnboundAction};
pub use trace::{NoopProfiler, Profiler, RecordingTrace, TraceEvent, TraceLog, TraceSink};
pub use walker::resolve_chain;

pub use herald_core::{CommandError, CommandSource, ResultCallback};
