//! The execution-control handle handed to custom redirects and executors.
//!
//! Plain redirects and leaves are scheduled by the walker itself. The
//! "custom" variants instead receive an [`ExecutionControl`] bound to the
//! current (context, frame) pair and take over scheduling: anything they want
//! run later must go back through [`ExecutionControl::queue`] (directly or
//! via the resolution/function helpers) so it stays inside the trampoline.

use std::cell::RefCell;
use std::rc::Rc;

use herald_core::{CommandSource, ResultCallback};

use crate::chain::{ChainModifiers, ResolvedChain};
use crate::context::ExecutionContext;
use crate::frame::Frame;
use crate::function::{invoke_function, FunctionBody};
use crate::task::Task;
use crate::trace::TraceSink;
use crate::walker;

// ---------------------------------------------------------------------------
// ExecutionControl
// ---------------------------------------------------------------------------

/// Scheduling capability scoped to one (context, frame) pair.
///
/// Borrowed mutably for the duration of one custom hook invocation; the hook
/// must queue follow-up work rather than hold the handle.
pub struct ExecutionControl<'a, T> {
    ctx: &'a mut ExecutionContext<T>,
    frame: &'a Frame,
}

impl<'a, T: CommandSource> ExecutionControl<'a, T> {
    pub(crate) fn new(ctx: &'a mut ExecutionContext<T>, frame: &'a Frame) -> Self {
        Self { ctx, frame }
    }

    /// The frame this handle is bound to.
    pub fn frame(&self) -> &Frame {
        self.frame
    }

    /// Queue a task under the bound frame.
    pub fn queue(&mut self, task: Task<T>) {
        self.ctx.queue_task(self.frame.clone(), task);
    }

    /// The bound context's trace sink, if any.
    pub fn tracer(&self) -> Option<Rc<RefCell<dyn TraceSink>>> {
        self.ctx.tracer()
    }

    /// Swap the bound context's trace sink.
    pub fn set_tracer(&mut self, tracer: Option<Rc<RefCell<dyn TraceSink>>>) {
        self.ctx.set_tracer(tracer);
    }

    /// Continue resolving a chain under the bound frame.
    ///
    /// Used by custom redirects that transform the source set and then hand
    /// the rest of the chain back to the engine.
    pub fn resolve(
        &mut self,
        original: &T,
        sources: Vec<T>,
        chain: ResolvedChain<T>,
        modifiers: ChainModifiers,
    ) {
        walker::resolve_chain(original, sources, chain, modifiers, self.ctx, self.frame);
    }

    /// Expand a stored function as a call under the bound frame.
    ///
    /// This is how a custom executor implements "invoke a function as if it
    /// were a command": the body's actions are queued, not run inline.
    pub fn call_function(
        &mut self,
        body: &Rc<FunctionBody<T>>,
        source: &T,
        callback: ResultCallback,
        tail: bool,
    ) {
        invoke_function(body, source, callback, tail, self.ctx, self.frame);
    }
}

// ---------------------------------------------------------------------------
// Custom hooks
// ---------------------------------------------------------------------------

/// A redirect that takes over scheduling for the rest of its resolution.
///
/// The walker hands it the original source, the current source set, the
/// chain advanced past this stage, and the accumulated fork state, then
/// returns immediately. Whatever should still run must be queued through
/// `control`.
pub trait CustomModifier<T> {
    fn apply(
        &self,
        original: &T,
        sources: Vec<T>,
        chain: ResolvedChain<T>,
        modifiers: ChainModifiers,
        control: &mut ExecutionControl<'_, T>,
    );
}

/// A leaf that manages its own sub-scheduling.
///
/// Run once per surviving source when its chain reaches the terminal stage.
pub trait CustomExecutor<T> {
    fn run(&self, source: &T, modifiers: ChainModifiers, control: &mut ExecutionControl<'_, T>);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
