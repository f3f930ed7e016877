//! Stored function bodies and the function invoker.
//!
//! A [`FunctionBody`] is an id plus an ordered list of unbound actions; a
//! call binds each action to the caller-chosen source and queues the results
//! behind everything already pending. One call costs one cost unit no matter
//! how long the body is — the budget bounds calls, not statements.
//!
//! Tail-position calls reuse the caller's frame control, so unbounded tail
//! recursion never grows the frame-control registry. Depth still increases
//! by one per call either way; it is a trace-only counter.

use std::fmt;
use std::rc::Rc;

use herald_core::{CommandError, CommandSource, ResultCallback};

use crate::chain::{ChainModifiers, ResolvedChain};
use crate::context::ExecutionContext;
use crate::frame::Frame;
use crate::task::{bind, QueueEntry, UnboundAction};
use crate::walker;

// ---------------------------------------------------------------------------
// FunctionBody
// ---------------------------------------------------------------------------

/// A stored function: an identifier plus its actions in declared order.
pub struct FunctionBody<T> {
    id: Rc<str>,
    actions: Vec<UnboundAction<T>>,
}

impl<T: CommandSource> FunctionBody<T> {
    pub fn new(id: impl Into<Rc<str>>, actions: Vec<UnboundAction<T>>) -> Self {
        Self {
            id: id.into(),
            actions,
        }
    }

    /// The function's identifier, e.g. `demo:main`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of actions in the body.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> &[UnboundAction<T>] {
        &self.actions
    }
}

impl<T> fmt::Debug for FunctionBody<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionBody")
            .field("id", &self.id)
            .field("actions", &self.actions.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Action constructors
// ---------------------------------------------------------------------------

/// An action that resolves a full command chain when it executes.
///
/// This is the form most function-body lines take: each line is a parsed
/// chain resolved for the bound source, with a fresh fork state.
pub fn chain_action<T: CommandSource>(chain: ResolvedChain<T>) -> UnboundAction<T> {
    Rc::new(move |source, ctx, frame| {
        walker::resolve_chain(
            source,
            vec![source.clone()],
            chain.clone(),
            ChainModifiers::new(),
            ctx,
            frame,
        );
    })
}

/// An action that runs a plain leaf command directly, without stages.
pub fn command_action<T: CommandSource>(
    command: impl Into<Rc<str>>,
    run: impl Fn(&T) -> Result<i32, CommandError> + 'static,
) -> UnboundAction<T> {
    let command: Rc<str> = command.into();
    Rc::new(move |source, ctx, _frame| {
        let label = format!("/{}", command);
        ctx.profiler_push(&label);
        match run(source) {
            Ok(value) => source.callback().on_success(value),
            Err(err) => {
                ctx.trace_error(&err.to_string());
                source.handle_error(err, false);
                source.callback().on_failure();
            }
        }
        ctx.profiler_pop();
    })
}

/// An action that calls another stored function.
pub fn call_action<T: CommandSource>(body: Rc<FunctionBody<T>>, tail: bool) -> UnboundAction<T> {
    Rc::new(move |source, ctx, frame| {
        invoke_function(&body, source, ResultCallback::empty(), tail, ctx, frame);
    })
}

// ---------------------------------------------------------------------------
// Invoker
// ---------------------------------------------------------------------------

/// Expand a function call into queued continuations.
///
/// Consumes exactly one cost unit, builds the callee frame at
/// `caller.depth() + 1`, and queues one entry per body action in declared
/// order. With `tail` set the callee shares the caller's frame control and
/// the registry does not grow; otherwise the control for the new depth is
/// fetched or created.
///
/// Nothing runs inline. Downstream errors surface when each queued action
/// executes.
pub fn invoke_function<T: CommandSource>(
    body: &Rc<FunctionBody<T>>,
    source: &T,
    callback: ResultCallback,
    tail: bool,
    ctx: &mut ExecutionContext<T>,
    caller: &Frame,
) {
    if !ctx.consume_cost() {
        ctx.report_command_limit(source, caller, false);
        return;
    }
    let depth = caller.depth() + 1;
    ctx.trace_call(depth, body.id(), body.len());

    let control = if tail {
        caller.control().clone()
    } else {
        ctx.frame_control_for(depth)
    };
    let frame = Frame::new(depth, callback, control);

    for action in body.actions() {
        ctx.queue_entry(QueueEntry::new(
            frame.clone(),
            bind(Rc::clone(action), source.clone()),
        ));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
