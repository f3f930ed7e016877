//! Per-invocation execution context and the trampoline drain loop.
//!
//! An [`ExecutionContext`] owns everything one top-level invocation needs:
//! the FIFO queue of pending continuations, the monotonic cost meter, the
//! depth-indexed frame-control registry, and the profiler/trace hooks. It is
//! created for exactly one submission, drained to completion by
//! [`ExecutionContext::run_queue`], and then discarded.
//!
//! The drain loop is what replaces native recursion: executing an entry may
//! push new entries onto the same queue, but never re-enters the walker or
//! invoker through the call stack.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use herald_core::{CommandError, CommandSource, ResultCallback};
use log::warn;

use crate::chain::{ChainModifiers, ResolvedChain};
use crate::frame::{Frame, FrameControl};
use crate::function::{invoke_function, FunctionBody};
use crate::settings::EngineSettings;
use crate::task::{QueueEntry, Task};
use crate::trace::{NoopProfiler, Profiler, TraceSink};
use crate::walker;

/// Hard cap on pending queue entries. A push past this cap sets a sticky
/// overflow flag and the drain loop stops instead of consuming unbounded
/// memory.
pub const MAX_QUEUE_LENGTH: usize = 10_000_000;

// ---------------------------------------------------------------------------
// ExecutionContext
// ---------------------------------------------------------------------------

/// Run state for one top-level command or function invocation.
pub struct ExecutionContext<T> {
    command_limit: usize,
    fork_limit: usize,
    /// Monotonic count of cost units consumed so far. Never decreases.
    cost: usize,
    /// Whether the command-limit error has already been reported.
    limit_reported: bool,
    queue: VecDeque<QueueEntry<T>>,
    queue_overflow: bool,
    max_queue_length: usize,
    /// Frame controls keyed by call depth. Tail calls bypass this registry.
    frame_controls: HashMap<u32, FrameControl>,
    profiler: Rc<RefCell<dyn Profiler>>,
    tracer: Option<Rc<RefCell<dyn TraceSink>>>,
}

impl<T: CommandSource> ExecutionContext<T> {
    /// Create a context with the given resource ceilings.
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            command_limit: settings.command_limit,
            fork_limit: settings.fork_limit,
            cost: 0,
            limit_reported: false,
            queue: VecDeque::new(),
            queue_overflow: false,
            max_queue_length: MAX_QUEUE_LENGTH,
            frame_controls: HashMap::new(),
            profiler: Rc::new(RefCell::new(NoopProfiler)),
            tracer: None,
        }
    }

    /// Attach a profiler. Purely observational.
    #[must_use]
    pub fn with_profiler(mut self, profiler: Rc<RefCell<dyn Profiler>>) -> Self {
        self.profiler = profiler;
        self
    }

    /// Attach or detach a trace sink. Purely observational.
    pub fn set_tracer(&mut self, tracer: Option<Rc<RefCell<dyn TraceSink>>>) {
        self.tracer = tracer;
    }

    /// The attached trace sink, if any.
    pub fn tracer(&self) -> Option<Rc<RefCell<dyn TraceSink>>> {
        self.tracer.clone()
    }

    // -- accounting -------------------------------------------------------

    /// The fork ceiling for resolutions in this context.
    pub fn fork_limit(&self) -> usize {
        self.fork_limit
    }

    /// Cost units consumed so far.
    pub fn cost(&self) -> usize {
        self.cost
    }

    /// Number of depth buckets in the frame-control registry.
    pub fn frame_control_count(&self) -> usize {
        self.frame_controls.len()
    }

    /// Number of queued, not-yet-executed entries.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Consume one cost unit. Returns `false` when the budget is exhausted;
    /// the caller is then expected to call [`Self::report_command_limit`] and
    /// stop contributing work.
    pub fn consume_cost(&mut self) -> bool {
        if self.cost >= self.command_limit {
            return false;
        }
        self.cost += 1;
        true
    }

    /// Report command-budget exhaustion.
    ///
    /// Trips `frame`'s control so the in-flight call tree stops contributing
    /// work, and reports [`CommandError::CommandLimit`] to `source` — exactly
    /// once per context, no matter how many sites observe exhaustion.
    pub fn report_command_limit(&mut self, source: &T, frame: &Frame, forked: bool) {
        frame.control().discard();
        if !self.limit_reported {
            self.limit_reported = true;
            warn!(
                "Command execution stopped due to limit (executed {} commands)",
                self.cost
            );
            let err = CommandError::CommandLimit(self.command_limit);
            self.trace_error(&err.to_string());
            source.handle_error(err, forked);
        }
    }

    /// Fetch or lazily create the frame control for a call depth.
    pub fn frame_control_for(&mut self, depth: u32) -> FrameControl {
        self.frame_controls
            .entry(depth)
            .or_insert_with(FrameControl::new)
            .clone()
    }

    // -- queue ------------------------------------------------------------

    /// Append an entry to the work queue (strict FIFO).
    pub fn queue_entry(&mut self, entry: QueueEntry<T>) {
        if self.queue_overflow {
            return;
        }
        if self.queue.len() >= self.max_queue_length {
            self.queue_overflow = true;
            return;
        }
        self.queue.push_back(entry);
    }

    /// Convenience: queue a task under the given frame.
    pub fn queue_task(&mut self, frame: Frame, task: Task<T>) {
        self.queue_entry(QueueEntry::new(frame, task));
    }

    /// Queue a top-level command resolution at depth 0.
    ///
    /// Results surface through `callback` and through the source's own
    /// sinks; nothing executes until [`Self::run_queue`] drains the queue.
    pub fn queue_initial_command(
        &mut self,
        chain: ResolvedChain<T>,
        source: T,
        callback: ResultCallback,
    ) {
        self.trace_command(0, chain.command());
        let control = self.frame_control_for(0);
        let frame = Frame::new(0, callback, control);
        let task = Task::new(move |ctx: &mut ExecutionContext<T>, frame: &Frame| {
            let sources = vec![source.clone()];
            walker::resolve_chain(&source, sources, chain, ChainModifiers::new(), ctx, frame);
        });
        self.queue_entry(QueueEntry::new(frame, task));
    }

    /// Queue a top-level stored-function invocation.
    ///
    /// The function's frame is created at depth 1 when the queued call
    /// expands, with `callback` as its return sink.
    pub fn queue_initial_function(
        &mut self,
        body: Rc<FunctionBody<T>>,
        source: T,
        callback: ResultCallback,
    ) {
        let control = self.frame_control_for(0);
        let frame = Frame::new(0, ResultCallback::empty(), control);
        let task = Task::new(move |ctx: &mut ExecutionContext<T>, frame: &Frame| {
            invoke_function(&body, &source, callback, false, ctx, frame);
        });
        self.queue_entry(QueueEntry::new(frame, task));
    }

    /// Drain the queue to completion.
    ///
    /// Pops entries in FIFO order and executes each; executing an entry may
    /// push new entries, which are processed by later iterations of this
    /// same loop. Entries whose frame control has been tripped are dropped
    /// unexecuted. The loop ends when the queue is empty (or the overflow
    /// guard fired).
    pub fn run_queue(&mut self) {
        loop {
            if self.queue_overflow {
                warn!(
                    "Command execution stopped due to command queue overflow (max {})",
                    self.max_queue_length
                );
                self.queue.clear();
                break;
            }
            let Some(entry) = self.queue.pop_front() else {
                break;
            };
            if entry.frame().control().is_discarded() {
                continue;
            }
            let (frame, mut task) = entry.into_parts();
            task.run(self, &frame);
        }
    }

    // -- observability ----------------------------------------------------

    /// Report a queued command to the trace sink.
    pub fn trace_command(&mut self, depth: u32, command: &str) {
        if let Some(tracer) = &self.tracer {
            tracer.borrow_mut().on_command(depth, command);
        }
    }

    /// Report a function expansion to the trace sink.
    pub fn trace_call(&mut self, depth: u32, function: &str, actions: usize) {
        if let Some(tracer) = &self.tracer {
            tracer.borrow_mut().on_call(depth, function, actions);
        }
    }

    /// Report an error to the trace sink.
    pub fn trace_error(&mut self, message: &str) {
        if let Some(tracer) = &self.tracer {
            tracer.borrow_mut().on_error(message);
        }
    }

    /// Open a profiler section.
    pub fn profiler_push(&mut self, label: &str) {
        self.profiler.borrow_mut().push(label);
    }

    /// Close the innermost profiler section.
    pub fn profiler_pop(&mut self) {
        self.profiler.borrow_mut().pop();
    }

    #[cfg(test)]
    pub(crate) fn set_max_queue_length(&mut self, max: usize) {
        self.max_queue_length = max;
    }

    #[cfg(test)]
    pub(crate) fn queue_overflowed(&self) -> bool {
        self.queue_overflow
    }
}

impl<T> fmt::Debug for ExecutionContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("command_limit", &self.command_limit)
            .field("fork_limit", &self.fork_limit)
            .field("cost", &self.cost)
            .field("pending", &self.queue.len())
            .field("frame_controls", &self.frame_controls.len())
            .field("queue_overflow", &self.queue_overflow)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
