//! Queue entries and the run-once task wrapper.
//!
//! A [`Task`] is one unit of work popped by the trampoline loop; a
//! [`QueueEntry`] pairs it with the [`Frame`] it executes under. Tasks are
//! consumed exactly once. An [`UnboundAction`] is a reusable action (one line
//! of a stored function body) that still needs a concrete source bound to it.

use std::fmt;
use std::rc::Rc;

use herald_core::CommandSource;

use crate::context::ExecutionContext;
use crate::frame::Frame;

/// A reusable, source-less unit of work.
///
/// Function bodies hold their actions in this form and bind each one to a
/// concrete source at call time with [`bind`].
pub type UnboundAction<T> = Rc<dyn Fn(&T, &mut ExecutionContext<T>, &Frame)>;

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A schedulable unit of work.
///
/// Carries a boxed closure invoked with the owning execution context and the
/// entry's frame. `Option` so we can `.take()` to run it exactly once.
pub struct Task<T> {
    work: Option<Box<dyn FnOnce(&mut ExecutionContext<T>, &Frame)>>,
}

impl<T: CommandSource> Task<T> {
    /// Wrap a closure as a task.
    pub fn new(f: impl FnOnce(&mut ExecutionContext<T>, &Frame) + 'static) -> Self {
        Self {
            work: Some(Box::new(f)),
        }
    }

    /// Execute the task's closure, consuming it.
    ///
    /// Returns `true` if the closure was present and executed, `false` if the
    /// task had already been consumed.
    pub fn run(&mut self, ctx: &mut ExecutionContext<T>, frame: &Frame) -> bool {
        if let Some(f) = self.work.take() {
            f(ctx, frame);
            true
        } else {
            false
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("has_work", &self.work.is_some())
            .finish()
    }
}

/// Bind an unbound action to a concrete source, yielding a runnable task.
pub fn bind<T: CommandSource>(action: UnboundAction<T>, source: T) -> Task<T> {
    Task::new(move |ctx, frame| action(&source, ctx, frame))
}

// ---------------------------------------------------------------------------
// QueueEntry
// ---------------------------------------------------------------------------

/// One pending continuation in the execution context's queue.
#[derive(Debug)]
pub struct QueueEntry<T> {
    frame: Frame,
    task: Task<T>,
}

impl<T: CommandSource> QueueEntry<T> {
    pub fn new(frame: Frame, task: Task<T>) -> Self {
        Self { frame, task }
    }

    /// The frame this entry executes under.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Split the entry for execution by the drain loop.
    pub fn into_parts(self) -> (Frame, Task<T>) {
        (self.frame, self.task)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
