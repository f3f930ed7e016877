//! Execution frames and per-depth frame controls.
//!
//! A [`Frame`] represents one logical call level: its depth, the callback a
//! return value propagates into, and a [`FrameControl`] — the shared
//! resource-control cell for that depth. Frames are immutable after
//! construction and cheap to clone; every queue entry carries one.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use herald_core::ResultCallback;

// ---------------------------------------------------------------------------
// FrameControl
// ---------------------------------------------------------------------------

/// Shared resource control for one call depth.
///
/// Controls live in the execution context's depth-indexed registry and are
/// handed to every frame created at that depth. Tail-position calls reuse the
/// *caller's* control instead of fetching a depth-indexed one, so a tail
/// chain shares a single control no matter how deep it recurses.
///
/// Discarding a control is sticky: once tripped, every queued entry whose
/// frame holds this control is dropped by the scheduler instead of executed.
#[derive(Clone, Default)]
pub struct FrameControl {
    discarded: Rc<Cell<bool>>,
}

impl FrameControl {
    /// Create a fresh, untripped control.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the control. All pending and future work under it is dropped.
    pub fn discard(&self) {
        self.discarded.set(true);
    }

    /// Whether the control has been tripped.
    pub fn is_discarded(&self) -> bool {
        self.discarded.get()
    }

    /// Whether two handles refer to the same underlying control.
    pub fn same_control(&self, other: &FrameControl) -> bool {
        Rc::ptr_eq(&self.discarded, &other.discarded)
    }
}

impl fmt::Debug for FrameControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameControl")
            .field("discarded", &self.is_discarded())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One logical call level.
///
/// `depth` is a trace-only counter: it increases by exactly one per function
/// call regardless of tail mode. The callback receives the frame's return
/// value when a returning resolution completes (or falls through).
#[derive(Clone)]
pub struct Frame {
    depth: u32,
    callback: ResultCallback,
    control: FrameControl,
}

impl Frame {
    /// Build a frame. Depth 0 is reserved for top-level invocations.
    pub fn new(depth: u32, callback: ResultCallback, control: FrameControl) -> Self {
        Self {
            depth,
            callback,
            control,
        }
    }

    /// Logical call depth of this frame.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The callback a return value at this level propagates into.
    pub fn callback(&self) -> &ResultCallback {
        &self.callback
    }

    /// The resource control governing work queued under this frame.
    pub fn control(&self) -> &FrameControl {
        &self.control
    }

    /// Deliver a successful return value to this frame's owner.
    pub fn return_success(&self, result: i32) {
        self.callback.on_success(result);
    }

    /// Deliver a failed return to this frame's owner.
    pub fn return_failure(&self) {
        self.callback.on_failure();
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("depth", &self.depth)
            .field("callback", &self.callback)
            .field("control", &self.control)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
