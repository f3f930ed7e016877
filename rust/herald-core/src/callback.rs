//! Result-callback chaining.
//!
//! A [`ResultCallback`] is the sink a command's numeric result flows into.
//! Nested calls compose callbacks with [`ResultCallback::chain`] instead of
//! threading return values through the native stack: a returning function
//! call wraps its source's callback so the result also reaches the caller's
//! frame.

use std::fmt;
use std::rc::Rc;

/// A shared, cloneable result sink.
///
/// Invoking an empty callback is a no-op, which lets callers compose chains
/// without special-casing "nobody is listening". The engine is single
/// threaded, so the inner closure is reference counted with [`Rc`].
#[derive(Clone, Default)]
pub struct ResultCallback {
    inner: Option<Rc<dyn Fn(bool, i32)>>,
}

impl ResultCallback {
    /// Wrap a closure. The closure receives `(success, result)`.
    pub fn new(f: impl Fn(bool, i32) + 'static) -> Self {
        Self {
            inner: Some(Rc::new(f)),
        }
    }

    /// The empty callback: invoking it does nothing.
    pub fn empty() -> Self {
        Self { inner: None }
    }

    /// Whether this callback has a listener attached.
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Deliver a result.
    pub fn invoke(&self, success: bool, result: i32) {
        if let Some(f) = &self.inner {
            f(success, result);
        }
    }

    /// Deliver a successful result.
    pub fn on_success(&self, result: i32) {
        self.invoke(true, result);
    }

    /// Deliver a failure (result value 0).
    pub fn on_failure(&self) {
        self.invoke(false, 0);
    }

    /// Compose two callbacks into one that invokes `first`, then `second`.
    ///
    /// If either side is empty the other is returned unchanged, so chains of
    /// mostly-empty callbacks stay a single allocation deep.
    pub fn chain(first: Self, second: Self) -> Self {
        match (first.inner, second.inner) {
            (None, inner) => Self { inner },
            (inner, None) => Self { inner },
            (Some(a), Some(b)) => Self::new(move |success, result| {
                a(success, result);
                b(success, result);
            }),
        }
    }
}

impl fmt::Debug for ResultCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCallback")
            .field("attached", &self.inner.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn recording() -> (ResultCallback, Rc<RefCell<Vec<(bool, i32)>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let cb = ResultCallback::new(move |ok, value| sink.borrow_mut().push((ok, value)));
        (cb, seen)
    }

    #[test]
    fn empty_callback_is_noop() {
        let cb = ResultCallback::empty();
        assert!(cb.is_empty());
        cb.on_success(42);
        cb.on_failure();
    }

    #[test]
    fn callback_receives_success_and_failure() {
        let (cb, seen) = recording();
        cb.on_success(7);
        cb.on_failure();
        assert_eq!(*seen.borrow(), vec![(true, 7), (false, 0)]);
    }

    #[test]
    fn chain_invokes_both_in_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let first = {
            let order = Rc::clone(&order);
            ResultCallback::new(move |_, v| order.borrow_mut().push(("first", v)))
        };
        let second = {
            let order = Rc::clone(&order);
            ResultCallback::new(move |_, v| order.borrow_mut().push(("second", v)))
        };

        let chained = ResultCallback::chain(first, second);
        chained.on_success(3);
        assert_eq!(*order.borrow(), vec![("first", 3), ("second", 3)]);
    }

    #[test]
    fn chain_with_empty_side_returns_other() {
        let (cb, seen) = recording();
        let chained = ResultCallback::chain(ResultCallback::empty(), cb.clone());
        chained.on_success(1);
        let chained = ResultCallback::chain(cb, ResultCallback::empty());
        chained.on_success(2);
        assert_eq!(*seen.borrow(), vec![(true, 1), (true, 2)]);
    }

    #[test]
    fn chain_of_two_empties_is_empty() {
        let chained = ResultCallback::chain(ResultCallback::empty(), ResultCallback::empty());
        assert!(chained.is_empty());
    }

    #[test]
    fn clones_share_the_same_sink() {
        let (cb, seen) = recording();
        let other = cb.clone();
        cb.on_success(1);
        other.on_success(2);
        assert_eq!(seen.borrow().len(), 2);
    }
}
