//! Test support: an in-memory command source.

use std::cell::RefCell;
use std::rc::Rc;

use herald_core::{CommandError, CommandSource, ResultCallback};

#[derive(Default)]
struct Shared {
    log: RefCell<Vec<String>>,
    errors: RefCell<Vec<(CommandError, bool)>>,
}

/// A command source whose observable effects land in shared in-memory sinks.
///
/// Sources produced by redirects ([`TestSource::child`]) keep writing to the
/// parent's sinks, so a test can assert on the whole resolution from the root
/// source.
#[derive(Clone)]
pub struct TestSource {
    name: Rc<str>,
    shared: Rc<Shared>,
    callback: ResultCallback,
}

impl TestSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            shared: Rc::default(),
            callback: ResultCallback::empty(),
        }
    }

    /// A renamed source sharing this source's sinks.
    pub fn child(&self, name: &str) -> Self {
        Self {
            name: name.into(),
            shared: Rc::clone(&self.shared),
            callback: self.callback.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log(&self, line: impl Into<String>) {
        self.shared.log.borrow_mut().push(line.into());
    }

    pub fn logged(&self) -> Vec<String> {
        self.shared.log.borrow().clone()
    }

    pub fn errors(&self) -> Vec<(CommandError, bool)> {
        self.shared.errors.borrow().clone()
    }
}

impl CommandSource for TestSource {
    fn handle_error(&self, error: CommandError, forked: bool) {
        self.shared.errors.borrow_mut().push((error, forked));
    }

    fn callback(&self) -> ResultCallback {
        self.callback.clone()
    }

    fn with_callback(&self, callback: ResultCallback) -> Self {
        Self {
            name: Rc::clone(&self.name),
            shared: Rc::clone(&self.shared),
            callback,
        }
    }
}
