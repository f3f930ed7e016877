//! The resolution-chain model.
//!
//! A parsed command becomes a [`ResolvedChain`]: an immutable, ordered
//! sequence of stages (one per command-tree node with a redirect) followed by
//! a terminal action. The engine never re-parses; it only advances a chain
//! view stage by stage. [`ChainModifiers`] is the fork state carried across
//! stage transitions — copied, never mutated in place.
//!
//! Redirects and terminals each come in exactly two variants: a plain
//! closure the engine schedules itself, or a "custom" implementation that
//! takes over scheduling through an execution-control handle.

use std::fmt;
use std::rc::Rc;

use herald_core::{CommandError, CommandSource};

use crate::control::{CustomExecutor, CustomModifier};

// ---------------------------------------------------------------------------
// ChainModifiers
// ---------------------------------------------------------------------------

/// Fork state for one resolution.
///
/// `forked` is sticky: once a resolution forks it never un-forks.
/// `returning` records whether results must propagate to a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainModifiers {
    forked: bool,
    returning: bool,
}

impl ChainModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy with the forked flag set.
    #[must_use]
    pub fn forked(self) -> Self {
        Self {
            forked: true,
            ..self
        }
    }

    /// Copy with the returning flag set.
    #[must_use]
    pub fn returning(self) -> Self {
        Self {
            returning: true,
            ..self
        }
    }

    pub fn is_forked(&self) -> bool {
        self.forked
    }

    pub fn is_returning(&self) -> bool {
        self.returning
    }
}

// ---------------------------------------------------------------------------
// Stage and terminal actions
// ---------------------------------------------------------------------------

/// A plain redirect: maps one source to zero or more new sources.
pub type RedirectFn<T> = Rc<dyn Fn(&T) -> Result<Vec<T>, CommandError>>;

/// A plain leaf command: runs a domain effect for one source.
pub type ExecuteFn<T> = Rc<dyn Fn(&T) -> Result<i32, CommandError>>;

/// The redirect carried by a non-terminal stage.
pub enum StageModifier<T> {
    /// An ordinary redirect the engine applies per source.
    Standard(RedirectFn<T>),
    /// A redirect that takes over scheduling itself.
    Custom(Rc<dyn CustomModifier<T>>),
}

impl<T> Clone for StageModifier<T> {
    fn clone(&self) -> Self {
        match self {
            StageModifier::Standard(f) => StageModifier::Standard(Rc::clone(f)),
            StageModifier::Custom(m) => StageModifier::Custom(Rc::clone(m)),
        }
    }
}

impl<T> fmt::Debug for StageModifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageModifier::Standard(_) => write!(f, "StageModifier::Standard"),
            StageModifier::Custom(_) => write!(f, "StageModifier::Custom"),
        }
    }
}

/// The action at the end of a chain.
pub enum TerminalAction<T> {
    /// A plain leaf the engine schedules, one continuation per source.
    Standard(ExecuteFn<T>),
    /// A leaf that manages its own sub-scheduling (e.g. invoking a stored
    /// function as if it were a command).
    Custom(Rc<dyn CustomExecutor<T>>),
}

impl<T> Clone for TerminalAction<T> {
    fn clone(&self) -> Self {
        match self {
            TerminalAction::Standard(f) => TerminalAction::Standard(Rc::clone(f)),
            TerminalAction::Custom(e) => TerminalAction::Custom(Rc::clone(e)),
        }
    }
}

impl<T> fmt::Debug for TerminalAction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalAction::Standard(_) => write!(f, "TerminalAction::Standard"),
            TerminalAction::Custom(_) => write!(f, "TerminalAction::Custom"),
        }
    }
}

/// One non-terminal node of a resolved chain.
#[derive(Debug)]
pub struct Stage<T> {
    forks: bool,
    modifier: Option<StageModifier<T>>,
}

impl<T> Stage<T> {
    /// Whether this stage's node was reached via a forking path. The walker
    /// sets the resolution's forked flag before applying the stage.
    pub fn forks(&self) -> bool {
        self.forks
    }

    /// The stage's redirect, if it carries one (literal nodes do not).
    pub fn modifier(&self) -> Option<&StageModifier<T>> {
        self.modifier.as_ref()
    }
}

// ---------------------------------------------------------------------------
// ResolvedChain
// ---------------------------------------------------------------------------

/// An immutable resolved command chain, advanced by index.
///
/// Cloning is cheap (shared stage storage); [`ResolvedChain::next_stage`]
/// produces a view advanced by one stage without touching the original.
pub struct ResolvedChain<T> {
    command: Rc<str>,
    stages: Rc<[Stage<T>]>,
    terminal: TerminalAction<T>,
    index: usize,
}

impl<T> Clone for ResolvedChain<T> {
    fn clone(&self) -> Self {
        Self {
            command: Rc::clone(&self.command),
            stages: Rc::clone(&self.stages),
            terminal: self.terminal.clone(),
            index: self.index,
        }
    }
}

impl<T> fmt::Debug for ResolvedChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedChain")
            .field("command", &self.command)
            .field("stages", &self.stages.len())
            .field("index", &self.index)
            .field("terminal", &self.terminal)
            .finish()
    }
}

impl<T> ResolvedChain<T> {
    /// The original command text (used for tracing and profiling labels).
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The stage the walker is currently at, or `None` at the terminal.
    pub fn current(&self) -> Option<&Stage<T>> {
        self.stages.get(self.index)
    }

    /// Whether all non-terminal stages have been applied.
    pub fn is_terminal(&self) -> bool {
        self.index >= self.stages.len()
    }

    /// A view of this chain advanced by one stage.
    #[must_use]
    pub fn next_stage(&self) -> Self {
        Self {
            command: Rc::clone(&self.command),
            stages: Rc::clone(&self.stages),
            terminal: self.terminal.clone(),
            index: (self.index + 1).min(self.stages.len()),
        }
    }

    /// The action to run once the last stage is reached.
    pub fn terminal(&self) -> &TerminalAction<T> {
        &self.terminal
    }
}

// ---------------------------------------------------------------------------
// ChainBuilder
// ---------------------------------------------------------------------------

/// Builder used by the parser boundary (and tests) to assemble chains.
pub struct ChainBuilder<T> {
    command: String,
    stages: Vec<Stage<T>>,
}

impl<T: CommandSource> ChainBuilder<T> {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            stages: Vec::new(),
        }
    }

    /// Append a literal stage with no redirect.
    #[must_use]
    pub fn literal(mut self) -> Self {
        self.stages.push(Stage {
            forks: false,
            modifier: None,
        });
        self
    }

    /// Append a non-forking redirect stage (e.g. `execute as @s`).
    #[must_use]
    pub fn modifier(mut self, f: impl Fn(&T) -> Result<Vec<T>, CommandError> + 'static) -> Self {
        self.stages.push(Stage {
            forks: false,
            modifier: Some(StageModifier::Standard(Rc::new(f))),
        });
        self
    }

    /// Append a forking redirect stage (e.g. a multi-target selector).
    #[must_use]
    pub fn fork(mut self, f: impl Fn(&T) -> Result<Vec<T>, CommandError> + 'static) -> Self {
        self.stages.push(Stage {
            forks: true,
            modifier: Some(StageModifier::Standard(Rc::new(f))),
        });
        self
    }

    /// Append a custom redirect stage that takes over scheduling.
    #[must_use]
    pub fn custom_modifier(mut self, forks: bool, modifier: Rc<dyn CustomModifier<T>>) -> Self {
        self.stages.push(Stage {
            forks,
            modifier: Some(StageModifier::Custom(modifier)),
        });
        self
    }

    /// Finish with a plain leaf command.
    pub fn execute(self, f: impl Fn(&T) -> Result<i32, CommandError> + 'static) -> ResolvedChain<T> {
        self.finish(TerminalAction::Standard(Rc::new(f)))
    }

    /// Finish with a custom executor leaf.
    pub fn execute_custom(self, executor: Rc<dyn CustomExecutor<T>>) -> ResolvedChain<T> {
        self.finish(TerminalAction::Custom(executor))
    }

    fn finish(self, terminal: TerminalAction<T>) -> ResolvedChain<T> {
        ResolvedChain {
            command: self.command.into(),
            stages: self.stages.into(),
            terminal,
            index: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
