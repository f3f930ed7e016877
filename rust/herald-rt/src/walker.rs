//! The resolution-chain walker and the fork ceiling.
//!
//! [`resolve_chain`] advances a [`ResolvedChain`] through its non-terminal
//! stages, applying redirects, enforcing the fork ceiling, and finally
//! scheduling leaf continuations onto the execution context's queue. It never
//! executes a leaf inline: the walker runs, queues, and returns, so recursion
//! depth stays O(1) no matter how a command fans out.
//!
//! Per-resolution fork state lives in [`ChainModifiers`]. A stage whose node
//! was reached via a forking path marks the resolution forked *before* its
//! own redirect applies, so errors from that redirect are already isolated
//! per sibling.

use std::rc::Rc;

use herald_core::{CommandError, CommandSource, ResultCallback};

use crate::chain::{ChainModifiers, ExecuteFn, ResolvedChain, StageModifier, TerminalAction};
use crate::context::ExecutionContext;
use crate::control::ExecutionControl;
use crate::frame::Frame;
use crate::task::Task;

/// Resolve a chain for a set of sources, queueing whatever should run next.
///
/// `original` is the source the whole resolution was submitted for; it is
/// the sole recipient of fork-limit errors. `sources` is the current fan-out
/// (initially one entry, the original itself).
pub fn resolve_chain<T: CommandSource>(
    original: &T,
    sources: Vec<T>,
    chain: ResolvedChain<T>,
    modifiers: ChainModifiers,
    ctx: &mut ExecutionContext<T>,
    frame: &Frame,
) {
    let label = format!("/{}", chain.command());
    ctx.profiler_push(&label);
    resolve_stages(original, sources, chain, modifiers, ctx, frame);
    ctx.profiler_pop();
}

fn resolve_stages<T: CommandSource>(
    original: &T,
    mut sources: Vec<T>,
    mut chain: ResolvedChain<T>,
    mut modifiers: ChainModifiers,
    ctx: &mut ExecutionContext<T>,
    frame: &Frame,
) {
    while let Some(stage) = chain.current() {
        let modifier = stage.modifier().cloned();
        // The forked flag is set before this stage's own redirect applies.
        if stage.forks() {
            modifiers = modifiers.forked();
        }
        let rest = chain.next_stage();

        match modifier {
            None => {}
            Some(StageModifier::Custom(custom)) => {
                // Scheduling ownership passes to the custom redirect.
                let mut control = ExecutionControl::new(ctx, frame);
                custom.apply(original, sources, rest, modifiers, &mut control);
                return;
            }
            Some(StageModifier::Standard(redirect)) => {
                // One cost unit per stage, not per source.
                if !ctx.consume_cost() {
                    ctx.report_command_limit(original, frame, modifiers.is_forked());
                    return;
                }
                let limit = ctx.fork_limit();
                let mut produced: Vec<T> = Vec::with_capacity(sources.len());
                for source in &sources {
                    match redirect(source) {
                        Ok(new_sources) => {
                            if produced.len() + new_sources.len() >= limit {
                                // Fail closed: nothing from this stage runs.
                                let err = CommandError::ForkLimit(limit);
                                ctx.trace_error(&err.to_string());
                                original.handle_error(err, modifiers.is_forked());
                                return;
                            }
                            produced.extend(new_sources);
                        }
                        Err(err) => {
                            ctx.trace_error(&err.to_string());
                            source.handle_error(err, modifiers.is_forked());
                            if !modifiers.is_forked() {
                                // A single logical path has nothing left to run.
                                return;
                            }
                            // Forked siblings are isolated; keep going.
                        }
                    }
                }
                sources = produced;
            }
        }
        chain = rest;
    }

    dispatch_terminal(sources, &chain, modifiers, ctx, frame);
}

fn dispatch_terminal<T: CommandSource>(
    sources: Vec<T>,
    chain: &ResolvedChain<T>,
    modifiers: ChainModifiers,
    ctx: &mut ExecutionContext<T>,
    frame: &Frame,
) {
    if sources.is_empty() {
        if modifiers.is_returning() {
            // A caller waiting on a return value gets a defined failure
            // instead of hanging on a resolution that matched nothing.
            let owner = frame.clone();
            ctx.queue_task(frame.clone(), Task::new(move |_, _| owner.return_failure()));
        }
        return;
    }

    match chain.terminal() {
        TerminalAction::Custom(executor) => {
            let executor = Rc::clone(executor);
            let mut control = ExecutionControl::new(ctx, frame);
            for source in &sources {
                executor.run(source, modifiers, &mut control);
            }
        }
        TerminalAction::Standard(execute) => {
            if modifiers.is_returning() {
                // Returning resolutions collapse to a single result source;
                // its callback is chained into the frame's so the caller
                // observes the leaf's outcome.
                if let Some(first) = sources.into_iter().next() {
                    let chained =
                        ResultCallback::chain(first.callback(), frame.callback().clone());
                    let wrapped = first.with_callback(chained);
                    queue_leaf(execute, wrapped, modifiers, ctx, frame);
                }
            } else {
                let execute = execute.clone();
                for source in sources {
                    queue_leaf(&execute, source, modifiers, ctx, frame);
                }
            }
        }
    }
}

/// Queue one leaf continuation. The leaf's own errors are reported to its
/// source when the entry executes, never propagated through the drain loop.
fn queue_leaf<T: CommandSource>(
    execute: &ExecuteFn<T>,
    source: T,
    modifiers: ChainModifiers,
    ctx: &mut ExecutionContext<T>,
    frame: &Frame,
) {
    let execute = Rc::clone(execute);
    let forked = modifiers.is_forked();
    ctx.queue_task(
        frame.clone(),
        Task::new(move |ctx: &mut ExecutionContext<T>, _frame: &Frame| {
            match execute(&source) {
                Ok(value) => source.callback().on_success(value),
                Err(err) => {
                    ctx.trace_error(&err.to_string());
                    source.handle_error(err, forked);
                    source.callback().on_failure();
                }
            }
        }),
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainBuilder;
    use crate::control::CustomModifier;
    use crate::settings::EngineSettings;
    use crate::testutil::TestSource;
    use std::cell::RefCell;

    fn run(
        chain: ResolvedChain<TestSource>,
        source: &TestSource,
        settings: EngineSettings,
    ) -> ExecutionContext<TestSource> {
        let mut ctx = ExecutionContext::new(settings);
        ctx.queue_initial_command(chain, source.clone(), ResultCallback::empty());
        ctx.run_queue();
        ctx
    }

    #[test]
    fn bare_chain_executes_once_for_the_single_source() {
        let source = TestSource::new("console");
        let chain = ChainBuilder::new("say hi").literal().execute(|s: &TestSource| {
            s.log("hi");
            Ok(1)
        });

        run(chain, &source, EngineSettings::default());

        assert_eq!(source.logged(), vec!["hi"]);
        assert!(source.errors().is_empty());
    }

    #[test]
    fn unforked_redirect_error_aborts_with_one_report() {
        let source = TestSource::new("console");
        let chain = ChainBuilder::new("execute as missing run say hi")
            .modifier(|_: &TestSource| Err(CommandError::failed("no such entity")))
            .execute(|s: &TestSource| {
                s.log("hi");
                Ok(1)
            });

        run(chain, &source, EngineSettings::default());

        assert!(source.logged().is_empty());
        assert_eq!(
            source.errors(),
            vec![(CommandError::failed("no such entity"), false)]
        );
    }

    #[test]
    fn forked_sibling_error_skips_only_the_failing_source() {
        let source = TestSource::new("console");
        let chain = ChainBuilder::new("execute as @a at @s run say hi")
            .fork(|s: &TestSource| Ok(vec![s.child("a"), s.child("b"), s.child("c")]))
            .modifier(|s: &TestSource| {
                if s.name() == "b" {
                    Err(CommandError::failed("b is unreachable"))
                } else {
                    Ok(vec![s.clone()])
                }
            })
            .execute(|s: &TestSource| {
                s.log(s.name());
                Ok(1)
            });

        run(chain, &source, EngineSettings::default());

        assert_eq!(source.logged(), vec!["a", "c"]);
        assert_eq!(
            source.errors(),
            vec![(CommandError::failed("b is unreachable"), true)]
        );
    }

    #[test]
    fn fork_ceiling_aborts_the_stage_with_one_report() {
        let source = TestSource::new("console");
        let chain = ChainBuilder::new("execute as @e run say hi")
            .fork(|s: &TestSource| {
                Ok(vec![s.child("a"), s.child("b"), s.child("c"), s.child("d")])
            })
            .execute(|s: &TestSource| {
                s.log("leaf");
                Ok(1)
            });

        run(chain, &source, EngineSettings::new(1000, 4));

        assert!(source.logged().is_empty());
        assert_eq!(source.errors(), vec![(CommandError::ForkLimit(4), true)]);
    }

    #[test]
    fn ceiling_counts_accumulation_across_sources() {
        let source = TestSource::new("console");
        // Two sources, each redirecting to two more: 2 + 2 >= 4 trips the cap
        // even though no single application reaches it.
        let chain = ChainBuilder::new("execute as @e as @e run say hi")
            .fork(|s: &TestSource| Ok(vec![s.child("x"), s.child("y")]))
            .fork(|s: &TestSource| Ok(vec![s.child("p"), s.child("q")]))
            .execute(|s: &TestSource| {
                s.log("leaf");
                Ok(1)
            });

        run(chain, &source, EngineSettings::new(1000, 4));

        assert!(source.logged().is_empty());
        assert_eq!(source.errors(), vec![(CommandError::ForkLimit(4), true)]);
    }

    #[test]
    fn returning_resolution_with_no_sources_falls_through_once() {
        let source = TestSource::new("console");
        let chain = ChainBuilder::new("return run execute as nobody")
            .fork(|_: &TestSource| Ok(vec![]))
            .execute(|s: &TestSource| {
                s.log("leaf");
                Ok(1)
            });

        let results = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&results);
        let mut ctx = ExecutionContext::new(EngineSettings::default());
        let callback = ResultCallback::new(move |ok, v| sink.borrow_mut().push((ok, v)));
        ctx.queue_initial_command(chain, source.clone(), callback);
        // Returning mode comes from the caller.
        // queue_initial_command starts non-returning, so resolve directly.
        ctx.run_queue();

        // Non-returning empty fan-out is a no-op.
        assert!(results.borrow().is_empty());

        let chain = ChainBuilder::new("return run execute as nobody")
            .fork(|_: &TestSource| Ok(vec![]))
            .execute(|_: &TestSource| Ok(1));
        let sink = Rc::clone(&results);
        let frame = Frame::new(
            0,
            ResultCallback::new(move |ok, v| sink.borrow_mut().push((ok, v))),
            ctx.frame_control_for(0),
        );
        resolve_chain(
            &source,
            vec![source.clone()],
            chain,
            ChainModifiers::new().returning(),
            &mut ctx,
            &frame,
        );
        ctx.run_queue();

        assert_eq!(*results.borrow(), vec![(false, 0)]);
        assert!(source.logged().is_empty());
    }

    #[test]
    fn returning_resolution_collapses_to_the_first_source() {
        let source = TestSource::new("console");
        let chain = ChainBuilder::new("return run execute as @a")
            .fork(|s: &TestSource| Ok(vec![s.child("a"), s.child("b"), s.child("c")]))
            .execute(|s: &TestSource| {
                s.log(s.name());
                Ok(7)
            });

        let results = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&results);
        let mut ctx = ExecutionContext::new(EngineSettings::default());
        let frame = Frame::new(
            0,
            ResultCallback::new(move |ok, v| sink.borrow_mut().push((ok, v))),
            ctx.frame_control_for(0),
        );
        resolve_chain(
            &source,
            vec![source.clone()],
            chain,
            ChainModifiers::new().returning(),
            &mut ctx,
            &frame,
        );
        ctx.run_queue();

        // Only the first fork product executed, and its result reached the
        // frame's callback.
        assert_eq!(source.logged(), vec!["a"]);
        assert_eq!(*results.borrow(), vec![(true, 7)]);
    }

    #[test]
    fn leaf_error_reports_and_fails_the_callback() {
        let source = TestSource::new("console");
        let results = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&results);
        let source = source.with_callback(ResultCallback::new(move |ok, v| {
            sink.borrow_mut().push((ok, v))
        }));
        let chain = ChainBuilder::new("ban ghost")
            .literal()
            .execute(|_: &TestSource| Err(CommandError::failed("player not found")));

        run(chain, &source, EngineSettings::default());

        assert_eq!(
            source.errors(),
            vec![(CommandError::failed("player not found"), false)]
        );
        assert_eq!(*results.borrow(), vec![(false, 0)]);
    }

    struct EvenFilter;

    impl CustomModifier<TestSource> for EvenFilter {
        fn apply(
            &self,
            original: &TestSource,
            sources: Vec<TestSource>,
            chain: ResolvedChain<TestSource>,
            modifiers: ChainModifiers,
            control: &mut ExecutionControl<'_, TestSource>,
        ) {
            let kept = sources
                .into_iter()
                .enumerate()
                .filter_map(|(i, s)| (i % 2 == 0).then_some(s))
                .collect();
            control.resolve(original, kept, chain, modifiers);
        }
    }

    #[test]
    fn custom_modifier_takes_over_and_resumes_resolution() {
        let source = TestSource::new("console");
        let chain = ChainBuilder::new("execute if custom run say hi")
            .fork(|s: &TestSource| {
                Ok(vec![s.child("0"), s.child("1"), s.child("2"), s.child("3")])
            })
            .custom_modifier(false, Rc::new(EvenFilter))
            .execute(|s: &TestSource| {
                s.log(s.name());
                Ok(1)
            });

        run(chain, &source, EngineSettings::default());

        assert_eq!(source.logged(), vec!["0", "2"]);
        assert!(source.errors().is_empty());
    }

    #[test]
    fn resolution_is_profiler_bracketed() {
        use crate::trace::Profiler;

        struct RecordingProfiler(Rc<RefCell<Vec<String>>>);

        impl Profiler for RecordingProfiler {
            fn push(&mut self, label: &str) {
                self.0.borrow_mut().push(format!("push {}", label));
            }
            fn pop(&mut self) {
                self.0.borrow_mut().push("pop".to_string());
            }
        }

        let events = Rc::new(RefCell::new(Vec::new()));
        let mut ctx = ExecutionContext::new(EngineSettings::default())
            .with_profiler(Rc::new(RefCell::new(RecordingProfiler(Rc::clone(&events)))));

        let source = TestSource::new("console");
        let chain = ChainBuilder::new("say hi").literal().execute(|_: &TestSource| Ok(1));
        ctx.queue_initial_command(chain, source, ResultCallback::empty());
        ctx.run_queue();

        assert_eq!(*events.borrow(), vec!["push /say hi", "pop"]);
    }

    #[test]
    fn cost_exhaustion_mid_chain_reports_the_command_limit() {
        let source = TestSource::new("console");
        let chain = ChainBuilder::new("execute as @s as @s as @s run say hi")
            .modifier(|s: &TestSource| Ok(vec![s.clone()]))
            .modifier(|s: &TestSource| Ok(vec![s.clone()]))
            .modifier(|s: &TestSource| Ok(vec![s.clone()]))
            .execute(|s: &TestSource| {
                s.log("leaf");
                Ok(1)
            });

        let ctx = run(chain, &source, EngineSettings::new(2, 1000));

        assert!(source.logged().is_empty());
        assert_eq!(source.errors(), vec![(CommandError::CommandLimit(2), false)]);
        assert_eq!(ctx.cost(), 2);
    }
}
