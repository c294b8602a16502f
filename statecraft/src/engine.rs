use crate::context::TransitionContext;
use crate::error::{ErrorOrigin, StateMachineError};
use crate::graph::StateGraph;
use crate::machine::Notifier;
use crate::state::HistoryMode;
use crate::{EventId, StateId};

/// Result of dispatching one event.
pub(crate) enum Dispatch<S> {
    /// A transition fired. `external` is `false` for internal transitions,
    /// which leave the current state untouched.
    Fired { new_state: S, external: bool },
    /// No transition fired anywhere on the parent chain.
    Declined,
}

/// Coordinates of the firing transition: the state whose table declares it,
/// the event, its position, and the declared target.
#[derive(Clone, Copy)]
struct Edge<S, E> {
    source: S,
    target: S,
    event: E,
    index: usize,
}

/// The hierarchical dispatch algorithm, borrowing the graph and the
/// notification fan-out for the duration of one event.
pub(crate) struct Engine<'a, S: StateId, E: EventId> {
    pub(crate) graph: &'a mut StateGraph<S, E>,
    pub(crate) notifier: &'a mut Notifier<S, E>,
}

impl<S: StateId, E: EventId> Engine<'_, S, E> {
    /// Find and execute the firing transition for `event`, starting at the
    /// current leaf and ascending the parent chain.
    pub(crate) fn dispatch(
        &mut self,
        origin: S,
        event: E,
        ctx: &mut TransitionContext<S, E>,
    ) -> Result<Dispatch<S>, StateMachineError<S, E>> {
        let mut scan = Some(origin);
        while let Some(state) = scan {
            let count = self
                .graph
                .require(state)?
                .transitions
                .get(&event)
                .map_or(0, Vec::len);
            for index in 0..count {
                if self.guard_passes(state, event, index, ctx)? {
                    let new_state = self.execute(origin, state, event, index, ctx)?;
                    return Ok(Dispatch::Fired {
                        new_state: new_state.unwrap_or(origin),
                        external: new_state.is_some(),
                    });
                }
            }
            scan = self.graph.require(state)?.parent;
        }
        Ok(Dispatch::Declined)
    }

    /// Walk the initial shallow-entry chain down to a leaf.
    pub(crate) fn enter_initial(
        &mut self,
        initial: S,
        ctx: &mut TransitionContext<S, E>,
    ) -> Result<S, StateMachineError<S, E>> {
        self.enter_shallow(initial, ctx)
    }

    /// Evaluate one guard. A guard error is reported and counts as the
    /// guard returning `false`.
    fn guard_passes(
        &mut self,
        state: S,
        event: E,
        index: usize,
        ctx: &TransitionContext<S, E>,
    ) -> Result<bool, StateMachineError<S, E>> {
        let node = self.graph.require(state)?;
        let Some(transition) = node.transitions.get(&event).and_then(|list| list.get(index))
        else {
            return Ok(false);
        };
        let target = transition.target;
        let passes = match &transition.guard {
            None => true,
            Some(guard) => match guard.execute(ctx.argument.as_ref()) {
                Ok(passes) => passes,
                Err(error) => {
                    self.notifier
                        .user_error(ErrorOrigin::Guard, Some(state), Some(event), error);
                    false
                }
            },
        };
        if !passes {
            self.notifier.skipped_transition(state, target, event);
        }
        Ok(passes)
    }

    /// Execute the chosen transition. Returns the new leaf for an external
    /// transition, `None` for an internal one.
    fn execute(
        &mut self,
        origin: S,
        source: S,
        event: E,
        index: usize,
        ctx: &mut TransitionContext<S, E>,
    ) -> Result<Option<S>, StateMachineError<S, E>> {
        let target = self
            .graph
            .require(source)?
            .transitions
            .get(&event)
            .and_then(|list| list.get(index))
            .and_then(|transition| transition.target);

        self.notifier.executing_transition(source, target, event);

        let result = match target {
            None => {
                let edge = Edge {
                    source,
                    target: source,
                    event,
                    index,
                };
                self.perform_actions(edge, ctx)?;
                None
            }
            Some(target) => {
                let edge = Edge {
                    source,
                    target,
                    event,
                    index,
                };
                // The dispatch may have ascended to find the transition;
                // leave every state below the source first.
                self.unwind(origin, source, ctx)?;
                self.traverse(source, target, edge, ctx)?;
                Some(self.enter_by_history(target, ctx)?)
            }
        };

        self.notifier.executed_transition(source, target, event);
        Ok(result)
    }

    /// Resolve the source-to-target step sequence.
    ///
    /// `edge.target` is the transition's declared target, carried through
    /// the recursion unchanged: it terminates the upward walk out of a
    /// nested source and distinguishes a self transition from the
    /// common-ancestor fixpoint.
    fn traverse(
        &mut self,
        from: S,
        to: S,
        edge: Edge<S, E>,
        ctx: &mut TransitionContext<S, E>,
    ) -> Result<(), StateMachineError<S, E>> {
        if from == edge.target {
            // Self transition, or the declared target reached from below.
            self.exit_state(from, ctx)?;
            self.perform_actions(edge, ctx)?;
            self.enter_state(edge.target, ctx)?;
            return Ok(());
        }
        if from == to {
            // Common ancestor reached from the target side; the descent
            // happens while the recursion unwinds.
            return self.perform_actions(edge, ctx);
        }

        let from_parent = self.graph.require(from)?.parent;
        let to_parent = self.graph.require(to)?.parent;

        if from_parent == to_parent {
            self.exit_state(from, ctx)?;
            self.perform_actions(edge, ctx)?;
            self.enter_state(to, ctx)?;
            return Ok(());
        }

        let from_depth = self.graph.require(from)?.depth;
        let to_depth = self.graph.require(to)?.depth;
        if from_depth > to_depth {
            self.exit_state(from, ctx)?;
            let up = from_parent.ok_or(StateMachineError::UnknownState(from))?;
            self.traverse(up, to, edge, ctx)?;
        } else if from_depth < to_depth {
            let up = to_parent.ok_or(StateMachineError::UnknownState(to))?;
            self.traverse(from, up, edge, ctx)?;
            self.enter_state(to, ctx)?;
        } else {
            self.exit_state(from, ctx)?;
            let from_up = from_parent.ok_or(StateMachineError::UnknownState(from))?;
            let to_up = to_parent.ok_or(StateMachineError::UnknownState(to))?;
            self.traverse(from_up, to_up, edge, ctx)?;
            self.enter_state(to, ctx)?;
        }
        Ok(())
    }

    /// Exit every state from `from` up to, but excluding, `to`.
    fn unwind(
        &mut self,
        from: S,
        to: S,
        ctx: &mut TransitionContext<S, E>,
    ) -> Result<(), StateMachineError<S, E>> {
        let mut state = from;
        while state != to {
            self.exit_state(state, ctx)?;
            state = self
                .graph
                .require(state)?
                .parent
                .ok_or(StateMachineError::UnknownState(to))?;
        }
        Ok(())
    }

    /// Descend from an already entered state to a leaf, honouring the
    /// state's history mode.
    fn enter_by_history(
        &mut self,
        state: S,
        ctx: &mut TransitionContext<S, E>,
    ) -> Result<S, StateMachineError<S, E>> {
        let node = self.graph.require(state)?;
        let (history, initial, last_active) =
            (node.history, node.initial_child, node.last_active_child);

        match history {
            HistoryMode::Shallow => {
                if let Some(child) = last_active {
                    return self.enter_shallow(child, ctx);
                }
            }
            HistoryMode::Deep => {
                if let Some(child) = last_active {
                    return self.enter_deep(child, ctx);
                }
            }
            HistoryMode::None => {}
        }
        match initial {
            Some(child) => self.enter_shallow(child, ctx),
            None => Ok(state),
        }
    }

    /// Enter `state`, then its initial chain down to a leaf.
    fn enter_shallow(
        &mut self,
        state: S,
        ctx: &mut TransitionContext<S, E>,
    ) -> Result<S, StateMachineError<S, E>> {
        self.enter_state(state, ctx)?;
        match self.graph.require(state)?.initial_child {
            Some(child) => self.enter_shallow(child, ctx),
            None => Ok(state),
        }
    }

    /// Enter `state`, then its remembered chain down to a leaf.
    fn enter_deep(
        &mut self,
        state: S,
        ctx: &mut TransitionContext<S, E>,
    ) -> Result<S, StateMachineError<S, E>> {
        self.enter_state(state, ctx)?;
        match self.graph.require(state)?.last_active_child {
            Some(child) => self.enter_deep(child, ctx),
            None => Ok(state),
        }
    }

    /// Record the step, run the entry actions, and mark this state as the
    /// parent's last active child. The memo is kept on entry so that it
    /// always names the active child; by the time a state is exited the
    /// memo already points at it.
    fn enter_state(
        &mut self,
        state: S,
        ctx: &mut TransitionContext<S, E>,
    ) -> Result<(), StateMachineError<S, E>> {
        ctx.record_enter(state);
        if let Some(parent) = self.graph.require(state)?.parent {
            self.graph.set_last_active(parent, state);
        }
        let node = self.graph.require(state)?;
        for action in &node.entry_actions {
            if let Err(error) = action.execute(ctx.argument.as_ref()) {
                self.notifier
                    .user_error(ErrorOrigin::EntryAction, Some(state), ctx.event, error);
            }
        }
        Ok(())
    }

    fn exit_state(
        &mut self,
        state: S,
        ctx: &mut TransitionContext<S, E>,
    ) -> Result<(), StateMachineError<S, E>> {
        ctx.record_exit(state);
        let node = self.graph.require(state)?;
        for action in &node.exit_actions {
            if let Err(error) = action.execute(ctx.argument.as_ref()) {
                self.notifier
                    .user_error(ErrorOrigin::ExitAction, Some(state), ctx.event, error);
            }
        }
        Ok(())
    }

    /// Run the transition's actions in declaration order. Action errors are
    /// reported and do not stop later actions.
    fn perform_actions(
        &mut self,
        edge: Edge<S, E>,
        ctx: &mut TransitionContext<S, E>,
    ) -> Result<(), StateMachineError<S, E>> {
        let node = self.graph.require(edge.source)?;
        let Some(transition) = node
            .transitions
            .get(&edge.event)
            .and_then(|list| list.get(edge.index))
        else {
            return Ok(());
        };
        for action in &transition.actions {
            if let Err(error) = action.execute(ctx.argument.as_ref()) {
                self.notifier.user_error(
                    ErrorOrigin::TransitionAction,
                    Some(edge.source),
                    Some(edge.event),
                    error,
                );
            }
        }
        Ok(())
    }
}
