use crate::action::{ActionHolder, GuardHolder};
use crate::error::StateMachineError;
use crate::graph::StateGraph;
use crate::state::HistoryMode;
use crate::transition::Transition;
use crate::{EventId, StateId};

/// Cursor-style configuration of one state.
///
/// Obtained from `in_state`. `on` selects the event under configuration;
/// `when` opens a guarded transition, `otherwise` the guard-less fallback
/// (which has to stay last), `goto` and `execute` shape the transition
/// opened most recently:
///
/// ```
/// # use statecraft::prelude::*;
/// # #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
/// # enum State { A, B, C }
/// # #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
/// # enum Event { Go }
/// # let mut machine = PassiveStateMachine::<State, Event>::new("doc");
/// machine
///     .in_state(State::A)
///     .on(Event::Go)
///     .when(|| false).unwrap()
///     .goto(State::B).unwrap()
///     .otherwise().unwrap()
///     .goto(State::C).unwrap();
/// ```
pub struct StateConfigurator<'m, S: StateId, E: EventId> {
    graph: &'m mut StateGraph<S, E>,
    state: S,
    event: Option<E>,
    cursor: Option<usize>,
}

impl<'m, S: StateId, E: EventId> StateConfigurator<'m, S, E> {
    pub(crate) fn new(graph: &'m mut StateGraph<S, E>, state: S) -> Self {
        graph.ensure(state);
        Self {
            graph,
            state,
            event: None,
            cursor: None,
        }
    }

    /// Append an entry action.
    pub fn executes_on_entry<F>(self, action: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        self.executes_on_entry_action(ActionHolder::new("entry action", action))
    }

    /// Append an entry action holder (named, typed or fallible).
    pub fn executes_on_entry_action(self, action: ActionHolder) -> Self {
        self.graph.ensure(self.state).entry_actions.push(action);
        self
    }

    /// Append an exit action.
    pub fn executes_on_exit<F>(self, action: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        self.executes_on_exit_action(ActionHolder::new("exit action", action))
    }

    /// Append an exit action holder (named, typed or fallible).
    pub fn executes_on_exit_action(self, action: ActionHolder) -> Self {
        self.graph.ensure(self.state).exit_actions.push(action);
        self
    }

    /// Set the history mode of this state.
    pub fn with_history(self, mode: HistoryMode) -> Self {
        self.graph.set_history(self.state, mode);
        self
    }

    /// Select the event whose transitions are configured next.
    pub fn on(mut self, event: E) -> Self {
        self.event = Some(event);
        self.cursor = None;
        self
    }

    /// Open a new guarded transition for the selected event.
    pub fn when<F>(self, guard: F) -> Result<Self, StateMachineError<S, E>>
    where
        F: Fn() -> bool + Send + 'static,
    {
        self.when_guard(GuardHolder::new("guard", guard))
    }

    /// Open a new transition guarded by the given holder.
    pub fn when_guard(mut self, guard: GuardHolder) -> Result<Self, StateMachineError<S, E>> {
        let event = self.selected_event()?;
        self.push_transition(event, Transition::internal().guarded_by(guard))?;
        Ok(self)
    }

    /// Open the guard-less fallback transition for the selected event. It
    /// is evaluated after every guarded transition and must stay last.
    pub fn otherwise(mut self) -> Result<Self, StateMachineError<S, E>> {
        let event = self.selected_event()?;
        self.push_transition(event, Transition::internal())?;
        Ok(self)
    }

    /// Set the target of the current transition, opening the guard-less
    /// one when no `when` preceded.
    pub fn goto(mut self, target: S) -> Result<Self, StateMachineError<S, E>> {
        let event = self.selected_event()?;
        self.graph.ensure(target);
        match self.cursor {
            None => {
                self.push_transition(event, Transition::to(target))?;
            }
            Some(index) => {
                let state = self.state;
                let transition = self.current_transition(event, index)?;
                if transition.target.is_some() {
                    return Err(StateMachineError::TargetAlreadySet { state, event });
                }
                transition.target = Some(target);
            }
        }
        Ok(self)
    }

    /// Append an action to the current transition, opening the guard-less
    /// internal one when no `when` or `goto` preceded.
    pub fn execute<F>(self, action: F) -> Result<Self, StateMachineError<S, E>>
    where
        F: Fn() + Send + 'static,
    {
        self.execute_action(ActionHolder::new("action", action))
    }

    /// Append an action holder to the current transition.
    pub fn execute_action(mut self, action: ActionHolder) -> Result<Self, StateMachineError<S, E>> {
        let event = self.selected_event()?;
        if self.cursor.is_none() {
            self.push_transition(event, Transition::internal())?;
        }
        let index = self.cursor.unwrap_or(0);
        self.current_transition(event, index)?.actions.push(action);
        Ok(self)
    }

    fn selected_event(&self) -> Result<E, StateMachineError<S, E>> {
        self.event
            .ok_or(StateMachineError::NoEventSelected(self.state))
    }

    fn push_transition(
        &mut self,
        event: E,
        transition: Transition<S>,
    ) -> Result<(), StateMachineError<S, E>> {
        let node = self.graph.require_mut(self.state)?;
        node.add_transition(event, transition)?;
        let index = node
            .transitions
            .get(&event)
            .map_or(0, |list| list.len().saturating_sub(1));
        self.cursor = Some(index);
        Ok(())
    }

    fn current_transition(
        &mut self,
        event: E,
        index: usize,
    ) -> Result<&mut Transition<S>, StateMachineError<S, E>> {
        self.graph
            .require_mut(self.state)?
            .transitions
            .get_mut(&event)
            .and_then(|list| list.get_mut(index))
            .ok_or(StateMachineError::UnknownState(self.state))
    }
}

/// Cursor-style wiring of a superstate's children.
pub struct HierarchyConfigurator<'m, S: StateId, E: EventId> {
    graph: &'m mut StateGraph<S, E>,
    superstate: S,
}

impl<'m, S: StateId, E: EventId> HierarchyConfigurator<'m, S, E> {
    pub(crate) fn new(graph: &'m mut StateGraph<S, E>, superstate: S) -> Self {
        graph.ensure(superstate);
        Self { graph, superstate }
    }

    /// Set the superstate's history mode.
    pub fn with_history(self, mode: HistoryMode) -> Self {
        self.graph.set_history(self.superstate, mode);
        self
    }

    /// Add `child` as a sub-state and mark it as the initial one.
    pub fn with_initial_sub_state(self, child: S) -> Result<Self, StateMachineError<S, E>> {
        self.graph.set_parent(child, self.superstate)?;
        self.graph.set_initial_child(self.superstate, child)?;
        Ok(self)
    }

    /// Add `child` as a sub-state.
    pub fn with_sub_state(self, child: S) -> Result<Self, StateMachineError<S, E>> {
        self.graph.set_parent(child, self.superstate)?;
        Ok(self)
    }
}
