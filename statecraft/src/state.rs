use std::collections::HashMap;

use crate::action::ActionHolder;
use crate::error::StateMachineError;
use crate::transition::Transition;
use crate::{EventId, StateId};

/// Policy for choosing the descendant to enter when a superstate is
/// (re-)entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    /// Descend into the initial sub-state chain.
    #[default]
    None,
    /// Re-enter the remembered direct child, then its initial chain.
    Shallow,
    /// Re-enter the remembered chain recursively.
    Deep,
}

/// A node of the state graph.
///
/// Nodes refer to their parent and children by id; all lookups go through
/// the owning [`StateGraph`](crate::StateGraph).
#[derive(Debug)]
pub struct StateNode<S: StateId, E: EventId> {
    pub(crate) id: S,
    pub(crate) parent: Option<S>,
    pub(crate) children: Vec<S>,
    pub(crate) initial_child: Option<S>,
    pub(crate) history: HistoryMode,
    pub(crate) last_active_child: Option<S>,
    pub(crate) depth: usize,
    pub(crate) entry_actions: Vec<ActionHolder>,
    pub(crate) exit_actions: Vec<ActionHolder>,
    pub(crate) transitions: HashMap<E, Vec<Transition<S>>>,
    // Keeps reporting deterministic; HashMap iteration order is not.
    pub(crate) event_order: Vec<E>,
}

impl<S: StateId, E: EventId> StateNode<S, E> {
    pub(crate) fn new(id: S) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            initial_child: None,
            history: HistoryMode::None,
            last_active_child: None,
            depth: 1,
            entry_actions: Vec::new(),
            exit_actions: Vec::new(),
            transitions: HashMap::new(),
            event_order: Vec::new(),
        }
    }

    pub fn id(&self) -> S {
        self.id
    }

    pub fn parent(&self) -> Option<S> {
        self.parent
    }

    pub fn children(&self) -> &[S] {
        &self.children
    }

    pub fn initial_child(&self) -> Option<S> {
        self.initial_child
    }

    pub fn history(&self) -> HistoryMode {
        self.history
    }

    /// The direct child that was most recently exited.
    pub fn last_active_child(&self) -> Option<S> {
        self.last_active_child
    }

    /// Distance from the root; a root state has depth 1.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn entry_actions(&self) -> &[ActionHolder] {
        &self.entry_actions
    }

    pub fn exit_actions(&self) -> &[ActionHolder] {
        &self.exit_actions
    }

    /// Declared transitions grouped per event, in declaration order.
    pub fn transitions(&self) -> impl Iterator<Item = (E, &[Transition<S>])> + '_ {
        self.event_order.iter().filter_map(move |event| {
            self.transitions
                .get(event)
                .map(|list| (*event, list.as_slice()))
        })
    }

    /// Add a transition to this state's table for `event`.
    ///
    /// Binds the transition's source. Per (state, event) at most one
    /// transition may omit its guard, and it must stay last in declaration
    /// order; declaration order is evaluation order.
    pub fn add_transition(
        &mut self,
        event: E,
        mut transition: Transition<S>,
    ) -> Result<(), StateMachineError<S, E>> {
        if let Some(bound) = transition.source {
            return Err(StateMachineError::TransitionAlreadyBound(bound));
        }

        let list = self.transitions.entry(event).or_default();
        if let Some(last) = list.last() {
            if last.guard.is_none() {
                return Err(if transition.guard.is_none() {
                    StateMachineError::MultipleGuardlessTransitions {
                        state: self.id,
                        event,
                    }
                } else {
                    StateMachineError::GuardedAfterGuardless {
                        state: self.id,
                        event,
                    }
                });
            }
        }

        transition.source = Some(self.id);
        if list.is_empty() {
            self.event_order.push(event);
        }
        list.push(transition);
        Ok(())
    }
}
