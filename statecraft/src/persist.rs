use std::collections::HashMap;

use crate::error::DynError;
use crate::StateId;

/// Sink receiving the machine's persistable state.
pub trait StateMachineSaver<S: StateId> {
    /// Record the current leaf state. `None` means the machine had not
    /// entered its initial state yet and must round-trip as uninitialized.
    fn save_current_state(&mut self, current_state: Option<S>) -> Result<(), DynError>;

    /// Record the last-active-child memo of every superstate that has one.
    fn save_history_states(&mut self, history_states: &HashMap<S, S>) -> Result<(), DynError>;
}

/// Source providing previously persisted machine state.
pub trait StateMachineLoader<S: StateId> {
    fn load_current_state(&mut self) -> Result<Option<S>, DynError>;

    /// The superstate-to-last-active-child mapping. Every value must be a
    /// direct child of its key; the machine rejects the load otherwise.
    fn load_history_states(&mut self) -> Result<HashMap<S, S>, DynError>;
}

/// In-memory saver/loader pair.
///
/// History pairs are kept as a plain list so the memento serializes to
/// formats without non-string map keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Memento<S: StateId> {
    current_state: Option<S>,
    history_states: Vec<(S, S)>,
}

impl<S: StateId> Memento<S> {
    pub fn new() -> Self {
        Self {
            current_state: None,
            history_states: Vec::new(),
        }
    }

    pub fn current_state(&self) -> Option<S> {
        self.current_state
    }

    /// The recorded (superstate, last active child) pairs, in no
    /// particular order.
    pub fn history_states(&self) -> &[(S, S)] {
        &self.history_states
    }
}

impl<S: StateId> StateMachineSaver<S> for Memento<S> {
    fn save_current_state(&mut self, current_state: Option<S>) -> Result<(), DynError> {
        self.current_state = current_state;
        Ok(())
    }

    fn save_history_states(&mut self, history_states: &HashMap<S, S>) -> Result<(), DynError> {
        self.history_states = history_states
            .iter()
            .map(|(&parent, &child)| (parent, child))
            .collect();
        Ok(())
    }
}

impl<S: StateId> StateMachineLoader<S> for Memento<S> {
    fn load_current_state(&mut self) -> Result<Option<S>, DynError> {
        Ok(self.current_state)
    }

    fn load_history_states(&mut self) -> Result<HashMap<S, S>, DynError> {
        Ok(self.history_states.iter().copied().collect())
    }
}
