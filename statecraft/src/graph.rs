use std::collections::HashMap;

use crate::error::StateMachineError;
use crate::state::{HistoryMode, StateNode};
use crate::{EventId, StateId};

/// Arena of [`StateNode`]s keyed by state id.
///
/// States are created lazily on first mention. Parent/child links are stored
/// as ids on both sides, so the hierarchy never holds references into
/// itself. Iteration follows insertion order.
#[derive(Debug, Default)]
pub struct StateGraph<S: StateId, E: EventId> {
    states: HashMap<S, StateNode<S, E>>,
    order: Vec<S>,
}

impl<S: StateId, E: EventId> StateGraph<S, E> {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Look up a state.
    pub fn state(&self, id: S) -> Option<&StateNode<S, E>> {
        self.states.get(&id)
    }

    pub fn contains(&self, id: S) -> bool {
        self.states.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All states in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &StateNode<S, E>> + '_ {
        self.order.iter().filter_map(move |id| self.states.get(id))
    }

    pub(crate) fn ensure(&mut self, id: S) -> &mut StateNode<S, E> {
        self.states.entry(id).or_insert_with(|| {
            self.order.push(id);
            StateNode::new(id)
        })
    }

    pub(crate) fn require(&self, id: S) -> Result<&StateNode<S, E>, StateMachineError<S, E>> {
        self.states.get(&id).ok_or(StateMachineError::UnknownState(id))
    }

    pub(crate) fn require_mut(
        &mut self,
        id: S,
    ) -> Result<&mut StateNode<S, E>, StateMachineError<S, E>> {
        self.states
            .get_mut(&id)
            .ok_or(StateMachineError::UnknownState(id))
    }

    /// Make `child` a sub-state of `parent`.
    ///
    /// A state may not be its own parent, has at most one parent, and the
    /// parent chain must stay acyclic. Depths of the whole subtree below
    /// `child` are recomputed.
    pub fn set_parent(&mut self, child: S, parent: S) -> Result<(), StateMachineError<S, E>> {
        if child == parent {
            return Err(StateMachineError::SelfParent(child));
        }
        if let Some(existing) = self.ensure(child).parent {
            return Err(StateMachineError::AlreadyHasParent {
                child,
                parent: existing,
            });
        }
        if self.is_ancestor(child, parent) {
            return Err(StateMachineError::HierarchyCycle { parent, child });
        }

        self.ensure(parent).children.push(child);
        self.ensure(child).parent = Some(parent);
        self.refresh_depths(child);
        Ok(())
    }

    /// Mark `child` as the state entered when `parent` is entered without
    /// history. Seeds the history memo so deep-history first entry is
    /// well defined.
    pub fn set_initial_child(&mut self, parent: S, child: S) -> Result<(), StateMachineError<S, E>> {
        let node = self.require(child)?;
        if node.parent != Some(parent) {
            return Err(StateMachineError::NotADirectChild { parent, child });
        }
        let node = self.require_mut(parent)?;
        if let Some(existing) = node.initial_child {
            return Err(StateMachineError::InitialChildAlreadySet { parent, existing });
        }
        node.initial_child = Some(child);
        node.last_active_child = Some(child);
        Ok(())
    }

    pub fn set_history(&mut self, id: S, mode: HistoryMode) {
        self.ensure(id).history = mode;
    }

    pub(crate) fn set_last_active(&mut self, parent: S, child: S) {
        if let Some(node) = self.states.get_mut(&parent) {
            node.last_active_child = Some(child);
        }
    }

    /// `true` when `ancestor` lies on `state`'s parent chain. A state is its
    /// own ancestor.
    pub fn is_ancestor(&self, ancestor: S, state: S) -> bool {
        let mut current = Some(state);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.states.get(&id).and_then(|node| node.parent);
        }
        false
    }

    fn refresh_depths(&mut self, root: S) {
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            let depth = match self.states.get(&id).and_then(|node| node.parent) {
                Some(parent) => self.states.get(&parent).map_or(1, |node| node.depth + 1),
                None => 1,
            };
            if let Some(node) = self.states.get_mut(&id) {
                node.depth = depth;
                pending.extend(node.children.iter().copied());
            }
        }
    }
}
