use crate::action::{ActionHolder, GuardHolder};
use crate::StateId;

/// One edge of the state graph.
///
/// The source is bound exactly once, when the transition is added to a
/// state's table. A transition without a target is *internal*: its actions
/// run without exiting or entering any state.
#[derive(Debug)]
pub struct Transition<S: StateId> {
    pub(crate) source: Option<S>,
    pub(crate) target: Option<S>,
    pub(crate) guard: Option<GuardHolder>,
    pub(crate) actions: Vec<ActionHolder>,
}

impl<S: StateId> Transition<S> {
    /// An internal transition: actions only, no exit or entry.
    pub fn internal() -> Self {
        Self {
            source: None,
            target: None,
            guard: None,
            actions: Vec::new(),
        }
    }

    /// A transition targeting `target`.
    pub fn to(target: S) -> Self {
        Self {
            target: Some(target),
            ..Self::internal()
        }
    }

    /// Attach a guard predicate.
    pub fn guarded_by(mut self, guard: GuardHolder) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Append an action, keeping declaration order.
    pub fn with_action(mut self, action: ActionHolder) -> Self {
        self.actions.push(action);
        self
    }

    /// The state this transition was added to, once bound.
    pub fn source(&self) -> Option<S> {
        self.source
    }

    /// The target state; `None` for an internal transition.
    pub fn target(&self) -> Option<S> {
        self.target
    }

    /// The guard predicate, if any.
    pub fn guard(&self) -> Option<&GuardHolder> {
        self.guard.as_ref()
    }

    /// The actions in declaration order.
    pub fn actions(&self) -> &[ActionHolder] {
        &self.actions
    }
}
