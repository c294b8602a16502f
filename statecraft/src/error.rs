use core::fmt;

use thiserror::Error;

use crate::{EventId, StateId};

/// Boxed error produced by user-supplied guards, actions, savers and loaders.
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Everything that can go wrong while defining or driving a state machine.
///
/// Configuration and lifecycle variants are returned to the caller at the
/// point of misuse. Errors from user code (guards and actions) never abort a
/// transition; they are delivered to the exception handler when one is
/// registered and otherwise surface as [`UnhandledUserError`] once the
/// transition has completed.
///
/// [`UnhandledUserError`]: StateMachineError::UnhandledUserError
#[derive(Debug, Error)]
pub enum StateMachineError<S: StateId, E: EventId> {
    /// A state cannot be made its own parent.
    #[error("state `{0:?}` cannot be its own parent")]
    SelfParent(S),

    /// A state has at most one parent.
    #[error("state `{child:?}` already has parent `{parent:?}`")]
    AlreadyHasParent { child: S, parent: S },

    /// Linking the pair would make the parent chain cyclic.
    #[error("state `{child:?}` is an ancestor of `{parent:?}`, linking them would close a cycle")]
    HierarchyCycle { parent: S, child: S },

    /// Initial sub-states and history memos must be direct children.
    #[error("state `{child:?}` is not a direct child of `{parent:?}`")]
    NotADirectChild { parent: S, child: S },

    /// At most one child may be marked initial.
    #[error("state `{parent:?}` already has initial sub-state `{existing:?}`")]
    InitialChildAlreadySet { parent: S, existing: S },

    /// The id does not name a state of this graph.
    #[error("unknown state `{0:?}`")]
    UnknownState(S),

    /// Per state and event at most one transition may omit its guard.
    #[error("state `{state:?}` already has an unguarded transition for event `{event:?}`")]
    MultipleGuardlessTransitions { state: S, event: E },

    /// The unguarded transition must stay last in declaration order.
    #[error(
        "an unguarded transition for event `{event:?}` already exists on state `{state:?}`, \
         guarded transitions must be declared before it"
    )]
    GuardedAfterGuardless { state: S, event: E },

    /// A transition may be added to a state table exactly once.
    #[error("transition is already bound to state `{0:?}`")]
    TransitionAlreadyBound(S),

    /// Transition configuration requires an `on(event)` cursor.
    #[error("no event selected on state `{0:?}`, call `on` first")]
    NoEventSelected(S),

    /// A transition carries at most one target.
    #[error("transition for event `{event:?}` on state `{state:?}` already has a target")]
    TargetAlreadySet { state: S, event: E },

    /// Operation requires a prior call to `initialize`.
    #[error("state machine is not initialized")]
    NotInitialized,

    /// `initialize` may only be called once.
    #[error("state machine is already initialized")]
    AlreadyInitialized,

    /// The initial state may only be entered once.
    #[error("initial state has already been entered")]
    InitialStateAlreadyEntered,

    /// Events can only be fired once the initial state has been entered.
    #[error("initial state has not been entered yet")]
    InitialStateNotEntered,

    /// Persisted state can only be loaded into a machine that was never
    /// initialized.
    #[error("state can only be loaded before initialization")]
    LoadAfterInitialize,

    /// A guard or action failed and no exception handler is registered.
    #[error("unhandled {origin} error")]
    UnhandledUserError {
        origin: ErrorOrigin,
        #[source]
        source: DynError,
    },

    /// The saver rejected the persisted data.
    #[error("saver failed")]
    Saver(#[source] DynError),

    /// The loader produced no usable data.
    #[error("loader failed")]
    Loader(#[source] DynError),

    /// The reporter sink failed.
    #[error("reporter failed")]
    Reporter(#[source] DynError),

    /// The worker thread of an active machine could not be spawned.
    #[error("failed to spawn worker thread")]
    WorkerSpawn(#[source] std::io::Error),

    /// The worker thread of an active machine panicked.
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),
}

/// Where a user-code error originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    Guard,
    TransitionAction,
    EntryAction,
    ExitAction,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorOrigin::Guard => "guard",
            ErrorOrigin::TransitionAction => "transition action",
            ErrorOrigin::EntryAction => "entry action",
            ErrorOrigin::ExitAction => "exit action",
        };
        f.write_str(text)
    }
}

/// Error delivered to the machine's exception handler.
///
/// `state` is the state whose guard or action failed, when known; `event` is
/// absent for failures during initial entry.
#[derive(Debug)]
pub struct ErrorReport<'a, S: StateId, E: EventId> {
    pub origin: ErrorOrigin,
    pub state: Option<S>,
    pub event: Option<E>,
    pub error: &'a (dyn std::error::Error + Send + Sync),
}
