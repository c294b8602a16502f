use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::builder::{HierarchyConfigurator, StateConfigurator};
use crate::context::{TransitionContext, TransitionRecord};
use crate::engine::{Dispatch, Engine};
use crate::error::{DynError, ErrorOrigin, ErrorReport, StateMachineError};
use crate::extension::{Extension, MachineInfo};
use crate::graph::StateGraph;
use crate::persist::{StateMachineLoader, StateMachineSaver};
use crate::report::Reporter;
use crate::{EventArgument, EventId, StateId};

type ExceptionHandler<S, E> = Box<dyn FnMut(ErrorReport<'_, S, E>) + Send>;

/// Shared handle to the registered extensions.
///
/// The list lives behind its own small lock so that drivers can emit
/// queueing notifications without synchronizing on the machine itself: the
/// lock is only ever held for the duration of one notification fan-out,
/// never across user actions.
pub(crate) type ExtensionList<S, E> = Arc<Mutex<Vec<Box<dyn Extension<S, E>>>>>;

/// Shared handle to the published current state.
pub(crate) type CurrentStateCell<S> = Arc<Mutex<Option<S>>>;

/// Result of one dispatched event.
#[derive(Debug)]
pub enum FireOutcome<S: StateId> {
    /// A transition fired. For internal transitions `old_state` equals
    /// `new_state` and the records are empty.
    Completed {
        old_state: S,
        new_state: S,
        /// The enter/exit steps taken, in order.
        records: Vec<TransitionRecord<S>>,
    },
    /// No transition accepted the event.
    Declined,
}

impl<S: StateId> FireOutcome<S> {
    pub fn is_completed(&self) -> bool {
        matches!(self, FireOutcome::Completed { .. })
    }

    pub fn is_declined(&self) -> bool {
        matches!(self, FireOutcome::Declined)
    }
}

/// Common surface of the passive and active drivers.
///
/// `fire` and `fire_priority` enqueue; whether the event is processed
/// before the call returns depends on the driver.
pub trait StateMachine<S: StateId, E: EventId> {
    /// Enqueue an event at the tail of the queue.
    fn fire(&mut self, event: E) -> Result<(), StateMachineError<S, E>> {
        self.fire_with(event, None)
    }

    /// Enqueue an event with an argument at the tail of the queue.
    fn fire_with(
        &mut self,
        event: E,
        argument: Option<EventArgument>,
    ) -> Result<(), StateMachineError<S, E>>;

    /// Enqueue an event at the head of the queue.
    fn fire_priority(&mut self, event: E) -> Result<(), StateMachineError<S, E>> {
        self.fire_priority_with(event, None)
    }

    /// Enqueue an event with an argument at the head of the queue.
    fn fire_priority_with(
        &mut self,
        event: E,
        argument: Option<EventArgument>,
    ) -> Result<(), StateMachineError<S, E>>;

    /// Begin processing events. Anything queued beforehand is drained.
    fn start(&mut self) -> Result<(), StateMachineError<S, E>>;

    /// Stop processing events. Queued events are retained for a later
    /// `start`.
    fn stop(&mut self) -> Result<(), StateMachineError<S, E>>;

    fn is_running(&self) -> bool;

    /// Record the initial state. May be called once, before any event is
    /// processed; the initial state is entered when the driver starts.
    fn initialize(&mut self, initial_state: S) -> Result<(), StateMachineError<S, E>>;

    /// The current leaf state, `None` until the initial state was entered.
    fn current_state(&self) -> Option<S>;

    fn name(&self) -> &str;

    fn add_extension(&mut self, extension: Box<dyn Extension<S, E>>);

    fn clear_extensions(&mut self);

    /// Persist the current state and all history memos.
    fn save(&self, saver: &mut dyn StateMachineSaver<S>) -> Result<(), StateMachineError<S, E>>;

    /// Restore state persisted by [`save`](Self::save). Only allowed on a
    /// machine that was never initialized.
    fn load(&mut self, loader: &mut dyn StateMachineLoader<S>)
        -> Result<(), StateMachineError<S, E>>;

    /// Feed the declared graph to a reporter sink.
    fn report(&self, reporter: &mut dyn Reporter<S, E>) -> Result<(), StateMachineError<S, E>>;
}

/// Notification fan-out shared by the façade and the engine: the extension
/// list, the exception channel, and the published current state.
pub(crate) struct Notifier<S: StateId, E: EventId> {
    pub(crate) name: String,
    current_state: CurrentStateCell<S>,
    extensions: ExtensionList<S, E>,
    exception_handler: Option<ExceptionHandler<S, E>>,
    pending_error: Option<(ErrorOrigin, DynError)>,
}

macro_rules! notify {
    ($self:ident, $method:ident $(, $arg:expr)*) => {{
        let info = MachineInfo {
            name: &$self.name,
            current_state: *$self.current_state.lock(),
        };
        let mut extensions = $self.extensions.lock();
        for extension in extensions.iter_mut() {
            extension.$method(&info $(, $arg)*);
        }
    }};
}

impl<S: StateId, E: EventId> Notifier<S, E> {
    fn new(name: String) -> Self {
        Self {
            name,
            current_state: Arc::new(Mutex::new(None)),
            extensions: Arc::new(Mutex::new(Vec::new())),
            exception_handler: None,
            pending_error: None,
        }
    }

    pub(crate) fn current_state(&self) -> Option<S> {
        *self.current_state.lock()
    }

    fn set_current_state(&self, state: S) {
        *self.current_state.lock() = Some(state);
    }

    pub(crate) fn current_state_cell(&self) -> CurrentStateCell<S> {
        Arc::clone(&self.current_state)
    }

    pub(crate) fn extension_list(&self) -> ExtensionList<S, E> {
        Arc::clone(&self.extensions)
    }

    pub(crate) fn event_queued(&mut self, event: E, priority: bool) {
        if priority {
            notify!(self, event_queued_with_priority, &event);
        } else {
            notify!(self, event_queued, &event);
        }
    }

    pub(crate) fn started(&mut self) {
        notify!(self, started_state_machine);
    }

    pub(crate) fn stopped(&mut self) {
        notify!(self, stopped_state_machine);
    }

    fn initializing(&mut self, initial_state: &mut S) {
        notify!(self, initializing_state_machine, initial_state);
    }

    fn initialized(&mut self, initial_state: S) {
        notify!(self, initialized_state_machine, initial_state);
    }

    fn entering_initial_state(&mut self, initial_state: S) {
        notify!(self, entering_initial_state, initial_state);
    }

    fn entered_initial_state(&mut self, new_state: S) {
        notify!(self, entered_initial_state, new_state);
    }

    fn firing_event(&mut self, event: &mut E, argument: &mut Option<EventArgument>) {
        notify!(self, firing_event, event, argument);
    }

    fn fired_event(&mut self, event: E) {
        notify!(self, fired_event, event);
    }

    pub(crate) fn switched_state(&mut self, old_state: Option<S>, new_state: S) {
        notify!(self, switched_state, old_state, new_state);
    }

    pub(crate) fn skipped_transition(&mut self, source: S, target: Option<S>, event: E) {
        notify!(self, skipped_transition, source, target, event);
    }

    pub(crate) fn executing_transition(&mut self, source: S, target: Option<S>, event: E) {
        notify!(self, executing_transition, source, target, event);
    }

    pub(crate) fn executed_transition(&mut self, source: S, target: Option<S>, event: E) {
        notify!(self, executed_transition, source, target, event);
    }

    /// Funnel a user-code error: bracket it with the handling/handled
    /// extension notifications, deliver it to the exception handler, or
    /// keep the first one to surface once the transition completed.
    pub(crate) fn user_error(
        &mut self,
        origin: ErrorOrigin,
        state: Option<S>,
        event: Option<E>,
        mut error: DynError,
    ) {
        match origin {
            ErrorOrigin::Guard => notify!(self, handling_guard_exception, &mut error),
            ErrorOrigin::TransitionAction => {
                notify!(self, handling_transition_exception, &mut error)
            }
            ErrorOrigin::EntryAction => notify!(self, handling_entry_action_exception, &mut error),
            ErrorOrigin::ExitAction => notify!(self, handling_exit_action_exception, &mut error),
        }

        let handled = if let Some(handler) = self.exception_handler.as_mut() {
            handler(ErrorReport {
                origin,
                state,
                event,
                error: error.as_ref(),
            });
            true
        } else {
            false
        };

        match origin {
            ErrorOrigin::Guard => notify!(self, handled_guard_exception, &error),
            ErrorOrigin::TransitionAction => notify!(self, handled_transition_exception, &error),
            ErrorOrigin::EntryAction => notify!(self, handled_entry_action_exception, &error),
            ErrorOrigin::ExitAction => notify!(self, handled_exit_action_exception, &error),
        }

        if !handled && self.pending_error.is_none() {
            self.pending_error = Some((origin, error));
        }
    }

    fn take_pending_error(&mut self) -> Option<(ErrorOrigin, DynError)> {
        self.pending_error.take()
    }
}

/// The machine façade shared by both drivers: owns the graph, the current
/// state, the one-shot initial-state handle and the extension list.
///
/// Most users interact with a driver instead; building a `MachineCore`
/// directly is the entry point for custom drivers and for configuring an
/// [`ActiveStateMachine`](crate::ActiveStateMachine) before it is started.
pub struct MachineCore<S: StateId, E: EventId> {
    graph: StateGraph<S, E>,
    initial: Option<S>,
    entered: bool,
    pub(crate) notifier: Notifier<S, E>,
}

impl<S: StateId, E: EventId> MachineCore<S, E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            graph: StateGraph::new(),
            initial: None,
            entered: false,
            notifier: Notifier::new(name.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.notifier.name
    }

    /// The current leaf state, `None` until the initial state was entered.
    pub fn current_state(&self) -> Option<S> {
        self.notifier.current_state()
    }

    /// The declared state graph.
    pub fn graph(&self) -> &StateGraph<S, E> {
        &self.graph
    }

    /// Begin configuring `state`, creating it on first mention.
    pub fn in_state(&mut self, state: S) -> StateConfigurator<'_, S, E> {
        StateConfigurator::new(&mut self.graph, state)
    }

    /// Begin wiring sub-states of `superstate`.
    pub fn hierarchy(&mut self, superstate: S) -> HierarchyConfigurator<'_, S, E> {
        HierarchyConfigurator::new(&mut self.graph, superstate)
    }

    pub fn add_extension(&mut self, extension: Box<dyn Extension<S, E>>) {
        self.notifier.extensions.lock().push(extension);
    }

    pub fn clear_extensions(&mut self) {
        self.notifier.extensions.lock().clear();
    }

    /// Install the sink receiving guard/action errors. Without one, such an
    /// error is returned wrapped from the dispatching call.
    pub fn set_exception_handler<F>(&mut self, handler: F)
    where
        F: FnMut(ErrorReport<'_, S, E>) + Send + 'static,
    {
        self.notifier.exception_handler = Some(Box::new(handler));
    }

    /// Record the initial state. Fails on a second call.
    pub fn initialize(&mut self, initial_state: S) -> Result<(), StateMachineError<S, E>> {
        if self.initial.is_some() || self.entered {
            return Err(StateMachineError::AlreadyInitialized);
        }
        let mut initial = initial_state;
        self.notifier.initializing(&mut initial);
        self.graph.ensure(initial);
        self.initial = Some(initial);
        self.notifier.initialized(initial);
        Ok(())
    }

    /// `true` once `initialize` was called but the initial state has not
    /// been entered yet.
    pub fn needs_initial_entry(&self) -> bool {
        self.initial.is_some() && !self.entered
    }

    /// Walk the initial state's shallow-entry chain down to a leaf, which
    /// becomes the current state. May only run once.
    pub fn enter_initial_state(&mut self) -> Result<(), StateMachineError<S, E>> {
        let initial = self.initial.ok_or(StateMachineError::NotInitialized)?;
        if self.entered {
            return Err(StateMachineError::InitialStateAlreadyEntered);
        }

        self.notifier.entering_initial_state(initial);
        let mut ctx = TransitionContext::new(None, None, None);
        let leaf = {
            let mut engine = Engine {
                graph: &mut self.graph,
                notifier: &mut self.notifier,
            };
            engine.enter_initial(initial, &mut ctx)?
        };
        self.entered = true;
        self.notifier.set_current_state(leaf);
        self.notifier.switched_state(None, leaf);
        self.notifier.entered_initial_state(leaf);

        if let Some((origin, source)) = self.notifier.take_pending_error() {
            return Err(StateMachineError::UnhandledUserError { origin, source });
        }
        Ok(())
    }

    /// Dispatch one event through the engine.
    pub fn fire(
        &mut self,
        event: E,
        argument: Option<EventArgument>,
    ) -> Result<FireOutcome<S>, StateMachineError<S, E>> {
        if self.initial.is_none() && !self.entered {
            return Err(StateMachineError::NotInitialized);
        }
        let current = self
            .notifier
            .current_state()
            .ok_or(StateMachineError::InitialStateNotEntered)?;

        let mut event = event;
        let mut argument = argument;
        self.notifier.firing_event(&mut event, &mut argument);

        let mut ctx = TransitionContext::new(Some(current), Some(event), argument);
        let dispatch = {
            let mut engine = Engine {
                graph: &mut self.graph,
                notifier: &mut self.notifier,
            };
            engine.dispatch(current, event, &mut ctx)?
        };

        let outcome = match dispatch {
            Dispatch::Fired {
                new_state,
                external,
            } => {
                if external {
                    self.notifier.set_current_state(new_state);
                    self.notifier.switched_state(Some(current), new_state);
                }
                FireOutcome::Completed {
                    old_state: current,
                    new_state,
                    records: ctx.into_records(),
                }
            }
            Dispatch::Declined => FireOutcome::Declined,
        };
        self.notifier.fired_event(event);

        if let Some((origin, source)) = self.notifier.take_pending_error() {
            return Err(StateMachineError::UnhandledUserError { origin, source });
        }
        Ok(outcome)
    }

    /// Persist the current state and the history memo of every superstate
    /// that has one.
    ///
    /// The current state is recorded as absent until the initial state has
    /// actually been entered, so an initialized-but-not-started machine
    /// round-trips as uninitialized.
    pub fn save(&self, saver: &mut dyn StateMachineSaver<S>) -> Result<(), StateMachineError<S, E>> {
        saver
            .save_current_state(self.notifier.current_state())
            .map_err(StateMachineError::Saver)?;
        let history: HashMap<S, S> = self
            .graph
            .iter()
            .filter_map(|node| node.last_active_child().map(|child| (node.id(), child)))
            .collect();
        saver
            .save_history_states(&history)
            .map_err(StateMachineError::Saver)
    }

    /// Restore persisted state into a machine that was never initialized.
    ///
    /// Every history pair is validated before anything is applied: the
    /// value must be a direct child of the claimed superstate.
    pub fn load(
        &mut self,
        loader: &mut dyn StateMachineLoader<S>,
    ) -> Result<(), StateMachineError<S, E>> {
        if self.initial.is_some() || self.entered {
            return Err(StateMachineError::LoadAfterInitialize);
        }

        let current = loader
            .load_current_state()
            .map_err(StateMachineError::Loader)?;
        let history = loader
            .load_history_states()
            .map_err(StateMachineError::Loader)?;

        if let Some(state) = current {
            if !self.graph.contains(state) {
                return Err(StateMachineError::UnknownState(state));
            }
        }
        for (&parent, &child) in &history {
            let node = self.graph.require(child)?;
            if node.parent() != Some(parent) {
                return Err(StateMachineError::NotADirectChild { parent, child });
            }
        }

        for (&parent, &child) in &history {
            self.graph.set_last_active(parent, child);
        }
        if let Some(state) = current {
            self.entered = true;
            self.notifier.set_current_state(state);
        }
        Ok(())
    }

    /// Feed the declared graph to a reporter sink.
    pub fn report(&self, reporter: &mut dyn Reporter<S, E>) -> Result<(), StateMachineError<S, E>> {
        reporter
            .report(self.name(), &self.graph, self.initial)
            .map_err(StateMachineError::Reporter)
    }
}
