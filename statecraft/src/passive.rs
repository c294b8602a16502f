use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::builder::{HierarchyConfigurator, StateConfigurator};
use crate::context::EventEntry;
use crate::error::{ErrorReport, StateMachineError};
use crate::extension::Extension;
use crate::machine::{MachineCore, StateMachine};
use crate::persist::{StateMachineLoader, StateMachineSaver};
use crate::report::Reporter;
use crate::{EventArgument, EventId, StateId};

type SharedQueue<E> = Arc<Mutex<VecDeque<EventEntry<E>>>>;

/// Driver processing events synchronously on the caller thread.
///
/// `fire` enqueues the event and pumps the queue. The pump is guarded
/// against re-entrancy: an event fired from within an action (through a
/// [`PassiveEventSender`]) is appended to the queue and processed by the
/// already running pump once the current transition completed. Events fired
/// while the machine is stopped accumulate until [`start`] drains them.
///
/// [`start`]: StateMachine::start
pub struct PassiveStateMachine<S: StateId, E: EventId> {
    core: MachineCore<S, E>,
    queue: SharedQueue<E>,
    executing: bool,
    running: bool,
}

/// Cloneable enqueue-only handle into a passive machine's queue.
///
/// Actions and guards cannot borrow the machine they run under; they fire
/// follow-up events through this handle instead. Enqueued events are picked
/// up by the pump that is currently draining the queue, or by the next
/// `fire`/`start` on the machine.
#[derive(Clone)]
pub struct PassiveEventSender<E: EventId> {
    queue: SharedQueue<E>,
}

impl<E: EventId> PassiveEventSender<E> {
    /// Append an event at the tail of the queue.
    pub fn fire(&self, event: E) {
        self.fire_with(event, None);
    }

    pub fn fire_with(&self, event: E, argument: Option<EventArgument>) {
        self.queue
            .lock().unwrap()
            .push_back(EventEntry { event, argument });
    }

    /// Insert an event at the head of the queue.
    pub fn fire_priority(&self, event: E) {
        self.fire_priority_with(event, None);
    }

    pub fn fire_priority_with(&self, event: E, argument: Option<EventArgument>) {
        self.queue
            .lock().unwrap()
            .push_front(EventEntry { event, argument });
    }
}

impl<S: StateId, E: EventId> PassiveStateMachine<S, E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_core(MachineCore::new(name))
    }

    /// Wrap an already configured [`MachineCore`].
    pub fn from_core(core: MachineCore<S, E>) -> Self {
        Self {
            core,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            executing: false,
            running: false,
        }
    }

    /// Begin configuring `state`, creating it on first mention.
    pub fn in_state(&mut self, state: S) -> StateConfigurator<'_, S, E> {
        self.core.in_state(state)
    }

    /// Begin wiring sub-states of `superstate`.
    pub fn hierarchy(&mut self, superstate: S) -> HierarchyConfigurator<'_, S, E> {
        self.core.hierarchy(superstate)
    }

    /// A handle for firing events from within actions and guards.
    pub fn event_sender(&self) -> PassiveEventSender<E> {
        PassiveEventSender {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Install the sink receiving guard/action errors. Without one, such an
    /// error is returned from the `fire` or `start` call that pumped the
    /// failing event.
    pub fn set_exception_handler<F>(&mut self, handler: F)
    where
        F: FnMut(ErrorReport<'_, S, E>) + Send + 'static,
    {
        self.core.set_exception_handler(handler);
    }

    fn execute_pending(&mut self) -> Result<(), StateMachineError<S, E>> {
        if self.executing || !self.running {
            return Ok(());
        }
        self.executing = true;
        let result = self.pump();
        self.executing = false;
        result
    }

    fn pump(&mut self) -> Result<(), StateMachineError<S, E>> {
        loop {
            if self.core.needs_initial_entry() {
                self.core.enter_initial_state()?;
            }
            // The queue borrow must not span the dispatch: actions may
            // enqueue through a sender while the event is processed.
            let entry = self.queue.lock().unwrap().pop_front();
            match entry {
                Some(entry) => {
                    self.core.fire(entry.event, entry.argument)?;
                }
                None => return Ok(()),
            }
        }
    }
}

impl<S: StateId, E: EventId> StateMachine<S, E> for PassiveStateMachine<S, E> {
    fn fire_with(
        &mut self,
        event: E,
        argument: Option<EventArgument>,
    ) -> Result<(), StateMachineError<S, E>> {
        self.queue
            .lock().unwrap()
            .push_back(EventEntry { event, argument });
        self.core.notifier.event_queued(event, false);
        self.execute_pending()
    }

    fn fire_priority_with(
        &mut self,
        event: E,
        argument: Option<EventArgument>,
    ) -> Result<(), StateMachineError<S, E>> {
        self.queue
            .lock().unwrap()
            .push_front(EventEntry { event, argument });
        self.core.notifier.event_queued(event, true);
        self.execute_pending()
    }

    fn start(&mut self) -> Result<(), StateMachineError<S, E>> {
        if self.running {
            return Ok(());
        }
        self.running = true;
        self.core.notifier.started();
        log::debug!("{}: passive driver started", self.core.name());
        self.execute_pending()
    }

    fn stop(&mut self) -> Result<(), StateMachineError<S, E>> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        self.core.notifier.stopped();
        log::debug!("{}: passive driver stopped", self.core.name());
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn initialize(&mut self, initial_state: S) -> Result<(), StateMachineError<S, E>> {
        self.core.initialize(initial_state)?;
        if self.running {
            self.core.enter_initial_state()?;
        }
        Ok(())
    }

    fn current_state(&self) -> Option<S> {
        self.core.current_state()
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    fn add_extension(&mut self, extension: Box<dyn Extension<S, E>>) {
        self.core.add_extension(extension);
    }

    fn clear_extensions(&mut self) {
        self.core.clear_extensions();
    }

    fn save(&self, saver: &mut dyn StateMachineSaver<S>) -> Result<(), StateMachineError<S, E>> {
        self.core.save(saver)
    }

    fn load(
        &mut self,
        loader: &mut dyn StateMachineLoader<S>,
    ) -> Result<(), StateMachineError<S, E>> {
        self.core.load(loader)
    }

    fn report(&self, reporter: &mut dyn Reporter<S, E>) -> Result<(), StateMachineError<S, E>> {
        self.core.report(reporter)
    }
}
