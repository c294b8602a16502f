use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::context::EventEntry;
use crate::error::{ErrorReport, StateMachineError};
use crate::extension::{Extension, MachineInfo};
use crate::machine::{CurrentStateCell, ExtensionList, MachineCore, StateMachine};
use crate::persist::{StateMachineLoader, StateMachineSaver};
use crate::report::Reporter;
use crate::{EventArgument, EventId, StateId};

struct QueueInner<E> {
    events: VecDeque<EventEntry<E>>,
    cancelled: bool,
}

struct EventQueue<E> {
    inner: Mutex<QueueInner<E>>,
    ready: Condvar,
}

impl<E: EventId> EventQueue<E> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                events: VecDeque::new(),
                cancelled: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Insert at tail (or head for priority) and wake the worker.
    fn push(&self, entry: EventEntry<E>, priority: bool) {
        let mut inner = self.inner.lock();
        if priority {
            inner.events.push_front(entry);
        } else {
            inner.events.push_back(entry);
        }
        self.ready.notify_one();
    }
}

/// What the worker found after taking the queue lock.
enum Wake<E> {
    Entry(EventEntry<E>),
    Cancelled,
    Recheck,
}

/// Driver processing events on a dedicated worker thread.
///
/// Producers on any thread enqueue through [`fire`]/[`fire_priority`] (or an
/// [`ActiveEventSender`] from within actions) and return without waiting for
/// the event to be processed. Priority events are processed before anything
/// enqueued after them, most recent first; normal events keep FIFO order.
///
/// [`stop`] signals cooperative cancellation and joins the worker: the
/// in-flight transition runs to completion, events still queued are retained
/// for a later [`start`], and a worker that terminated abnormally surfaces
/// its fault out of [`stop`].
///
/// The machine is configured through a [`MachineCore`] before being wrapped:
///
/// ```
/// use statecraft::prelude::*;
///
/// #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
/// enum State { Idle, Busy }
/// #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
/// enum Event { Work }
///
/// let mut core = MachineCore::new("worker");
/// core.in_state(State::Idle).on(Event::Work).goto(State::Busy).unwrap();
/// core.initialize(State::Idle).unwrap();
///
/// let mut machine = ActiveStateMachine::from_core(core);
/// machine.start().unwrap();
/// machine.fire(Event::Work).unwrap();
/// machine.stop().unwrap();
/// ```
///
/// [`fire`]: StateMachine::fire
/// [`fire_priority`]: StateMachine::fire_priority
/// [`start`]: StateMachine::start
/// [`stop`]: StateMachine::stop
pub struct ActiveStateMachine<S: StateId, E: EventId> {
    name: String,
    core: Arc<Mutex<MachineCore<S, E>>>,
    queue: Arc<EventQueue<E>>,
    // Shared with the core's notifier; lets producers publish queueing
    // notifications and read the current state without contending on the
    // machine mutex while a dispatch is in flight.
    extensions: ExtensionList<S, E>,
    current: CurrentStateCell<S>,
    worker: Option<JoinHandle<Result<(), StateMachineError<S, E>>>>,
}

/// Cloneable enqueue-only handle into an active machine's queue.
///
/// Safe to use from any thread, including from within actions running on
/// the worker.
pub struct ActiveEventSender<E: EventId> {
    queue: Arc<EventQueue<E>>,
}

impl<E: EventId> Clone for ActiveEventSender<E> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<E: EventId> ActiveEventSender<E> {
    /// Append an event at the tail of the queue.
    pub fn fire(&self, event: E) {
        self.fire_with(event, None);
    }

    pub fn fire_with(&self, event: E, argument: Option<EventArgument>) {
        self.queue.push(EventEntry { event, argument }, false);
    }

    /// Insert an event at the head of the queue.
    pub fn fire_priority(&self, event: E) {
        self.fire_priority_with(event, None);
    }

    pub fn fire_priority_with(&self, event: E, argument: Option<EventArgument>) {
        self.queue.push(EventEntry { event, argument }, true);
    }
}

impl<S: StateId, E: EventId> ActiveStateMachine<S, E> {
    /// Wrap an already configured [`MachineCore`].
    pub fn from_core(core: MachineCore<S, E>) -> Self {
        Self {
            name: core.name().to_owned(),
            extensions: core.notifier.extension_list(),
            current: core.notifier.current_state_cell(),
            core: Arc::new(Mutex::new(core)),
            queue: Arc::new(EventQueue::new()),
            worker: None,
        }
    }

    /// A handle for firing events from any thread without going through
    /// the machine.
    pub fn event_sender(&self) -> ActiveEventSender<E> {
        ActiveEventSender {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Install the sink receiving guard/action errors. Without one, such an
    /// error terminates the worker and surfaces out of `stop`.
    pub fn set_exception_handler<F>(&mut self, handler: F)
    where
        F: FnMut(ErrorReport<'_, S, E>) + Send + 'static,
    {
        self.core.lock().set_exception_handler(handler);
    }

    fn notify_queued(&self, event: E, priority: bool) {
        let info = MachineInfo {
            name: &self.name,
            current_state: *self.current.lock(),
        };
        let mut extensions = self.extensions.lock();
        for extension in extensions.iter_mut() {
            if priority {
                extension.event_queued_with_priority(&info, &event);
            } else {
                extension.event_queued(&info, &event);
            }
        }
    }
}

fn worker_loop<S: StateId, E: EventId>(
    core: Arc<Mutex<MachineCore<S, E>>>,
    queue: Arc<EventQueue<E>>,
) -> Result<(), StateMachineError<S, E>> {
    loop {
        {
            let mut core = core.lock();
            if core.needs_initial_entry() {
                core.enter_initial_state()?;
            }
        }

        let wake = {
            let mut inner = queue.inner.lock();
            if inner.cancelled {
                Wake::Cancelled
            } else if let Some(entry) = inner.events.pop_front() {
                Wake::Entry(entry)
            } else {
                queue.ready.wait(&mut inner);
                // Woken by a producer, by `stop`, or by `initialize`;
                // cancellation wins over anything still queued.
                if inner.cancelled {
                    Wake::Cancelled
                } else if let Some(entry) = inner.events.pop_front() {
                    Wake::Entry(entry)
                } else {
                    Wake::Recheck
                }
            }
        };

        match wake {
            // Dispatch outside the queue lock so producers never wait on
            // a running transition.
            Wake::Entry(entry) => {
                core.lock().fire(entry.event, entry.argument)?;
            }
            Wake::Cancelled => return Ok(()),
            Wake::Recheck => continue,
        }
    }
}

impl<S: StateId, E: EventId> StateMachine<S, E> for ActiveStateMachine<S, E> {
    fn fire_with(
        &mut self,
        event: E,
        argument: Option<EventArgument>,
    ) -> Result<(), StateMachineError<S, E>> {
        self.queue.push(EventEntry { event, argument }, false);
        self.notify_queued(event, false);
        Ok(())
    }

    fn fire_priority_with(
        &mut self,
        event: E,
        argument: Option<EventArgument>,
    ) -> Result<(), StateMachineError<S, E>> {
        self.queue.push(EventEntry { event, argument }, true);
        self.notify_queued(event, true);
        Ok(())
    }

    fn start(&mut self) -> Result<(), StateMachineError<S, E>> {
        if self.worker.is_some() {
            return Ok(());
        }
        {
            let mut inner = self.queue.inner.lock();
            inner.cancelled = false;
        }
        self.core.lock().notifier.started();
        log::debug!("{}: worker starting", self.name);

        let core = Arc::clone(&self.core);
        let queue = Arc::clone(&self.queue);
        let handle = thread::Builder::new()
            .name(format!("{} worker", self.name))
            .spawn(move || worker_loop(core, queue))
            .map_err(StateMachineError::WorkerSpawn)?;
        self.worker = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), StateMachineError<S, E>> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        {
            // Cancellation and the wake-up pulse happen under the queue
            // lock, closing the race against a worker about to wait.
            let mut inner = self.queue.inner.lock();
            inner.cancelled = true;
            self.queue.ready.notify_all();
        }
        log::debug!("{}: worker stopping", self.name);

        match worker.join() {
            Ok(Ok(())) => {
                self.core.lock().notifier.stopped();
                Ok(())
            }
            Ok(Err(error)) => Err(error),
            Err(panic) => Err(StateMachineError::WorkerPanicked(panic_text(&panic))),
        }
    }

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    fn initialize(&mut self, initial_state: S) -> Result<(), StateMachineError<S, E>> {
        self.core.lock().initialize(initial_state)?;
        // Wake a parked worker so it performs the initial entry.
        let _inner = self.queue.inner.lock();
        self.queue.ready.notify_all();
        Ok(())
    }

    fn current_state(&self) -> Option<S> {
        *self.current.lock()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn add_extension(&mut self, extension: Box<dyn Extension<S, E>>) {
        self.extensions.lock().push(extension);
    }

    fn clear_extensions(&mut self) {
        self.extensions.lock().clear();
    }

    fn save(&self, saver: &mut dyn StateMachineSaver<S>) -> Result<(), StateMachineError<S, E>> {
        self.core.lock().save(saver)
    }

    fn load(
        &mut self,
        loader: &mut dyn StateMachineLoader<S>,
    ) -> Result<(), StateMachineError<S, E>> {
        self.core.lock().load(loader)
    }

    fn report(&self, reporter: &mut dyn Reporter<S, E>) -> Result<(), StateMachineError<S, E>> {
        self.core.lock().report(reporter)
    }
}

impl<S: StateId, E: EventId> Drop for ActiveStateMachine<S, E> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let mut inner = self.queue.inner.lock();
            inner.cancelled = true;
            self.queue.ready.notify_all();
            drop(inner);
            let _ = worker.join();
        }
    }
}

fn panic_text(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "worker thread panicked".to_owned()
    }
}
