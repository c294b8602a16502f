use crate::{EventArgument, EventId, StateId};

/// Kind of a recorded enter/exit step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Enter,
    Exit,
}

/// One enter or exit step recorded while a transition executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRecord<S> {
    pub state: S,
    pub kind: RecordKind,
}

/// Per-dispatch scratch data.
///
/// Created for every fired event (and once for initial entry, with no
/// event). Collects the enter/exit trace for diagnostics; the event argument
/// lives here so guards and actions can borrow it.
pub(crate) struct TransitionContext<S: StateId, E: EventId> {
    pub(crate) origin: Option<S>,
    pub(crate) event: Option<E>,
    pub(crate) argument: Option<EventArgument>,
    pub(crate) records: Vec<TransitionRecord<S>>,
}

impl<S: StateId, E: EventId> TransitionContext<S, E> {
    pub(crate) fn new(origin: Option<S>, event: Option<E>, argument: Option<EventArgument>) -> Self {
        Self {
            origin,
            event,
            argument,
            records: Vec::new(),
        }
    }

    pub(crate) fn record_enter(&mut self, state: S) {
        self.records.push(TransitionRecord {
            state,
            kind: RecordKind::Enter,
        });
    }

    pub(crate) fn record_exit(&mut self, state: S) {
        self.records.push(TransitionRecord {
            state,
            kind: RecordKind::Exit,
        });
    }

    pub(crate) fn into_records(self) -> Vec<TransitionRecord<S>> {
        self.records
    }
}

/// An event with its argument, as held in driver queues.
pub(crate) struct EventEntry<E> {
    pub(crate) event: E,
    pub(crate) argument: Option<EventArgument>,
}
