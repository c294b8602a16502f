use crate::error::DynError;
use crate::{EventArgument, EventId, StateId};

/// Read-only view of the machine handed to every extension callback.
#[derive(Debug, Clone, Copy)]
pub struct MachineInfo<'a, S: StateId> {
    pub name: &'a str,
    pub current_state: Option<S>,
}

/// Observer receiving lifecycle notifications at fixed points.
///
/// Extensions are invoked in registration order. All methods default to
/// no-ops; implement the ones of interest. The `initializing_state_machine`
/// and `firing_event` hooks receive their parameters mutably and may
/// rewrite them — the engine sees the value left by the last extension.
#[allow(unused_variables)]
pub trait Extension<S: StateId, E: EventId>: Send {
    /// An event was appended to the tail of a driver queue.
    fn event_queued(&mut self, machine: &MachineInfo<'_, S>, event: &E) {}

    /// An event was inserted at the head of a driver queue.
    fn event_queued_with_priority(&mut self, machine: &MachineInfo<'_, S>, event: &E) {}

    fn started_state_machine(&mut self, machine: &MachineInfo<'_, S>) {}

    fn stopped_state_machine(&mut self, machine: &MachineInfo<'_, S>) {}

    /// About to record the initial state; the id may be rewritten.
    fn initializing_state_machine(&mut self, machine: &MachineInfo<'_, S>, initial_state: &mut S) {}

    fn initialized_state_machine(&mut self, machine: &MachineInfo<'_, S>, initial_state: S) {}

    fn entering_initial_state(&mut self, machine: &MachineInfo<'_, S>, initial_state: S) {}

    /// The initial entry chain completed; `new_state` is the current leaf.
    fn entered_initial_state(&mut self, machine: &MachineInfo<'_, S>, new_state: S) {}

    /// About to dispatch; event and argument may be rewritten.
    fn firing_event(
        &mut self,
        machine: &MachineInfo<'_, S>,
        event: &mut E,
        argument: &mut Option<EventArgument>,
    ) {
    }

    fn fired_event(&mut self, machine: &MachineInfo<'_, S>, event: E) {}

    /// The current state changed. `old_state` is absent for initial entry.
    fn switched_state(&mut self, machine: &MachineInfo<'_, S>, old_state: Option<S>, new_state: S) {
    }

    /// A transition's guard returned `false` (or failed) and the transition
    /// was passed over.
    fn skipped_transition(
        &mut self,
        machine: &MachineInfo<'_, S>,
        source: S,
        target: Option<S>,
        event: E,
    ) {
    }

    /// A transition was chosen; emitted before any exit action runs.
    fn executing_transition(
        &mut self,
        machine: &MachineInfo<'_, S>,
        source: S,
        target: Option<S>,
        event: E,
    ) {
    }

    fn executed_transition(
        &mut self,
        machine: &MachineInfo<'_, S>,
        source: S,
        target: Option<S>,
        event: E,
    ) {
    }

    /// A guard failed; the error may be rewritten before delivery.
    fn handling_guard_exception(&mut self, machine: &MachineInfo<'_, S>, error: &mut DynError) {}

    fn handled_guard_exception(&mut self, machine: &MachineInfo<'_, S>, error: &DynError) {}

    /// A transition action failed; the error may be rewritten before
    /// delivery.
    fn handling_transition_exception(&mut self, machine: &MachineInfo<'_, S>, error: &mut DynError) {
    }

    fn handled_transition_exception(&mut self, machine: &MachineInfo<'_, S>, error: &DynError) {}

    /// An entry action failed; the error may be rewritten before delivery.
    fn handling_entry_action_exception(
        &mut self,
        machine: &MachineInfo<'_, S>,
        error: &mut DynError,
    ) {
    }

    fn handled_entry_action_exception(&mut self, machine: &MachineInfo<'_, S>, error: &DynError) {}

    /// An exit action failed; the error may be rewritten before delivery.
    fn handling_exit_action_exception(
        &mut self,
        machine: &MachineInfo<'_, S>,
        error: &mut DynError,
    ) {
    }

    fn handled_exit_action_exception(&mut self, machine: &MachineInfo<'_, S>, error: &DynError) {}
}

/// Extension forwarding notifications to the `log` facade.
///
/// State switches log at info level, queueing and dispatch chatter at
/// debug, user-code errors at warn.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingExtension;

impl<S: StateId, E: EventId> Extension<S, E> for LoggingExtension {
    fn event_queued(&mut self, machine: &MachineInfo<'_, S>, event: &E) {
        log::debug!("{}: queued {:?}", machine.name, event);
    }

    fn event_queued_with_priority(&mut self, machine: &MachineInfo<'_, S>, event: &E) {
        log::debug!("{}: queued {:?} with priority", machine.name, event);
    }

    fn started_state_machine(&mut self, machine: &MachineInfo<'_, S>) {
        log::info!("{}: started", machine.name);
    }

    fn stopped_state_machine(&mut self, machine: &MachineInfo<'_, S>) {
        log::info!("{}: stopped", machine.name);
    }

    fn initialized_state_machine(&mut self, machine: &MachineInfo<'_, S>, initial_state: S) {
        log::debug!("{}: initialized to {:?}", machine.name, initial_state);
    }

    fn fired_event(&mut self, machine: &MachineInfo<'_, S>, event: E) {
        log::debug!("{}: fired {:?}", machine.name, event);
    }

    fn switched_state(&mut self, machine: &MachineInfo<'_, S>, old_state: Option<S>, new_state: S) {
        match old_state {
            Some(old) => log::info!("{}: {:?} -> {:?}", machine.name, old, new_state),
            None => log::info!("{}: entered {:?}", machine.name, new_state),
        }
    }

    fn skipped_transition(
        &mut self,
        machine: &MachineInfo<'_, S>,
        source: S,
        target: Option<S>,
        event: E,
    ) {
        log::debug!(
            "{}: skipped {:?} -> {:?} on {:?}",
            machine.name,
            source,
            target,
            event
        );
    }

    fn handling_guard_exception(&mut self, machine: &MachineInfo<'_, S>, error: &mut DynError) {
        log::warn!("{}: guard failed: {}", machine.name, error);
    }

    fn handling_transition_exception(&mut self, machine: &MachineInfo<'_, S>, error: &mut DynError) {
        log::warn!("{}: transition action failed: {}", machine.name, error);
    }

    fn handling_entry_action_exception(
        &mut self,
        machine: &MachineInfo<'_, S>,
        error: &mut DynError,
    ) {
        log::warn!("{}: entry action failed: {}", machine.name, error);
    }

    fn handling_exit_action_exception(
        &mut self,
        machine: &MachineInfo<'_, S>,
        error: &mut DynError,
    ) {
        log::warn!("{}: exit action failed: {}", machine.name, error);
    }
}
