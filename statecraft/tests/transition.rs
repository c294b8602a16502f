use std::sync::{Arc, Mutex};

use statecraft::prelude::*;
use statecraft::{RecordKind, TransitionRecord};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum State {
    A,
    B,
    C,
    D,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum Event {
    E1,
    E2,
    E3,
    E4,
}

fn enter(state: State) -> TransitionRecord<State> {
    TransitionRecord {
        state,
        kind: RecordKind::Enter,
    }
}

fn exit(state: State) -> TransitionRecord<State> {
    TransitionRecord {
        state,
        kind: RecordKind::Exit,
    }
}

/// `A` parent of `{B, C}` with `B` initial, `D` a separate root.
fn core() -> MachineCore<State, Event> {
    let mut core = MachineCore::new("transitions");
    core.hierarchy(State::A)
        .with_initial_sub_state(State::B)
        .unwrap()
        .with_sub_state(State::C)
        .unwrap();
    core.in_state(State::D);
    core
}

fn records<S: StateId>(outcome: FireOutcome<S>) -> Vec<TransitionRecord<S>> {
    match outcome {
        FireOutcome::Completed { records, .. } => records,
        FireOutcome::Declined => panic!("transition declined"),
    }
}

#[test]
fn initial_entry_walks_the_shallow_chain() {
    let trace: Arc<Mutex<Vec<State>>> = Arc::new(Mutex::new(Vec::new()));
    let entered_a = Arc::clone(&trace);
    let entered_b = Arc::clone(&trace);

    let mut core = core();
    core.in_state(State::A)
        .executes_on_entry(move || entered_a.lock().unwrap().push(State::A));
    core.in_state(State::B)
        .executes_on_entry(move || entered_b.lock().unwrap().push(State::B));
    core.initialize(State::A).unwrap();
    core.enter_initial_state().unwrap();

    assert_eq!(*trace.lock().unwrap(), vec![State::A, State::B]);
    assert_eq!(core.current_state(), Some(State::B));
}

#[test]
fn sibling_transition_exits_source_and_enters_target() {
    let mut core = core();
    core.in_state(State::B)
        .on(Event::E1)
        .goto(State::C)
        .unwrap();
    core.initialize(State::A).unwrap();
    core.enter_initial_state().unwrap();

    let outcome = core.fire(Event::E1, None).unwrap();

    assert_eq!(records(outcome), vec![exit(State::B), enter(State::C)]);
    assert_eq!(core.current_state(), Some(State::C));
    assert_eq!(
        core.graph().state(State::A).unwrap().last_active_child(),
        Some(State::C)
    );
}

#[test]
fn ancestor_to_descendant_does_not_reenter_the_ancestor() {
    let mut core = core();
    core.in_state(State::A)
        .on(Event::E2)
        .goto(State::C)
        .unwrap();
    core.initialize(State::A).unwrap();
    core.enter_initial_state().unwrap();

    // Dispatch ascends from B to A to find the edge.
    let outcome = core.fire(Event::E2, None).unwrap();

    assert_eq!(records(outcome), vec![exit(State::B), enter(State::C)]);
    assert_eq!(core.current_state(), Some(State::C));
}

#[test]
fn descendant_to_ancestor_reenters_and_descends() {
    let mut core = core();
    core.in_state(State::B)
        .on(Event::E1)
        .goto(State::C)
        .unwrap();
    core.in_state(State::C)
        .on(Event::E3)
        .goto(State::A)
        .unwrap();
    core.initialize(State::A).unwrap();
    core.enter_initial_state().unwrap();
    core.fire(Event::E1, None).unwrap();

    let outcome = core.fire(Event::E3, None).unwrap();

    assert_eq!(
        records(outcome),
        vec![
            exit(State::C),
            exit(State::A),
            enter(State::A),
            enter(State::B)
        ]
    );
    assert_eq!(core.current_state(), Some(State::B));
}

#[test]
fn self_transition_exits_and_reenters() {
    let mut core = core();
    core.in_state(State::B)
        .on(Event::E4)
        .goto(State::B)
        .unwrap();
    core.initialize(State::A).unwrap();
    core.enter_initial_state().unwrap();

    let outcome = core.fire(Event::E4, None).unwrap();

    assert_eq!(records(outcome), vec![exit(State::B), enter(State::B)]);
    assert_eq!(core.current_state(), Some(State::B));
}

#[test]
fn internal_transition_runs_actions_without_exit_or_entry() {
    let count = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&count);

    let mut core = core();
    core.in_state(State::B)
        .on(Event::E4)
        .execute(move || *seen.lock().unwrap() += 1)
        .unwrap();
    core.initialize(State::A).unwrap();
    core.enter_initial_state().unwrap();

    let outcome = core.fire(Event::E4, None).unwrap();

    assert!(records(outcome).is_empty());
    assert_eq!(core.current_state(), Some(State::B));
    assert_eq!(*count.lock().unwrap(), 1);
}

#[test]
fn unhandled_event_is_declined() {
    let mut core = core();
    core.initialize(State::D).unwrap();
    core.enter_initial_state().unwrap();

    let outcome = core.fire(Event::E1, None).unwrap();

    assert!(outcome.is_declined());
    assert_eq!(core.current_state(), Some(State::D));
}

#[test]
fn transition_actions_run_exactly_once_regardless_of_depth() {
    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
    enum Deep {
        R1,
        S1,
        S11,
        R2,
        T1,
        T11,
    }

    let count = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&count);

    let mut core: MachineCore<Deep, Event> = MachineCore::new("deep");
    core.hierarchy(Deep::R1)
        .with_initial_sub_state(Deep::S1)
        .unwrap();
    core.hierarchy(Deep::S1)
        .with_initial_sub_state(Deep::S11)
        .unwrap();
    core.hierarchy(Deep::R2)
        .with_initial_sub_state(Deep::T1)
        .unwrap();
    core.hierarchy(Deep::T1)
        .with_initial_sub_state(Deep::T11)
        .unwrap();
    core.in_state(Deep::S11)
        .on(Event::E1)
        .goto(Deep::T11)
        .unwrap()
        .execute(move || *seen.lock().unwrap() += 1)
        .unwrap();
    core.initialize(Deep::R1).unwrap();
    core.enter_initial_state().unwrap();

    let outcome = core.fire(Event::E1, None).unwrap();

    // Cross-hierarchy transition three levels deep on both sides.
    assert_eq!(
        records(outcome)
            .iter()
            .map(|record| (record.state, record.kind))
            .collect::<Vec<_>>(),
        vec![
            (Deep::S11, RecordKind::Exit),
            (Deep::S1, RecordKind::Exit),
            (Deep::R1, RecordKind::Exit),
            (Deep::R2, RecordKind::Enter),
            (Deep::T1, RecordKind::Enter),
            (Deep::T11, RecordKind::Enter),
        ]
    );
    assert_eq!(*count.lock().unwrap(), 1);
    assert_eq!(core.current_state(), Some(Deep::T11));
}

#[test]
fn source_deeper_than_target_crosses_over_once() {
    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
    enum Deep {
        R1,
        S1,
        S11,
        R2,
        T1,
    }

    let mut core: MachineCore<Deep, Event> = MachineCore::new("deep");
    core.hierarchy(Deep::R1)
        .with_initial_sub_state(Deep::S1)
        .unwrap();
    core.hierarchy(Deep::S1)
        .with_initial_sub_state(Deep::S11)
        .unwrap();
    core.hierarchy(Deep::R2)
        .with_initial_sub_state(Deep::T1)
        .unwrap();
    core.in_state(Deep::S11)
        .on(Event::E1)
        .goto(Deep::T1)
        .unwrap();
    core.initialize(Deep::R1).unwrap();
    core.enter_initial_state().unwrap();

    let outcome = core.fire(Event::E1, None).unwrap();

    assert_eq!(
        records(outcome)
            .iter()
            .map(|record| (record.state, record.kind))
            .collect::<Vec<_>>(),
        vec![
            (Deep::S11, RecordKind::Exit),
            (Deep::S1, RecordKind::Exit),
            (Deep::R1, RecordKind::Exit),
            (Deep::R2, RecordKind::Enter),
            (Deep::T1, RecordKind::Enter),
        ]
    );
    assert_eq!(core.current_state(), Some(Deep::T1));
}

#[test]
fn current_state_is_a_leaf_after_every_transition() {
    let mut core = core();
    core.in_state(State::C)
        .on(Event::E3)
        .goto(State::A)
        .unwrap();
    core.in_state(State::B)
        .on(Event::E1)
        .goto(State::C)
        .unwrap();
    core.initialize(State::A).unwrap();
    core.enter_initial_state().unwrap();

    core.fire(Event::E1, None).unwrap();
    core.fire(Event::E3, None).unwrap();

    let current = core.current_state().unwrap();
    assert!(core
        .graph()
        .state(current)
        .unwrap()
        .initial_child()
        .is_none());
}
