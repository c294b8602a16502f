use std::sync::{Arc, Mutex};

use statecraft::prelude::*;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum State {
    A,
    B,
    C,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum Event {
    Go,
    Next,
    Mark1,
    Mark2,
    Mark3,
}

type Log = Arc<Mutex<Vec<&'static str>>>;

#[test]
fn events_fired_before_start_accumulate_and_drain_on_start() {
    let mut machine = PassiveStateMachine::new("queued");
    machine.in_state(State::A).on(Event::Go).goto(State::B).unwrap();
    machine.in_state(State::B).on(Event::Next).goto(State::C).unwrap();
    machine.initialize(State::A).unwrap();

    machine.fire(Event::Go).unwrap();
    machine.fire(Event::Next).unwrap();
    // Not running: nothing processed, not even the initial entry.
    assert_eq!(machine.current_state(), None);

    machine.start().unwrap();

    assert_eq!(machine.current_state(), Some(State::C));
}

#[test]
fn an_event_fired_from_an_action_is_processed_by_the_outer_pump() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut machine = PassiveStateMachine::new("reentrant");
    let sender = machine.event_sender();
    let in_action = Arc::clone(&log);
    let entered_b = Arc::clone(&log);
    let exited_b = Arc::clone(&log);
    let entered_c = Arc::clone(&log);

    machine
        .in_state(State::A)
        .on(Event::Go)
        .goto(State::B)
        .unwrap()
        .execute(move || {
            in_action.lock().unwrap().push("firing next");
            sender.fire(Event::Next);
        })
        .unwrap();
    machine
        .in_state(State::B)
        .executes_on_entry(move || entered_b.lock().unwrap().push("enter B"))
        .executes_on_exit(move || exited_b.lock().unwrap().push("exit B"))
        .on(Event::Next)
        .goto(State::C)
        .unwrap();
    machine
        .in_state(State::C)
        .executes_on_entry(move || entered_c.lock().unwrap().push("enter C"));
    machine.initialize(State::A).unwrap();
    machine.start().unwrap();

    machine.fire(Event::Go).unwrap();

    // The inner fire only enqueued; the Go transition completed before
    // Next was dispatched.
    assert_eq!(
        *log.lock().unwrap(),
        vec!["firing next", "enter B", "exit B", "enter C"]
    );
    assert_eq!(machine.current_state(), Some(State::C));
}

#[test]
fn priority_events_jump_the_queue() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut machine = PassiveStateMachine::new("priority");
    let one = Arc::clone(&log);
    let two = Arc::clone(&log);
    let three = Arc::clone(&log);
    machine
        .in_state(State::A)
        .on(Event::Mark1)
        .execute(move || one.lock().unwrap().push("one"))
        .unwrap()
        .on(Event::Mark2)
        .execute(move || two.lock().unwrap().push("two"))
        .unwrap()
        .on(Event::Mark3)
        .execute(move || three.lock().unwrap().push("three"))
        .unwrap();
    machine.initialize(State::A).unwrap();

    // Queue while stopped, then drain: Mark3 was inserted at the head.
    machine.fire(Event::Mark1).unwrap();
    machine.fire(Event::Mark2).unwrap();
    machine.fire_priority(Event::Mark3).unwrap();
    machine.start().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["three", "one", "two"]);
}

#[test]
fn stopping_retains_queued_events() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut machine = PassiveStateMachine::new("stop");
    let mark = Arc::clone(&log);
    machine
        .in_state(State::A)
        .on(Event::Mark1)
        .execute(move || mark.lock().unwrap().push("one"))
        .unwrap();
    machine.initialize(State::A).unwrap();
    machine.start().unwrap();
    machine.stop().unwrap();
    assert!(!machine.is_running());

    machine.fire(Event::Mark1).unwrap();
    assert!(log.lock().unwrap().is_empty());

    machine.start().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["one"]);
}

#[test]
fn extensions_see_queueing_notifications() {
    use statecraft::{Extension, MachineInfo};

    struct QueueTap {
        log: Log,
    }

    impl Extension<State, Event> for QueueTap {
        fn event_queued(&mut self, _: &MachineInfo<'_, State>, _: &Event) {
            self.log.lock().unwrap().push("queued");
        }

        fn event_queued_with_priority(&mut self, _: &MachineInfo<'_, State>, _: &Event) {
            self.log.lock().unwrap().push("queued with priority");
        }

        fn started_state_machine(&mut self, _: &MachineInfo<'_, State>) {
            self.log.lock().unwrap().push("started");
        }

        fn stopped_state_machine(&mut self, _: &MachineInfo<'_, State>) {
            self.log.lock().unwrap().push("stopped");
        }
    }

    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut machine = PassiveStateMachine::new("tap");
    machine.add_extension(Box::new(QueueTap {
        log: Arc::clone(&log),
    }));
    machine.in_state(State::A);
    machine.initialize(State::A).unwrap();

    machine.fire(Event::Go).unwrap();
    machine.fire_priority(Event::Next).unwrap();
    machine.start().unwrap();
    machine.stop().unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["queued", "queued with priority", "started", "stopped"]
    );
}
