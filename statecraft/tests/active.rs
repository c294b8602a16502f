use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use statecraft::prelude::*;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum State {
    Idle,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum Event {
    Gate,
    A,
    B,
    P1,
    P2,
    Done,
    Boom,
}

type Log = Arc<Mutex<Vec<&'static str>>>;

const WAIT: Duration = Duration::from_secs(5);

fn mark(log: &Log, tag: &'static str) -> impl Fn() + Send + 'static {
    let log = Arc::clone(log);
    move || log.lock().unwrap().push(tag)
}

/// A single state with internal transitions recording each event; `Done`
/// additionally signals the test thread.
fn core(log: &Log, done: mpsc::Sender<()>) -> MachineCore<State, Event> {
    let finished = Arc::clone(log);
    let mut core = MachineCore::new("active");
    core.in_state(State::Idle)
        .on(Event::A)
        .execute(mark(log, "a"))
        .unwrap()
        .on(Event::B)
        .execute(mark(log, "b"))
        .unwrap()
        .on(Event::P1)
        .execute(mark(log, "p1"))
        .unwrap()
        .on(Event::P2)
        .execute(mark(log, "p2"))
        .unwrap()
        .on(Event::Done)
        .execute(move || {
            finished.lock().unwrap().push("done");
            done.send(()).ok();
        })
        .unwrap();
    core.initialize(State::Idle).unwrap();
    core
}

#[test]
fn events_are_processed_in_fifo_order() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = mpsc::channel();

    let mut machine = ActiveStateMachine::from_core(core(&log, done_tx));
    machine.start().unwrap();

    machine.fire(Event::A).unwrap();
    machine.fire(Event::B).unwrap();
    machine.fire(Event::Done).unwrap();
    done_rx.recv_timeout(WAIT).unwrap();
    machine.stop().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "done"]);
}

#[test]
fn priority_events_overtake_the_queue_most_recent_first() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = mpsc::channel();
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let mut core = core(&log, done_tx);
    core.in_state(State::Idle)
        .on(Event::Gate)
        .execute(move || {
            entered_tx.send(()).ok();
            release_rx.recv().ok();
        })
        .unwrap();

    let mut machine = ActiveStateMachine::from_core(core);
    machine.start().unwrap();

    // Park the worker inside the gate action, then shape the queue.
    machine.fire(Event::Gate).unwrap();
    entered_rx.recv_timeout(WAIT).unwrap();
    machine.fire(Event::A).unwrap();
    machine.fire(Event::B).unwrap();
    machine.fire(Event::Done).unwrap();
    machine.fire_priority(Event::P1).unwrap();
    machine.fire_priority(Event::P2).unwrap();
    release_tx.send(()).unwrap();

    done_rx.recv_timeout(WAIT).unwrap();
    machine.stop().unwrap();

    // Priority events first, most recent first; FIFO for the rest.
    assert_eq!(*log.lock().unwrap(), vec!["p2", "p1", "a", "b", "done"]);
}

#[test]
fn events_survive_a_stop_start_cycle() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = mpsc::channel();

    let mut machine = ActiveStateMachine::from_core(core(&log, done_tx));
    machine.start().unwrap();
    machine.stop().unwrap();
    assert!(!machine.is_running());

    // The worker is joined; these can only be processed after a restart.
    machine.fire(Event::A).unwrap();
    machine.fire(Event::B).unwrap();
    assert!(log.lock().unwrap().is_empty());

    machine.start().unwrap();
    machine.fire(Event::Done).unwrap();
    done_rx.recv_timeout(WAIT).unwrap();
    machine.stop().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "done"]);
}

#[test]
fn the_worker_performs_the_pending_initial_entry() {
    use statecraft::{Extension, MachineInfo};

    struct EntrySignal {
        tx: mpsc::Sender<()>,
    }

    impl Extension<State, Event> for EntrySignal {
        fn entered_initial_state(&mut self, _: &MachineInfo<'_, State>, _: State) {
            self.tx.send(()).ok();
        }
    }

    let (entered_tx, entered_rx) = mpsc::channel();

    let mut core = MachineCore::<State, Event>::new("entry");
    core.add_extension(Box::new(EntrySignal { tx: entered_tx }));
    core.initialize(State::Idle).unwrap();

    let mut machine = ActiveStateMachine::from_core(core);
    machine.start().unwrap();

    entered_rx.recv_timeout(WAIT).unwrap();
    assert_eq!(machine.current_state(), Some(State::Idle));
    machine.stop().unwrap();
}

#[test]
fn an_unhandled_action_error_faults_the_worker_and_surfaces_in_stop() {
    let (reached_tx, reached_rx) = mpsc::channel();

    let mut core = MachineCore::<State, Event>::new("faulty");
    core.in_state(State::Idle)
        .on(Event::Boom)
        .execute_action(ActionHolder::fallible("boom", move || {
            reached_tx.send(()).ok();
            Err("kaput".into())
        }))
        .unwrap();
    core.initialize(State::Idle).unwrap();

    let mut machine = ActiveStateMachine::from_core(core);
    machine.start().unwrap();
    machine.fire(Event::Boom).unwrap();
    reached_rx.recv_timeout(WAIT).unwrap();

    let result = machine.stop();
    assert!(matches!(
        result,
        Err(StateMachineError::UnhandledUserError { .. })
    ));
}

#[test]
fn senders_enqueue_from_any_thread() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = mpsc::channel();

    let mut machine = ActiveStateMachine::from_core(core(&log, done_tx));
    let sender = machine.event_sender();
    machine.start().unwrap();

    let producer = std::thread::spawn(move || {
        sender.fire(Event::A);
        sender.fire(Event::Done);
    });
    producer.join().unwrap();

    done_rx.recv_timeout(WAIT).unwrap();
    machine.stop().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["a", "done"]);
}
