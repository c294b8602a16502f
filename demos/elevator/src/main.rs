//! An elevator controller on the passive driver.
//!
//! `Healthy` carries deep history: after an error is reset the elevator
//! resumes exactly where it was, door state included.

use statecraft::prelude::*;
use statecraft::LoggingExtension;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum State {
    Healthy,
    OnFloor,
    DoorOpen,
    DoorClosed,
    Moving,
    MovingUp,
    MovingDown,
    Error,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum Event {
    GoUp,
    GoDown,
    Stop,
    OpenDoor,
    CloseDoor,
    ErrorOccurred,
    Reset,
}

fn build() -> Result<PassiveStateMachine<State, Event>, StateMachineError<State, Event>> {
    let mut machine = PassiveStateMachine::new("elevator");
    machine.add_extension(Box::new(LoggingExtension));

    machine
        .hierarchy(State::Healthy)
        .with_history(HistoryMode::Deep)
        .with_initial_sub_state(State::OnFloor)?
        .with_sub_state(State::Moving)?;
    machine
        .hierarchy(State::OnFloor)
        .with_initial_sub_state(State::DoorClosed)?
        .with_sub_state(State::DoorOpen)?;
    machine
        .hierarchy(State::Moving)
        .with_initial_sub_state(State::MovingUp)?
        .with_sub_state(State::MovingDown)?;

    machine
        .in_state(State::Healthy)
        .on(Event::ErrorOccurred)
        .goto(State::Error)?;
    machine
        .in_state(State::Error)
        .on(Event::Reset)
        .goto(State::Healthy)?;

    machine
        .in_state(State::DoorClosed)
        .on(Event::GoUp)
        .goto(State::MovingUp)?
        .on(Event::GoDown)
        .goto(State::MovingDown)?
        .on(Event::OpenDoor)
        .goto(State::DoorOpen)?;
    machine
        .in_state(State::DoorOpen)
        .executes_on_entry(|| println!("ding"))
        .on(Event::CloseDoor)
        .goto(State::DoorClosed)?;
    machine
        .in_state(State::Moving)
        .on(Event::Stop)
        .goto(State::OnFloor)?;

    machine.initialize(State::Healthy)?;
    Ok(machine)
}

fn main() -> Result<(), StateMachineError<State, Event>> {
    env_logger::init();

    let mut elevator = build()?;
    elevator.start()?;

    elevator.fire(Event::GoUp)?;
    elevator.fire(Event::Stop)?;
    elevator.fire(Event::OpenDoor)?;

    // A fault while the door is open, then recovery: deep history brings
    // the elevator back to the open door.
    elevator.fire(Event::ErrorOccurred)?;
    println!("after error: {:?}", elevator.current_state());
    elevator.fire(Event::Reset)?;
    println!("after reset: {:?}", elevator.current_state());

    elevator.fire(Event::CloseDoor)?;
    println!("final: {:?}", elevator.current_state());
    elevator.stop()?;
    Ok(())
}
