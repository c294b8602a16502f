//! A coin turnstile on the active driver, with a CSV report of the
//! declared graph.

use std::io;
use std::sync::mpsc;

use statecraft::prelude::*;
use statecraft::LoggingExtension;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum State {
    Locked,
    Unlocked,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum Event {
    Coin,
    Push,
    Shutdown,
}

fn main() -> Result<(), StateMachineError<State, Event>> {
    env_logger::init();
    let (done_tx, done_rx) = mpsc::channel();

    let mut core = MachineCore::new("turnstile");
    core.add_extension(Box::new(LoggingExtension));
    core.in_state(State::Locked)
        .on(Event::Coin)
        .goto(State::Unlocked)?
        .execute(|| println!("unlocked"))?
        .on(Event::Push)
        .execute(|| println!("locked, push rejected"))?;
    core.in_state(State::Unlocked)
        .on(Event::Push)
        .goto(State::Locked)?
        .execute(|| println!("rotating"))?
        .on(Event::Coin)
        .execute(|| println!("already unlocked, coin returned"))?;
    core.in_state(State::Locked).on(Event::Shutdown).execute(move || {
        done_tx.send(()).ok();
    })?;
    core.initialize(State::Locked)?;
    core.report(&mut CsvReporter::new(io::stdout()))?;

    let mut turnstile = ActiveStateMachine::from_core(core);
    turnstile.start()?;

    turnstile.fire(Event::Push)?;
    turnstile.fire(Event::Coin)?;
    turnstile.fire(Event::Coin)?;
    turnstile.fire(Event::Push)?;
    turnstile.fire(Event::Shutdown)?;

    done_rx.recv().ok();
    println!("final: {:?}", turnstile.current_state());
    turnstile.stop()?;
    Ok(())
}
