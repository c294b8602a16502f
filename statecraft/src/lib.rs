//! Runtime-configurable hierarchical state machines for event-driven systems.
//!
//! A state graph is described at runtime through a small builder: states with
//! entry and exit actions, nested sub-states with shallow or deep history,
//! and transitions guarded by predicates. Events are then fed into one of two
//! drivers sharing the same execution engine:
//!
//! - [`PassiveStateMachine`] processes events on the caller thread and is
//!   safe to fire into from within an action (through a [`PassiveEventSender`]).
//! - [`ActiveStateMachine`] owns a worker thread consuming a shared queue
//!   with normal and priority insertion.
//!
//! ```
//! use statecraft::prelude::*;
//!
//! #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
//! enum State {
//!     On,
//!     Off,
//! }
//!
//! #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
//! enum Event {
//!     Toggle,
//! }
//!
//! let mut machine = PassiveStateMachine::new("switch");
//! machine.in_state(State::On).on(Event::Toggle).goto(State::Off).unwrap();
//! machine.in_state(State::Off).on(Event::Toggle).goto(State::On).unwrap();
//!
//! machine.initialize(State::On).unwrap();
//! machine.start().unwrap();
//! machine.fire(Event::Toggle).unwrap();
//!
//! assert_eq!(machine.current_state(), Some(State::Off));
//! ```
//!
//! Observers implementing [`Extension`] receive lifecycle notifications;
//! [`StateMachineSaver`] and [`StateMachineLoader`] persist the current state
//! and per-superstate history memos; [`Reporter`] renders the declared graph.

use core::fmt::Debug;
use core::hash::Hash;
use std::any::Any;

mod action;
mod active;
mod builder;
mod context;
mod engine;
mod error;
mod extension;
mod graph;
mod machine;
mod passive;
mod persist;
mod report;
mod state;
mod transition;

pub use action::{ActionHolder, ArgumentError, GuardHolder};
pub use active::{ActiveEventSender, ActiveStateMachine};
pub use builder::{HierarchyConfigurator, StateConfigurator};
pub use context::{RecordKind, TransitionRecord};
pub use error::{DynError, ErrorOrigin, ErrorReport, StateMachineError};
pub use extension::{Extension, LoggingExtension, MachineInfo};
pub use graph::StateGraph;
pub use machine::{FireOutcome, MachineCore, StateMachine};
pub use passive::{PassiveEventSender, PassiveStateMachine};
pub use persist::{Memento, StateMachineLoader, StateMachineSaver};
pub use report::{CsvReporter, Reporter};
pub use state::{HistoryMode, StateNode};
pub use transition::Transition;

/// Opaque payload attached to a fired event, handed to guards and actions.
pub type EventArgument = Box<dyn Any + Send>;

/// Marker trait for state identifiers.
///
/// Implemented automatically for any type satisfying the bounds; in practice
/// ids are small `Copy` enums or integers.
pub trait StateId: Copy + Eq + Hash + Debug + Send + 'static {}

impl<T> StateId for T where T: Copy + Eq + Hash + Debug + Send + 'static {}

/// Marker trait for event identifiers.
pub trait EventId: Copy + Eq + Hash + Debug + Send + 'static {}

impl<T> EventId for T where T: Copy + Eq + Hash + Debug + Send + 'static {}

/// Prelude containing the necessary imports for everyday use.
pub mod prelude {
    pub use crate::action::{ActionHolder, GuardHolder};
    pub use crate::active::ActiveStateMachine;
    pub use crate::error::StateMachineError;
    pub use crate::extension::Extension;
    pub use crate::machine::{FireOutcome, MachineCore, StateMachine};
    pub use crate::passive::PassiveStateMachine;
    pub use crate::persist::{Memento, StateMachineLoader, StateMachineSaver};
    pub use crate::report::CsvReporter;
    pub use crate::state::HistoryMode;
    pub use crate::{EventArgument, EventId, StateId};
}
