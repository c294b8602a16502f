use std::io;

use crate::error::DynError;
use crate::graph::StateGraph;
use crate::{EventId, StateId};

/// Sink rendering a declared state graph.
pub trait Reporter<S: StateId, E: EventId> {
    fn report(
        &mut self,
        name: &str,
        graph: &StateGraph<S, E>,
        initial_state: Option<S>,
    ) -> Result<(), DynError>;
}

/// Reporter writing one CSV row per declared transition.
///
/// Header: `Source;Event;Guard;Target;Actions`. Internal transitions show
/// `internal transition` in the target column; guard and action names come
/// from their `describe()` labels.
pub struct CsvReporter<W: io::Write> {
    writer: W,
}

impl<W: io::Write> CsvReporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<S: StateId, E: EventId, W: io::Write> Reporter<S, E> for CsvReporter<W> {
    fn report(
        &mut self,
        name: &str,
        graph: &StateGraph<S, E>,
        initial_state: Option<S>,
    ) -> Result<(), DynError> {
        match initial_state {
            Some(initial) => writeln!(self.writer, "{} (initial state {:?})", name, initial)?,
            None => writeln!(self.writer, "{}", name)?,
        }
        writeln!(self.writer, "Source;Event;Guard;Target;Actions")?;

        for state in graph.iter() {
            for (event, transitions) in state.transitions() {
                for transition in transitions {
                    let guard = transition
                        .guard()
                        .map(|guard| guard.describe())
                        .unwrap_or_default();
                    let target = match transition.target() {
                        Some(target) => format!("{:?}", target),
                        None => "internal transition".to_owned(),
                    };
                    let actions = transition
                        .actions()
                        .iter()
                        .map(|action| action.describe())
                        .collect::<Vec<_>>()
                        .join(", ");
                    writeln!(
                        self.writer,
                        "{:?};{:?};{};{};{}",
                        state.id(),
                        event,
                        guard,
                        target,
                        actions
                    )?;
                }
            }
        }
        Ok(())
    }
}
