use core::fmt;

use thiserror::Error;

use crate::error::DynError;
use crate::EventArgument;

/// Failure of a typed holder to obtain its argument.
#[derive(Debug, Error)]
pub enum ArgumentError {
    /// The holder expects an argument but the event carried none.
    #[error("`{0}` expected an event argument, none was supplied")]
    Missing(String),

    /// The event argument is of a different type than the holder expects.
    #[error("`{0}` received an event argument of an unexpected type")]
    Mismatch(String),
}

type ActionFn = Box<dyn Fn(Option<&EventArgument>) -> Result<(), DynError> + Send>;
type GuardFn = Box<dyn Fn(Option<&EventArgument>) -> Result<bool, DynError> + Send>;

/// A named, executable action attached to a state or transition.
///
/// Actions come in two arities: argument-less and typed. A typed action
/// downcasts the event argument and fails cleanly (through the machine's
/// exception channel) when the argument is absent or of a mismatched type.
pub struct ActionHolder {
    label: String,
    action: ActionFn,
}

impl ActionHolder {
    /// An action that ignores the event argument.
    pub fn new<F>(label: impl Into<String>, action: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        Self::fallible(label, move || {
            action();
            Ok(())
        })
    }

    /// An argument-less action that may fail.
    pub fn fallible<F>(label: impl Into<String>, action: F) -> Self
    where
        F: Fn() -> Result<(), DynError> + Send + 'static,
    {
        Self {
            label: label.into(),
            action: Box::new(move |_| action()),
        }
    }

    /// An action receiving the event argument downcast to `T`.
    pub fn with_arg<T, F>(label: impl Into<String>, action: F) -> Self
    where
        T: 'static,
        F: Fn(&T) + Send + 'static,
    {
        Self::with_arg_fallible(label, move |arg: &T| {
            action(arg);
            Ok(())
        })
    }

    /// A typed action that may fail.
    pub fn with_arg_fallible<T, F>(label: impl Into<String>, action: F) -> Self
    where
        T: 'static,
        F: Fn(&T) -> Result<(), DynError> + Send + 'static,
    {
        let label = label.into();
        let name = label.clone();
        Self {
            label,
            action: Box::new(move |argument| {
                let arg = downcast::<T>(&name, argument)?;
                action(arg)
            }),
        }
    }

    /// The label reported by diagnostics and reporters.
    pub fn describe(&self) -> &str {
        &self.label
    }

    pub(crate) fn execute(&self, argument: Option<&EventArgument>) -> Result<(), DynError> {
        (self.action)(argument)
    }
}

impl fmt::Debug for ActionHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionHolder").field(&self.label).finish()
    }
}

/// A named predicate deciding whether a transition fires.
///
/// Guard failures are treated as the guard returning `false`; the error is
/// funnelled through the machine's exception channel.
pub struct GuardHolder {
    label: String,
    guard: GuardFn,
}

impl GuardHolder {
    /// A predicate that ignores the event argument.
    pub fn new<F>(label: impl Into<String>, guard: F) -> Self
    where
        F: Fn() -> bool + Send + 'static,
    {
        Self::fallible(label, move || Ok(guard()))
    }

    /// An argument-less predicate that may fail.
    pub fn fallible<F>(label: impl Into<String>, guard: F) -> Self
    where
        F: Fn() -> Result<bool, DynError> + Send + 'static,
    {
        Self {
            label: label.into(),
            guard: Box::new(move |_| guard()),
        }
    }

    /// A predicate receiving the event argument downcast to `T`.
    pub fn with_arg<T, F>(label: impl Into<String>, guard: F) -> Self
    where
        T: 'static,
        F: Fn(&T) -> bool + Send + 'static,
    {
        Self::with_arg_fallible(label, move |arg: &T| Ok(guard(arg)))
    }

    /// A typed predicate that may fail.
    pub fn with_arg_fallible<T, F>(label: impl Into<String>, guard: F) -> Self
    where
        T: 'static,
        F: Fn(&T) -> Result<bool, DynError> + Send + 'static,
    {
        let label = label.into();
        let name = label.clone();
        Self {
            label,
            guard: Box::new(move |argument| {
                let arg = downcast::<T>(&name, argument)?;
                guard(arg)
            }),
        }
    }

    /// The label reported by diagnostics and reporters.
    pub fn describe(&self) -> &str {
        &self.label
    }

    pub(crate) fn execute(&self, argument: Option<&EventArgument>) -> Result<bool, DynError> {
        (self.guard)(argument)
    }
}

impl fmt::Debug for GuardHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GuardHolder").field(&self.label).finish()
    }
}

fn downcast<'a, T: 'static>(
    label: &str,
    argument: Option<&'a EventArgument>,
) -> Result<&'a T, DynError> {
    let argument = argument.ok_or_else(|| ArgumentError::Missing(label.to_owned()))?;
    argument
        .downcast_ref::<T>()
        .ok_or_else(|| ArgumentError::Mismatch(label.to_owned()).into())
}
