use std::rc::Rc;

use crate::machine::{Item, Machine, Marker};
use crate::scope::Scope;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("unknown word: {name}")]
    UnknownWord { name: String },
    #[error("stack underflow: needed {needed} value(s), found {found}")]
    StackUnderflow { needed: usize, found: usize },
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: &'static str },
    #[error("malformed scope: attempted to leave the root scope")]
    MalformedScope,
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
    #[error("host error: {message}")]
    Host { message: String },
}

/// A failed step. `machine` is the state the step started from, so the
/// failing unit is still at the head of its continuation.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct Fault {
    pub error: RuntimeError,
    pub machine: Machine,
}

/// Why a run handed control back to its driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// The continuation is empty.
    Settled,
    /// A break marker was reached and removed; run again to resume.
    Breakpoint,
    /// The step budget ran out; the machine is resumable as-is.
    Exhausted,
}

/// Performs exactly one unit of work.
pub fn step(machine: &Machine) -> Result<Machine, Fault> {
    advance(machine, false)
}

/// `step`, optionally planting a pause marker behind a word expansion.
pub(crate) fn advance(machine: &Machine, pause: bool) -> Result<Machine, Fault> {
    let mut next = machine.clone();
    let Some(item) = next.take_next() else {
        return Ok(next);
    };
    let outcome = match item {
        Item::Marker(marker) => settle_marker(next, marker),
        Item::Value(Value::Symbol(name)) => execute(next, &name, pause),
        Item::Value(value) => {
            next.push(value);
            Ok(next)
        }
    };
    outcome.map_err(|error| Fault { error, machine: machine.clone() })
}

fn settle_marker(mut machine: Machine, marker: Marker) -> Result<Machine, RuntimeError> {
    match marker {
        Marker::Restore(scope) => machine.set_scope(scope),
        Marker::PopScope => {
            let outer = machine.scope().leave_nested()?;
            machine.set_scope(outer);
        }
        Marker::Literal(value) => machine.push(value),
        Marker::Pause | Marker::Break => {}
    }
    Ok(machine)
}

fn execute(mut machine: Machine, name: &str, pause: bool) -> Result<Machine, RuntimeError> {
    let (value, home) = match machine.scope().resolve_with_home(name) {
        Some((value, home)) => (value.clone(), home),
        None => return Err(RuntimeError::UnknownWord { name: name.to_string() }),
    };
    match value {
        Value::List(body) => Ok(activate(machine, body, home, pause)),
        Value::Word(word) => word.invoke(machine),
        other => {
            machine.push(other);
            Ok(machine)
        }
    }
}

/// Expands a word body in its home chain plus one fresh frame.
///
/// The caller's scope rides on a restore marker behind the body. If a restore
/// is already next (a tail activation), that one supersedes ours.
fn activate(mut machine: Machine, body: Rc<Vec<Value>>, home: Scope, pause: bool) -> Machine {
    if pause {
        machine.schedule(Item::Marker(Marker::Pause));
    }
    if !matches!(machine.head(), Some(Item::Marker(Marker::Restore(_)))) {
        let caller = machine.scope().clone();
        machine.schedule(Item::Marker(Marker::Restore(caller)));
    }
    machine.splice(body.iter().cloned());
    machine.set_scope(home.enter_nested());
    machine
}

/// Whether the next step would expand a word body.
pub fn expands_next(machine: &Machine) -> bool {
    match machine.head() {
        Some(Item::Value(Value::Symbol(name))) => {
            matches!(machine.scope().resolve(name), Some(Value::List(_)))
        }
        _ => false,
    }
}

/// Prepends `extra` and steps until the continuation empties or a break
/// marker surfaces. The break marker is removed; calling `run` again with no
/// new input resumes exactly where it stopped.
pub fn run(machine: Machine, extra: Vec<Value>) -> Result<(Machine, Halt), Fault> {
    run_with_limit(machine, extra, None)
}

/// `run` with an optional step budget.
pub fn run_with_limit(
    mut machine: Machine,
    extra: Vec<Value>,
    limit: Option<u64>,
) -> Result<(Machine, Halt), Fault> {
    machine.splice(extra);
    drive(machine, limit, |_, _| {})
}

/// Host entry point: feed parsed source into a machine.
pub fn interpret(machine: Machine, source: Vec<Value>) -> Result<(Machine, Halt), Fault> {
    run(machine, source)
}

/// The run loop. `observe` sees the step count and machine before every step.
pub fn drive<F>(mut machine: Machine, limit: Option<u64>, mut observe: F) -> Result<(Machine, Halt), Fault>
where
    F: FnMut(u64, &Machine),
{
    let mut steps = 0u64;
    loop {
        match machine.head() {
            None => return Ok((machine, Halt::Settled)),
            Some(Item::Marker(Marker::Break)) => {
                machine.take_next();
                return Ok((machine, Halt::Breakpoint));
            }
            Some(_) => {}
        }
        if limit.is_some_and(|max| steps >= max) {
            return Ok((machine, Halt::Exhausted));
        }
        observe(steps, &machine);
        machine = step(&machine)?;
        steps += 1;
    }
}
