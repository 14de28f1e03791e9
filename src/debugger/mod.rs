//! Step-in / step-over / step-out, built only from the stepper.
//!
//! Stepping into a word plants a pause marker behind its expansion; stepping
//! out runs to the nearest pause marker. Stepping over is the two combined.

use crate::interpreter::{self, Fault, Halt};
use crate::machine::{Item, Machine, Marker};
use crate::value::Value;

/// Where a debugger command stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// Exactly one unit of work was performed.
    Stepped,
    /// A pause marker was reached and consumed: the activation completed.
    Paused,
    /// A break marker was reached and consumed.
    Breakpoint,
    /// The continuation is empty.
    Settled,
}

/// One step. When the step expands a word, the next command stops at the
/// first unit inside it, and a later `step_out` returns to this level.
pub fn step_in(machine: &Machine) -> Result<Machine, Fault> {
    interpreter::advance(machine, true)
}

/// Runs until the nearest pause marker is consumed, a break marker is hit,
/// or the continuation empties.
pub fn step_out(mut machine: Machine) -> Result<(Machine, Stop), Fault> {
    loop {
        match machine.head() {
            None => return Ok((machine, Stop::Settled)),
            Some(Item::Marker(Marker::Pause)) => {
                machine.take_next();
                return Ok((machine, Stop::Paused));
            }
            Some(Item::Marker(Marker::Break)) => {
                machine.take_next();
                return Ok((machine, Stop::Breakpoint));
            }
            Some(_) => machine = interpreter::step(&machine)?,
        }
    }
}

/// Completes one logical unit: a whole word activation, or a single step.
pub fn step_over(machine: &Machine) -> Result<(Machine, Stop), Fault> {
    if interpreter::expands_next(machine) {
        step_out(step_in(machine)?)
    } else {
        Ok((interpreter::step(machine)?, Stop::Stepped))
    }
}

/// Interactive session over one machine, remembering every state it visited.
///
/// Machines share structure, so the history costs one node per change.
#[derive(Debug)]
pub struct Debugger {
    current: Machine,
    history: Vec<Machine>,
}

impl Debugger {
    pub fn new(machine: Machine) -> Self {
        Debugger { current: machine, history: Vec::new() }
    }

    /// Queue `source` in front of whatever is pending.
    pub fn load(&mut self, source: Vec<Value>) {
        self.current.splice(source);
    }

    pub fn machine(&self) -> &Machine {
        &self.current
    }

    pub fn into_machine(self) -> Machine {
        self.current
    }

    /// A detached copy of the current state, for exploring another path.
    pub fn fork(&self) -> Machine {
        self.current.clone()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn commit(&mut self, next: Machine) {
        let previous = std::mem::replace(&mut self.current, next);
        self.history.push(previous);
    }

    pub fn step(&mut self) -> Result<Stop, Fault> {
        let next = interpreter::step(&self.current)?;
        self.commit(next);
        Ok(Stop::Stepped)
    }

    pub fn step_in(&mut self) -> Result<Stop, Fault> {
        if self.current.continuation().is_empty() {
            return Ok(Stop::Settled);
        }
        let next = step_in(&self.current)?;
        self.commit(next);
        Ok(Stop::Stepped)
    }

    pub fn step_over(&mut self) -> Result<Stop, Fault> {
        if self.current.continuation().is_empty() {
            return Ok(Stop::Settled);
        }
        let (next, stop) = step_over(&self.current)?;
        self.commit(next);
        Ok(stop)
    }

    pub fn step_out(&mut self) -> Result<Stop, Fault> {
        let (next, stop) = step_out(self.current.clone())?;
        self.commit(next);
        Ok(stop)
    }

    /// Runs to the next breakpoint or to completion.
    pub fn resume(&mut self) -> Result<Stop, Fault> {
        let (next, halt) = interpreter::run(self.current.clone(), Vec::new())?;
        self.commit(next);
        Ok(match halt {
            Halt::Breakpoint => Stop::Breakpoint,
            Halt::Settled | Halt::Exhausted => Stop::Settled,
        })
    }

    /// Rewinds to the state before the last command. False if there is none.
    pub fn back(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.current = previous;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Registry;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn sym(s: &str) -> Value {
        Value::symbol(s)
    }

    /// Machine with `double` defined and `program` queued.
    fn prepared(program: Vec<Value>) -> Machine {
        let setup = vec![Value::list(vec![sym("dup"), sym("+")]), Value::string("double"), sym("define")];
        let (mut m, _) = interpreter::run(Registry::with_builtins().boot(), setup).unwrap();
        m.splice(program);
        m
    }

    #[test]
    fn step_in_stops_inside_word() {
        let m = prepared(vec![num(5.0), sym("double"), num(1.0)]);
        let m = interpreter::step(&m).unwrap();
        let m = step_in(&m).unwrap();
        assert_eq!(m.head(), Some(&Item::Value(sym("dup"))));
        assert_eq!(m.scope().depth(), 2);
        assert!(m.continuation().iter().any(|i| *i == Item::Marker(Marker::Pause)));
    }

    #[test]
    fn step_out_finishes_activation() {
        let m = prepared(vec![num(5.0), sym("double"), num(1.0)]);
        let m = interpreter::step(&m).unwrap();
        let m = step_in(&m).unwrap();
        let m = interpreter::step(&m).unwrap();
        let (m, stop) = step_out(m).unwrap();
        assert_eq!(stop, Stop::Paused);
        assert_eq!(m.stack().to_vec(), vec![num(10.0)]);
        assert_eq!(m.head(), Some(&Item::Value(num(1.0))));
        assert_eq!(m.scope().depth(), 1);
    }

    #[test]
    fn step_over_word_is_step_in_then_out() {
        let m = prepared(vec![num(5.0), sym("double"), num(1.0)]);
        let m = interpreter::step(&m).unwrap();
        let (over, stop) = step_over(&m).unwrap();
        assert_eq!(stop, Stop::Paused);
        let (manual, _) = step_out(step_in(&m).unwrap()).unwrap();
        assert_eq!(over, manual);
        assert_eq!(over.stack().to_vec(), vec![num(10.0)]);
    }

    #[test]
    fn step_over_primitive_is_one_step() {
        let m = prepared(vec![num(1.0), num(2.0), sym("+")]);
        let (m, stop) = step_over(&m).unwrap();
        assert_eq!(stop, Stop::Stepped);
        assert_eq!(m.stack().to_vec(), vec![num(1.0)]);
    }

    #[test]
    fn step_out_at_top_level_runs_to_end() {
        let m = prepared(vec![num(1.0), num(2.0), sym("+")]);
        let (m, stop) = step_out(m).unwrap();
        assert_eq!(stop, Stop::Settled);
        assert_eq!(m.stack().to_vec(), vec![num(3.0)]);
    }

    #[test]
    fn step_out_stops_at_breakpoint() {
        let m = prepared(vec![num(1.0), sym("break"), num(2.0)]);
        let (m, stop) = step_out(m).unwrap();
        assert_eq!(stop, Stop::Breakpoint);
        assert_eq!(m.continuation().len(), 1);
    }

    #[test]
    fn nested_step_in_out_returns_one_level() {
        // quad calls double twice; stepping into quad then into double and
        // stepping out lands back inside quad
        let mut m = prepared(vec![]);
        m.splice(vec![
            Value::list(vec![sym("double"), sym("double")]),
            Value::string("quad"),
            sym("define"),
        ]);
        let (mut m, _) = interpreter::run(m, vec![]).unwrap();
        m.splice(vec![num(1.0), sym("quad")]);
        let m = interpreter::step(&m).unwrap();
        let m = step_in(&m).unwrap();
        assert_eq!(m.scope().depth(), 2);
        let m = step_in(&m).unwrap();
        let (m, stop) = step_out(m).unwrap();
        assert_eq!(stop, Stop::Paused);
        assert_eq!(m.stack().to_vec(), vec![num(2.0)]);
        assert_eq!(m.head(), Some(&Item::Value(sym("double"))));
        let (m, stop) = step_out(m).unwrap();
        assert_eq!(stop, Stop::Paused);
        assert_eq!(m.stack().to_vec(), vec![num(4.0)]);
        assert!(m.continuation().is_empty());
    }

    #[test]
    fn faults_surface_from_step_over() {
        let m = prepared(vec![sym("double")]);
        let fault = step_over(&m).unwrap_err();
        assert!(matches!(fault.error, crate::interpreter::RuntimeError::StackUnderflow { .. }));
    }

    #[test]
    fn session_history_and_back() {
        let mut dbg = Debugger::new(prepared(vec![]));
        dbg.load(vec![num(3.0), sym("double"), num(1.0), sym("+")]);
        dbg.step().unwrap();
        assert_eq!(dbg.step_over().unwrap(), Stop::Paused);
        assert_eq!(dbg.machine().stack().to_vec(), vec![num(6.0)]);
        let fork = dbg.fork();
        assert!(dbg.back());
        assert_eq!(dbg.machine().stack().to_vec(), vec![num(3.0)]);
        assert_eq!(dbg.history_len(), 1);
        assert_eq!(dbg.resume().unwrap(), Stop::Settled);
        assert_eq!(dbg.machine().stack().to_vec(), vec![num(7.0)]);
        assert_eq!(fork.stack().to_vec(), vec![num(6.0)]);
    }

    #[test]
    fn session_at_end_reports_settled() {
        let mut dbg = Debugger::new(prepared(vec![]));
        assert_eq!(dbg.step_in().unwrap(), Stop::Settled);
        assert_eq!(dbg.step_over().unwrap(), Stop::Settled);
        assert_eq!(dbg.history_len(), 0);
        assert!(!dbg.back());
    }
}
