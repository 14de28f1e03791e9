//! Combinators. None of these recurse in Rust: they rearrange the
//! continuation and return, so every iteration stays visible to the stepper.
//! Looping words re-enter through their dictionary names.

use super::{Outcome, Registry};
use crate::machine::{mismatch, Item, Machine, Marker};
use crate::value::Value;

pub(super) fn register(r: &mut Registry) {
    r.register("apply", apply);
    r.register("dip", dip);
    r.register("keep", keep);
    r.register("if", if_else);
    r.register("when", |m| conditional(m, true));
    r.register("unless", |m| conditional(m, false));
    r.register("times", times);
    r.register("while", while_loop);
    r.register("scoped", scoped);
    r.register("break", breakpoint);
}

/// Runs a quotation, or invokes a word value directly.
fn apply(mut m: Machine) -> Outcome {
    match m.pop()? {
        Value::List(body) => {
            m.splice(body.iter().cloned());
            Ok(m)
        }
        Value::Word(word) => word.invoke(m),
        other => Err(mismatch("list or word", &other)),
    }
}

// x [q] -- ... x
fn dip(mut m: Machine) -> Outcome {
    m.require(2)?;
    let body = m.pop_list()?;
    let saved = m.pop()?;
    m.schedule_push(saved);
    m.splice(body.iter().cloned());
    Ok(m)
}

// x [q] -- ... x   (q sees x)
fn keep(mut m: Machine) -> Outcome {
    m.require(2)?;
    let body = m.pop_list()?;
    let saved = m.pop()?;
    m.push(saved.clone());
    m.schedule_push(saved);
    m.splice(body.iter().cloned());
    Ok(m)
}

// flag [then] [else] --
fn if_else(mut m: Machine) -> Outcome {
    m.require(3)?;
    let otherwise = m.pop_list()?;
    let then = m.pop_list()?;
    let flag = m.pop()?;
    let branch = if flag.is_truthy() { then } else { otherwise };
    m.splice(branch.iter().cloned());
    Ok(m)
}

// flag [q] --
fn conditional(mut m: Machine, run_when: bool) -> Outcome {
    m.require(2)?;
    let body = m.pop_list()?;
    let flag = m.pop()?;
    if flag.is_truthy() == run_when {
        m.splice(body.iter().cloned());
    }
    Ok(m)
}

// [q] n --
fn times(mut m: Machine) -> Outcome {
    m.require(2)?;
    let count = m.pop_int()?;
    let body = m.pop_list()?;
    if count > 0 {
        let again = [
            Value::List(body.clone()),
            Value::Number((count - 1) as f64),
            Value::symbol("times"),
        ];
        m.splice(again);
        m.splice(body.iter().cloned());
    }
    Ok(m)
}

// [cond] [body] --
fn while_loop(mut m: Machine) -> Outcome {
    m.require(2)?;
    let body = m.pop_list()?;
    let cond = m.pop_list()?;
    let mut iteration: Vec<Value> = body.iter().cloned().collect();
    iteration.push(Value::List(cond.clone()));
    iteration.push(Value::List(body));
    iteration.push(Value::symbol("while"));
    m.splice([Value::list(iteration), Value::symbol("when")]);
    m.splice(cond.iter().cloned());
    Ok(m)
}

/// Runs a quotation inside its own nested frame.
fn scoped(mut m: Machine) -> Outcome {
    let body = m.pop_list()?;
    m.schedule(Item::Marker(Marker::PopScope));
    m.splice(body.iter().cloned());
    let nested = m.scope().enter_nested();
    m.set_scope(nested);
    Ok(m)
}

fn breakpoint(mut m: Machine) -> Outcome {
    m.schedule(Item::Marker(Marker::Break));
    Ok(m)
}
