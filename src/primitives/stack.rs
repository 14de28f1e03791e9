use super::{Outcome, Registry};
use crate::machine::{Machine, PList};
use crate::value::Value;

pub(super) fn register(r: &mut Registry) {
    r.register("dup", dup);
    r.register("drop", drop_top);
    r.register("swap", swap);
    r.register("over", over);
    r.register("rot", rot);
    r.register("nip", nip);
    r.register("clear", clear);
    r.register("depth", depth);
}

fn dup(mut m: Machine) -> Outcome {
    let top = m.pop()?;
    m.push(top.clone());
    m.push(top);
    Ok(m)
}

fn drop_top(mut m: Machine) -> Outcome {
    m.pop()?;
    Ok(m)
}

fn swap(mut m: Machine) -> Outcome {
    m.require(2)?;
    let b = m.pop()?;
    let a = m.pop()?;
    m.push(b);
    m.push(a);
    Ok(m)
}

// a b -- a b a
fn over(mut m: Machine) -> Outcome {
    m.require(2)?;
    let b = m.pop()?;
    let a = m.pop()?;
    m.push(a.clone());
    m.push(b);
    m.push(a);
    Ok(m)
}

// a b c -- b c a
fn rot(mut m: Machine) -> Outcome {
    m.require(3)?;
    let c = m.pop()?;
    let b = m.pop()?;
    let a = m.pop()?;
    m.push(b);
    m.push(c);
    m.push(a);
    Ok(m)
}

fn nip(mut m: Machine) -> Outcome {
    m.require(2)?;
    let b = m.pop()?;
    m.pop()?;
    m.push(b);
    Ok(m)
}

fn clear(mut m: Machine) -> Outcome {
    m.set_stack(PList::new());
    Ok(m)
}

fn depth(mut m: Machine) -> Outcome {
    let depth = m.stack().len();
    m.push(Value::Number(depth as f64));
    Ok(m)
}
