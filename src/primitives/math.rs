use std::cmp::Ordering;

use super::{Outcome, Registry};
use crate::interpreter::RuntimeError;
use crate::machine::{mismatch, Machine};
use crate::value::Value;

pub(super) fn register(r: &mut Registry) {
    // Arithmetic follows IEEE-754; dividing by zero yields inf or NaN.
    r.register("+", |m| arith(m, |a, b| a + b));
    r.register("-", |m| arith(m, |a, b| a - b));
    r.register("*", |m| arith(m, |a, b| a * b));
    r.register("/", |m| arith(m, |a, b| a / b));
    r.register("mod", |m| arith(m, |a, b| a % b));
    r.register("neg", |m| unary(m, |a| -a));
    r.register("abs", |m| unary(m, f64::abs));
    r.register("floor", |m| unary(m, f64::floor));

    // Bitwise on the truncated integer value. Not restricted to -1/0.
    r.register("and", |m| bits(m, |a, b| a & b));
    r.register("or", |m| bits(m, |a, b| a | b));
    r.register("xor", |m| bits(m, |a, b| a ^ b));
    r.register("shl", |m| bits(m, |a, b| a.wrapping_shl(b as u32)));
    r.register("shr", |m| bits(m, |a, b| a.wrapping_shr(b as u32)));
    r.register("not", not);

    r.register("=", |m| equality(m, true));
    r.register("!=", |m| equality(m, false));
    r.register("<", |m| compare(m, |o| o == Ordering::Less));
    r.register(">", |m| compare(m, |o| o == Ordering::Greater));
    r.register("<=", |m| compare(m, |o| o != Ordering::Greater));
    r.register(">=", |m| compare(m, |o| o != Ordering::Less));
}

fn arith(mut m: Machine, op: impl Fn(f64, f64) -> f64) -> Outcome {
    m.require(2)?;
    let b = m.pop_number()?;
    let a = m.pop_number()?;
    m.push(Value::Number(op(a, b)));
    Ok(m)
}

fn unary(mut m: Machine, op: impl Fn(f64) -> f64) -> Outcome {
    let a = m.pop_number()?;
    m.push(Value::Number(op(a)));
    Ok(m)
}

fn bits(mut m: Machine, op: impl Fn(i64, i64) -> i64) -> Outcome {
    m.require(2)?;
    let b = m.pop_int()?;
    let a = m.pop_int()?;
    m.push(Value::Number(op(a, b) as f64));
    Ok(m)
}

fn not(mut m: Machine) -> Outcome {
    let a = m.pop_int()?;
    m.push(Value::Number(!a as f64));
    Ok(m)
}

fn equality(mut m: Machine, want_equal: bool) -> Outcome {
    m.require(2)?;
    let b = m.pop()?;
    let a = m.pop()?;
    m.push(Value::bool((a == b) == want_equal));
    Ok(m)
}

/// Orders two numbers or two strings. A NaN operand makes every ordering false.
fn compare(mut m: Machine, test: impl Fn(Ordering) -> bool) -> Outcome {
    m.require(2)?;
    let b = m.pop()?;
    let a = m.pop()?;
    let ordering = match (&a, &b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Number(_), other) | (Value::String(_), other) => {
            return Err(mismatch(a.type_name(), other));
        }
        (other, _) => {
            return Err(RuntimeError::TypeMismatch { expected: "number or string", found: other.type_name() });
        }
    };
    m.push(Value::bool(ordering.is_some_and(test)));
    Ok(m)
}

#[cfg(test)]
mod tests {
    use crate::interpreter::RuntimeError;
    use crate::primitives::testing::*;

    #[test]
    fn arithmetic() {
        assert_eq!(stack_after(vec![n(4.0), n(3.0), s("+")]), vec![n(7.0)]);
        assert_eq!(stack_after(vec![n(4.0), n(3.0), s("-")]), vec![n(1.0)]);
        assert_eq!(stack_after(vec![n(4.0), n(3.0), s("*")]), vec![n(12.0)]);
        assert_eq!(stack_after(vec![n(3.0), n(4.0), s("/")]), vec![n(0.75)]);
        assert_eq!(stack_after(vec![n(7.0), n(3.0), s("mod")]), vec![n(1.0)]);
        assert_eq!(stack_after(vec![n(2.5), s("neg")]), vec![n(-2.5)]);
        assert_eq!(stack_after(vec![n(-2.5), s("abs")]), vec![n(2.5)]);
        assert_eq!(stack_after(vec![n(2.7), s("floor")]), vec![n(2.0)]);
    }

    #[test]
    fn division_by_zero_is_ieee() {
        assert_eq!(stack_after(vec![n(1.0), n(0.0), s("/")]), vec![n(f64::INFINITY)]);
    }

    #[test]
    fn comparisons_yield_minus_one_or_zero() {
        assert_eq!(stack_after(vec![n(1.0), n(2.0), s("<")]), vec![n(-1.0)]);
        assert_eq!(stack_after(vec![n(1.0), n(2.0), s(">")]), vec![n(0.0)]);
        assert_eq!(stack_after(vec![n(2.0), n(2.0), s("<=")]), vec![n(-1.0)]);
        assert_eq!(stack_after(vec![n(1.0), n(2.0), s(">=")]), vec![n(0.0)]);
        assert_eq!(stack_after(vec![text("a"), text("b"), s("<")]), vec![n(-1.0)]);
        assert_eq!(stack_after(vec![n(f64::NAN), n(1.0), s("<")]), vec![n(0.0)]);
    }

    #[test]
    fn equality_is_structural() {
        let a = q(vec![n(1.0), s("dup")]);
        assert_eq!(stack_after(vec![a.clone(), a.clone(), s("=")]), vec![n(-1.0)]);
        assert_eq!(stack_after(vec![a, q(vec![]), s("!=")]), vec![n(-1.0)]);
        assert_eq!(stack_after(vec![text("1"), n(1.0), s("=")]), vec![n(0.0)]);
    }

    #[test]
    fn logic_is_bitwise_on_truncation() {
        assert_eq!(stack_after(vec![n(-1.0), n(0.0), s("and")]), vec![n(0.0)]);
        assert_eq!(stack_after(vec![n(-1.0), n(0.0), s("or")]), vec![n(-1.0)]);
        assert_eq!(stack_after(vec![n(0.0), s("not")]), vec![n(-1.0)]);
        assert_eq!(stack_after(vec![n(-1.0), s("not")]), vec![n(0.0)]);
        // malformed booleans are accepted as plain integers
        assert_eq!(stack_after(vec![n(6.9), n(3.0), s("and")]), vec![n(2.0)]);
        assert_eq!(stack_after(vec![n(1.0), s("not")]), vec![n(-2.0)]);
        assert_eq!(stack_after(vec![n(5.0), n(1.0), s("xor")]), vec![n(4.0)]);
        assert_eq!(stack_after(vec![n(1.0), n(4.0), s("shl")]), vec![n(16.0)]);
        assert_eq!(stack_after(vec![n(16.0), n(2.0), s("shr")]), vec![n(4.0)]);
    }

    #[test]
    fn mixed_types_mismatch() {
        assert_eq!(
            error_of(vec![n(1.0), text("a"), s("<")]),
            RuntimeError::TypeMismatch { expected: "number", found: "string" }
        );
        assert_eq!(
            error_of(vec![q(vec![]), n(1.0), s("<")]),
            RuntimeError::TypeMismatch { expected: "number or string", found: "list" }
        );
        assert_eq!(
            error_of(vec![n(1.0), text("a"), s("+")]),
            RuntimeError::TypeMismatch { expected: "number", found: "string" }
        );
    }
}
