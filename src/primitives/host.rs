//! Host calls. These block inside a single step and run to completion.

use std::io::Write;

use super::{Outcome, Registry};
use crate::interpreter::RuntimeError;
use crate::machine::Machine;
use crate::value::Value;

pub(super) fn register(r: &mut Registry) {
    r.register("print", print);
    r.register("emit", emit);
    r.register("read-file", read_file);
    r.register("write-file", write_file);
    r.register("random", random);
}

fn host(err: std::io::Error) -> RuntimeError {
    RuntimeError::Host { message: err.to_string() }
}

fn print(mut m: Machine) -> Outcome {
    let value = m.pop()?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", value.to_plain_string()).map_err(host)?;
    Ok(m)
}

/// Writes one character given by its code point, no newline.
fn emit(mut m: Machine) -> Outcome {
    let code = m.pop_int()?;
    let ch = u32::try_from(code).ok().and_then(char::from_u32).ok_or_else(|| {
        RuntimeError::InvalidArgument { message: format!("{code} is not a character code") }
    })?;
    let mut out = std::io::stdout().lock();
    write!(out, "{ch}").and_then(|()| out.flush()).map_err(host)?;
    Ok(m)
}

fn read_file(mut m: Machine) -> Outcome {
    let path = m.pop_string()?;
    let contents = std::fs::read_to_string(path.as_ref()).map_err(host)?;
    m.push(Value::string(&contents));
    Ok(m)
}

// text path --
fn write_file(mut m: Machine) -> Outcome {
    m.require(2)?;
    let path = m.pop_string()?;
    let contents = m.pop_string()?;
    std::fs::write(path.as_ref(), contents.as_bytes()).map_err(host)?;
    Ok(m)
}

/// Uniform in [0, 1).
fn random(mut m: Machine) -> Outcome {
    m.push(Value::Number(fastrand::f64()));
    Ok(m)
}

#[cfg(test)]
mod tests {
    use crate::interpreter::RuntimeError;
    use crate::primitives::testing::*;
    use crate::value::Value;

    #[test]
    fn files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        let path = path.to_str().unwrap();
        let program = vec![
            text("hello"), text(path), s("write-file"),
            text(path), s("read-file"),
        ];
        assert_eq!(stack_after(program), vec![text("hello")]);
    }

    #[test]
    fn missing_file_is_host_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        let err = error_of(vec![text(path.to_str().unwrap()), s("read-file")]);
        assert!(matches!(err, RuntimeError::Host { .. }));
    }

    #[test]
    fn random_is_in_unit_interval() {
        for _ in 0..50 {
            match stack_after(vec![s("random")]).as_slice() {
                [Value::Number(x)] => assert!((0.0..1.0).contains(x)),
                other => panic!("unexpected stack {other:?}"),
            }
        }
    }

    #[test]
    fn emit_rejects_bad_code_points() {
        assert!(matches!(error_of(vec![n(-5.0), s("emit")]), RuntimeError::InvalidArgument { .. }));
    }
}
