use super::{Outcome, Registry};
use crate::interpreter::RuntimeError;
use crate::machine::{Machine, PList};
use crate::value::Value;

pub(super) fn register(r: &mut Registry) {
    r.register("define", define);
    r.register("lookup", lookup);
    r.register("defined?", defined);
    r.register("words", words);
    r.register("stack", stack);
    r.register("set-stack", set_stack);
    r.register("continuation", continuation);
    r.register("set-continuation", set_continuation);
    r.register("dictionary", dictionary);
}

// value name --   binds in the innermost frame
fn define(mut m: Machine) -> Outcome {
    m.require(2)?;
    let name = m.pop_name()?;
    let value = m.pop()?;
    m.scope_mut().bind(&name, value);
    Ok(m)
}

fn lookup(mut m: Machine) -> Outcome {
    let name = m.pop_name()?;
    let value = m
        .scope()
        .resolve(&name)
        .cloned()
        .ok_or_else(|| RuntimeError::UnknownWord { name: name.to_string() })?;
    m.push(value);
    Ok(m)
}

fn defined(mut m: Machine) -> Outcome {
    let name = m.pop_name()?;
    let found = m.scope().resolve(&name).is_some();
    m.push(Value::bool(found));
    Ok(m)
}

fn words(mut m: Machine) -> Outcome {
    let names = m.scope().flatten().into_keys().map(|k| Value::string(&k)).collect();
    m.push(Value::list(names));
    Ok(m)
}

/// Pushes the stack as a list, top first.
fn stack(mut m: Machine) -> Outcome {
    let snapshot = m.stack().to_vec();
    m.push(Value::list(snapshot));
    Ok(m)
}

fn set_stack(mut m: Machine) -> Outcome {
    let items = m.pop_list()?;
    m.set_stack(items.iter().cloned().collect::<PList<Value>>());
    Ok(m)
}

/// Pushes the rest of the current activation as a list.
fn continuation(mut m: Machine) -> Outcome {
    let pending = m.pending_values();
    m.push(Value::list(pending));
    Ok(m)
}

fn set_continuation(mut m: Machine) -> Outcome {
    let items = m.pop_list()?;
    m.replace_pending_values(items.to_vec());
    Ok(m)
}

fn dictionary(mut m: Machine) -> Outcome {
    let visible = m.scope().flatten();
    m.push(Value::map(visible));
    Ok(m)
}

#[cfg(test)]
mod tests {
    use crate::interpreter::RuntimeError;
    use crate::primitives::testing::*;
    use crate::value::Value;

    #[test]
    fn define_accepts_symbol_names() {
        let program = vec![
            q(vec![s("dup"), s("*")]),
            q(vec![s("square")]),
            s("first"),
            s("define"),
            n(7.0),
            s("square"),
        ];
        assert_eq!(stack_after(program), vec![n(49.0)]);
    }

    #[test]
    fn lookup_and_defined() {
        assert_eq!(
            stack_after(vec![n(5.0), text("five"), s("define"), text("five"), s("lookup")]),
            vec![n(5.0)]
        );
        assert_eq!(stack_after(vec![text("dup"), s("defined?")]), vec![n(-1.0)]);
        assert_eq!(
            error_of(vec![text("frobnicate"), s("lookup")]),
            RuntimeError::UnknownWord { name: "frobnicate".into() }
        );
    }

    #[test]
    fn stack_round_trips_through_set_stack() {
        let program = vec![n(1.0), n(2.0), s("stack"), s("clear"), s("set-stack")];
        assert_eq!(stack_after(program), vec![n(1.0), n(2.0)]);
    }

    #[test]
    fn stack_list_is_top_first() {
        assert_eq!(
            stack_after(vec![n(1.0), n(2.0), s("stack")]),
            vec![n(1.0), n(2.0), q(vec![n(2.0), n(1.0)])]
        );
    }

    #[test]
    fn continuation_can_be_rewritten() {
        // drop the pending `10 +` and run `100 *` instead
        let program = vec![
            n(2.0),
            q(vec![n(100.0), s("*")]),
            s("set-continuation"),
            n(10.0),
            s("+"),
        ];
        assert_eq!(stack_after(program), vec![n(200.0)]);
    }

    #[test]
    fn continuation_lists_pending_values() {
        let program = vec![s("continuation"), n(1.0), n(2.0), s("drop"), s("drop")];
        assert_eq!(
            stack_after(program),
            vec![q(vec![n(1.0), n(2.0), s("drop"), s("drop")])]
        );
    }

    #[test]
    fn dictionary_and_words_show_visible_bindings() {
        let (m, _) = eval(vec![n(1.0), text("one"), s("define"), s("dictionary")]).unwrap();
        match m.peek() {
            Some(Value::Map(entries)) => {
                assert_eq!(entries.get("one"), Some(&n(1.0)));
                assert!(matches!(entries.get("dup"), Some(Value::Word(_))));
            }
            other => panic!("expected map, got {other:?}"),
        }
        let (m, _) = eval(vec![s("words")]).unwrap();
        let listed = m.peek().and_then(Value::as_list).unwrap();
        assert!(listed.contains(&text("define")));
    }
}
