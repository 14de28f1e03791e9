use std::collections::BTreeMap;
use std::rc::Rc;

use super::{Outcome, Registry};
use crate::interpreter::RuntimeError;
use crate::machine::{mismatch, Machine};
use crate::value::Value;

pub(super) fn register(r: &mut Registry) {
    r.register("size", size);
    r.register("first", first);
    r.register("rest", rest);
    r.register("cons", cons);
    r.register("concat", concat);
    r.register("nth", nth);
    r.register("reverse", reverse);
    r.register("map-new", map_new);
    r.register("get", get);
    r.register("put", put);
    r.register("keys", keys);
    r.register("has?", has);
    r.register("to-string", to_string);
    r.register("type", type_of);
}

fn size(mut m: Machine) -> Outcome {
    let len = match m.pop()? {
        Value::List(items) => items.len(),
        Value::String(s) => s.chars().count(),
        Value::Map(entries) => entries.len(),
        other => return Err(mismatch("list, string or map", &other)),
    };
    m.push(Value::Number(len as f64));
    Ok(m)
}

fn non_empty(items: Rc<Vec<Value>>, word: &str) -> Result<Rc<Vec<Value>>, RuntimeError> {
    if items.is_empty() {
        return Err(RuntimeError::InvalidArgument { message: format!("{word} of an empty list") });
    }
    Ok(items)
}

fn first(mut m: Machine) -> Outcome {
    let items = non_empty(m.pop_list()?, "first")?;
    m.push(items[0].clone());
    Ok(m)
}

fn rest(mut m: Machine) -> Outcome {
    let items = non_empty(m.pop_list()?, "rest")?;
    m.push(Value::list(items[1..].to_vec()));
    Ok(m)
}

// x [xs] -- [x xs]
fn cons(mut m: Machine) -> Outcome {
    m.require(2)?;
    let items = m.pop_list()?;
    let head = m.pop()?;
    let mut out = Vec::with_capacity(items.len() + 1);
    out.push(head);
    out.extend(items.iter().cloned());
    m.push(Value::list(out));
    Ok(m)
}

fn concat(mut m: Machine) -> Outcome {
    m.require(2)?;
    let b = m.pop()?;
    let a = m.pop()?;
    let joined = match (a, b) {
        (Value::List(x), Value::List(y)) => {
            Value::list(x.iter().chain(y.iter()).cloned().collect())
        }
        (Value::String(x), Value::String(y)) => {
            let mut out = String::with_capacity(x.len() + y.len());
            out.push_str(&x);
            out.push_str(&y);
            Value::string(&out)
        }
        (Value::List(_), other) => return Err(mismatch("list", &other)),
        (Value::String(_), other) => return Err(mismatch("string", &other)),
        (other, _) => return Err(mismatch("list or string", &other)),
    };
    m.push(joined);
    Ok(m)
}

// [xs] i -- xs[i]
fn nth(mut m: Machine) -> Outcome {
    m.require(2)?;
    let index = m.pop_int()?;
    let items = m.pop_list()?;
    let item = usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .ok_or_else(|| RuntimeError::InvalidArgument {
            message: format!("index {index} out of range for list of {}", items.len()),
        })?;
    m.push(item.clone());
    Ok(m)
}

fn reverse(mut m: Machine) -> Outcome {
    let reversed = match m.pop()? {
        Value::List(items) => Value::list(items.iter().rev().cloned().collect()),
        Value::String(s) => Value::string(&s.chars().rev().collect::<String>()),
        other => return Err(mismatch("list or string", &other)),
    };
    m.push(reversed);
    Ok(m)
}

fn pop_map(m: &mut Machine) -> Result<Rc<BTreeMap<String, Value>>, RuntimeError> {
    match m.pop()? {
        Value::Map(entries) => Ok(entries),
        other => Err(mismatch("map", &other)),
    }
}

fn map_new(mut m: Machine) -> Outcome {
    m.push(Value::map(BTreeMap::new()));
    Ok(m)
}

// {map} key -- value
fn get(mut m: Machine) -> Outcome {
    m.require(2)?;
    let key = m.pop_name()?;
    let entries = pop_map(&mut m)?;
    let value = entries.get(key.as_ref()).cloned().ok_or_else(|| {
        RuntimeError::InvalidArgument { message: format!("no key '{key}' in map") }
    })?;
    m.push(value);
    Ok(m)
}

// {map} key value -- {map'}
fn put(mut m: Machine) -> Outcome {
    m.require(3)?;
    let value = m.pop()?;
    let key = m.pop_name()?;
    let mut entries = pop_map(&mut m)?;
    Rc::make_mut(&mut entries).insert(key.to_string(), value);
    m.push(Value::Map(entries));
    Ok(m)
}

fn keys(mut m: Machine) -> Outcome {
    let entries = pop_map(&mut m)?;
    m.push(Value::list(entries.keys().map(|k| Value::string(k)).collect()));
    Ok(m)
}

// {map} key -- {map} flag
fn has(mut m: Machine) -> Outcome {
    m.require(2)?;
    let key = m.pop_name()?;
    let entries = pop_map(&mut m)?;
    let found = entries.contains_key(key.as_ref());
    m.push(Value::Map(entries));
    m.push(Value::bool(found));
    Ok(m)
}

fn to_string(mut m: Machine) -> Outcome {
    let value = m.pop()?;
    m.push(Value::string(&value.to_plain_string()));
    Ok(m)
}

fn type_of(mut m: Machine) -> Outcome {
    let value = m.pop()?;
    m.push(Value::string(value.type_name()));
    Ok(m)
}
