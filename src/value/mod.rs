use std::collections::BTreeMap;
use std::rc::Rc;

use crate::interpreter::RuntimeError;
use crate::machine::Machine;

/// Native operation behind a primitive word.
pub type NativeFn = Rc<dyn Fn(Machine) -> Result<Machine, RuntimeError>>;

/// Every datum and every program fragment.
///
/// Lists are both data and code: a List sitting on the continuation is pushed,
/// a List bound to a name is expanded when the name is executed.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Symbol(Rc<str>),
    String(Rc<str>),
    Number(f64),
    List(Rc<Vec<Value>>),
    Map(Rc<BTreeMap<String, Value>>),
    Word(Word),
}

impl Value {
    pub fn symbol(name: &str) -> Self {
        Value::Symbol(Rc::from(name))
    }

    pub fn string(text: &str) -> Self {
        Value::String(Rc::from(text))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(items))
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(Rc::new(entries))
    }

    /// `-1` (all bits set) for true, `0` for false.
    pub fn bool(b: bool) -> Self {
        Value::Number(if b { -1.0 } else { 0.0 })
    }

    /// Only `Number(0)` is false.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Number(n) if *n == 0.0)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Symbol(_) => "symbol",
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Word(_) => "word",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Rc<Vec<Value>>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Like `Display`, but strings come out raw instead of quoted.
    pub fn to_plain_string(&self) -> String {
        match self {
            Value::String(s) => s.to_string(),
            other => other.to_string(),
        }
    }

    /// Lossy JSON projection used by `dump` and `--json` output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Symbol(name) => serde_json::json!({ "symbol": name.as_ref() }),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Word(w) => serde_json::json!({ "word": w.name() }),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Symbol(name) => write!(f, "{}", name),
            Value::String(s) => write!(f, "{:?}", s.as_ref()),
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 { write!(f, " ")?; }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Word(w) => write!(f, "<{}>", w.name()),
        }
    }
}

/// Resolved handle to a primitive. Compared and serialized by name only.
#[derive(Clone)]
pub struct Word {
    name: Rc<str>,
    op: NativeFn,
}

impl Word {
    pub fn new(name: &str, op: NativeFn) -> Self {
        Word { name: Rc::from(name), op }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self, machine: Machine) -> Result<Machine, RuntimeError> {
        (self.op)(machine)
    }
}

impl PartialEq for Word {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl std::fmt::Debug for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Word({})", self.name)
    }
}
