//! Native operations, registered by name once at startup.
//!
//! Each primitive takes the machine with its own symbol already consumed and
//! returns the successor machine. Control constructs are ordinary primitives
//! that splice quotations onto the continuation.

mod control;
mod data;
mod host;
mod math;
mod reflect;
mod stack;

use std::collections::HashMap;
use std::rc::Rc;

use crate::interpreter::RuntimeError;
use crate::machine::Machine;
use crate::scope::Scope;
use crate::value::{Value, Word};

pub type Outcome = Result<Machine, RuntimeError>;

/// Name → primitive table. Read-only once the host has finished registering.
#[derive(Default)]
pub struct Registry {
    words: HashMap<String, Word>,
}

impl Registry {
    pub fn new() -> Self {
        Registry { words: HashMap::new() }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Registry::new();
        stack::register(&mut registry);
        math::register(&mut registry);
        data::register(&mut registry);
        control::register(&mut registry);
        reflect::register(&mut registry);
        host::register(&mut registry);
        registry
    }

    /// Last registration of a name wins.
    pub fn register<F>(&mut self, name: &str, op: F)
    where
        F: Fn(Machine) -> Outcome + 'static,
    {
        self.words.insert(name.to_string(), Word::new(name, Rc::new(op)));
    }

    pub fn get(&self, name: &str) -> Option<&Word> {
        self.words.get(name)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.words.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// A root scope with every primitive bound to its word.
    pub fn install(&self) -> Scope {
        let mut scope = Scope::root();
        for (name, word) in &self.words {
            scope.bind(name, Value::Word(word.clone()));
        }
        scope
    }

    /// A fresh machine over `install()`.
    pub fn boot(&self) -> Machine {
        Machine::new(self.install())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("words", &self.names()).finish()
    }
}
