pub mod plist;

use std::rc::Rc;

pub use plist::PList;

use crate::interpreter::RuntimeError;
use crate::scope::Scope;
use crate::value::Value;

/// Internal control markers. They live only on the continuation and have no
/// spelling in source, so user definitions can never shadow or forge them.
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    /// End of a word activation: reinstate the caller's scope.
    Restore(Scope),
    /// End of a `scoped` block: leave the innermost frame.
    PopScope,
    /// Debugger stop point injected behind a stepped-into expansion.
    Pause,
    /// Breakpoint placed by the `break` primitive.
    Break,
    /// Push the value without interpreting it (a saved symbol must not run).
    Literal(Value),
}

/// One pending unit on the continuation.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Value(Value),
    Marker(Marker),
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Item::Value(v) => write!(f, "{}", v),
            Item::Marker(Marker::Restore(_)) => write!(f, "<restore>"),
            Item::Marker(Marker::PopScope) => write!(f, "<pop-scope>"),
            Item::Marker(Marker::Pause) => write!(f, "<pause>"),
            Item::Marker(Marker::Break) => write!(f, "<break>"),
            Item::Marker(Marker::Literal(v)) => write!(f, "<literal {}>", v),
        }
    }
}

/// What the head of the continuation means for a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing left to execute.
    Settled,
    /// Ordinary work is pending.
    Ready,
    /// A debugger pause marker is next.
    Paused,
    /// A breakpoint marker is next.
    Breakpoint,
}

/// The whole machine: data stack, continuation, dictionary.
///
/// Cloning is O(1): all three registers are persistent structures.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Machine {
    stack: PList<Value>,
    continuation: PList<Item>,
    scope: Scope,
}

impl Machine {
    pub fn new(scope: Scope) -> Self {
        Machine { stack: PList::new(), continuation: PList::new(), scope }
    }

    pub fn from_parts(stack: PList<Value>, continuation: PList<Item>, scope: Scope) -> Self {
        Machine { stack, continuation, scope }
    }

    pub fn stack(&self) -> &PList<Value> {
        &self.stack
    }

    pub fn continuation(&self) -> &PList<Item> {
        &self.continuation
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn set_stack(&mut self, stack: PList<Value>) {
        self.stack = stack;
    }

    pub fn set_continuation(&mut self, continuation: PList<Item>) {
        self.continuation = continuation;
    }

    pub fn set_scope(&mut self, scope: Scope) {
        self.scope = scope;
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn status(&self) -> Status {
        match self.continuation.peek() {
            None => Status::Settled,
            Some(Item::Marker(Marker::Pause)) => Status::Paused,
            Some(Item::Marker(Marker::Break)) => Status::Breakpoint,
            Some(_) => Status::Ready,
        }
    }

    // ── Stack ────────────────────────────────────────────────────────

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn peek(&self) -> Option<&Value> {
        self.stack.peek()
    }

    /// Fails with `StackUnderflow` unless at least `n` values are present.
    pub fn require(&self, n: usize) -> Result<(), RuntimeError> {
        if self.stack.len() < n {
            return Err(RuntimeError::StackUnderflow { needed: n, found: self.stack.len() });
        }
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.require(1)?;
        self.stack
            .pop()
            .ok_or(RuntimeError::StackUnderflow { needed: 1, found: 0 })
    }

    pub fn pop_number(&mut self) -> Result<f64, RuntimeError> {
        match self.pop()? {
            Value::Number(n) => Ok(n),
            other => Err(mismatch("number", &other)),
        }
    }

    /// Pops a number truncated toward zero. NaN truncates to 0.
    pub fn pop_int(&mut self) -> Result<i64, RuntimeError> {
        Ok(self.pop_number()? as i64)
    }

    pub fn pop_list(&mut self) -> Result<Rc<Vec<Value>>, RuntimeError> {
        match self.pop()? {
            Value::List(items) => Ok(items),
            other => Err(mismatch("list", &other)),
        }
    }

    pub fn pop_string(&mut self) -> Result<Rc<str>, RuntimeError> {
        match self.pop()? {
            Value::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }

    /// A dictionary key: either a string or a symbol.
    pub fn pop_name(&mut self) -> Result<Rc<str>, RuntimeError> {
        match self.pop()? {
            Value::String(s) | Value::Symbol(s) => Ok(s),
            other => Err(mismatch("name", &other)),
        }
    }

    // ── Continuation ─────────────────────────────────────────────────

    pub fn head(&self) -> Option<&Item> {
        self.continuation.peek()
    }

    /// Removes and returns the next unit of work.
    pub fn take_next(&mut self) -> Option<Item> {
        self.continuation.pop()
    }

    pub fn schedule(&mut self, item: Item) {
        self.continuation.push(item);
    }

    /// Puts `values` in front of the continuation, first value runs first.
    pub fn splice<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        self.continuation.prepend(values.into_iter().map(Item::Value));
    }

    /// Schedules `value` to be pushed as data once the work in front of it is done.
    pub fn schedule_push(&mut self, value: Value) {
        let item = match value {
            Value::Symbol(_) => Item::Marker(Marker::Literal(value)),
            other => Item::Value(other),
        };
        self.continuation.push(item);
    }

    /// Pending values up to the first marker: the rest of the current activation.
    pub fn pending_values(&self) -> Vec<Value> {
        self.continuation
            .iter()
            .map_while(|item| match item {
                Item::Value(v) => Some(v.clone()),
                Item::Marker(_) => None,
            })
            .collect()
    }

    /// Replaces the values returned by `pending_values`, leaving markers intact.
    pub fn replace_pending_values(&mut self, values: Vec<Value>) {
        while matches!(self.continuation.peek(), Some(Item::Value(_))) {
            self.continuation.pop();
        }
        self.splice(values);
    }
}

pub(crate) fn mismatch(expected: &'static str, found: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch { expected, found: found.type_name() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_reports_underflow() {
        let mut m = Machine::default();
        assert_eq!(m.pop(), Err(RuntimeError::StackUnderflow { needed: 1, found: 0 }));
        m.push(Value::Number(1.0));
        assert_eq!(m.require(2), Err(RuntimeError::StackUnderflow { needed: 2, found: 1 }));
    }

    #[test]
    fn typed_pops_report_mismatch() {
        let mut m = Machine::default();
        m.push(Value::string("x"));
        assert_eq!(
            m.pop_number(),
            Err(RuntimeError::TypeMismatch { expected: "number", found: "string" })
        );
    }

    #[test]
    fn pop_name_accepts_string_or_symbol() {
        let mut m = Machine::default();
        m.push(Value::symbol("a"));
        m.push(Value::string("b"));
        assert_eq!(m.pop_name().unwrap().as_ref(), "b");
        assert_eq!(m.pop_name().unwrap().as_ref(), "a");
    }

    #[test]
    fn status_follows_head() {
        let mut m = Machine::default();
        assert_eq!(m.status(), Status::Settled);
        m.schedule(Item::Marker(Marker::Break));
        assert_eq!(m.status(), Status::Breakpoint);
        m.schedule(Item::Marker(Marker::Pause));
        assert_eq!(m.status(), Status::Paused);
        m.splice(vec![Value::Number(1.0)]);
        assert_eq!(m.status(), Status::Ready);
    }

    #[test]
    fn schedule_push_protects_symbols() {
        let mut m = Machine::default();
        m.schedule_push(Value::symbol("dup"));
        m.schedule_push(Value::Number(3.0));
        assert_eq!(m.head(), Some(&Item::Value(Value::Number(3.0))));
        m.take_next();
        assert_eq!(m.head(), Some(&Item::Marker(Marker::Literal(Value::symbol("dup")))));
    }

    #[test]
    fn pending_values_stop_at_markers() {
        let mut m = Machine::default();
        m.splice(vec![Value::Number(9.0)]);
        m.schedule(Item::Marker(Marker::PopScope));
        m.splice(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(m.pending_values(), vec![Value::Number(1.0), Value::Number(2.0)]);
        m.replace_pending_values(vec![Value::Number(5.0)]);
        assert_eq!(m.continuation().len(), 3);
        assert_eq!(m.pending_values(), vec![Value::Number(5.0)]);
    }
}
