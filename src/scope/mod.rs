//! Lexical scopes as a persistent chain of frames.
//!
//! A scope is a pointer to its innermost frame; each frame points at its
//! parent. Frames are shared between scopes and never mutated once shared, so
//! a scope captured by a pending activation stays valid whatever the running
//! code defines afterwards.
//!
//! Activations do not stack frames on top of the caller. A word runs in the
//! chain that was current where the word was found (its home) plus one fresh
//! frame, so lookup depth follows lexical nesting and stays flat under
//! recursion.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::interpreter::RuntimeError;
use crate::value::Value;

#[derive(Debug, Clone)]
struct Frame {
    bindings: HashMap<Rc<str>, Value>,
    parent: Option<Rc<Frame>>,
    depth: usize,
}

#[derive(Debug, Clone)]
pub struct Scope {
    innermost: Rc<Frame>,
}

impl Scope {
    /// A chain with a single empty frame.
    pub fn root() -> Self {
        Scope {
            innermost: Rc::new(Frame { bindings: HashMap::new(), parent: None, depth: 1 }),
        }
    }

    /// Rebuild a chain from its frames, outermost first. An empty iterator
    /// yields the root scope.
    pub fn from_frames<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = BTreeMap<String, Value>>,
    {
        let mut scope: Option<Scope> = None;
        for frame in frames {
            let mut next = match &scope {
                Some(s) => s.enter_nested(),
                None => Scope::root(),
            };
            for (name, value) in frame {
                next.bind(&name, value);
            }
            scope = Some(next);
        }
        scope.unwrap_or_else(Scope::root)
    }

    /// Pushes `frames` on top of this chain, outermost first.
    pub fn extend<I>(&self, frames: I) -> Scope
    where
        I: IntoIterator<Item = BTreeMap<String, Value>>,
    {
        let mut scope = self.clone();
        for frame in frames {
            scope = scope.enter_nested();
            for (name, value) in frame {
                scope.bind(&name, value);
            }
        }
        scope
    }

    /// The chain's single outermost frame.
    pub fn outermost(&self) -> Scope {
        let mut frame = &self.innermost;
        while let Some(parent) = &frame.parent {
            frame = parent;
        }
        Scope { innermost: Rc::clone(frame) }
    }

    /// Whether both chains end in the very same root frame.
    pub fn shares_root(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.outermost().innermost, &other.outermost().innermost)
    }

    /// Returns a new scope with `name` bound in the innermost frame.
    pub fn define(&self, name: &str, value: Value) -> Scope {
        let mut next = self.clone();
        next.bind(name, value);
        next
    }

    /// In-place `define`; copies the innermost frame only if it is shared.
    pub fn bind(&mut self, name: &str, value: Value) {
        Rc::make_mut(&mut self.innermost).bindings.insert(Rc::from(name), value);
    }

    pub fn resolve(&self, name: &str) -> Option<&Value> {
        self.resolve_with_home(name).map(|(value, _)| value)
    }

    /// Resolve `name` and also return the chain starting at the frame that
    /// holds the binding. Executing a word body uses that chain as its home.
    pub fn resolve_with_home(&self, name: &str) -> Option<(&Value, Scope)> {
        let mut frame = &self.innermost;
        loop {
            if let Some(value) = frame.bindings.get(name) {
                return Some((value, Scope { innermost: Rc::clone(frame) }));
            }
            frame = frame.parent.as_ref()?;
        }
    }

    /// Pushes one empty frame.
    pub fn enter_nested(&self) -> Scope {
        Scope {
            innermost: Rc::new(Frame {
                bindings: HashMap::new(),
                parent: Some(Rc::clone(&self.innermost)),
                depth: self.innermost.depth + 1,
            }),
        }
    }

    /// Pops the innermost frame. Leaving the root is a defect in the caller.
    pub fn leave_nested(&self) -> Result<Scope, RuntimeError> {
        self.innermost
            .parent
            .as_ref()
            .map(|parent| Scope { innermost: Rc::clone(parent) })
            .ok_or(RuntimeError::MalformedScope)
    }

    /// Number of frames a lookup may have to visit.
    pub fn depth(&self) -> usize {
        self.innermost.depth
    }

    pub fn is_root(&self) -> bool {
        self.innermost.parent.is_none()
    }

    /// Every visible binding, inner frames shadowing outer ones.
    pub fn flatten(&self) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        for frame in self.frames() {
            out.extend(frame);
        }
        out
    }

    /// Frame contents, outermost first.
    pub fn frames(&self) -> Vec<BTreeMap<String, Value>> {
        let mut out = Vec::with_capacity(self.depth());
        let mut frame = Some(&self.innermost);
        while let Some(f) = frame {
            out.push(
                f.bindings
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            );
            frame = f.parent.as_ref();
        }
        out.reverse();
        out
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::root()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        let mut a = Some(&self.innermost);
        let mut b = Some(&other.innermost);
        loop {
            match (a, b) {
                (None, None) => return true,
                (Some(x), Some(y)) => {
                    if Rc::ptr_eq(x, y) {
                        return true;
                    }
                    if x.depth != y.depth || x.bindings != y.bindings {
                        return false;
                    }
                    a = x.parent.as_ref();
                    b = y.parent.as_ref();
                }
                _ => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn inner_binding_shadows_outer() {
        let outer = Scope::root().define("x", num(1.0));
        let inner = outer.enter_nested().define("x", num(2.0));
        assert_eq!(inner.resolve("x"), Some(&num(2.0)));
        assert_eq!(outer.resolve("x"), Some(&num(1.0)));
    }

    #[test]
    fn outer_bindings_visible_after_enter() {
        let outer = Scope::root().define("x", num(1.0)).define("y", num(2.0));
        let inner = outer.enter_nested();
        assert_eq!(inner.resolve("x"), Some(&num(1.0)));
        let inner = inner.define("x", num(9.0));
        assert_eq!(inner.resolve("y"), Some(&num(2.0)));
    }

    #[test]
    fn enter_then_leave_is_identity() {
        let scope = Scope::root().define("a", num(1.0)).enter_nested().define("b", num(2.0));
        let back = scope.enter_nested().leave_nested().unwrap();
        assert_eq!(back, scope);
        assert_eq!(back.depth(), 2);
    }

    #[test]
    fn leaving_root_is_malformed() {
        assert_eq!(Scope::root().leave_nested(), Err(RuntimeError::MalformedScope));
    }

    #[test]
    fn define_does_not_touch_ancestors_or_originals() {
        let outer = Scope::root().define("x", num(1.0));
        let inner = outer.enter_nested();
        let defined = inner.define("x", num(5.0));
        assert_eq!(inner.resolve("x"), Some(&num(1.0)));
        let left = defined.leave_nested().unwrap();
        assert_eq!(left.resolve("x"), Some(&num(1.0)));
        assert_eq!(left, outer);
    }

    #[test]
    fn unbound_name_resolves_to_none() {
        assert!(Scope::root().resolve("frobnicate").is_none());
    }

    #[test]
    fn home_is_defining_frame() {
        let outer = Scope::root().define("w", num(1.0));
        let inner = outer.enter_nested().enter_nested();
        let (_, home) = inner.resolve_with_home("w").unwrap();
        assert_eq!(home.depth(), 1);
        assert_eq!(home, outer);
    }

    #[test]
    fn frames_round_trip() {
        let scope = Scope::root()
            .define("a", num(1.0))
            .enter_nested()
            .define("a", num(2.0))
            .define("b", num(3.0));
        let frames = scope.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(Scope::from_frames(frames), scope);
        assert_eq!(Scope::from_frames(Vec::new()), Scope::root());
    }

    #[test]
    fn extend_shares_the_root_frame() {
        let root = Scope::root().define("a", num(1.0));
        let nested = root.enter_nested().define("b", num(2.0)).enter_nested();
        assert!(nested.shares_root(&root));
        assert!(!nested.shares_root(&Scope::root().define("a", num(1.0))));
        assert_eq!(nested.outermost(), root);

        let above: Vec<_> = nested.frames().into_iter().skip(1).collect();
        let rebuilt = root.extend(above);
        assert_eq!(rebuilt, nested);
        assert!(rebuilt.shares_root(&root));
        assert_eq!(root.extend(Vec::new()), root);
    }

    #[test]
    fn flatten_prefers_inner() {
        let scope = Scope::root()
            .define("a", num(1.0))
            .define("b", num(1.0))
            .enter_nested()
            .define("a", num(2.0));
        let flat = scope.flatten();
        assert_eq!(flat["a"], num(2.0));
        assert_eq!(flat["b"], num(1.0));
    }
}
