//! Scopes.
//!
//! A scope is the `(context, implicits)` pair handed to every compiled
//! getter and setter. Implicit frames are consulted innermost-first before
//! the shared context; logic elements refresh their frames in place between
//! detection passes.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

/// Shared mutable state map of one binding reference.
pub type Context = Rc<RefCell<IndexMap<String, Value>>>;

/// One implicit-variable frame (loop variables, `$event`, `let-` values).
pub type ImplicitFrame = Rc<RefCell<IndexMap<String, Value>>>;

pub fn new_context(entries: impl IntoIterator<Item = (String, Value)>) -> Context {
    Rc::new(RefCell::new(entries.into_iter().collect()))
}

pub fn new_frame(entries: impl IntoIterator<Item = (String, Value)>) -> ImplicitFrame {
    Rc::new(RefCell::new(entries.into_iter().collect()))
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub context: Context,
    pub implicits: Vec<ImplicitFrame>,
}

impl Scope {
    pub fn new(context: Context) -> Self {
        Scope {
            context,
            implicits: Vec::new(),
        }
    }

    pub fn with_implicits(context: Context, implicits: Vec<ImplicitFrame>) -> Self {
        Scope { context, implicits }
    }

    /// Derive a child scope with one more implicit frame on top.
    pub fn child(&self, frame: ImplicitFrame) -> Scope {
        let mut implicits = self.implicits.clone();
        implicits.push(frame);
        Scope {
            context: Rc::clone(&self.context),
            implicits,
        }
    }

    /// Resolve a name: innermost implicit frame first, then the context.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        for frame in self.implicits.iter().rev() {
            if let Some(value) = frame.borrow().get(name) {
                return Some(value.clone());
            }
        }
        self.context.borrow().get(name).cloned()
    }

    /// Whether a name resolves at all (a declared `undefined` counts).
    pub fn declares(&self, name: &str) -> bool {
        self.implicits
            .iter()
            .any(|frame| frame.borrow().contains_key(name))
            || self.context.borrow().contains_key(name)
    }

    /// Write a root name. Implicit frames shadow the context for writes the
    /// same way they do for reads.
    pub fn write(&self, name: &str, value: Value) {
        for frame in self.implicits.iter().rev() {
            if frame.borrow().contains_key(name) {
                frame.borrow_mut().insert(name.to_string(), value);
                return;
            }
        }
        self.context.borrow_mut().insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_shadows_context() {
        let context = new_context([("x".to_string(), Value::from(1))]);
        let scope = Scope::new(context);
        let child = scope.child(new_frame([("x".to_string(), Value::from(2))]));
        assert_eq!(scope.lookup("x"), Some(Value::from(1)));
        assert_eq!(child.lookup("x"), Some(Value::from(2)));
    }

    #[test]
    fn test_write_targets_declaring_frame() {
        let context = new_context([("x".to_string(), Value::from(1))]);
        let scope = Scope::new(context);
        let frame = new_frame([("item".to_string(), Value::from("a"))]);
        let child = scope.child(Rc::clone(&frame));

        child.write("item", Value::from("b"));
        child.write("x", Value::from(9));

        assert_eq!(frame.borrow().get("item"), Some(&Value::from("b")));
        assert_eq!(scope.lookup("x"), Some(Value::from(9)));
    }
}
