//! Repetition logic element (`*for`).
//!
//! Reconciles child references against the previous array snapshot by value
//! identity, not index: surviving items keep their child reference,
//! duplicates pair one-for-one through a one-shot taken marker, removals
//! run in reverse index order, and new or moved children insert before the
//! next untouched surviving anchor (or the end marker).

use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use trellis_compiler::view::ConstructorStack;

use crate::dom::NodeRef;
use crate::engine::EngineShared;
use crate::error::Result;
use crate::reference::binding::eval_statement;
use crate::reference::{BindingReference, ReferenceInner};
use crate::scope::{new_frame, ImplicitFrame, Scope};
use crate::value::Value;

use super::{LogicCore, LogicKind};

pub(crate) struct ForState {
    pub previous: Vec<Value>,
    pub children: Vec<ForChild>,
}

#[derive(Clone)]
pub(crate) struct ForChild {
    pub value: Value,
    pub reference: BindingReference,
    pub frame: ImplicitFrame,
}

impl ForState {
    pub fn new() -> Self {
        ForState {
            previous: Vec::new(),
            children: Vec::new(),
        }
    }
}

impl LogicCore {
    pub(crate) fn detect_for(&mut self, scope: &Scope, recursive: bool) -> Result<()> {
        let skip_errors = self.engine.skip_errors();
        let array = match eval_statement(&self.attr.statement, scope, &self.attr.name, skip_errors)?
        {
            Value::Array(items) => items,
            _ => Vec::new(),
        };

        let env = ForEnv {
            engine: Rc::clone(&self.engine),
            owner: self.owner.clone(),
            stack: Rc::clone(&self.stack),
            marker: self.marker.clone(),
            item_alias: self.attr.item_alias.clone(),
            index_alias: self.attr.index_alias.clone(),
            variables: self.variables.clone(),
        };
        let state = match &mut self.kind {
            LogicKind::For(state) => state,
            _ => unreachable!("detect_for on a non-for logic element"),
        };

        // Fast path: identical length and every element by identity.
        if array.len() == state.previous.len()
            && array.iter().zip(&state.previous).all(|(a, b)| a == b)
        {
            for (index, child) in state.children.iter().enumerate() {
                env.refresh_frame(child, index, &array, scope);
                child.reference.detect_changes(recursive)?;
            }
            return Ok(());
        }

        // Match each previous element against a not-yet-taken equal element
        // in the new array; unmatched previous elements are removals.
        let mut taken = vec![false; array.len()];
        let mut matched: Vec<Option<usize>> = vec![None; array.len()];
        let mut remains = vec![false; state.children.len()];
        for (old_index, child) in state.children.iter().enumerate() {
            let found = array
                .iter()
                .enumerate()
                .position(|(i, value)| !taken[i] && *value == child.value);
            if let Some(new_index) = found {
                taken[new_index] = true;
                matched[new_index] = Some(old_index);
                remains[old_index] = true;
            }
        }

        // Removals first, in reverse index order.
        for old_index in (0..state.children.len()).rev() {
            if !remains[old_index] {
                let child = state.children.remove(old_index);
                child.reference.destroy()?;
                for slot in matched.iter_mut().flatten() {
                    if *slot > old_index {
                        *slot -= 1;
                    }
                }
            }
        }

        // Forward walk: correlated children stay in place when already
        // positioned correctly, otherwise they (and new children) insert
        // before the next untouched surviving anchor.
        let survivors = std::mem::take(&mut state.children);
        let mut pending: Vec<usize> = (0..survivors.len()).collect();
        let mut children = Vec::with_capacity(array.len());

        for (index, value) in array.iter().enumerate() {
            match matched[index] {
                Some(old_index) => {
                    let child = survivors[old_index].clone();
                    if pending.first() == Some(&old_index) {
                        pending.remove(0);
                    } else {
                        pending.retain(|&i| i != old_index);
                        let anchor = env.anchor_node(&survivors, &pending);
                        child.reference.detach()?;
                        child.reference.insert_before(&anchor)?;
                    }
                    let child = ForChild {
                        value: value.clone(),
                        ..child
                    };
                    env.refresh_frame(&child, index, &array, scope);
                    child.reference.detect_changes(recursive)?;
                    children.push(child);
                }
                None => {
                    let anchor = env.anchor_node(&survivors, &pending);
                    let child = env.create_child(value, index, &array, scope)?;
                    child.reference.insert_before(&anchor)?;
                    child.reference.detect_changes(recursive)?;
                    children.push(child);
                }
            }
        }

        state.previous = array;
        state.children = children;
        Ok(())
    }
}

struct ForEnv {
    engine: Rc<EngineShared>,
    owner: Weak<ReferenceInner>,
    stack: Rc<ConstructorStack>,
    marker: NodeRef,
    item_alias: Option<String>,
    index_alias: Option<String>,
    variables: IndexMap<String, String>,
}

impl ForEnv {
    /// The next untouched surviving child's first node, or the end marker.
    fn anchor_node(&self, survivors: &[ForChild], pending: &[usize]) -> NodeRef {
        pending
            .first()
            .and_then(|&index| survivors[index].reference.first_node())
            .unwrap_or_else(|| self.marker.clone())
    }

    fn create_child(
        &self,
        value: &Value,
        index: usize,
        array: &[Value],
        scope: &Scope,
    ) -> Result<ForChild> {
        let frame = new_frame([]);
        let reference = BindingReference::new(Rc::clone(&self.engine), Rc::clone(&self.stack), true);
        if let Some(owner) = self.owner.upgrade() {
            reference.set_parent(&BindingReference::from_inner(owner));
        }
        let child = ForChild {
            value: value.clone(),
            reference,
            frame,
        };
        self.refresh_frame(&child, index, array, scope);

        let mut implicits = scope.implicits.clone();
        implicits.push(Rc::clone(&child.frame));
        child.reference.bind(scope.context.clone(), implicits)?;
        Ok(child)
    }

    /// Refresh the implicit variables: `item`, `index`, `length`, `array`,
    /// the user aliases, and `let-` derived values.
    fn refresh_frame(&self, child: &ForChild, index: usize, array: &[Value], scope: &Scope) {
        {
            let mut frame = child.frame.borrow_mut();
            frame.insert("item".to_string(), child.value.clone());
            frame.insert("index".to_string(), Value::Number(index as f64));
            frame.insert("length".to_string(), Value::Number(array.len() as f64));
            frame.insert("array".to_string(), Value::Array(array.to_vec()));
            if let Some(alias) = &self.item_alias {
                frame.insert(alias.clone(), child.value.clone());
            }
            if let Some(alias) = &self.index_alias {
                frame.insert(alias.clone(), Value::Number(index as f64));
            }
        }

        if self.variables.is_empty() {
            return;
        }
        let derived_scope = scope.child(Rc::clone(&child.frame));
        let statements = self.engine.compiler.statements();
        for (name, path) in &self.variables {
            let value = statements
                .parse(path)
                .ok()
                .and_then(|info| {
                    eval_statement(&info, &derived_scope, name, true).ok()
                })
                .unwrap_or(Value::Undefined);
            child.frame.borrow_mut().insert(name.clone(), value);
        }
    }
}
