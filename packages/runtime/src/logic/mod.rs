//! Logic Elements
//!
//! Structural directives managing dynamic sub-trees: `*if` gates a single
//! child reference, `*for` reconciles an ordered set of child references by
//! item identity. A comment marker node brackets each logic region and
//! stays well-defined even with zero children.

mod conditional;
mod repeat;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use trellis_compiler::template_parser::LogicAttr;
use trellis_compiler::view::ConstructorStack;

use crate::dom::NodeRef;
use crate::engine::EngineShared;
use crate::error::{Result, RuntimeError};
use crate::reference::{BindingReference, ReferenceInner};
use crate::scope::Scope;

pub use conditional::IfStatus;

pub(crate) struct LogicCore {
    pub engine: Rc<EngineShared>,
    pub owner: Weak<ReferenceInner>,
    pub attr: LogicAttr,
    pub variables: IndexMap<String, String>,
    pub stack: Rc<ConstructorStack>,
    pub marker: NodeRef,
    pub kind: LogicKind,
}

pub(crate) enum LogicKind {
    If(conditional::IfState),
    For(repeat::ForState),
}

/// Shared handle to one logic element.
#[derive(Clone)]
pub struct LogicElement {
    inner: Rc<RefCell<LogicCore>>,
}

impl LogicElement {
    pub(crate) fn new(
        engine: Rc<EngineShared>,
        owner: Weak<ReferenceInner>,
        attr: LogicAttr,
        variables: IndexMap<String, String>,
        stack: Rc<ConstructorStack>,
        marker: NodeRef,
    ) -> Result<Self> {
        let kind = match attr.name.as_str() {
            "if" => LogicKind::If(conditional::IfState::new()),
            "for" => LogicKind::For(repeat::ForState::new()),
            other => {
                return Err(RuntimeError::lifecycle(format!(
                    "unknown logic directive `*{}`",
                    other
                )));
            }
        };
        Ok(LogicElement {
            inner: Rc::new(RefCell::new(LogicCore {
                engine,
                owner,
                attr,
                variables,
                stack,
                marker,
                kind,
            })),
        })
    }

    /// Re-evaluate the driving expression and update the managed sub-tree.
    pub fn detect_changes(&self, scope: &Scope, recursive: bool) -> Result<()> {
        let mut core = self.inner.borrow_mut();
        if matches!(core.kind, LogicKind::If(_)) {
            core.detect_if(scope, recursive)
        } else {
            core.detect_for(scope, recursive)
        }
    }

    /// Current `*if` status; `None` for other directives.
    pub fn if_status(&self) -> Option<IfStatus> {
        match &self.inner.borrow().kind {
            LogicKind::If(state) => Some(state.status),
            _ => None,
        }
    }

    /// The inner reference of an active-or-inactive `*if`.
    pub fn inner_reference(&self) -> Option<BindingReference> {
        match &self.inner.borrow().kind {
            LogicKind::If(state) => state.reference.clone(),
            _ => None,
        }
    }

    /// Child references of a `*for`, in document order.
    pub fn child_references(&self) -> Vec<BindingReference> {
        match &self.inner.borrow().kind {
            LogicKind::For(state) => state
                .children
                .iter()
                .map(|child| child.reference.clone())
                .collect(),
            LogicKind::If(state) => state.reference.clone().into_iter().collect(),
        }
    }

    /// Re-insert the marker and every live child before `anchor`.
    pub(crate) fn attach(&self, parent: &NodeRef, anchor: Option<&NodeRef>) -> Result<()> {
        let (marker, references) = {
            let core = self.inner.borrow();
            parent.insert_before(&core.marker, anchor);
            let references: Vec<BindingReference> = match &core.kind {
                LogicKind::If(state) if state.status == IfStatus::Active => {
                    state.reference.clone().into_iter().collect()
                }
                LogicKind::If(_) => Vec::new(),
                LogicKind::For(state) => state
                    .children
                    .iter()
                    .map(|child| child.reference.clone())
                    .collect(),
            };
            (core.marker.clone(), references)
        };
        for reference in references {
            reference.insert_before(&marker)?;
        }
        Ok(())
    }

    pub(crate) fn detach(&self) -> Result<()> {
        for reference in self.child_references() {
            reference.detach()?;
        }
        self.inner.borrow().marker.remove();
        Ok(())
    }

    pub(crate) fn destroy(&self) -> Result<()> {
        for reference in self.child_references() {
            reference.destroy()?;
        }
        self.inner.borrow().marker.remove();
        Ok(())
    }

    /// Every native node this logic element currently contributes,
    /// including the marker.
    pub(crate) fn nodes(&self) -> Vec<NodeRef> {
        let mut nodes = Vec::new();
        for reference in self.child_references() {
            if reference.is_attached() {
                nodes.extend(reference.root_nodes());
            }
        }
        nodes.push(self.inner.borrow().marker.clone());
        nodes
    }
}
