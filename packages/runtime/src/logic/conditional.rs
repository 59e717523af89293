//! Conditional logic element (`*if`).
//!
//! Constructs its inner reference only the first time it becomes active with
//! a known DOM location; later toggles attach and detach the same reference
//! without rebuilding it, so `onInit` fires at most once.

use std::rc::Rc;

use crate::error::Result;
use crate::reference::binding::eval_statement;
use crate::reference::BindingReference;
use crate::scope::Scope;

use super::{LogicCore, LogicKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfStatus {
    Pending,
    Inactive,
    Active,
}

pub(crate) struct IfState {
    pub status: IfStatus,
    pub reference: Option<BindingReference>,
}

impl IfState {
    pub fn new() -> Self {
        IfState {
            status: IfStatus::Pending,
            reference: None,
        }
    }
}

impl LogicCore {
    pub(crate) fn detect_if(&mut self, scope: &Scope, recursive: bool) -> Result<()> {
        let skip_errors = self.engine.skip_errors();
        let active = eval_statement(&self.attr.statement, scope, &self.attr.name, skip_errors)?
            .is_truthy();

        let marker = self.marker.clone();
        let engine = Rc::clone(&self.engine);
        let owner = self.owner.clone();
        let stack = Rc::clone(&self.stack);
        let state = match &mut self.kind {
            LogicKind::If(state) => state,
            _ => unreachable!("detect_if on a non-if logic element"),
        };

        if active {
            match &state.reference {
                None => {
                    // First activation with a known location builds the
                    // inner reference once.
                    if marker.parent().is_none() {
                        return Ok(());
                    }
                    let reference = BindingReference::new(engine, stack, false);
                    if let Some(inner) = owner.upgrade() {
                        reference.set_parent(&BindingReference::from_inner(inner));
                    }
                    reference.bind(scope.context.clone(), scope.implicits.clone())?;
                    reference.insert_before(&marker)?;
                    state.reference = Some(reference);
                }
                Some(reference) => {
                    let reference = reference.clone();
                    if !reference.is_attached() {
                        reference.insert_before(&marker)?;
                    }
                    reference.detect_changes(recursive)?;
                }
            }
            state.status = IfStatus::Active;
        } else {
            if let Some(reference) = &state.reference {
                reference.detach()?;
            }
            state.status = IfStatus::Inactive;
        }
        Ok(())
    }
}
