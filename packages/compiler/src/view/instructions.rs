//! Constructor stacks.
//!
//! A compiled template is an ordered list of instantiation and
//! binding-setup instructions. Element instructions own their child
//! instruction lists; logic and behavior instructions carry deferred inner
//! stacks shared behind `Rc` so one compile result serves every instance.

use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use crate::statement::StatementInfo;
use crate::template_parser::{ContentPart, LogicAttr, MapBinding};

/// Compiled, cached instruction sequence for one template.
pub type ConstructorStack = Vec<ViewInstruction>;

/// One binding-setup instruction attached to an element.
#[derive(Debug, Clone, PartialEq)]
pub enum BindOp {
    /// `[key]="expr"` — attribute value tracks the expression.
    Input { key: String, statement: StatementInfo },
    /// `(key)="expr"` — native listener evaluating an action.
    Output { key: String, statement: StatementInfo },
    /// `[(key)]="expr"` — input plus write-back listener.
    TwoWay { key: String, statement: StatementInfo },
    /// `[class]` / `[class.x]` family, applied differentially.
    ClassMap { bindings: Vec<MapBinding> },
    /// `[style]` / `[style.x]` family, applied differentially.
    StyleMap { bindings: Vec<MapBinding> },
}

/// One instantiation instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewInstruction {
    /// Static element construction plus its binding-setup ops.
    CreateElement {
        tag: String,
        namespace: Option<String>,
        attributes: IndexMap<String, String>,
        classes: IndexSet<String>,
        styles: IndexMap<String, String>,
        reference: Option<String>,
        bindings: SmallVec<[BindOp; 4]>,
        children: Vec<ViewInstruction>,
    },
    /// Static text node.
    CreateText { text: String },
    /// Interpolated text node; the runtime setter performs a surgical
    /// character-data replace, never node replacement.
    CreateBoundText { parts: Vec<ContentPart> },
    /// Comment node.
    CreateComment { text: String },
    /// Deferred logic-element factory (`*if`, `*for`). The inner stack is
    /// the node compiled without this directive.
    CreateLogic {
        logic: LogicAttr,
        variables: IndexMap<String, String>,
        reference: Option<String>,
        stack: Rc<ConstructorStack>,
    },
    /// Registered bindable tag. Declared entries feed the behavior's own
    /// state; the host instruction keeps everything undeclared.
    CreateBehavior {
        name: String,
        /// Full component replacement renders `stack` inside the host tag;
        /// attribute-style behaviors have an empty stack.
        stack: Rc<ConstructorStack>,
        /// Declared static attribute literals seeding the behavior state.
        initial: IndexMap<String, String>,
        inputs: IndexMap<String, StatementInfo>,
        outputs: IndexMap<String, StatementInfo>,
        two_ways: IndexMap<String, StatementInfo>,
        host: Box<ViewInstruction>,
    },
}

impl ViewInstruction {
    /// The reference marker (`#x`) declared by this instruction, if any.
    pub fn reference(&self) -> Option<&str> {
        match self {
            ViewInstruction::CreateElement { reference, .. } => reference.as_deref(),
            ViewInstruction::CreateLogic { reference, .. } => reference.as_deref(),
            ViewInstruction::CreateBehavior { host, .. } => host.reference(),
            _ => None,
        }
    }
}
