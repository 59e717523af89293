//! Template AST
//!
//! Attributed tree with every raw attribute classified into its binding
//! category. Parsing identical template text twice yields structurally equal
//! trees, which is why everything here derives `PartialEq`.

use indexmap::{IndexMap, IndexSet};

use crate::statement::StatementInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateNodeKind {
    Root,
    Tag,
    Text,
    Comment,
}

/// One part of an interpolated text content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Literal(String),
    Statement(StatementInfo),
}

/// A dynamic class/style binding.
#[derive(Debug, Clone, PartialEq)]
pub enum MapBinding {
    /// `[class]="expr"` where the expression is not a literal map.
    Whole(StatementInfo),
    /// `[class.foo]="expr"`, or a plain-key entry of a literal map.
    Entry { name: String, value: MapBindingValue },
    /// A computed-key entry: both key and value changes are tracked, and the
    /// previously applied key is removed when the key itself changes.
    Computed {
        key: StatementInfo,
        value: MapBindingValue,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapBindingValue {
    Literal(String),
    Statement(StatementInfo),
}

/// A `*name="expr"` logic directive.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicAttr {
    pub name: String,
    pub raw: String,
    /// The driving expression: the whole text for `*if`, the array part of
    /// `item, index in array` for `*for`.
    pub statement: StatementInfo,
    pub item_alias: Option<String>,
    pub index_alias: Option<String>,
}

/// Classified template node.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateNode {
    pub kind: TemplateNodeKind,
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: IndexMap<String, String>,
    pub classes: IndexSet<String>,
    pub styles: IndexMap<String, String>,
    pub inputs: IndexMap<String, StatementInfo>,
    pub outputs: IndexMap<String, StatementInfo>,
    pub two_ways: IndexMap<String, StatementInfo>,
    pub logics: IndexMap<String, LogicAttr>,
    pub contents: Vec<ContentPart>,
    pub variables: IndexMap<String, String>,
    pub reference: Option<String>,
    pub class_bindings: Vec<MapBinding>,
    pub style_bindings: Vec<MapBinding>,
    pub children: Vec<TemplateNode>,
}

impl TemplateNode {
    pub fn new(kind: TemplateNodeKind, name: impl Into<String>) -> Self {
        TemplateNode {
            kind,
            name: name.into(),
            namespace: None,
            attributes: IndexMap::new(),
            classes: IndexSet::new(),
            styles: IndexMap::new(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            two_ways: IndexMap::new(),
            logics: IndexMap::new(),
            contents: Vec::new(),
            variables: IndexMap::new(),
            reference: None,
            class_bindings: Vec::new(),
            style_bindings: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn root() -> Self {
        TemplateNode::new(TemplateNodeKind::Root, "")
    }

    /// Whether any content part is dynamic.
    pub fn has_bound_content(&self) -> bool {
        self.contents
            .iter()
            .any(|part| matches!(part, ContentPart::Statement(_)))
    }
}
