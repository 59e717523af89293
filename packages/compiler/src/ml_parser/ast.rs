//! Markup AST
//!
//! Raw attributed tree produced by the markup parser. The template parser
//! classifies these nodes into the binding-aware template AST.

use crate::parse_util::ParseSourceSpan;

/// Node type union
#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(Text),
    Comment(Comment),
}

impl Node {
    pub fn source_span(&self) -> &ParseSourceSpan {
        match self {
            Node::Element(e) => &e.source_span,
            Node::Text(t) => &t.source_span,
            Node::Comment(c) => &c.source_span,
        }
    }
}

/// Attribute node
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub source_span: ParseSourceSpan,
}

impl Attribute {
    pub fn new(name: String, value: String, source_span: ParseSourceSpan) -> Self {
        Attribute { name, value, source_span }
    }
}

/// Element node
#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Node>,
    pub is_self_closing: bool,
    pub source_span: ParseSourceSpan,
}

/// Text node
#[derive(Debug, Clone)]
pub struct Text {
    pub value: String,
    pub source_span: ParseSourceSpan,
}

impl Text {
    pub fn new(value: String, source_span: ParseSourceSpan) -> Self {
        Text { value, source_span }
    }
}

/// Comment node
#[derive(Debug, Clone)]
pub struct Comment {
    pub value: Option<String>,
    pub source_span: ParseSourceSpan,
}

impl Comment {
    pub fn new(value: Option<String>, source_span: ParseSourceSpan) -> Self {
        Comment { value, source_span }
    }
}
