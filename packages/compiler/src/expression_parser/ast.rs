//! Expression AST
//!
//! Generic syntax tree produced by the expression grammar. The statement
//! analyzer and the runtime evaluator both dispatch over these variants with
//! exhaustive matches.

use serde::{Deserialize, Serialize};

/// Span relative to the start of the parsed expression text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseSpan {
    pub start: usize,
    pub end: usize,
}

impl ParseSpan {
    pub fn new(start: usize, end: usize) -> Self {
        ParseSpan { start, end }
    }

    pub fn to_absolute(&self, absolute_offset: usize) -> AbsoluteSpan {
        AbsoluteSpan::new(absolute_offset + self.start, absolute_offset + self.end)
    }
}

/// Span mapped back into the enclosing template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsoluteSpan {
    pub start: usize,
    pub end: usize,
}

impl AbsoluteSpan {
    pub fn new(start: usize, end: usize) -> Self {
        AbsoluteSpan { start, end }
    }
}

/// Expression node union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Ast {
    Empty(Empty),
    ImplicitReceiver(ImplicitReceiver),
    ThisReceiver(ThisReceiver),
    Chain(Chain),
    Conditional(Conditional),
    PropertyRead(PropertyRead),
    SafePropertyRead(SafePropertyRead),
    KeyedRead(KeyedRead),
    SafeKeyedRead(SafeKeyedRead),
    LiteralPrimitive(LiteralPrimitive),
    LiteralArray(LiteralArray),
    LiteralMap(LiteralMap),
    Binary(Binary),
    PrefixNot(PrefixNot),
    Unary(Unary),
    Call(Call),
    SafeCall(SafeCall),
    PropertyWrite(PropertyWrite),
    KeyedWrite(KeyedWrite),
}

/// Empty expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Empty {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
}

/// Implicit receiver (the bound context)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplicitReceiver {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
}

/// Explicit `this` receiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThisReceiver {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
}

/// Chain of `;`-separated expressions, action position only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub expressions: Vec<Box<Ast>>,
}

/// Ternary conditional (`test ? a : b`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub condition: Box<Ast>,
    pub true_exp: Box<Ast>,
    pub false_exp: Box<Ast>,
}

/// Property read (`obj.property` or bare `property`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRead {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub receiver: Box<Ast>,
    pub name: String,
}

/// Safe property read (`obj?.property`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafePropertyRead {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub receiver: Box<Ast>,
    pub name: String,
}

/// Keyed read (`obj[key]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedRead {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub receiver: Box<Ast>,
    pub key: Box<Ast>,
}

/// Safe keyed read (`obj?.[key]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeKeyedRead {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub receiver: Box<Ast>,
    pub key: Box<Ast>,
}

/// Literal primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "literalType")]
pub enum LiteralPrimitive {
    String {
        span: ParseSpan,
        source_span: AbsoluteSpan,
        value: String,
    },
    Number {
        span: ParseSpan,
        source_span: AbsoluteSpan,
        value: f64,
    },
    Boolean {
        span: ParseSpan,
        source_span: AbsoluteSpan,
        value: bool,
    },
    Null {
        span: ParseSpan,
        source_span: AbsoluteSpan,
    },
    Undefined {
        span: ParseSpan,
        source_span: AbsoluteSpan,
    },
}

/// Array literal (`[1, 2, 3]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralArray {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub expressions: Vec<Box<Ast>>,
}

/// Map literal key: identifier, quoted string, or computed `[expr]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "keyType")]
pub enum LiteralMapKey {
    Ident { key: String },
    Quoted { key: String },
    Computed { key: Box<Ast> },
}

/// Object literal (`{a: 1, "b": 2, [k]: 3}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralMap {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub keys: Vec<LiteralMapKey>,
    pub values: Vec<Box<Ast>>,
}

/// Binary operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binary {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub operation: String,
    pub left: Box<Ast>,
    pub right: Box<Ast>,
}

/// Prefix not (`!expr`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixNot {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub expression: Box<Ast>,
}

/// Unary `+`/`-`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unary {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub operator: String,
    pub expr: Box<Ast>,
}

/// Function call (`fn(a, b)`, `obj.fn(a)`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub receiver: Box<Ast>,
    pub args: Vec<Box<Ast>>,
}

/// Safe function call (`fn?.(a, b)`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeCall {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub receiver: Box<Ast>,
    pub args: Vec<Box<Ast>>,
}

/// Property write (`obj.property = value`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyWrite {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub receiver: Box<Ast>,
    pub name: String,
    pub value: Box<Ast>,
}

/// Keyed write (`obj[key] = value`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedWrite {
    pub span: ParseSpan,
    pub source_span: AbsoluteSpan,
    pub receiver: Box<Ast>,
    pub key: Box<Ast>,
    pub value: Box<Ast>,
}

impl Ast {
    pub fn source_span(&self) -> AbsoluteSpan {
        match self {
            Ast::Empty(e) => e.source_span,
            Ast::ImplicitReceiver(e) => e.source_span,
            Ast::ThisReceiver(e) => e.source_span,
            Ast::Chain(e) => e.source_span,
            Ast::Conditional(e) => e.source_span,
            Ast::PropertyRead(e) => e.source_span,
            Ast::SafePropertyRead(e) => e.source_span,
            Ast::KeyedRead(e) => e.source_span,
            Ast::SafeKeyedRead(e) => e.source_span,
            Ast::LiteralPrimitive(e) => match e {
                LiteralPrimitive::String { source_span, .. } => *source_span,
                LiteralPrimitive::Number { source_span, .. } => *source_span,
                LiteralPrimitive::Boolean { source_span, .. } => *source_span,
                LiteralPrimitive::Null { source_span, .. } => *source_span,
                LiteralPrimitive::Undefined { source_span, .. } => *source_span,
            },
            Ast::LiteralArray(e) => e.source_span,
            Ast::LiteralMap(e) => e.source_span,
            Ast::Binary(e) => e.source_span,
            Ast::PrefixNot(e) => e.source_span,
            Ast::Unary(e) => e.source_span,
            Ast::Call(e) => e.source_span,
            Ast::SafeCall(e) => e.source_span,
            Ast::PropertyWrite(e) => e.source_span,
            Ast::KeyedWrite(e) => e.source_span,
        }
    }

    pub fn is_implicit_receiver(&self) -> bool {
        matches!(self, Ast::ImplicitReceiver(_))
    }

    /// A literal map/array at the top level, recognized so map-typed
    /// class/style bindings can split into per-entry bindings.
    pub fn as_literal_map(&self) -> Option<&LiteralMap> {
        match self {
            Ast::LiteralMap(m) => Some(m),
            _ => None,
        }
    }
}
