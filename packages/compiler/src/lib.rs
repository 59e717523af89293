#![deny(clippy::all)]

//! Trellis compiler.
//!
//! Compiles the HTML-like template DSL with embedded expression bindings
//! into reusable constructor stacks: the markup parser produces a raw
//! attributed tree, the template parser classifies every attribute into its
//! binding category, the statement parser extracts dependency metadata from
//! each embedded expression, and the view compiler emits the cached
//! instruction sequences the runtime instantiates.

pub mod cache;
pub mod chars;
pub mod error;
pub mod parse_util;

// Parser modules
pub mod expression_parser;
pub mod ml_parser;
pub mod statement;
pub mod template_parser;

// Compilation modules
pub mod view;

pub use cache::BoundedCache;
pub use error::{CompileError, Result};
pub use statement::{StatementInfo, StatementParser};
pub use template_parser::{TemplateNode, TemplateParser};
pub use view::{BehaviorSpec, Compiler, CompilerOptions, ConstructorStack, ViewInstruction};
