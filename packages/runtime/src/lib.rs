#![deny(clippy::all)]

//! Trellis runtime.
//!
//! Instantiates the compiler's constructor stacks into live node trees and
//! keeps them updated: the evaluator runs compiled expressions against a
//! scope, binding references manage lifecycle and per-node re-evaluation,
//! logic elements reconcile conditional and repeated regions, and the
//! scheduler batches mutation bursts into single flush passes.
//!
//! The engine is single-threaded, cooperative and synchronous; its shared
//! state is `Rc<RefCell<…>>` and deliberately `!Send`.

pub mod dom;
pub mod engine;
pub mod error;
pub mod eval;
pub mod logic;
pub mod reference;
pub mod scheduler;
pub mod scope;
pub mod value;

pub use dom::{Document, NodeKind, NodeRef, Rect};
pub use engine::Engine;
pub use error::{Result, RuntimeError};
pub use logic::{IfStatus, LogicElement};
pub use reference::{BindingReference, LifecycleFlags, NamedTarget};
pub use scheduler::{FlushHandle, Scheduler};
pub use scope::{new_context, new_frame, Context, ImplicitFrame, Scope};
pub use value::{NativeFn, Value};

// The compiler's surface is re-exported so embedders need a single
// dependency.
pub use trellis_compiler::view::{BehaviorSpec, CompilerOptions};
