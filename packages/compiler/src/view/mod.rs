//! View compilation: constructor stacks, behavior registry, selector and
//! template compilers.

pub mod behavior;
pub mod compiler;
pub mod instructions;
pub mod selector;

pub use behavior::BehaviorSpec;
pub use compiler::{Compiler, CompilerOptions};
pub use instructions::{BindOp, ConstructorStack, ViewInstruction};
pub use selector::{parse_selector, ParsedSelector};
