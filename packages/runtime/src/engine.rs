//! Engine wiring.
//!
//! One `Engine` ties together the compiler (with its caches and behavior
//! registry), the document facade and the change-detection scheduler. All
//! binding references created through it share this state; `reset` restores
//! a pristine engine for tests.

use std::rc::Rc;

use indexmap::IndexMap;

use trellis_compiler::view::{BehaviorSpec, Compiler, CompilerOptions, ConstructorStack};

use crate::dom::{Document, NodeRef};
use crate::error::Result;
use crate::reference::BindingReference;
use crate::scheduler::Scheduler;
use crate::scope::{new_context, Context};
use crate::value::Value;

pub struct EngineShared {
    pub compiler: Rc<Compiler>,
    pub document: Document,
    pub scheduler: Scheduler,
}

impl EngineShared {
    pub fn skip_errors(&self) -> bool {
        self.compiler.options().skip_errors
    }
}

#[derive(Clone)]
pub struct Engine {
    shared: Rc<EngineShared>,
}

impl Engine {
    pub fn new() -> Self {
        Engine::with_options(CompilerOptions::default())
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        Engine {
            shared: Rc::new(EngineShared {
                compiler: Rc::new(Compiler::new(options)),
                document: Document::new(),
                scheduler: Scheduler::new(),
            }),
        }
    }

    pub fn shared(&self) -> Rc<EngineShared> {
        Rc::clone(&self.shared)
    }

    pub fn compiler(&self) -> &Rc<Compiler> {
        &self.shared.compiler
    }

    pub fn document(&self) -> &Document {
        &self.shared.document
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.shared.scheduler
    }

    pub fn register_behavior(&self, spec: BehaviorSpec) {
        self.shared.compiler.register_behavior(spec);
    }

    pub fn compile(&self, template: &str) -> Result<Rc<ConstructorStack>> {
        Ok(self.shared.compiler.compile(template)?)
    }

    pub fn compile_selector(
        &self,
        selector: &str,
        host_bindings: &IndexMap<String, String>,
    ) -> Result<Rc<ConstructorStack>> {
        Ok(self.shared.compiler.compile_selector(selector, host_bindings)?)
    }

    /// Create an unbound reference for a compiled stack.
    pub fn create_reference(&self, stack: Rc<ConstructorStack>) -> BindingReference {
        BindingReference::new(self.shared(), stack, false)
    }

    /// Create an implicit reference: same contract, but lifecycle hooks are
    /// suppressed.
    pub fn create_implicit_reference(&self, stack: Rc<ConstructorStack>) -> BindingReference {
        BindingReference::new(self.shared(), stack, true)
    }

    /// Compile `template`, bind it to `state` and append it under `parent`.
    pub fn render(
        &self,
        template: &str,
        state: impl IntoIterator<Item = (String, Value)>,
        parent: &NodeRef,
    ) -> Result<BindingReference> {
        let stack = self.compile(template)?;
        let reference = self.create_reference(stack);
        reference.bind(new_context(state), Vec::new())?;
        reference.append_to(parent)?;
        Ok(reference)
    }

    /// Compile a selector plus host bindings and bind the result to an
    /// externally-owned host element.
    pub fn bind_host(
        &self,
        host: &NodeRef,
        selector: &str,
        host_bindings: &IndexMap<String, String>,
        context: Context,
    ) -> Result<BindingReference> {
        let stack = self.compile_selector(selector, host_bindings)?;
        let reference = BindingReference::new_host(self.shared(), stack, host.clone());
        reference.bind(context, Vec::new())?;
        Ok(reference)
    }

    /// Drop caches, pending detection state and the scheduler's flow
    /// history. Registered behaviors survive.
    pub fn reset(&self) {
        self.shared.compiler.reset();
        self.shared.scheduler.reset();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}
