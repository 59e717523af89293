//! Binding Compiler
//!
//! Walks the classified template AST and emits cached, reusable constructor
//! stacks. Template mode caches by exact template text; selector mode caches
//! by `selector::sorted host-binding entries`. A failed compile stores
//! nothing.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use crate::cache::BoundedCache;
use crate::error::{CompileError, Result};
use crate::statement::StatementParser;
use crate::template_parser::{ContentPart, TemplateNode, TemplateNodeKind, TemplateParser};

use super::behavior::BehaviorSpec;
use super::instructions::{BindOp, ConstructorStack, ViewInstruction};
use super::selector::parse_selector;

/// Engine-wide compiler configuration.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Evaluation failures log and substitute the raw source text instead of
    /// aborting the detection pass.
    pub skip_errors: bool,
    pub statement_cache_capacity: usize,
    pub stack_cache_capacity: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            skip_errors: false,
            statement_cache_capacity: 512,
            stack_cache_capacity: 128,
        }
    }
}

/// Template and selector compiler with behavior registry and caches.
#[derive(Debug)]
pub struct Compiler {
    options: CompilerOptions,
    statements: Rc<StatementParser>,
    templates: TemplateParser,
    behaviors: RefCell<IndexMap<String, Rc<BehaviorSpec>>>,
    stacks: RefCell<BoundedCache<String, Rc<ConstructorStack>>>,
    compiling: RefCell<IndexSet<String>>,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        let statements = Rc::new(StatementParser::new(options.statement_cache_capacity));
        Compiler {
            templates: TemplateParser::new(Rc::clone(&statements)),
            stacks: RefCell::new(BoundedCache::new(options.stack_cache_capacity)),
            behaviors: RefCell::new(IndexMap::new()),
            compiling: RefCell::new(IndexSet::new()),
            statements,
            options,
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn statements(&self) -> &Rc<StatementParser> {
        &self.statements
    }

    pub fn register_behavior(&self, spec: BehaviorSpec) {
        self.behaviors
            .borrow_mut()
            .insert(spec.name.clone(), Rc::new(spec));
    }

    /// Number of cached constructor stacks.
    pub fn cache_len(&self) -> usize {
        self.stacks.borrow().len()
    }

    /// Drop every cached stack and statement. Registered behaviors survive a
    /// reset; they are configuration, not derived state.
    pub fn reset(&self) {
        self.stacks.borrow_mut().clear();
        self.statements.reset();
    }

    /// Compile a template text into its constructor stack.
    pub fn compile(&self, template: &str) -> Result<Rc<ConstructorStack>> {
        let key = template.to_string();
        if let Some(stack) = self.stacks.borrow().get(&key) {
            return Ok(Rc::clone(stack));
        }
        if !self.compiling.borrow_mut().insert(key.clone()) {
            return Err(CompileError::Selector {
                selector: key,
                message: "recursive behavior template".to_string(),
            });
        }

        let compiled = self.compile_uncached(template);
        self.compiling.borrow_mut().shift_remove(&key);

        let stack = compiled?;
        log::debug!("compiled template ({} bytes, {} roots)", key.len(), stack.len());
        self.stacks.borrow_mut().insert(key, Rc::clone(&stack));
        Ok(stack)
    }

    /// Compile a single compound selector plus host-binding entries into a
    /// one-element constructor stack.
    pub fn compile_selector(
        &self,
        selector: &str,
        host_bindings: &IndexMap<String, String>,
    ) -> Result<Rc<ConstructorStack>> {
        let key = selector_cache_key(selector, host_bindings);
        if let Some(stack) = self.stacks.borrow().get(&key) {
            return Ok(Rc::clone(stack));
        }

        let parsed = parse_selector(selector)?;
        let mut node = TemplateNode::new(TemplateNodeKind::Tag, parsed.tag);
        if let Some(id) = parsed.id {
            node.attributes.insert("id".to_string(), id);
        }
        for class in parsed.classes {
            node.classes.insert(class);
        }
        for (name, value) in parsed.attributes {
            node.attributes.insert(name, value);
        }
        for (name, value) in host_bindings {
            self.templates.classify_attribute(&mut node, name, value)?;
        }

        let stack = Rc::new(vec![self.compile_node(&node)?]);
        self.stacks.borrow_mut().insert(key, Rc::clone(&stack));
        Ok(stack)
    }

    fn compile_uncached(&self, template: &str) -> Result<Rc<ConstructorStack>> {
        let root = self.templates.parse(template)?;
        let mut stack = Vec::with_capacity(root.children.len());
        for child in &root.children {
            stack.push(self.compile_node(child)?);
        }
        Ok(Rc::new(stack))
    }

    fn compile_node(&self, node: &TemplateNode) -> Result<ViewInstruction> {
        match node.kind {
            TemplateNodeKind::Text => Ok(self.compile_text(node)),
            TemplateNodeKind::Comment => Ok(ViewInstruction::CreateComment {
                text: match node.contents.first() {
                    Some(ContentPart::Literal(text)) => text.clone(),
                    _ => String::new(),
                },
            }),
            TemplateNodeKind::Tag => self.compile_tag(node),
            TemplateNodeKind::Root => Err(CompileError::Selector {
                selector: String::new(),
                message: "root node cannot be compiled directly".to_string(),
            }),
        }
    }

    fn compile_text(&self, node: &TemplateNode) -> ViewInstruction {
        if node.has_bound_content() {
            ViewInstruction::CreateBoundText {
                parts: node.contents.clone(),
            }
        } else {
            let text = node
                .contents
                .iter()
                .map(|part| match part {
                    ContentPart::Literal(text) => text.as_str(),
                    ContentPart::Statement(_) => "",
                })
                .collect();
            ViewInstruction::CreateText { text }
        }
    }

    fn compile_tag(&self, node: &TemplateNode) -> Result<ViewInstruction> {
        // A logic directive wraps all remaining processing of the node in a
        // deferred factory; the inner stack compiles the node without it.
        if let Some((name, logic)) = node.logics.first() {
            let mut inner = node.clone();
            inner.logics.shift_remove(name);
            inner.reference = None;
            let instruction = self.compile_node(&inner)?;
            return Ok(ViewInstruction::CreateLogic {
                logic: logic.clone(),
                variables: node.variables.clone(),
                reference: node.reference.clone(),
                stack: Rc::new(vec![instruction]),
            });
        }

        let behavior = self.behaviors.borrow().get(&node.name).cloned();
        if let Some(spec) = behavior {
            return self.compile_behavior(node, &spec);
        }

        self.compile_element(node)
    }

    fn compile_element(&self, node: &TemplateNode) -> Result<ViewInstruction> {
        let mut bindings: SmallVec<[BindOp; 4]> = SmallVec::new();
        for (key, statement) in &node.inputs {
            bindings.push(BindOp::Input {
                key: key.clone(),
                statement: statement.clone(),
            });
        }
        for (key, statement) in &node.outputs {
            bindings.push(BindOp::Output {
                key: key.clone(),
                statement: statement.clone(),
            });
        }
        for (key, statement) in &node.two_ways {
            bindings.push(BindOp::TwoWay {
                key: key.clone(),
                statement: statement.clone(),
            });
        }
        if !node.class_bindings.is_empty() {
            bindings.push(BindOp::ClassMap {
                bindings: node.class_bindings.clone(),
            });
        }
        if !node.style_bindings.is_empty() {
            bindings.push(BindOp::StyleMap {
                bindings: node.style_bindings.clone(),
            });
        }

        let mut children = Vec::with_capacity(node.children.len());
        for child in &node.children {
            children.push(self.compile_node(child)?);
        }

        Ok(ViewInstruction::CreateElement {
            tag: node.name.clone(),
            namespace: node.namespace.clone(),
            attributes: node.attributes.clone(),
            classes: node.classes.clone(),
            styles: node.styles.clone(),
            reference: node.reference.clone(),
            bindings,
            children,
        })
    }

    /// Partition the node's entries between the behavior and the underlying
    /// element using the declared property/emitter metadata, then emit the
    /// behavior instruction wrapping the stripped host element.
    fn compile_behavior(
        &self,
        node: &TemplateNode,
        spec: &BehaviorSpec,
    ) -> Result<ViewInstruction> {
        let mut element = node.clone();
        let mut initial = IndexMap::new();
        let mut inputs = IndexMap::new();
        let mut outputs = IndexMap::new();
        let mut two_ways = IndexMap::new();

        element.attributes.retain(|key, value| {
            if spec.declares_property(key) {
                initial.insert(key.clone(), value.clone());
                false
            } else {
                true
            }
        });
        element.inputs.retain(|key, statement| {
            if spec.declares_property(key) {
                inputs.insert(key.clone(), statement.clone());
                false
            } else {
                true
            }
        });
        element.outputs.retain(|key, statement| {
            if spec.declares_emitter(key) {
                outputs.insert(key.clone(), statement.clone());
                false
            } else {
                true
            }
        });
        element.two_ways.retain(|key, statement| {
            if spec.declares_property(key) {
                two_ways.insert(key.clone(), statement.clone());
                false
            } else {
                true
            }
        });

        let stack = match &spec.template {
            Some(template) => self.compile(template)?,
            None => Rc::new(Vec::new()),
        };

        let host = self.compile_element(&element)?;
        Ok(ViewInstruction::CreateBehavior {
            name: spec.name.clone(),
            stack,
            initial,
            inputs,
            outputs,
            two_ways,
            host: Box::new(host),
        })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new(CompilerOptions::default())
    }
}

fn selector_cache_key(selector: &str, host_bindings: &IndexMap<String, String>) -> String {
    let mut entries: Vec<String> = host_bindings
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    entries.sort();
    format!("{}::{}", selector, entries.join(";"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_caches_by_exact_text() {
        let compiler = Compiler::default();
        let a = compiler.compile("<div>{{value}}</div>").expect("compiles");
        let b = compiler.compile("<div>{{value}}</div>").expect("compiles");
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(compiler.cache_len(), 1);
    }

    #[test]
    fn test_failed_compile_stores_nothing() {
        let compiler = Compiler::default();
        assert!(compiler.compile("<div><span></div>").is_err());
        assert_eq!(compiler.cache_len(), 0);
    }

    #[test]
    fn test_logic_wraps_remaining_processing() {
        let compiler = Compiler::default();
        let stack = compiler
            .compile("<li *for=\"item in items\" [title]=\"item\"></li>")
            .expect("compiles");
        match &stack[0] {
            ViewInstruction::CreateLogic { logic, stack, .. } => {
                assert_eq!(logic.name, "for");
                assert!(matches!(
                    &stack[0],
                    ViewInstruction::CreateElement { bindings, .. } if bindings.len() == 1
                ));
            }
            other => panic!("expected logic instruction, got {:?}", other),
        }
    }

    #[test]
    fn test_behavior_partitioning() {
        let compiler = Compiler::default();
        compiler.register_behavior(
            BehaviorSpec::new("date-picker")
                .with_property("value")
                .with_emitter("changed"),
        );
        let stack = compiler
            .compile("<date-picker [value]=\"d\" [width]=\"w\" (changed)=\"go()\"></date-picker>")
            .expect("compiles");
        match &stack[0] {
            ViewInstruction::CreateBehavior {
                inputs,
                outputs,
                host,
                ..
            } => {
                assert!(inputs.contains_key("value"));
                assert!(outputs.contains_key("changed"));
                match host.as_ref() {
                    ViewInstruction::CreateElement { bindings, .. } => {
                        assert!(bindings
                            .iter()
                            .any(|b| matches!(b, BindOp::Input { key, .. } if key == "width")));
                        assert!(!bindings
                            .iter()
                            .any(|b| matches!(b, BindOp::Input { key, .. } if key == "value")));
                    }
                    other => panic!("expected element host, got {:?}", other),
                }
            }
            other => panic!("expected behavior instruction, got {:?}", other),
        }
    }

    #[test]
    fn test_selector_cache_key_sorts_entries() {
        let compiler = Compiler::default();
        let mut forward = IndexMap::new();
        forward.insert("[title]".to_string(), "t".to_string());
        forward.insert("class".to_string(), "a".to_string());
        let mut reversed = IndexMap::new();
        reversed.insert("class".to_string(), "a".to_string());
        reversed.insert("[title]".to_string(), "t".to_string());

        let a = compiler
            .compile_selector("div.panel", &forward)
            .expect("compiles");
        let b = compiler
            .compile_selector("div.panel", &reversed)
            .expect("compiles");
        assert!(Rc::ptr_eq(&a, &b));
    }
}
