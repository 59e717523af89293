//! Binding References
//!
//! A binding reference is one live, lifecycle-managed instance of a compiled
//! constructor stack: `constructed → bound → initialized → attached ⇄
//! detached → destroyed`. It owns the root output list (a mix of native
//! nodes and logic elements), the binding entries it re-evaluates each
//! detection pass, the template-variable registry, and its listeners.

pub mod binding;
mod build;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use indexmap::IndexMap;

use trellis_compiler::view::ConstructorStack;

use crate::dom::{ListenerFn, ListenerId, NodeRef, Rect};
use crate::engine::EngineShared;
use crate::error::Result;
use crate::logic::LogicElement;
use crate::scheduler::Scheduler;
use crate::scope::{Context, ImplicitFrame, Scope};
use crate::value::Value;

use binding::ElementBinding;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LifecycleFlags: u8 {
        const BOUND = 1 << 0;
        const INITIALIZED = 1 << 1;
        const ATTACHED = 1 << 2;
        const DESTROYED = 1 << 3;
    }
}

/// Where the reference's roots live in the document.
#[derive(Clone)]
pub struct DomLocation {
    pub parent: Option<NodeRef>,
    pub anchor: Option<NodeRef>,
}

impl DomLocation {
    pub fn append(parent: NodeRef) -> Self {
        DomLocation {
            parent: Some(parent),
            anchor: None,
        }
    }

    pub fn before(anchor: NodeRef) -> Self {
        DomLocation {
            parent: None,
            anchor: Some(anchor),
        }
    }

    /// The anchor's parent wins over a stored parent, so markers that moved
    /// with their subtree keep working.
    pub fn resolve(&self) -> Option<(NodeRef, Option<NodeRef>)> {
        if let Some(anchor) = &self.anchor {
            if let Some(parent) = anchor.parent() {
                return Some((parent, Some(anchor.clone())));
            }
        }
        self.parent.clone().map(|parent| (parent, self.anchor.clone()))
    }
}

/// One entry of the mixed root output list.
#[derive(Clone)]
pub(crate) enum RootItem {
    Node(NodeRef),
    Logic(LogicElement),
}

/// Template-variable registry target (`#name` markers).
#[derive(Clone)]
pub enum NamedTarget {
    Node(NodeRef),
    Logic(LogicElement),
}

pub(crate) struct CoreState {
    pub flags: LifecycleFlags,
    pub stack: Rc<ConstructorStack>,
    pub scope: Option<Scope>,
    pub roots: Vec<RootItem>,
    pub named: IndexMap<String, NamedTarget>,
    pub listeners: Vec<(NodeRef, ListenerId)>,
    pub pending_state: Option<IndexMap<String, Value>>,
    pub dirty: bool,
    pub parent: Option<Weak<ReferenceInner>>,
    pub location: Option<DomLocation>,
    pub logic_children: Vec<LogicElement>,
    pub behavior_children: Vec<BindingReference>,
}

pub struct ReferenceInner {
    pub(crate) engine: Rc<EngineShared>,
    pub(crate) implicit: bool,
    pub(crate) host: RefCell<Option<NodeRef>>,
    pub(crate) core: RefCell<CoreState>,
    pub(crate) bindings: RefCell<Vec<ElementBinding>>,
}

/// Shared handle to one reference; clones are identity.
#[derive(Clone)]
pub struct BindingReference {
    inner: Rc<ReferenceInner>,
}

impl PartialEq for BindingReference {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for BindingReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingReference")
            .field("implicit", &self.inner.implicit)
            .finish_non_exhaustive()
    }
}

impl BindingReference {
    pub(crate) fn new(
        engine: Rc<EngineShared>,
        stack: Rc<ConstructorStack>,
        implicit: bool,
    ) -> Self {
        BindingReference {
            inner: Rc::new(ReferenceInner {
                engine,
                implicit,
                host: RefCell::new(None),
                core: RefCell::new(CoreState {
                    flags: LifecycleFlags::empty(),
                    stack,
                    scope: None,
                    roots: Vec::new(),
                    named: IndexMap::new(),
                    listeners: Vec::new(),
                    pending_state: None,
                    dirty: false,
                    parent: None,
                    location: None,
                    logic_children: Vec::new(),
                    behavior_children: Vec::new(),
                }),
                bindings: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Host-attached variant: bound to an externally-owned element whose
    /// lifecycle the engine does not manage.
    pub(crate) fn new_host(
        engine: Rc<EngineShared>,
        stack: Rc<ConstructorStack>,
        host: NodeRef,
    ) -> Self {
        let reference = BindingReference::new(engine, stack, false);
        *reference.inner.host.borrow_mut() = Some(host);
        reference
    }

    pub(crate) fn from_inner(inner: Rc<ReferenceInner>) -> Self {
        BindingReference { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ReferenceInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn engine(&self) -> Rc<EngineShared> {
        Rc::clone(&self.inner.engine)
    }

    pub fn scheduler(&self) -> Scheduler {
        self.inner.engine.scheduler.clone()
    }

    pub fn flags(&self) -> LifecycleFlags {
        self.inner.core.borrow().flags
    }

    pub fn is_attached(&self) -> bool {
        self.flags().contains(LifecycleFlags::ATTACHED)
    }

    pub fn is_destroyed(&self) -> bool {
        self.flags().contains(LifecycleFlags::DESTROYED)
    }

    pub fn is_implicit(&self) -> bool {
        self.inner.implicit
    }

    pub(crate) fn set_parent(&self, parent: &BindingReference) {
        self.inner.core.borrow_mut().parent = Some(parent.downgrade());
    }

    /// Identity-or-ancestry test used by the scheduler's subsumption rule.
    pub fn is_same_or_ancestor_of(&self, other: &BindingReference) -> bool {
        if self == other {
            return true;
        }
        let mut current = other.inner.core.borrow().parent.clone();
        while let Some(weak) = current {
            match weak.upgrade() {
                Some(inner) => {
                    if Rc::ptr_eq(&inner, &self.inner) {
                        return true;
                    }
                    current = inner.core.borrow().parent.clone();
                }
                None => return false,
            }
        }
        false
    }

    // ---- Lifecycle -------------------------------------------------------

    /// Attach state and the implicit-variable stack. Initializes right away
    /// when a DOM location is already known, otherwise initialization waits
    /// for one.
    pub fn bind(&self, context: Context, implicits: Vec<ImplicitFrame>) -> Result<()> {
        if self.is_destroyed() {
            return Ok(());
        }
        {
            let mut core = self.inner.core.borrow_mut();
            core.scope = Some(Scope::with_implicits(context, implicits));
            core.flags |= LifecycleFlags::BOUND;
        }
        self.try_initialize()
    }

    /// Append the reference's output under `parent`.
    pub fn append_to(&self, parent: &NodeRef) -> Result<()> {
        self.place(DomLocation::append(parent.clone()))
    }

    /// Insert the reference's output before `anchor`.
    pub fn insert_before(&self, anchor: &NodeRef) -> Result<()> {
        self.place(DomLocation::before(anchor.clone()))
    }

    fn place(&self, location: DomLocation) -> Result<()> {
        if self.is_destroyed() {
            return Ok(());
        }
        if self.is_attached() {
            self.detach()?;
        }
        self.inner.core.borrow_mut().location = Some(location);
        if self.flags().contains(LifecycleFlags::INITIALIZED) {
            self.attach()
        } else {
            self.try_initialize()
        }
    }

    /// Idempotent; fires once. Requires state and a DOM location (or a
    /// host element): runs the constructor stack, inserts the output,
    /// invokes `onInit`/`onAttach`, applies queued state, and runs the
    /// first full detection pass.
    fn try_initialize(&self) -> Result<()> {
        let (scope, ready) = {
            let core = self.inner.core.borrow();
            if core.flags.contains(LifecycleFlags::INITIALIZED)
                || core.flags.contains(LifecycleFlags::DESTROYED)
                || !core.flags.contains(LifecycleFlags::BOUND)
            {
                return Ok(());
            }
            let has_target = core.location.is_some() || self.inner.host.borrow().is_some();
            (core.scope.clone(), has_target)
        };
        let scope = match (scope, ready) {
            (Some(scope), true) => scope,
            _ => return Ok(()),
        };

        let host = self.inner.host.borrow().clone();
        let roots = match host {
            Some(host) => build::build_host(self, &host, &scope)?,
            None => {
                let (parent, anchor) = match self.inner.core.borrow().location.as_ref().and_then(DomLocation::resolve) {
                    Some(resolved) => resolved,
                    None => return Ok(()),
                };
                build::build_stack_instructions(self, &parent, anchor.as_ref(), &scope)?
            }
        };

        let pending = {
            let mut core = self.inner.core.borrow_mut();
            core.roots = roots;
            core.flags |= LifecycleFlags::INITIALIZED | LifecycleFlags::ATTACHED;
            core.pending_state.take()
        };

        self.invoke_hook("onInit", &[]);
        self.invoke_hook("onAttach", &[]);

        if let Some(partial) = pending {
            let context = scope.context.clone();
            let mut state = context.borrow_mut();
            for (key, value) in partial {
                state.insert(key, value);
            }
        }

        self.detect_changes(true)
    }

    /// Shallow-merge changed keys, fire `onChanges`, and trigger detection:
    /// synchronous when attached (deferred to the enclosing burst when one
    /// is open), buffered otherwise.
    pub fn set_state(&self, partial: IndexMap<String, Value>) -> Result<()> {
        if self.is_destroyed() {
            return Ok(());
        }
        let flags = self.flags();
        if !flags.contains(LifecycleFlags::INITIALIZED) {
            let mut core = self.inner.core.borrow_mut();
            let pending = core.pending_state.get_or_insert_with(IndexMap::new);
            for (key, value) in partial {
                pending.insert(key, value);
            }
            return Ok(());
        }

        let changes = self.merge_state(partial);
        if changes.is_empty() {
            return Ok(());
        }

        self.invoke_hook("onChanges", &[Value::Object(changes)]);

        if self.is_attached() {
            let scheduler = self.scheduler();
            let handle = scheduler.mark_change_detection(self);
            if !scheduler.in_burst() {
                handle.invoke()?;
            }
        } else {
            self.inner.core.borrow_mut().dirty = true;
        }
        Ok(())
    }

    /// Shallow-merge changed keys into the context, returning the recorded
    /// `{previous, current}` change map.
    fn merge_state(&self, partial: IndexMap<String, Value>) -> IndexMap<String, Value> {
        let mut changes: IndexMap<String, Value> = IndexMap::new();
        let core = self.inner.core.borrow();
        let context = match core.scope.as_ref() {
            Some(scope) => scope.context.clone(),
            None => return changes,
        };
        drop(core);
        let mut context = context.borrow_mut();
        for (key, value) in partial {
            let old = context.get(&key).cloned();
            if old.as_ref() != Some(&value) {
                changes.insert(
                    key.clone(),
                    Value::object([
                        ("previous".to_string(), old.unwrap_or(Value::Undefined)),
                        ("current".to_string(), value.clone()),
                    ]),
                );
                context.insert(key, value);
            }
        }
        changes
    }

    /// Push one input value from an enclosing detection pass. The change map
    /// and `onChanges` hook behave like `set_state`, but detection is left
    /// to the pass that is already running.
    pub(crate) fn apply_input_state(&self, key: &str, value: Value) -> Result<()> {
        if self.is_destroyed() {
            return Ok(());
        }
        if !self.flags().contains(LifecycleFlags::INITIALIZED) {
            let mut core = self.inner.core.borrow_mut();
            core.pending_state
                .get_or_insert_with(IndexMap::new)
                .insert(key.to_string(), value);
            return Ok(());
        }
        let mut partial = IndexMap::new();
        partial.insert(key.to_string(), value);
        let changes = self.merge_state(partial);
        if !changes.is_empty() {
            self.invoke_hook("onChanges", &[Value::Object(changes)]);
        }
        Ok(())
    }

    /// Re-evaluate every binding entry against the current scope in document
    /// order, then recurse into logic and behavior children.
    pub fn detect_changes(&self, recursive: bool) -> Result<()> {
        let (scope, live) = {
            let core = self.inner.core.borrow();
            let live = core.flags.contains(LifecycleFlags::INITIALIZED)
                && !core.flags.contains(LifecycleFlags::DESTROYED);
            (core.scope.clone(), live)
        };
        let scope = match (scope, live) {
            (Some(scope), true) => scope,
            _ => return Ok(()),
        };
        let skip_errors = self.inner.engine.skip_errors();

        let bindings = self.inner.bindings.borrow().clone();
        for element in &bindings {
            for entry in &element.entries {
                entry.apply(&scope, skip_errors)?;
            }
        }

        let logic_children = self.inner.core.borrow().logic_children.clone();
        for logic in &logic_children {
            logic.detect_changes(&scope, recursive)?;
        }

        if recursive {
            let behavior_children = self.inner.core.borrow().behavior_children.clone();
            for child in &behavior_children {
                child.detect_changes(true)?;
            }
        }
        Ok(())
    }

    /// Idempotent DOM-presence toggle; state survives and the reference is
    /// re-attachable at a different location.
    pub fn attach(&self) -> Result<()> {
        if self.is_destroyed() || self.is_attached() {
            return Ok(());
        }
        if !self.flags().contains(LifecycleFlags::INITIALIZED) {
            return self.try_initialize();
        }
        let resolved = self
            .inner
            .core
            .borrow()
            .location
            .as_ref()
            .and_then(DomLocation::resolve);
        let (parent, anchor) = match resolved {
            Some(resolved) => resolved,
            None => return Ok(()),
        };
        let roots = self.inner.core.borrow().roots.clone();
        for item in &roots {
            match item {
                RootItem::Node(node) => parent.insert_before(node, anchor.as_ref()),
                RootItem::Logic(logic) => logic.attach(&parent, anchor.as_ref())?,
            }
        }
        let dirty = {
            let mut core = self.inner.core.borrow_mut();
            core.flags |= LifecycleFlags::ATTACHED;
            std::mem::take(&mut core.dirty)
        };
        self.invoke_hook("onAttach", &[]);
        if dirty {
            let scheduler = self.scheduler();
            let handle = scheduler.mark_change_detection(self);
            if !scheduler.in_burst() {
                handle.invoke()?;
            }
        }
        Ok(())
    }

    pub fn detach(&self) -> Result<()> {
        if self.is_destroyed() || !self.is_attached() {
            return Ok(());
        }
        let roots = self.inner.core.borrow().roots.clone();
        for item in &roots {
            match item {
                RootItem::Node(node) => node.remove(),
                RootItem::Logic(logic) => logic.detach()?,
            }
        }
        self.inner.core.borrow_mut().flags -= LifecycleFlags::ATTACHED;
        Ok(())
    }

    /// Terminal: releases native listeners, runs the symmetric teardown
    /// stack, detaches, fires `onDestroy`. Every later operation is a no-op.
    pub fn destroy(&self) -> Result<()> {
        if self.is_destroyed() {
            return Ok(());
        }

        for element in self.inner.bindings.borrow().iter() {
            for entry in &element.entries {
                entry.release();
            }
        }
        let listeners = std::mem::take(&mut self.inner.core.borrow_mut().listeners);
        for (node, id) in listeners {
            node.remove_listener(id);
        }

        // Symmetric teardown: children unwind in reverse creation order.
        let (logic_children, behavior_children) = {
            let mut core = self.inner.core.borrow_mut();
            (
                std::mem::take(&mut core.logic_children),
                std::mem::take(&mut core.behavior_children),
            )
        };
        for child in behavior_children.iter().rev() {
            child.destroy()?;
        }
        for logic in logic_children.iter().rev() {
            logic.destroy()?;
        }

        self.detach()?;
        self.invoke_hook("onDestroy", &[]);

        let mut core = self.inner.core.borrow_mut();
        core.flags |= LifecycleFlags::DESTROYED;
        core.flags -= LifecycleFlags::BOUND;
        self.inner.bindings.borrow_mut().clear();
        Ok(())
    }

    // ---- Structural fan-out ---------------------------------------------

    /// All root-level native nodes, including logic markers and reconciled
    /// children.
    pub fn root_nodes(&self) -> Vec<NodeRef> {
        let mut nodes = Vec::new();
        for item in self.inner.core.borrow().roots.iter() {
            match item {
                RootItem::Node(node) => nodes.push(node.clone()),
                RootItem::Logic(logic) => nodes.extend(logic.nodes()),
            }
        }
        if let Some(host) = self.inner.host.borrow().clone() {
            nodes.push(host);
        }
        nodes
    }

    pub(crate) fn first_node(&self) -> Option<NodeRef> {
        self.root_nodes().into_iter().next()
    }

    /// Find the first matching node across the whole output, descending into
    /// logic and behavior children.
    pub fn find(&self, selector: &str) -> Option<NodeRef> {
        for node in self.root_nodes() {
            if let Some(found) = node.query(selector) {
                return Some(found);
            }
        }
        let core = self.inner.core.borrow();
        for child in &core.behavior_children {
            if let Some(found) = child.find(selector) {
                return Some(found);
            }
        }
        None
    }

    /// Look up a `#name` template-variable registration.
    pub fn named(&self, name: &str) -> Option<NamedTarget> {
        self.inner.core.borrow().named.get(name).cloned()
    }

    /// Nested behavior references, in document order.
    pub fn behavior_children(&self) -> Vec<BindingReference> {
        self.inner.core.borrow().behavior_children.clone()
    }

    /// Union of the constituents' rects.
    pub fn bounding_rect(&self) -> Option<Rect> {
        let mut union: Option<Rect> = None;
        for node in self.root_nodes() {
            if let Some(rect) = node.bounding_rect() {
                union = Some(match union {
                    Some(current) => current.union(&rect),
                    None => rect,
                });
            }
        }
        union
    }

    pub fn add_event_listener(&self, event: &str, handler: ListenerFn) {
        for node in self.element_roots() {
            let id = node.add_listener(event, Rc::clone(&handler));
            self.inner.core.borrow_mut().listeners.push((node, id));
        }
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        for node in self.element_roots() {
            node.set_attribute(name, value);
        }
    }

    pub fn add_class(&self, name: &str) {
        for node in self.element_roots() {
            node.add_class(name);
        }
    }

    pub fn remove_class(&self, name: &str) {
        for node in self.element_roots() {
            node.remove_class(name);
        }
    }

    pub fn set_style(&self, name: &str, value: &str) {
        for node in self.element_roots() {
            node.set_style(name, value);
        }
    }

    fn element_roots(&self) -> Vec<NodeRef> {
        self.root_nodes()
            .into_iter()
            .filter(|node| node.kind() == crate::dom::NodeKind::Element)
            .collect()
    }

    // ---- State access ----------------------------------------------------

    pub fn context(&self) -> Option<Context> {
        self.inner
            .core
            .borrow()
            .scope
            .as_ref()
            .map(|scope| scope.context.clone())
    }

    pub fn state(&self, key: &str) -> Option<Value> {
        self.context()
            .and_then(|context| context.borrow().get(key).cloned())
    }

    pub(crate) fn scope(&self) -> Option<Scope> {
        self.inner.core.borrow().scope.clone()
    }

    /// Invoke a lifecycle hook declared as a function on the context.
    /// Implicit references suppress hook invocation entirely.
    fn invoke_hook(&self, name: &str, args: &[Value]) {
        if self.inner.implicit {
            return;
        }
        let hook = self
            .scope()
            .and_then(|scope| scope.context.borrow().get(name).cloned());
        if let Some(Value::Func(f)) = hook {
            f(args);
        }
    }
}
