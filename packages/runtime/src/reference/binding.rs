//! Binding entries.
//!
//! One `BindingEntry` per bound target: attribute, bound text slot, class or
//! style map, event, two-way, or behavior input. Entries hold their own
//! `previous` state and expose a pure `apply(scope) -> changed` method;
//! value-carrying setters self-guard via previous-value comparison, while
//! event-style setters re-bind their native listener on every pass.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use trellis_compiler::statement::StatementInfo;
use trellis_compiler::template_parser::{ContentPart, MapBinding, MapBindingValue};

use crate::dom::{ListenerId, NodeRef};
use crate::error::{Result, RuntimeError};
use crate::eval::{assign, evaluate};
use crate::scope::{new_frame, Scope};
use crate::value::Value;

use super::{BindingReference, ReferenceInner};

/// Event name used for two-way write-back notifications.
pub const TWO_WAY_EVENT: &str = "input";

/// A target node plus its binding entries.
#[derive(Clone)]
pub struct ElementBinding {
    pub node: NodeRef,
    pub entries: Vec<Rc<BindingEntry>>,
}

pub struct BindingEntry {
    pub key: String,
    pub source: String,
    pub is_plain: bool,
    pub source_keys: IndexSet<String>,
    kind: RefCell<BindingKind>,
    previous: RefCell<Option<Value>>,
}

enum BindingKind {
    Attribute {
        node: NodeRef,
        statement: StatementInfo,
    },
    Text {
        node: NodeRef,
        parts: Vec<ContentPart>,
    },
    ClassMap {
        node: NodeRef,
        entries: Vec<MapEntryState>,
    },
    StyleMap {
        node: NodeRef,
        entries: Vec<MapEntryState>,
    },
    Event {
        node: NodeRef,
        event: String,
        statement: StatementInfo,
        listener: Option<ListenerId>,
        owner: Weak<ReferenceInner>,
    },
    TwoWay {
        node: NodeRef,
        target: String,
        statement: StatementInfo,
        listener: Option<ListenerId>,
        owner: Weak<ReferenceInner>,
    },
    BehaviorInput {
        child: BindingReference,
        target: String,
        statement: StatementInfo,
        two_way: bool,
    },
}

/// Per-map-binding differential state: the keys (and, for styles, values)
/// this binding currently has applied. Diffs run against this, never against
/// the static literal.
struct MapEntryState {
    binding: MapBinding,
    applied: IndexMap<String, String>,
}

impl BindingEntry {
    pub fn attribute(key: &str, node: NodeRef, statement: StatementInfo) -> Rc<Self> {
        Rc::new(BindingEntry {
            key: key.to_string(),
            source: statement.statement.clone(),
            is_plain: statement.is_plain_value,
            source_keys: statement.source_keys(),
            kind: RefCell::new(BindingKind::Attribute { node, statement }),
            previous: RefCell::new(None),
        })
    }

    pub fn text(node: NodeRef, parts: Vec<ContentPart>) -> Rc<Self> {
        let source_keys = parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Statement(info) => Some(info.source_keys()),
                ContentPart::Literal(_) => None,
            })
            .flatten()
            .collect();
        Rc::new(BindingEntry {
            key: "content".to_string(),
            source: String::new(),
            is_plain: false,
            source_keys,
            kind: RefCell::new(BindingKind::Text { node, parts }),
            previous: RefCell::new(None),
        })
    }

    pub fn class_map(node: NodeRef, bindings: Vec<MapBinding>) -> Rc<Self> {
        Rc::new(Self::map_entry("class", BindingKind::ClassMap {
            node,
            entries: bindings.into_iter().map(MapEntryState::new).collect(),
        }))
    }

    pub fn style_map(node: NodeRef, bindings: Vec<MapBinding>) -> Rc<Self> {
        Rc::new(Self::map_entry("style", BindingKind::StyleMap {
            node,
            entries: bindings.into_iter().map(MapEntryState::new).collect(),
        }))
    }

    fn map_entry(key: &str, kind: BindingKind) -> Self {
        let source_keys = match &kind {
            BindingKind::ClassMap { entries, .. } | BindingKind::StyleMap { entries, .. } => {
                entries
                    .iter()
                    .flat_map(|entry| entry.binding_source_keys())
                    .collect()
            }
            _ => IndexSet::new(),
        };
        BindingEntry {
            key: key.to_string(),
            source: String::new(),
            is_plain: false,
            source_keys,
            kind: RefCell::new(kind),
            previous: RefCell::new(None),
        }
    }

    pub fn event(
        key: &str,
        node: NodeRef,
        statement: StatementInfo,
        owner: Weak<ReferenceInner>,
    ) -> Rc<Self> {
        Rc::new(BindingEntry {
            key: key.to_string(),
            source: statement.statement.clone(),
            is_plain: false,
            source_keys: statement.source_keys(),
            kind: RefCell::new(BindingKind::Event {
                node,
                event: key.to_string(),
                statement,
                listener: None,
                owner,
            }),
            previous: RefCell::new(None),
        })
    }

    pub fn two_way(
        key: &str,
        node: NodeRef,
        statement: StatementInfo,
        owner: Weak<ReferenceInner>,
    ) -> Rc<Self> {
        Rc::new(BindingEntry {
            key: key.to_string(),
            source: statement.statement.clone(),
            is_plain: false,
            source_keys: statement.source_keys(),
            kind: RefCell::new(BindingKind::TwoWay {
                node,
                target: key.to_string(),
                statement,
                listener: None,
                owner,
            }),
            previous: RefCell::new(None),
        })
    }

    pub fn behavior_input(
        key: &str,
        child: BindingReference,
        statement: StatementInfo,
        two_way: bool,
    ) -> Rc<Self> {
        Rc::new(BindingEntry {
            key: key.to_string(),
            source: statement.statement.clone(),
            is_plain: false,
            source_keys: statement.source_keys(),
            kind: RefCell::new(BindingKind::BehaviorInput {
                child,
                target: key.to_string(),
                statement,
                two_way,
            }),
            previous: RefCell::new(None),
        })
    }

    /// Re-evaluate against `scope` and update the target. Returns whether
    /// anything observable changed.
    pub fn apply(&self, scope: &Scope, skip_errors: bool) -> Result<bool> {
        let mut kind = self.kind.borrow_mut();
        match &mut *kind {
            BindingKind::Attribute { node, statement } => {
                let value = self.eval(statement, scope, skip_errors)?;
                if self.previous.borrow().as_ref() == Some(&value) {
                    return Ok(false);
                }
                if value.is_nil() {
                    node.remove_attribute(&self.key);
                } else {
                    node.set_attribute(&self.key, &value.to_display_string());
                }
                *self.previous.borrow_mut() = Some(value);
                Ok(true)
            }
            BindingKind::Text { node, parts } => {
                let mut composed = String::new();
                for part in parts.iter() {
                    match part {
                        ContentPart::Literal(text) => composed.push_str(text),
                        ContentPart::Statement(statement) => {
                            let value = self.eval(statement, scope, skip_errors)?;
                            composed.push_str(&value.to_display_string());
                        }
                    }
                }
                let value = Value::Str(composed);
                if self.previous.borrow().as_ref() == Some(&value) {
                    return Ok(false);
                }
                node.set_text(&value.to_display_string());
                *self.previous.borrow_mut() = Some(value);
                Ok(true)
            }
            BindingKind::ClassMap { node, entries } => {
                let mut changed = false;
                for entry in entries.iter_mut() {
                    changed |= entry.apply_class(node, scope, skip_errors, &self.key)?;
                }
                Ok(changed)
            }
            BindingKind::StyleMap { node, entries } => {
                let mut changed = false;
                for entry in entries.iter_mut() {
                    changed |= entry.apply_style(node, scope, skip_errors, &self.key)?;
                }
                Ok(changed)
            }
            BindingKind::Event {
                node,
                event,
                statement,
                listener,
                owner,
            } => {
                // Unconditional listener re-bind on every pass; identical
                // handlers stay externally unobservable.
                if let Some(id) = listener.take() {
                    node.remove_listener(id);
                }
                let id = node.add_listener(
                    event,
                    action_listener(statement, scope, owner.clone(), self.key.clone()),
                );
                *listener = Some(id);
                Ok(false)
            }
            BindingKind::TwoWay {
                node,
                target,
                statement,
                listener,
                owner,
            } => {
                if let Some(id) = listener.take() {
                    node.remove_listener(id);
                }
                let id = node.add_listener(
                    TWO_WAY_EVENT,
                    write_back_listener(statement, scope, owner.clone(), self.key.clone()),
                );
                *listener = Some(id);

                let value = self.eval(statement, scope, skip_errors)?;
                if self.previous.borrow().as_ref() == Some(&value) {
                    return Ok(false);
                }
                node.set_attribute(target, &value.to_display_string());
                *self.previous.borrow_mut() = Some(value);
                Ok(true)
            }
            BindingKind::BehaviorInput {
                child,
                target,
                statement,
                two_way: _,
            } => {
                let value = self.eval(statement, scope, skip_errors)?;
                if self.previous.borrow().as_ref() == Some(&value) {
                    return Ok(false);
                }
                // Detection of the child is left to the enclosing pass,
                // which recurses into behavior children after the entries.
                child.apply_input_state(target, value.clone())?;
                *self.previous.borrow_mut() = Some(value);
                Ok(true)
            }
        }
    }

    /// Release the native listener, if any.
    pub fn release(&self) {
        let mut kind = self.kind.borrow_mut();
        match &mut *kind {
            BindingKind::Event { node, listener, .. }
            | BindingKind::TwoWay { node, listener, .. } => {
                if let Some(id) = listener.take() {
                    node.remove_listener(id);
                }
            }
            _ => {}
        }
    }

    fn eval(&self, statement: &StatementInfo, scope: &Scope, skip_errors: bool) -> Result<Value> {
        eval_statement(statement, scope, &self.key, skip_errors)
    }
}

/// Evaluate a statement for a binding. Plain values pass their raw text
/// through; in skip-error mode an evaluation failure logs and substitutes
/// the raw source text.
pub fn eval_statement(
    statement: &StatementInfo,
    scope: &Scope,
    key: &str,
    skip_errors: bool,
) -> Result<Value> {
    let ast = match &statement.ast {
        Some(ast) => ast,
        None => return Ok(Value::Str(statement.statement.clone())),
    };
    match evaluate(ast, scope) {
        Ok(value) => Ok(value),
        Err(error) if skip_errors => {
            log::warn!(
                "binding `{}` (`{}`) failed, substituting source text: {}",
                key,
                statement.statement,
                error
            );
            Ok(Value::Str(statement.statement.clone()))
        }
        Err(error) => Err(error.in_binding(key, &statement.statement)),
    }
}

fn action_listener(
    statement: &StatementInfo,
    scope: &Scope,
    owner: Weak<ReferenceInner>,
    key: String,
) -> Rc<dyn Fn(&Value)> {
    let ast = statement.ast.clone();
    let scope = scope.clone();
    Rc::new(move |payload: &Value| {
        let reference = match owner.upgrade() {
            Some(inner) => BindingReference::from_inner(inner),
            None => return,
        };
        let scheduler = reference.scheduler();
        scheduler.enter_burst();

        let frame = new_frame([("$event".to_string(), payload.clone())]);
        let scope = scope.child(frame);
        let result = match &ast {
            Some(ast) => evaluate(ast, &scope).map(|value| {
                // A handler-reference binding evaluates to the function
                // itself; invoke it with the event payload.
                if let Value::Func(f) = value {
                    f(&[payload.clone()]);
                }
            }),
            None => Ok(()),
        };

        scheduler.leave_burst();
        if let Err(error) = result {
            log::warn!("event `{}` handler failed: {}", key, error);
        }
        let handle = scheduler.mark_change_detection(&reference);
        if let Err(error) = handle.invoke() {
            log::error!("change detection after `{}` failed: {}", key, error);
        }
    })
}

fn write_back_listener(
    statement: &StatementInfo,
    scope: &Scope,
    owner: Weak<ReferenceInner>,
    key: String,
) -> Rc<dyn Fn(&Value)> {
    let ast = statement.ast.clone();
    let scope = scope.clone();
    Rc::new(move |payload: &Value| {
        let reference = match owner.upgrade() {
            Some(inner) => BindingReference::from_inner(inner),
            None => return,
        };
        let scheduler = reference.scheduler();
        scheduler.enter_burst();
        let result = match &ast {
            Some(ast) => assign(ast, &scope, payload.clone()),
            None => Err(RuntimeError::eval("two-way target is not assignable")),
        };
        scheduler.leave_burst();
        if let Err(error) = result {
            log::warn!("two-way `{}` write-back failed: {}", key, error);
        }
        let handle = scheduler.mark_change_detection(&reference);
        if let Err(error) = handle.invoke() {
            log::error!("change detection after `{}` failed: {}", key, error);
        }
    })
}

impl MapEntryState {
    fn new(binding: MapBinding) -> Self {
        MapEntryState {
            binding,
            applied: IndexMap::new(),
        }
    }

    fn binding_source_keys(&self) -> IndexSet<String> {
        let mut keys = IndexSet::new();
        match &self.binding {
            MapBinding::Whole(info) => keys.extend(info.source_keys()),
            MapBinding::Entry { value, .. } => {
                if let MapBindingValue::Statement(info) = value {
                    keys.extend(info.source_keys());
                }
            }
            MapBinding::Computed { key, value } => {
                keys.extend(key.source_keys());
                if let MapBindingValue::Statement(info) = value {
                    keys.extend(info.source_keys());
                }
            }
        }
        keys
    }

    /// Compute the desired key set for this pass. Class semantics: truthy
    /// values keep the key; style semantics: non-nil, non-false values map
    /// to their display string.
    fn desired(
        &self,
        scope: &Scope,
        skip_errors: bool,
        key: &str,
        styles: bool,
    ) -> Result<IndexMap<String, String>> {
        let mut desired = IndexMap::new();
        match &self.binding {
            MapBinding::Whole(info) => {
                let value = eval_statement(info, scope, key, skip_errors)?;
                if let Value::Object(map) = value {
                    for (name, value) in map {
                        insert_desired(&mut desired, name, &value, styles);
                    }
                }
            }
            MapBinding::Entry { name, value } => {
                let value = self.entry_value(value, scope, skip_errors, key)?;
                insert_desired(&mut desired, name.clone(), &value, styles);
            }
            MapBinding::Computed { key: computed, value } => {
                let name = eval_statement(computed, scope, key, skip_errors)?.to_display_string();
                let value = self.entry_value(value, scope, skip_errors, key)?;
                if !name.is_empty() {
                    insert_desired(&mut desired, name, &value, styles);
                }
            }
        }
        Ok(desired)
    }

    fn entry_value(
        &self,
        value: &MapBindingValue,
        scope: &Scope,
        skip_errors: bool,
        key: &str,
    ) -> Result<Value> {
        match value {
            MapBindingValue::Literal(text) => Ok(Value::Str(text.clone())),
            MapBindingValue::Statement(info) => eval_statement(info, scope, key, skip_errors),
        }
    }

    fn apply_class(
        &mut self,
        node: &NodeRef,
        scope: &Scope,
        skip_errors: bool,
        key: &str,
    ) -> Result<bool> {
        let desired = self.desired(scope, skip_errors, key, false)?;
        let mut changed = false;
        for name in self.applied.keys() {
            if !desired.contains_key(name) {
                node.remove_class(name);
                changed = true;
            }
        }
        for name in desired.keys() {
            if !self.applied.contains_key(name) {
                node.add_class(name);
                changed = true;
            }
        }
        self.applied = desired;
        Ok(changed)
    }

    fn apply_style(
        &mut self,
        node: &NodeRef,
        scope: &Scope,
        skip_errors: bool,
        key: &str,
    ) -> Result<bool> {
        let desired = self.desired(scope, skip_errors, key, true)?;
        let mut changed = false;
        for name in self.applied.keys() {
            if !desired.contains_key(name) {
                node.remove_style(name);
                changed = true;
            }
        }
        for (name, value) in &desired {
            if self.applied.get(name) != Some(value) {
                node.set_style(name, value);
                changed = true;
            }
        }
        self.applied = desired;
        Ok(changed)
    }
}

fn insert_desired(
    desired: &mut IndexMap<String, String>,
    name: String,
    value: &Value,
    styles: bool,
) {
    if styles {
        if !value.is_nil() && value != &Value::Bool(false) {
            desired.insert(name, value.to_display_string());
        }
    } else if value.is_truthy() {
        desired.insert(name, String::new());
    }
}
