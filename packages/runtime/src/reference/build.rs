//! Constructor-stack interpretation.
//!
//! Runs a compiled stack during `initialize`, creating nodes, registering
//! binding entries in document order, and wiring logic and behavior
//! children.

use std::rc::Rc;

use trellis_compiler::view::{BindOp, ViewInstruction};

use crate::dom::NodeRef;
use crate::error::{Result, RuntimeError};
use crate::logic::LogicElement;
use crate::scope::{new_context, Scope};
use crate::value::Value;

use super::binding::{BindingEntry, ElementBinding};
use super::{BindingReference, NamedTarget, RootItem};

/// Build every top-level instruction into `parent` before `anchor`.
pub(crate) fn build_stack_instructions(
    reference: &BindingReference,
    parent: &NodeRef,
    anchor: Option<&NodeRef>,
    scope: &Scope,
) -> Result<Vec<RootItem>> {
    let stack = reference.inner.core.borrow().stack.clone();
    let mut roots = Vec::with_capacity(stack.len());
    for instruction in stack.iter() {
        roots.push(build_instruction(reference, instruction, parent, anchor, scope)?);
    }
    Ok(roots)
}

/// Apply a selector-compiled stack to an externally-owned host element. The
/// host is not part of the reference's root output; its lifecycle belongs to
/// the caller.
pub(crate) fn build_host(
    reference: &BindingReference,
    host: &NodeRef,
    scope: &Scope,
) -> Result<Vec<RootItem>> {
    let stack = reference.inner.core.borrow().stack.clone();
    let instruction = stack.first().ok_or_else(|| {
        RuntimeError::lifecycle("host binding requires a compiled element instruction")
    })?;
    match instruction {
        ViewInstruction::CreateElement {
            attributes,
            classes,
            styles,
            reference: marker,
            bindings,
            children,
            ..
        } => {
            apply_statics(host, attributes, classes, styles);
            if let Some(name) = marker {
                register_named(reference, name, NamedTarget::Node(host.clone()));
            }
            register_bindings(reference, host, bindings)?;
            for child in children {
                build_instruction(reference, child, host, None, scope)?;
            }
            Ok(Vec::new())
        }
        other => Err(RuntimeError::lifecycle(format!(
            "host binding requires an element instruction, got {:?}",
            other
        ))),
    }
}

fn build_instruction(
    reference: &BindingReference,
    instruction: &ViewInstruction,
    parent: &NodeRef,
    anchor: Option<&NodeRef>,
    scope: &Scope,
) -> Result<RootItem> {
    let document = reference.inner.engine.document.clone();
    match instruction {
        ViewInstruction::CreateElement {
            tag,
            namespace,
            attributes,
            classes,
            styles,
            reference: marker,
            bindings,
            children,
        } => {
            let node = document.create_element(tag, namespace.as_deref());
            apply_statics(&node, attributes, classes, styles);
            if let Some(name) = marker {
                register_named(reference, name, NamedTarget::Node(node.clone()));
            }
            register_bindings(reference, &node, bindings)?;
            for child in children {
                build_instruction(reference, child, &node, None, scope)?;
            }
            parent.insert_before(&node, anchor);
            Ok(RootItem::Node(node))
        }
        ViewInstruction::CreateText { text } => {
            let node = document.create_text(text);
            parent.insert_before(&node, anchor);
            Ok(RootItem::Node(node))
        }
        ViewInstruction::CreateBoundText { parts } => {
            let node = document.create_text("");
            let entry = BindingEntry::text(node.clone(), parts.clone());
            push_binding(reference, ElementBinding {
                node: node.clone(),
                entries: vec![entry],
            });
            parent.insert_before(&node, anchor);
            Ok(RootItem::Node(node))
        }
        ViewInstruction::CreateComment { text } => {
            let node = document.create_comment(text);
            parent.insert_before(&node, anchor);
            Ok(RootItem::Node(node))
        }
        ViewInstruction::CreateLogic {
            logic,
            variables,
            reference: marker,
            stack,
        } => {
            let end_marker = document.create_comment(&logic.name);
            parent.insert_before(&end_marker, anchor);
            let element = LogicElement::new(
                reference.engine(),
                reference.downgrade(),
                logic.clone(),
                variables.clone(),
                Rc::clone(stack),
                end_marker,
            )?;
            if let Some(name) = marker {
                register_named(reference, name, NamedTarget::Logic(element.clone()));
            }
            reference
                .inner
                .core
                .borrow_mut()
                .logic_children
                .push(element.clone());
            Ok(RootItem::Logic(element))
        }
        ViewInstruction::CreateBehavior {
            stack,
            initial,
            inputs,
            outputs,
            two_ways,
            host,
            ..
        } => {
            let host_item = build_instruction(reference, host, parent, anchor, scope)?;
            let host_node = match &host_item {
                RootItem::Node(node) => node.clone(),
                RootItem::Logic(_) => {
                    return Err(RuntimeError::lifecycle(
                        "behavior host must be an element instruction",
                    ));
                }
            };

            // Attribute-style behaviors have no template; their implicit
            // reference carries state without rendering, and hooks stay
            // suppressed.
            let child = BindingReference::new(
                reference.engine(),
                Rc::clone(stack),
                stack.is_empty(),
            );
            child.set_parent(reference);
            let context = new_context(
                initial
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::Str(value.clone()))),
            );
            child.bind(context, Vec::new())?;
            child.append_to(&host_node)?;

            let mut entries = Vec::new();
            for (key, statement) in inputs {
                entries.push(BindingEntry::behavior_input(
                    key,
                    child.clone(),
                    statement.clone(),
                    false,
                ));
            }
            for (key, statement) in two_ways {
                entries.push(BindingEntry::behavior_input(
                    key,
                    child.clone(),
                    statement.clone(),
                    true,
                ));
                entries.push(BindingEntry::two_way(
                    key,
                    host_node.clone(),
                    statement.clone(),
                    reference.downgrade(),
                ));
            }
            for (key, statement) in outputs {
                entries.push(BindingEntry::event(
                    key,
                    host_node.clone(),
                    statement.clone(),
                    reference.downgrade(),
                ));
            }
            if !entries.is_empty() {
                push_binding(reference, ElementBinding {
                    node: host_node.clone(),
                    entries,
                });
            }
            reference
                .inner
                .core
                .borrow_mut()
                .behavior_children
                .push(child);
            Ok(RootItem::Node(host_node))
        }
    }
}

fn register_bindings(
    reference: &BindingReference,
    node: &NodeRef,
    bindings: &[BindOp],
) -> Result<()> {
    if bindings.is_empty() {
        return Ok(());
    }
    let mut entries = Vec::with_capacity(bindings.len());
    for op in bindings {
        match op {
            BindOp::Input { key, statement } => {
                entries.push(BindingEntry::attribute(key, node.clone(), statement.clone()));
            }
            BindOp::Output { key, statement } => {
                entries.push(BindingEntry::event(
                    key,
                    node.clone(),
                    statement.clone(),
                    reference.downgrade(),
                ));
            }
            BindOp::TwoWay { key, statement } => {
                entries.push(BindingEntry::two_way(
                    key,
                    node.clone(),
                    statement.clone(),
                    reference.downgrade(),
                ));
            }
            BindOp::ClassMap { bindings } => {
                entries.push(BindingEntry::class_map(node.clone(), bindings.clone()));
            }
            BindOp::StyleMap { bindings } => {
                entries.push(BindingEntry::style_map(node.clone(), bindings.clone()));
            }
        }
    }
    push_binding(reference, ElementBinding {
        node: node.clone(),
        entries,
    });
    Ok(())
}

fn apply_statics(
    node: &NodeRef,
    attributes: &indexmap::IndexMap<String, String>,
    classes: &indexmap::IndexSet<String>,
    styles: &indexmap::IndexMap<String, String>,
) {
    for (name, value) in attributes {
        node.set_attribute(name, value);
    }
    for class in classes {
        node.add_class(class);
    }
    for (name, value) in styles {
        node.set_style(name, value);
    }
}

fn push_binding(reference: &BindingReference, element: ElementBinding) {
    reference.inner.bindings.borrow_mut().push(element);
}

fn register_named(reference: &BindingReference, name: &str, target: NamedTarget) {
    reference
        .inner
        .core
        .borrow_mut()
        .named
        .insert(name.to_string(), target);
}
