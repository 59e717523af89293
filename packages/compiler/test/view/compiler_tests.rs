//! View compiler tests: constructor-stack shape, caching, behavior
//! partitioning and selector mode.

use std::rc::Rc;

use indexmap::IndexMap;
use trellis_compiler::view::{BehaviorSpec, BindOp, Compiler, ViewInstruction};

fn host_bindings(entries: &[(&str, &str)]) -> IndexMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn emits_static_construction_then_bindings_then_children() {
    let compiler = Compiler::default();
    let stack = compiler
        .compile(r#"<div class="box" [title]="t"><span>inner</span></div>"#)
        .expect("compiles");
    match &stack[0] {
        ViewInstruction::CreateElement {
            tag,
            classes,
            bindings,
            children,
            ..
        } => {
            assert_eq!(tag, "div");
            assert!(classes.contains("box"));
            assert!(matches!(&bindings[0], BindOp::Input { key, .. } if key == "title"));
            assert!(matches!(&children[0], ViewInstruction::CreateElement { tag, .. } if tag == "span"));
        }
        other => panic!("expected element, got {:?}", other),
    }
}

#[test]
fn text_nodes_compile_to_static_or_bound_instructions() {
    let compiler = Compiler::default();
    let stack = compiler
        .compile("<p>static</p><p>{{value}}-suffix</p>")
        .expect("compiles");
    let static_p = match &stack[0] {
        ViewInstruction::CreateElement { children, .. } => &children[0],
        other => panic!("expected element, got {:?}", other),
    };
    assert!(matches!(static_p, ViewInstruction::CreateText { text } if text == "static"));

    let bound_p = match &stack[1] {
        ViewInstruction::CreateElement { children, .. } => &children[0],
        other => panic!("expected element, got {:?}", other),
    };
    assert!(matches!(bound_p, ViewInstruction::CreateBoundText { parts } if parts.len() == 2));
}

#[test]
fn compile_caches_by_exact_template_text() {
    let compiler = Compiler::default();
    let a = compiler.compile("<div>{{x}}</div>").expect("compiles");
    let b = compiler.compile("<div>{{x}}</div>").expect("compiles");
    let c = compiler.compile("<div>{{x}} </div>").expect("compiles");
    assert!(Rc::ptr_eq(&a, &b));
    assert!(!Rc::ptr_eq(&a, &c));
    assert_eq!(compiler.cache_len(), 2);
}

#[test]
fn failed_compiles_are_never_cached() {
    let compiler = Compiler::default();
    assert!(compiler.compile("<div>{{oops</div>").is_err());
    assert_eq!(compiler.cache_len(), 0);
    // The same text fails identically on retry instead of hitting a cache.
    assert!(compiler.compile("<div>{{oops</div>").is_err());
}

#[test]
fn logic_directive_wraps_remaining_processing() {
    let compiler = Compiler::default();
    let stack = compiler
        .compile(r#"<li *for="item in items" [title]="item" class="row">{{item}}</li>"#)
        .expect("compiles");
    match &stack[0] {
        ViewInstruction::CreateLogic { logic, stack, .. } => {
            assert_eq!(logic.name, "for");
            assert_eq!(logic.item_alias.as_deref(), Some("item"));
            match &stack[0] {
                ViewInstruction::CreateElement {
                    tag,
                    classes,
                    bindings,
                    children,
                    ..
                } => {
                    assert_eq!(tag, "li");
                    assert!(classes.contains("row"));
                    assert_eq!(bindings.len(), 1);
                    assert!(matches!(&children[0], ViewInstruction::CreateBoundText { .. }));
                }
                other => panic!("expected inner element, got {:?}", other),
            }
        }
        other => panic!("expected logic instruction, got {:?}", other),
    }
}

#[test]
fn nested_logic_directives_compile_inside_out() {
    let compiler = Compiler::default();
    let stack = compiler
        .compile(r#"<li *if="visible" *for="item in items">{{item}}</li>"#)
        .expect("compiles");
    match &stack[0] {
        ViewInstruction::CreateLogic { logic, stack, .. } => {
            assert_eq!(logic.name, "if");
            assert!(matches!(
                &stack[0],
                ViewInstruction::CreateLogic { logic, .. } if logic.name == "for"
            ));
        }
        other => panic!("expected logic instruction, got {:?}", other),
    }
}

#[test]
fn behavior_metadata_partitions_entries() {
    let compiler = Compiler::default();
    compiler.register_behavior(
        BehaviorSpec::new("number-field")
            .with_property("value")
            .with_property("max")
            .with_emitter("changed"),
    );
    let stack = compiler
        .compile(
            r#"<number-field max="10" [value]="count" [placeholder]="hint" (changed)="sync()" (focus)="noted()"></number-field>"#,
        )
        .expect("compiles");
    match &stack[0] {
        ViewInstruction::CreateBehavior {
            name,
            initial,
            inputs,
            outputs,
            host,
            ..
        } => {
            assert_eq!(name, "number-field");
            assert_eq!(initial.get("max"), Some(&"10".to_string()));
            assert!(inputs.contains_key("value"));
            assert!(outputs.contains_key("changed"));
            match host.as_ref() {
                ViewInstruction::CreateElement { attributes, bindings, .. } => {
                    // Undeclared entries stay plain DOM attributes/bindings.
                    assert!(!attributes.contains_key("max"));
                    assert!(bindings
                        .iter()
                        .any(|b| matches!(b, BindOp::Input { key, .. } if key == "placeholder")));
                    assert!(bindings
                        .iter()
                        .any(|b| matches!(b, BindOp::Output { key, .. } if key == "focus")));
                }
                other => panic!("expected host element, got {:?}", other),
            }
        }
        other => panic!("expected behavior, got {:?}", other),
    }
}

#[test]
fn replacement_behavior_compiles_its_template() {
    let compiler = Compiler::default();
    compiler.register_behavior(
        BehaviorSpec::new("badge")
            .with_property("label")
            .with_template("<span class=\"badge\">{{label}}</span>"),
    );
    let stack = compiler.compile("<badge [label]=\"name\"></badge>").expect("compiles");
    match &stack[0] {
        ViewInstruction::CreateBehavior { stack, .. } => {
            assert!(matches!(
                &stack[0],
                ViewInstruction::CreateElement { tag, .. } if tag == "span"
            ));
        }
        other => panic!("expected behavior, got {:?}", other),
    }
}

#[test]
fn selector_mode_builds_one_element() {
    let compiler = Compiler::default();
    let stack = compiler
        .compile_selector(
            "button.primary#go[type=\"submit\"]",
            &host_bindings(&[("[title]", "label"), ("(click)", "go()")]),
        )
        .expect("compiles");
    match &stack[0] {
        ViewInstruction::CreateElement {
            tag,
            classes,
            attributes,
            bindings,
            ..
        } => {
            assert_eq!(tag, "button");
            assert!(classes.contains("primary"));
            assert_eq!(attributes.get("id"), Some(&"go".to_string()));
            assert_eq!(attributes.get("type"), Some(&"submit".to_string()));
            assert_eq!(bindings.len(), 2);
        }
        other => panic!("expected element, got {:?}", other),
    }
}

#[test]
fn selector_cache_ignores_host_binding_order() {
    let compiler = Compiler::default();
    let a = compiler
        .compile_selector("div.panel", &host_bindings(&[("[a]", "x"), ("[b]", "y")]))
        .expect("compiles");
    let b = compiler
        .compile_selector("div.panel", &host_bindings(&[("[b]", "y"), ("[a]", "x")]))
        .expect("compiles");
    assert!(Rc::ptr_eq(&a, &b));
    assert_eq!(compiler.cache_len(), 1);
}

#[test]
fn reset_clears_caches_but_keeps_behaviors() {
    let compiler = Compiler::default();
    compiler.register_behavior(BehaviorSpec::new("badge").with_property("label"));
    compiler.compile("<div></div>").expect("compiles");
    assert_eq!(compiler.cache_len(), 1);
    compiler.reset();
    assert_eq!(compiler.cache_len(), 0);
    let stack = compiler.compile("<badge></badge>").expect("compiles");
    assert!(matches!(&stack[0], ViewInstruction::CreateBehavior { .. }));
}
