//! Template parser tests: attribute classification, class/style forms,
//! interpolation splitting and namespace inheritance.

use std::rc::Rc;

use trellis_compiler::statement::StatementParser;
use trellis_compiler::template_parser::{
    ContentPart, MapBinding, MapBindingValue, TemplateNode, TemplateNodeKind, TemplateParser,
};

fn parser() -> TemplateParser {
    TemplateParser::new(Rc::new(StatementParser::default()))
}

fn parse(content: &str) -> TemplateNode {
    parser()
        .parse(content)
        .unwrap_or_else(|e| panic!("`{}` should parse: {}", content, e))
}

#[test]
fn classifies_every_attribute_category() {
    let root = parse(
        r#"<div id="panel" [title]="heading" (click)="select()" [(value)]="entry" *if="visible" let-row="item.row" #main></div>"#,
    );
    let div = &root.children[0];
    assert_eq!(div.kind, TemplateNodeKind::Tag);
    assert_eq!(div.attributes.get("id"), Some(&"panel".to_string()));
    assert!(div.inputs.contains_key("title"));
    assert!(div.outputs.contains_key("click"));
    assert!(div.two_ways.contains_key("value"));
    assert!(div.logics.contains_key("if"));
    assert_eq!(div.variables.get("row"), Some(&"item.row".to_string()));
    assert_eq!(div.reference.as_deref(), Some("main"));
}

#[test]
fn static_class_and_style_split_into_maps() {
    let root = parse(r#"<div class="a b  c" style="color: red; width: 10px"></div>"#);
    let div = &root.children[0];
    assert_eq!(div.classes.len(), 3);
    assert_eq!(div.styles.get("color"), Some(&"red".to_string()));
    assert_eq!(div.styles.get("width"), Some(&"10px".to_string()));
}

#[test]
fn per_entry_class_and_style_bindings() {
    let root = parse(r#"<div [class.active]="on" [style.width]="w + 'px'"></div>"#);
    let div = &root.children[0];
    match &div.class_bindings[0] {
        MapBinding::Entry { name, value } => {
            assert_eq!(name, "active");
            assert!(matches!(value, MapBindingValue::Statement(info) if info.variables.contains("on")));
        }
        other => panic!("expected entry binding, got {:?}", other),
    }
    assert!(matches!(&div.style_bindings[0], MapBinding::Entry { name, .. } if name == "width"));
}

#[test]
fn literal_map_binding_splits_per_entry() {
    let root = parse(r#"<div [class]="{selected: isSelected, disabled: locked}"></div>"#);
    let div = &root.children[0];
    assert_eq!(div.class_bindings.len(), 2);
    assert!(matches!(&div.class_bindings[0], MapBinding::Entry { name, .. } if name == "selected"));
    assert!(matches!(&div.class_bindings[1], MapBinding::Entry { name, .. } if name == "disabled"));
}

#[test]
fn computed_key_entries_track_both_sides() {
    let root = parse(r#"<div [style]="{[prop]: value, color: 'red'}"></div>"#);
    let div = &root.children[0];
    match &div.style_bindings[0] {
        MapBinding::Computed { key, value } => {
            assert!(key.variables.contains("prop"));
            assert!(matches!(value, MapBindingValue::Statement(info) if info.variables.contains("value")));
        }
        other => panic!("expected computed binding, got {:?}", other),
    }
    match &div.style_bindings[1] {
        MapBinding::Entry { name, value } => {
            assert_eq!(name, "color");
            assert!(matches!(value, MapBindingValue::Literal(text) if text == "red"));
        }
        other => panic!("expected entry binding, got {:?}", other),
    }
}

#[test]
fn non_literal_map_expression_stays_whole() {
    let root = parse(r#"<div [class]="classMap"></div>"#);
    let div = &root.children[0];
    assert!(matches!(&div.class_bindings[0], MapBinding::Whole(info) if info.variables.contains("classMap")));
}

#[test]
fn interpolation_splits_into_alternating_parts() {
    let root = parse("<span>count: {{count}} of {{total}}!</span>");
    let text = &root.children[0].children[0];
    assert_eq!(text.kind, TemplateNodeKind::Text);
    assert_eq!(text.contents.len(), 5);
    assert!(matches!(&text.contents[0], ContentPart::Literal(s) if s == "count: "));
    assert!(matches!(&text.contents[1], ContentPart::Statement(info) if info.variables.contains("count")));
    assert!(matches!(&text.contents[4], ContentPart::Literal(s) if s == "!"));
}

#[test]
fn repeat_directive_aliases() {
    let root = parse(r#"<li *for="entry, position in entries.visible"></li>"#);
    let logic = root.children[0].logics.get("for").expect("for directive");
    assert_eq!(logic.item_alias.as_deref(), Some("entry"));
    assert_eq!(logic.index_alias.as_deref(), Some("position"));
    assert_eq!(logic.statement.statement, "entries.visible");
    assert!(logic.statement.chain_props.contains("entries.visible"));
}

#[test]
fn bare_repeat_expression_has_no_aliases() {
    let root = parse(r#"<li *for="entries"></li>"#);
    let logic = root.children[0].logics.get("for").expect("for directive");
    assert!(logic.item_alias.is_none());
    assert_eq!(logic.statement.statement, "entries");
}

#[test]
fn svg_subtree_inherits_namespace() {
    let root = parse(r#"<div><svg><g><rect width="5"/></g></svg></div>"#);
    let div = &root.children[0];
    let svg = &div.children[0];
    assert!(div.namespace.is_none());
    assert_eq!(svg.namespace.as_deref(), Some("svg"));
    assert_eq!(svg.children[0].namespace.as_deref(), Some("svg"));
    assert_eq!(svg.children[0].children[0].namespace.as_deref(), Some("svg"));
}

#[test]
fn malformed_markup_is_fatal() {
    assert!(parser().parse("<div><span></div>").is_err());
}

#[test]
fn malformed_expression_is_wrapped_with_key_and_source() {
    let err = parser().parse(r#"<div [title]="value +"></div>"#).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("title"));
    assert!(message.contains("value +"));
}

#[test]
fn unterminated_interpolation_is_an_error() {
    let err = parser().parse("<div>{{broken</div>").unwrap_err();
    assert!(err.to_string().contains("Unterminated interpolation"));
}

#[test]
fn identical_text_parses_to_equal_trees() {
    let content = r#"<ul><li *for="item in items" [class.odd]="index % 2">{{item}}</li></ul>"#;
    assert_eq!(parse(content), parse(content));
}
