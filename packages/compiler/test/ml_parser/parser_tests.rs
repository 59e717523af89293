//! Markup parser tests.

use trellis_compiler::ml_parser::{Node, ParseTreeResult, Parser};

fn parse(source: &str) -> ParseTreeResult {
    Parser::new().parse(source, "test.html")
}

fn element(node: &Node) -> &trellis_compiler::ml_parser::Element {
    match node {
        Node::Element(element) => element,
        other => panic!("expected element, got {:?}", other),
    }
}

#[test]
fn parses_nested_structure() {
    let result = parse("<section><header>title</header><p>body</p></section>");
    assert!(result.errors.is_empty());
    let section = element(&result.root_nodes[0]);
    assert_eq!(section.name, "section");
    assert_eq!(section.children.len(), 2);
    assert_eq!(element(&section.children[0]).name, "header");
}

#[test]
fn parses_attributes_with_and_without_values() {
    let result = parse(r#"<input type="text" disabled value='a b'>"#);
    assert!(result.errors.is_empty());
    let input = element(&result.root_nodes[0]);
    let names: Vec<&str> = input.attrs.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["type", "disabled", "value"]);
    assert_eq!(input.attrs[1].value, "");
    assert_eq!(input.attrs[2].value, "a b");
}

#[test]
fn binding_sigils_survive_as_attribute_names() {
    let result = parse(r#"<div [title]="t" (click)="go()" [(value)]="v" *if="ok" let-row="r" #mark></div>"#);
    assert!(result.errors.is_empty());
    let div = element(&result.root_nodes[0]);
    let names: Vec<&str> = div.attrs.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["[title]", "(click)", "[(value)]", "*if", "let-row", "#mark"]
    );
}

#[test]
fn void_and_self_closing_tags() {
    let result = parse("<div><br><img src=\"x\"><svg><circle r=\"2\"/></svg></div>");
    assert!(result.errors.is_empty());
    let div = element(&result.root_nodes[0]);
    assert_eq!(div.children.len(), 3);
    assert!(element(&div.children[2]).children[0].source_span().start.offset > 0);
}

#[test]
fn decodes_entities_in_text_and_attributes() {
    let result = parse(r#"<p title="a &amp; b">&lt;tag&gt; &#65;</p>"#);
    assert!(result.errors.is_empty());
    let p = element(&result.root_nodes[0]);
    assert_eq!(p.attrs[0].value, "a & b");
    match &p.children[0] {
        Node::Text(text) => assert_eq!(text.value, "<tag> A"),
        other => panic!("expected text, got {:?}", other),
    }
}

#[test]
fn comments_are_preserved() {
    let result = parse("<div><!-- note --></div>");
    let div = element(&result.root_nodes[0]);
    match &div.children[0] {
        Node::Comment(comment) => assert_eq!(comment.value.as_deref(), Some(" note ")),
        other => panic!("expected comment, got {:?}", other),
    }
}

#[test]
fn adjacent_text_merges() {
    let result = parse("<p>a &amp; b</p>");
    let p = element(&result.root_nodes[0]);
    assert_eq!(p.children.len(), 1);
}

#[test]
fn mismatched_closing_tag_is_reported_with_position() {
    let result = parse("<div><span></div>");
    assert!(!result.errors.is_empty());
    let error = &result.errors[0];
    assert!(error.msg.contains("</div>"));
    assert!(error.msg.contains("</span>"));
    assert_eq!(error.span.start.offset, 11);
}

#[test]
fn unclosed_tag_is_reported() {
    let result = parse("<ul><li>one");
    assert!(result
        .errors
        .iter()
        .any(|e| e.msg.contains("Unclosed tag <li>")));
}

#[test]
fn stray_close_is_reported() {
    let result = parse("text</div>");
    assert!(result.errors[0].msg.contains("Unexpected closing tag </div>"));
}
