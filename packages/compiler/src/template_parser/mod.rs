//! Template Parser
//!
//! Parses markup text into the classified template AST: each raw attribute
//! is dispatched into its static or dynamic binding category and every
//! embedded expression is run through the statement parser.

pub mod ast;

use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{CompileError, Result};
use crate::expression_parser::ast::{Ast, LiteralMap, LiteralMapKey, LiteralPrimitive};
use crate::ml_parser::tags::get_tag_definition;
use crate::ml_parser::{self, Node};
use crate::statement::{StatementInfo, StatementParser};

pub use ast::{
    ContentPart, LogicAttr, MapBinding, MapBindingValue, TemplateNode, TemplateNodeKind,
};

lazy_static! {
    /// Classification of a raw attribute name into its binding category:
    /// `[(x)]` two-way, `[x]` input, `(x)` output, `*x` logic, `let-x`
    /// declared variable, `#x` reference marker.
    static ref BINDING_NAME_REGEXP: Regex =
        Regex::new(r"^(?:\[\(([^\)\]]+)\)\]|\[([^\]]+)\]|\(([^\)]+)\)|\*([\w-]+)|let-([\w-]+)|#([\w-]+))$")
            .expect("binding name regex");
}

const KW_TWO_WAY_IDX: usize = 1;
const KW_INPUT_IDX: usize = 2;
const KW_OUTPUT_IDX: usize = 3;
const KW_LOGIC_IDX: usize = 4;
const KW_LET_IDX: usize = 5;
const KW_REF_IDX: usize = 6;

const INTERPOLATION_START: &str = "{{";
const INTERPOLATION_END: &str = "}}";

/// Parses markup text into classified [`TemplateNode`] trees.
#[derive(Debug)]
pub struct TemplateParser {
    parser: ml_parser::Parser,
    statements: Rc<StatementParser>,
}

impl TemplateParser {
    pub fn new(statements: Rc<StatementParser>) -> Self {
        TemplateParser {
            parser: ml_parser::Parser::new(),
            statements,
        }
    }

    pub fn parse(&self, content: &str) -> Result<TemplateNode> {
        let tree = self.parser.parse(content, "template");
        if !tree.errors.is_empty() {
            return Err(CompileError::Markup(tree.errors));
        }

        let mut root = TemplateNode::root();
        root.children = self.classify_children(&tree.root_nodes, None)?;
        Ok(root)
    }

    fn classify_children(
        &self,
        nodes: &[Node],
        namespace: Option<&str>,
    ) -> Result<Vec<TemplateNode>> {
        let mut children = Vec::new();
        for node in nodes {
            match node {
                Node::Element(element) => {
                    children.push(self.classify_element(element, namespace)?);
                }
                Node::Text(text) => {
                    // Whitespace-only text between elements carries no
                    // content and no bindings.
                    if text.value.trim().is_empty() {
                        continue;
                    }
                    let mut template = TemplateNode::new(TemplateNodeKind::Text, "");
                    template.contents = self.split_interpolation(&text.value)?;
                    children.push(template);
                }
                Node::Comment(comment) => {
                    let mut template = TemplateNode::new(TemplateNodeKind::Comment, "");
                    if let Some(value) = &comment.value {
                        template.contents = vec![ContentPart::Literal(value.clone())];
                    }
                    children.push(template);
                }
            }
        }
        Ok(children)
    }

    fn classify_element(
        &self,
        element: &ml_parser::Element,
        inherited_namespace: Option<&str>,
    ) -> Result<TemplateNode> {
        let mut node = TemplateNode::new(TemplateNodeKind::Tag, element.name.clone());

        let tag_def = get_tag_definition(&element.name);
        node.namespace = tag_def
            .implicit_namespace
            .map(str::to_string)
            .or_else(|| inherited_namespace.map(str::to_string));

        for attr in &element.attrs {
            self.classify_attribute(&mut node, &attr.name, &attr.value)?;
        }

        node.children = self.classify_children(&element.children, node.namespace.as_deref())?;
        Ok(node)
    }

    /// Classify one raw attribute into the node's binding category. Also
    /// used by selector-mode compilation for host-binding entries.
    pub fn classify_attribute(
        &self,
        node: &mut TemplateNode,
        name: &str,
        value: &str,
    ) -> Result<()> {
        if let Some(captures) = BINDING_NAME_REGEXP.captures(name) {
            if let Some(key) = captures.get(KW_TWO_WAY_IDX) {
                let info = self.statement(value, name)?;
                node.two_ways.insert(key.as_str().to_string(), info);
            } else if let Some(key) = captures.get(KW_INPUT_IDX) {
                self.classify_input(node, key.as_str(), value)?;
            } else if let Some(key) = captures.get(KW_OUTPUT_IDX) {
                let info = self.action(value, name)?;
                node.outputs.insert(key.as_str().to_string(), info);
            } else if let Some(key) = captures.get(KW_LOGIC_IDX) {
                let logic = self.parse_logic(key.as_str(), value, name)?;
                node.logics.insert(key.as_str().to_string(), logic);
            } else if let Some(key) = captures.get(KW_LET_IDX) {
                node.variables
                    .insert(key.as_str().to_string(), value.to_string());
            } else if let Some(key) = captures.get(KW_REF_IDX) {
                node.reference = Some(key.as_str().to_string());
            }
            return Ok(());
        }

        match name {
            "class" => {
                for class in value.split_whitespace() {
                    node.classes.insert(class.to_string());
                }
            }
            "style" => {
                for entry in value.split(';') {
                    if let Some((key, val)) = entry.split_once(':') {
                        node.styles
                            .insert(key.trim().to_string(), val.trim().to_string());
                    }
                }
            }
            _ => {
                node.attributes.insert(name.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    fn classify_input(&self, node: &mut TemplateNode, key: &str, value: &str) -> Result<()> {
        if key == "class" || key == "style" {
            let bindings = self.parse_map_binding(value, key)?;
            if key == "class" {
                node.class_bindings.extend(bindings);
            } else {
                node.style_bindings.extend(bindings);
            }
            return Ok(());
        }
        if let Some(entry) = key.strip_prefix("class.") {
            let info = self.statement(value, key)?;
            node.class_bindings.push(MapBinding::Entry {
                name: entry.to_string(),
                value: MapBindingValue::Statement(info),
            });
            return Ok(());
        }
        if let Some(entry) = key.strip_prefix("style.") {
            let info = self.statement(value, key)?;
            node.style_bindings.push(MapBinding::Entry {
                name: entry.to_string(),
                value: MapBindingValue::Statement(info),
            });
            return Ok(());
        }

        let info = self.statement(value, key)?;
        node.inputs.insert(key.to_string(), info);
        Ok(())
    }

    /// `[class]="expr"` / `[style]="expr"`: a literal map splits into
    /// per-entry bindings — computed keys become (key, value) 2-tuples so
    /// both sides are tracked — anything else is one whole-map binding.
    fn parse_map_binding(&self, value: &str, key: &str) -> Result<Vec<MapBinding>> {
        let info = self.statement(value, key)?;
        let map = info
            .ast
            .as_deref()
            .and_then(Ast::as_literal_map)
            .cloned();

        let map: LiteralMap = match map {
            Some(map) => map,
            None => return Ok(vec![MapBinding::Whole(info)]),
        };

        // Subexpression spans are relative to the map root (the wrapped
        // synthetic declaration shifts them), so slicing subtracts the
        // root's own start.
        let source = &info.statement;
        let base = map.source_span.start;

        let mut bindings = Vec::new();
        for (map_key, map_value) in map.keys.iter().zip(map.values.iter()) {
            let entry_value = self.map_entry_value(source, base, map_value, key)?;
            match map_key {
                LiteralMapKey::Ident { key: name } | LiteralMapKey::Quoted { key: name } => {
                    bindings.push(MapBinding::Entry {
                        name: name.clone(),
                        value: entry_value,
                    });
                }
                LiteralMapKey::Computed { key: computed } => {
                    let key_text = slice_span(source, base, computed);
                    let key_info = self.statement(&key_text, key)?;
                    bindings.push(MapBinding::Computed {
                        key: key_info,
                        value: entry_value,
                    });
                }
            }
        }
        Ok(bindings)
    }

    fn map_entry_value(
        &self,
        source: &str,
        base: usize,
        value: &Ast,
        key: &str,
    ) -> Result<MapBindingValue> {
        if let Ast::LiteralPrimitive(LiteralPrimitive::String { value, .. }) = value {
            return Ok(MapBindingValue::Literal(value.clone()));
        }
        let text = slice_span(source, base, value);
        Ok(MapBindingValue::Statement(self.statement(&text, key)?))
    }

    /// Parse a `*name="expr"` directive. Repetition syntax is
    /// `item in array`, `item, index in array`, or a bare array expression.
    fn parse_logic(&self, name: &str, value: &str, attr_name: &str) -> Result<LogicAttr> {
        let (statement_text, item_alias, index_alias) = match split_repeat_syntax(value) {
            Some((aliases, array)) => {
                let mut parts = aliases.split(',').map(str::trim);
                let item = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
                let index = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
                (array.to_string(), item, index)
            }
            None => (value.to_string(), None, None),
        };

        let statement = self.statement(&statement_text, attr_name)?;
        Ok(LogicAttr {
            name: name.to_string(),
            raw: value.to_string(),
            statement,
            item_alias,
            index_alias,
        })
    }

    /// Split `{{expr}}` interpolation into alternating literal / statement
    /// parts, merging adjacent literals.
    fn split_interpolation(&self, text: &str) -> Result<Vec<ContentPart>> {
        let mut parts: Vec<ContentPart> = Vec::new();
        let mut rest = text;
        let mut offset = 0;

        while let Some(start) = rest.find(INTERPOLATION_START) {
            if start > 0 {
                push_literal(&mut parts, &rest[..start]);
            }
            let after_open = &rest[start + INTERPOLATION_START.len()..];
            let end = after_open.find(INTERPOLATION_END).ok_or_else(|| {
                CompileError::statement(text, offset + start, "Unterminated interpolation")
            })?;
            let expr = &after_open[..end];
            let info = self
                .statements
                .parse(expr)
                .map_err(|e| e.in_binding("content", expr))?;
            parts.push(ContentPart::Statement(info));

            let consumed = start + INTERPOLATION_START.len() + end + INTERPOLATION_END.len();
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            push_literal(&mut parts, rest);
        }
        Ok(parts)
    }

    fn statement(&self, value: &str, key: &str) -> Result<StatementInfo> {
        self.statements
            .parse(value)
            .map_err(|e| e.in_binding(key, value))
    }

    fn action(&self, value: &str, key: &str) -> Result<StatementInfo> {
        self.statements
            .parse_action(value)
            .map_err(|e| e.in_binding(key, value))
    }
}

fn push_literal(parts: &mut Vec<ContentPart>, text: &str) {
    if let Some(ContentPart::Literal(last)) = parts.last_mut() {
        last.push_str(text);
        return;
    }
    parts.push(ContentPart::Literal(text.to_string()));
}

/// Extract the source text of a subexpression via its span, relative to the
/// span base of the enclosing root expression.
fn slice_span(source: &str, base: usize, ast: &Ast) -> String {
    let span = ast.source_span();
    let start = span.start.saturating_sub(base);
    let end = span.end.saturating_sub(base);
    source.get(start..end).unwrap_or("").trim().to_string()
}

/// Find the top-level ` in ` keyword of a repeat expression. Returns the
/// alias list and the array expression.
fn split_repeat_syntax(value: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let bytes = value.as_bytes();
    for i in 0..bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b' ' if depth == 0 => {
                if value[i..].starts_with(" in ") {
                    return Some((value[..i].trim(), value[i + 4..].trim()));
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> TemplateNode {
        let statements = Rc::new(StatementParser::default());
        TemplateParser::new(statements)
            .parse(content)
            .expect("should parse")
    }

    #[test]
    fn test_attribute_classification() {
        let root = parse(r#"<div id="a" [title]="t" (click)="go()" [(value)]="v" #mark></div>"#);
        let div = &root.children[0];
        assert_eq!(div.attributes.get("id"), Some(&"a".to_string()));
        assert!(div.inputs.contains_key("title"));
        assert!(div.outputs.contains_key("click"));
        assert!(div.two_ways.contains_key("value"));
        assert_eq!(div.reference.as_deref(), Some("mark"));
    }

    #[test]
    fn test_class_and_style_forms() {
        let root = parse(
            r#"<div class="a b" style="color: red" [class.on]="flag" [style.width]="w"></div>"#,
        );
        let div = &root.children[0];
        assert!(div.classes.contains("a"));
        assert!(div.classes.contains("b"));
        assert_eq!(div.styles.get("color"), Some(&"red".to_string()));
        assert!(matches!(&div.class_bindings[0], MapBinding::Entry { name, .. } if name == "on"));
        assert!(matches!(&div.style_bindings[0], MapBinding::Entry { name, .. } if name == "width"));
    }

    #[test]
    fn test_literal_map_splits_into_entries() {
        let root = parse(r#"<div [class]="{a: flag, [computed]: other}"></div>"#);
        let div = &root.children[0];
        assert_eq!(div.class_bindings.len(), 2);
        assert!(matches!(&div.class_bindings[0], MapBinding::Entry { name, .. } if name == "a"));
        assert!(matches!(&div.class_bindings[1], MapBinding::Computed { .. }));
    }

    #[test]
    fn test_whole_map_binding() {
        let root = parse(r#"<div [style]="styleMap"></div>"#);
        let div = &root.children[0];
        assert!(matches!(&div.style_bindings[0], MapBinding::Whole(_)));
    }

    #[test]
    fn test_repeat_aliases() {
        let root = parse(r#"<li *for="item, i in items"></li>"#);
        let li = &root.children[0];
        let logic = li.logics.get("for").expect("for logic");
        assert_eq!(logic.item_alias.as_deref(), Some("item"));
        assert_eq!(logic.index_alias.as_deref(), Some("i"));
        assert_eq!(logic.statement.statement, "items");
    }

    #[test]
    fn test_interpolation_split() {
        let root = parse("<div>a {{first}} b {{second}} c</div>");
        let div = &root.children[0];
        let text = &div.children[0];
        assert_eq!(text.contents.len(), 5);
        assert!(matches!(&text.contents[0], ContentPart::Literal(s) if s == "a "));
        assert!(matches!(&text.contents[1], ContentPart::Statement(_)));
    }

    #[test]
    fn test_unterminated_interpolation() {
        let statements = Rc::new(StatementParser::default());
        let err = TemplateParser::new(statements)
            .parse("<div>{{oops</div>")
            .unwrap_err();
        assert!(err.to_string().contains("Unterminated interpolation"));
    }

    #[test]
    fn test_svg_namespace_inheritance() {
        let root = parse(r#"<svg><g><circle r="1"/></g></svg>"#);
        let svg = &root.children[0];
        let g = &svg.children[0];
        let circle = &g.children[0];
        assert_eq!(svg.namespace.as_deref(), Some("svg"));
        assert_eq!(g.namespace.as_deref(), Some("svg"));
        assert_eq!(circle.namespace.as_deref(), Some("svg"));
    }

    #[test]
    fn test_structural_equality() {
        let a = parse("<div [title]=\"t\">{{value}}</div>");
        let b = parse("<div [title]=\"t\">{{value}}</div>");
        assert_eq!(a, b);
    }
}
