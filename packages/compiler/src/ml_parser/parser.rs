//! Markup parser.
//!
//! Converts the token stream into the raw markup AST. Maintains an
//! open-element stack; mismatched or unclosed non-void tags are fatal
//! parse errors.

use crate::parse_util::{ParseError, ParseSourceSpan};

use super::ast::{Attribute, Comment, Element, Node, Text};
use super::lexer::tokenize;
use super::tags::get_tag_definition;
use super::tokens::{Token, TokenType};

/// Parse tree result
#[derive(Debug)]
pub struct ParseTreeResult {
    pub root_nodes: Vec<Node>,
    pub errors: Vec<ParseError>,
}

/// Markup parser
#[derive(Debug, Default)]
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Parser
    }

    pub fn parse(&self, source: &str, url: &str) -> ParseTreeResult {
        let tokenized = tokenize(source, url);
        let mut builder = TreeBuilder::new(tokenized.tokens);
        builder.build();

        let mut errors = tokenized.errors;
        errors.extend(builder.errors);
        ParseTreeResult {
            root_nodes: builder.root_nodes,
            errors,
        }
    }
}

struct OpenElement {
    element: Element,
}

struct TreeBuilder {
    tokens: Vec<Token>,
    index: usize,
    stack: Vec<OpenElement>,
    root_nodes: Vec<Node>,
    errors: Vec<ParseError>,
}

impl TreeBuilder {
    fn new(tokens: Vec<Token>) -> Self {
        TreeBuilder {
            tokens,
            index: 0,
            stack: Vec::new(),
            root_nodes: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn build(&mut self) {
        while let Some(token) = self.current().cloned() {
            self.index += 1;
            match token.token_type {
                TokenType::TagOpenStart => self.consume_element(token),
                TokenType::TagClose => self.consume_tag_close(token),
                TokenType::Text => self.append_text(token),
                TokenType::Comment => {
                    let comment = Comment::new(Some(token.part(0).to_string()), token.source_span);
                    self.append(Node::Comment(comment));
                }
                TokenType::Eof => {
                    if let Some(open) = self.stack.last() {
                        let span = open.element.source_span.clone();
                        self.errors.push(ParseError::new(
                            span,
                            format!("Unclosed tag <{}>", open.element.name),
                        ));
                    }
                    return;
                }
                other => {
                    self.errors.push(ParseError::new(
                        token.source_span,
                        format!("Unexpected token {:?}", other),
                    ));
                }
            }
        }
    }

    fn consume_element(&mut self, open_token: Token) {
        let name = open_token.part(0).to_string();
        let mut attrs = Vec::new();

        let mut closed_void = false;
        loop {
            match self.current().cloned() {
                Some(token) if token.token_type == TokenType::AttrName => {
                    self.index += 1;
                    attrs.push(self.consume_attribute(token));
                }
                Some(token) if token.token_type == TokenType::TagOpenEnd => {
                    self.index += 1;
                    break;
                }
                Some(token) if token.token_type == TokenType::TagOpenEndVoid => {
                    self.index += 1;
                    closed_void = true;
                    break;
                }
                _ => {
                    self.errors.push(ParseError::new(
                        open_token.source_span.clone(),
                        format!("Unterminated tag <{}>", name),
                    ));
                    return;
                }
            }
        }

        let tag_def = get_tag_definition(&name);
        let element = Element {
            name,
            attrs,
            children: Vec::new(),
            is_self_closing: closed_void,
            source_span: open_token.source_span,
        };

        if closed_void || tag_def.is_void {
            self.append(Node::Element(element));
        } else {
            self.stack.push(OpenElement { element });
        }
    }

    fn consume_attribute(&mut self, name_token: Token) -> Attribute {
        let name = name_token.part(0).to_string();
        let mut value = String::new();
        let mut span: ParseSourceSpan = name_token.source_span;
        if let Some(token) = self.current() {
            if token.token_type == TokenType::AttrValue {
                value = token.part(0).to_string();
                span.end = token.source_span.end.clone();
                self.index += 1;
            }
        }
        Attribute::new(name, value, span)
    }

    fn consume_tag_close(&mut self, token: Token) {
        let name = token.part(0).to_string();
        match self.stack.pop() {
            Some(open) if open.element.name == name => {
                self.append(Node::Element(open.element));
            }
            Some(open) => {
                self.errors.push(ParseError::new(
                    token.source_span,
                    format!(
                        "Unexpected closing tag </{}>, expected </{}>",
                        name, open.element.name
                    ),
                ));
            }
            None => {
                self.errors.push(ParseError::new(
                    token.source_span,
                    format!("Unexpected closing tag </{}>", name),
                ));
            }
        }
    }

    fn append_text(&mut self, token: Token) {
        let value = token.part(0).to_string();
        let children = self.children_mut();
        // Merge adjacent text nodes.
        if let Some(Node::Text(last)) = children.last_mut() {
            last.value.push_str(&value);
            last.source_span.end = token.source_span.end;
            return;
        }
        self.append(Node::Text(Text::new(value, token.source_span)));
    }

    fn children_mut(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(open) => &mut open.element.children,
            None => &mut self.root_nodes,
        }
    }

    fn append(&mut self, node: Node) {
        self.children_mut().push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParseTreeResult {
        Parser::new().parse(source, "test.html")
    }

    #[test]
    fn test_nested_elements() {
        let result = parse("<div><span>a</span>b</div>");
        assert!(result.errors.is_empty());
        assert_eq!(result.root_nodes.len(), 1);
        match &result.root_nodes[0] {
            Node::Element(div) => {
                assert_eq!(div.name, "div");
                assert_eq!(div.children.len(), 2);
            }
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_void_tag_takes_no_children() {
        let result = parse("<div><br>text</div>");
        assert!(result.errors.is_empty());
        match &result.root_nodes[0] {
            Node::Element(div) => {
                assert_eq!(div.children.len(), 2);
                assert!(matches!(&div.children[0], Node::Element(e) if e.name == "br"));
                assert!(matches!(&div.children[1], Node::Text(t) if t.value == "text"));
            }
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_close_is_error() {
        let result = parse("<div><span></div>");
        assert!(!result.errors.is_empty());
        assert!(result.errors[0].msg.contains("</div>"));
    }

    #[test]
    fn test_unclosed_tag_is_error() {
        let result = parse("<div>");
        assert!(!result.errors.is_empty());
        assert!(result.errors[0].msg.contains("Unclosed tag <div>"));
    }

    #[test]
    fn test_self_closing() {
        let result = parse("<svg><circle r=\"5\"/></svg>");
        assert!(result.errors.is_empty());
    }
}
