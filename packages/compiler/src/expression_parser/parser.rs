//! Expression Parser
//!
//! Recursive descent parser for template expressions. Binding position
//! rejects `;` chains and assignments; action position (event handlers)
//! accepts both.

use super::ast::*;
use super::lexer::{Lexer, Token, TokenType};
use crate::error::{CompileError, Result};

/// Parse flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFlags {
    None,
    Action,
}

/// Parser for template expressions
#[derive(Debug, Default)]
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new() -> Self {
        Parser { lexer: Lexer::new() }
    }

    /// Parse a binding expression (property binding, interpolation part).
    pub fn parse_binding(&self, input: &str, absolute_offset: usize) -> Result<Ast> {
        let tokens = self.lexer.tokenize(input);
        let mut parse = ParseAst::new(input, absolute_offset, tokens, ParseFlags::None);
        let ast = parse.parse_chain()?;
        parse.expect_done()?;
        Ok(ast)
    }

    /// Parse an action expression (event handler).
    pub fn parse_action(&self, input: &str, absolute_offset: usize) -> Result<Ast> {
        let tokens = self.lexer.tokenize(input);
        let mut parse = ParseAst::new(input, absolute_offset, tokens, ParseFlags::Action);
        let ast = parse.parse_chain()?;
        parse.expect_done()?;
        Ok(ast)
    }
}

/// Single-use parse state over a token stream.
struct ParseAst<'a> {
    input: &'a str,
    absolute_offset: usize,
    tokens: Vec<Token>,
    flags: ParseFlags,
    index: usize,
}

impl<'a> ParseAst<'a> {
    fn new(input: &'a str, absolute_offset: usize, tokens: Vec<Token>, flags: ParseFlags) -> Self {
        ParseAst {
            input,
            absolute_offset,
            tokens,
            flags,
            index: 0,
        }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    /// Offset in the input of the current token, or end of input.
    fn input_index(&self) -> usize {
        self.current()
            .map(|t| t.index)
            .unwrap_or_else(|| self.input.len())
    }

    fn span(&self, start: usize) -> ParseSpan {
        let end = self
            .tokens
            .get(self.index.saturating_sub(1))
            .map(|t| t.end)
            .unwrap_or_else(|| self.input.len());
        ParseSpan::new(start, end.max(start))
    }

    fn source_span(&self, start: usize) -> AbsoluteSpan {
        self.span(start).to_absolute(self.absolute_offset)
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::statement(self.input, self.input_index(), message)
    }

    fn expect_done(&self) -> Result<()> {
        if let Some(token) = self.current() {
            return Err(self.error(format!("Unexpected token '{}'", describe_token(token))));
        }
        Ok(())
    }

    fn consume_optional_character(&mut self, code: char) -> bool {
        if let Some(token) = self.current() {
            if token.is_character(code) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume_optional_operator(&mut self, op: &str) -> bool {
        if let Some(token) = self.current() {
            if token.is_operator(op) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn expect_character(&mut self, code: char) -> Result<()> {
        if self.consume_optional_character(code) {
            Ok(())
        } else {
            Err(self.error(format!("Expected character '{}'", code)))
        }
    }

    fn expect_identifier_or_keyword(&mut self) -> Result<String> {
        match self.current() {
            Some(token)
                if token.token_type == TokenType::Identifier
                    || token.token_type == TokenType::Keyword =>
            {
                let name = token.str_value.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("Expected identifier")),
        }
    }

    /// Parse a `;`-separated chain. Non-action positions reject chains.
    fn parse_chain(&mut self) -> Result<Ast> {
        let start = self.input_index();
        if self.tokens.is_empty() {
            return Ok(Ast::Empty(Empty {
                span: ParseSpan::new(0, 0),
                source_span: AbsoluteSpan::new(self.absolute_offset, self.absolute_offset),
            }));
        }

        let mut expressions = vec![self.parse_assignment()?];
        while self.consume_optional_character(';') {
            if self.index >= self.tokens.len() {
                break;
            }
            expressions.push(self.parse_assignment()?);
        }

        if expressions.len() == 1 {
            Ok(expressions.into_iter().next().expect("one expression"))
        } else {
            if self.flags != ParseFlags::Action {
                return Err(self.error("Bindings cannot contain chained expressions"));
            }
            Ok(Ast::Chain(Chain {
                span: self.span(start),
                source_span: self.source_span(start),
                expressions: expressions.into_iter().map(Box::new).collect(),
            }))
        }
    }

    /// Parse assignment (`a = b`). Only property/keyed reads are assignable,
    /// and only in action position.
    fn parse_assignment(&mut self) -> Result<Ast> {
        let start = self.input_index();
        let left = self.parse_conditional()?;

        if self.consume_optional_operator("=") {
            if self.flags != ParseFlags::Action {
                return Err(self.error("Bindings cannot contain assignments"));
            }
            let value = Box::new(self.parse_assignment()?);
            return match left {
                Ast::PropertyRead(read) => Ok(Ast::PropertyWrite(PropertyWrite {
                    span: self.span(start),
                    source_span: self.source_span(start),
                    receiver: read.receiver,
                    name: read.name,
                    value,
                })),
                Ast::KeyedRead(read) => Ok(Ast::KeyedWrite(KeyedWrite {
                    span: self.span(start),
                    source_span: self.source_span(start),
                    receiver: read.receiver,
                    key: read.key,
                    value,
                })),
                _ => Err(self.error("Expression is not assignable")),
            };
        }

        Ok(left)
    }

    /// Parse ternary conditional (`a ? b : c`), right-associative.
    fn parse_conditional(&mut self) -> Result<Ast> {
        let start = self.input_index();
        let result = self.parse_nullish_coalescing()?;

        if self.consume_optional_operator("?") {
            let true_exp = self.parse_conditional()?;
            self.expect_character(':')?;
            let false_exp = self.parse_conditional()?;
            return Ok(Ast::Conditional(Conditional {
                span: self.span(start),
                source_span: self.source_span(start),
                condition: Box::new(result),
                true_exp: Box::new(true_exp),
                false_exp: Box::new(false_exp),
            }));
        }

        Ok(result)
    }

    fn parse_binary_level(
        &mut self,
        operators: &[&str],
        next: fn(&mut Self) -> Result<Ast>,
    ) -> Result<Ast> {
        let start = self.input_index();
        let mut result = next(self)?;

        loop {
            let matched = self.current().and_then(|token| {
                operators
                    .iter()
                    .find(|op| token.is_operator(op) || token.is_keyword(op))
                    .map(|op| op.to_string())
            });
            match matched {
                Some(operation) => {
                    self.advance();
                    let right = next(self)?;
                    result = Ast::Binary(Binary {
                        span: self.span(start),
                        source_span: self.source_span(start),
                        operation,
                        left: Box::new(result),
                        right: Box::new(right),
                    });
                }
                None => break,
            }
        }

        Ok(result)
    }

    fn parse_nullish_coalescing(&mut self) -> Result<Ast> {
        self.parse_binary_level(&["??"], Self::parse_logical_or)
    }

    fn parse_logical_or(&mut self) -> Result<Ast> {
        self.parse_binary_level(&["||"], Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> Result<Ast> {
        self.parse_binary_level(&["&&"], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<Ast> {
        self.parse_binary_level(&["===", "!==", "==", "!="], Self::parse_relational)
    }

    fn parse_relational(&mut self) -> Result<Ast> {
        self.parse_binary_level(&["<=", ">=", "<", ">", "in"], Self::parse_additive)
    }

    fn parse_additive(&mut self) -> Result<Ast> {
        self.parse_binary_level(&["+", "-"], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<Ast> {
        self.parse_binary_level(&["*", "/", "%"], Self::parse_prefix)
    }

    /// Parse prefix operators (`!`, unary `+`/`-`)
    fn parse_prefix(&mut self) -> Result<Ast> {
        let start = self.input_index();

        if self.consume_optional_operator("!") {
            let expr = self.parse_prefix()?;
            return Ok(Ast::PrefixNot(PrefixNot {
                span: self.span(start),
                source_span: self.source_span(start),
                expression: Box::new(expr),
            }));
        }
        for op in ["+", "-"] {
            if self.consume_optional_operator(op) {
                let expr = self.parse_prefix()?;
                return Ok(Ast::Unary(Unary {
                    span: self.span(start),
                    source_span: self.source_span(start),
                    operator: op.to_string(),
                    expr: Box::new(expr),
                }));
            }
        }

        self.parse_call_chain()
    }

    /// Parse member access, keyed access and calls left-to-right.
    fn parse_call_chain(&mut self) -> Result<Ast> {
        let start = self.input_index();
        let mut result = self.parse_primary()?;

        loop {
            if self.consume_optional_character('.') {
                let name = self.expect_identifier_or_keyword()?;
                result = Ast::PropertyRead(PropertyRead {
                    span: self.span(start),
                    source_span: self.source_span(start),
                    receiver: Box::new(result),
                    name,
                });
            } else if self.consume_optional_operator("?.") {
                if self.consume_optional_character('[') {
                    let key = self.parse_assignment()?;
                    self.expect_character(']')?;
                    result = Ast::SafeKeyedRead(SafeKeyedRead {
                        span: self.span(start),
                        source_span: self.source_span(start),
                        receiver: Box::new(result),
                        key: Box::new(key),
                    });
                } else if self.consume_optional_character('(') {
                    let args = self.parse_call_arguments()?;
                    result = Ast::SafeCall(SafeCall {
                        span: self.span(start),
                        source_span: self.source_span(start),
                        receiver: Box::new(result),
                        args,
                    });
                } else {
                    let name = self.expect_identifier_or_keyword()?;
                    result = Ast::SafePropertyRead(SafePropertyRead {
                        span: self.span(start),
                        source_span: self.source_span(start),
                        receiver: Box::new(result),
                        name,
                    });
                }
            } else if self.consume_optional_character('[') {
                let key = self.parse_assignment()?;
                self.expect_character(']')?;
                result = Ast::KeyedRead(KeyedRead {
                    span: self.span(start),
                    source_span: self.source_span(start),
                    receiver: Box::new(result),
                    key: Box::new(key),
                });
            } else if self.consume_optional_character('(') {
                let args = self.parse_call_arguments()?;
                result = Ast::Call(Call {
                    span: self.span(start),
                    source_span: self.source_span(start),
                    receiver: Box::new(result),
                    args,
                });
            } else {
                return Ok(result);
            }
        }
    }

    fn parse_call_arguments(&mut self) -> Result<Vec<Box<Ast>>> {
        let mut args = Vec::new();
        if self.consume_optional_character(')') {
            return Ok(args);
        }
        loop {
            args.push(Box::new(self.parse_assignment()?));
            if !self.consume_optional_character(',') {
                break;
            }
        }
        self.expect_character(')')?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Ast> {
        let start = self.input_index();

        if self.consume_optional_character('(') {
            let result = self.parse_chain()?;
            self.expect_character(')')?;
            return Ok(result);
        }
        if self.consume_optional_character('[') {
            return self.parse_literal_array(start);
        }
        if self.consume_optional_character('{') {
            return self.parse_literal_map(start);
        }

        let token = match self.current() {
            Some(token) => token.clone(),
            None => return Err(self.error("Unexpected end of expression")),
        };

        match token.token_type {
            TokenType::Keyword => {
                self.advance();
                let span = self.span(start);
                let source_span = self.source_span(start);
                match token.str_value.as_str() {
                    "this" => Ok(Ast::ThisReceiver(ThisReceiver { span, source_span })),
                    "true" => Ok(Ast::LiteralPrimitive(LiteralPrimitive::Boolean {
                        span,
                        source_span,
                        value: true,
                    })),
                    "false" => Ok(Ast::LiteralPrimitive(LiteralPrimitive::Boolean {
                        span,
                        source_span,
                        value: false,
                    })),
                    "null" => Ok(Ast::LiteralPrimitive(LiteralPrimitive::Null {
                        span,
                        source_span,
                    })),
                    "undefined" => Ok(Ast::LiteralPrimitive(LiteralPrimitive::Undefined {
                        span,
                        source_span,
                    })),
                    other => Err(self.error(format!("Unexpected keyword '{}'", other))),
                }
            }
            TokenType::Identifier => {
                self.advance();
                let span = self.span(start);
                let source_span = self.source_span(start);
                Ok(Ast::PropertyRead(PropertyRead {
                    span,
                    source_span,
                    receiver: Box::new(Ast::ImplicitReceiver(ImplicitReceiver {
                        span,
                        source_span,
                    })),
                    name: token.str_value,
                }))
            }
            TokenType::Number => {
                self.advance();
                Ok(Ast::LiteralPrimitive(LiteralPrimitive::Number {
                    span: self.span(start),
                    source_span: self.source_span(start),
                    value: token.num_value,
                }))
            }
            TokenType::String => {
                self.advance();
                Ok(Ast::LiteralPrimitive(LiteralPrimitive::String {
                    span: self.span(start),
                    source_span: self.source_span(start),
                    value: token.str_value,
                }))
            }
            TokenType::Error => Err(self.error(token.str_value)),
            _ => Err(self.error(format!("Unexpected token '{}'", describe_token(&token)))),
        }
    }

    fn parse_literal_array(&mut self, start: usize) -> Result<Ast> {
        let mut expressions = Vec::new();
        if !self.consume_optional_character(']') {
            loop {
                expressions.push(Box::new(self.parse_assignment()?));
                if !self.consume_optional_character(',') {
                    break;
                }
            }
            self.expect_character(']')?;
        }
        Ok(Ast::LiteralArray(LiteralArray {
            span: self.span(start),
            source_span: self.source_span(start),
            expressions,
        }))
    }

    fn parse_literal_map(&mut self, start: usize) -> Result<Ast> {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        if !self.consume_optional_character('}') {
            loop {
                let key = self.parse_map_key()?;
                self.expect_character(':')?;
                let value = self.parse_assignment()?;
                keys.push(key);
                values.push(Box::new(value));
                if !self.consume_optional_character(',') {
                    break;
                }
            }
            self.expect_character('}')?;
        }
        Ok(Ast::LiteralMap(LiteralMap {
            span: self.span(start),
            source_span: self.source_span(start),
            keys,
            values,
        }))
    }

    fn parse_map_key(&mut self) -> Result<LiteralMapKey> {
        if self.consume_optional_character('[') {
            let key = self.parse_assignment()?;
            self.expect_character(']')?;
            return Ok(LiteralMapKey::Computed { key: Box::new(key) });
        }
        match self.current() {
            Some(token) if token.is_string() => {
                let key = token.str_value.clone();
                self.advance();
                Ok(LiteralMapKey::Quoted { key })
            }
            Some(token)
                if token.token_type == TokenType::Identifier
                    || token.token_type == TokenType::Keyword =>
            {
                let key = token.str_value.clone();
                self.advance();
                Ok(LiteralMapKey::Ident { key })
            }
            _ => Err(self.error("Expected map key")),
        }
    }
}

fn describe_token(token: &Token) -> String {
    match token.token_type {
        TokenType::Number => token.num_value.to_string(),
        _ => token.str_value.clone(),
    }
}
