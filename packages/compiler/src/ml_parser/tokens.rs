//! Markup tokens.

use crate::parse_util::ParseSourceSpan;

/// Token types for markup parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenType {
    TagOpenStart,
    AttrName,
    AttrValue,
    TagOpenEnd,
    TagOpenEndVoid,
    TagClose,
    Text,
    Comment,
    Eof,
}

/// Token with its raw parts and span
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub parts: Vec<String>,
    pub source_span: ParseSourceSpan,
}

impl Token {
    pub fn new(token_type: TokenType, parts: Vec<String>, source_span: ParseSourceSpan) -> Self {
        Token {
            token_type,
            parts,
            source_span,
        }
    }

    pub fn part(&self, index: usize) -> &str {
        self.parts.get(index).map(String::as_str).unwrap_or("")
    }
}
