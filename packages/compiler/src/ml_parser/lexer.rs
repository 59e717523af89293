//! Markup lexer.
//!
//! Single-pass tokenizer over the template text. Decodes character entities
//! in text and attribute values; structural errors (unterminated tags or
//! comments) are reported with their span.

use crate::chars;
use crate::parse_util::{span_of, ParseError, ParseSourceSpan};

use super::tokens::{Token, TokenType};

#[derive(Debug)]
pub struct TokenizeResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<ParseError>,
}

pub fn tokenize(source: &str, url: &str) -> TokenizeResult {
    let mut lexer = MarkupLexer::new(source, url);
    lexer.run();
    TokenizeResult {
        tokens: lexer.tokens,
        errors: lexer.errors,
    }
}

struct MarkupLexer<'a> {
    source: &'a str,
    url: &'a str,
    chars: Vec<char>,
    index: usize,
    tokens: Vec<Token>,
    errors: Vec<ParseError>,
}

impl<'a> MarkupLexer<'a> {
    fn new(source: &'a str, url: &'a str) -> Self {
        MarkupLexer {
            source,
            url,
            chars: source.chars().collect(),
            index: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> char {
        *self.chars.get(self.index + offset).unwrap_or(&chars::EOF)
    }

    fn at_end(&self) -> bool {
        self.index >= self.chars.len()
    }

    fn span(&self, start: usize) -> ParseSourceSpan {
        span_of(self.source, self.url, start, self.index)
    }

    fn emit(&mut self, token_type: TokenType, parts: Vec<String>, start: usize) {
        let span = self.span(start);
        self.tokens.push(Token::new(token_type, parts, span));
    }

    fn error(&mut self, start: usize, msg: impl Into<String>) {
        let span = self.span(start);
        self.errors.push(ParseError::new(span, msg.into()));
    }

    fn run(&mut self) {
        while !self.at_end() {
            if self.peek(0) == chars::LT {
                if self.peek(1) == chars::BANG && self.peek(2) == chars::MINUS {
                    self.consume_comment();
                } else if self.peek(1) == chars::SLASH {
                    self.consume_tag_close();
                } else if chars::is_ascii_letter(self.peek(1)) {
                    self.consume_tag_open();
                } else {
                    // A lone `<` is text.
                    self.consume_text();
                }
            } else {
                self.consume_text();
            }
        }
        let end = self.chars.len();
        self.emit(TokenType::Eof, Vec::new(), end);
    }

    fn consume_text(&mut self) {
        let start = self.index;
        let mut buffer = String::new();
        while !self.at_end() {
            let ch = self.peek(0);
            // Stop only where run() would dispatch to a tag or comment, so
            // a stray `<` stays text and the loop always makes progress.
            if ch == chars::LT
                && self.index > start
                && (chars::is_ascii_letter(self.peek(1))
                    || self.peek(1) == chars::SLASH
                    || (self.peek(1) == chars::BANG && self.peek(2) == chars::MINUS))
            {
                break;
            }
            if ch == chars::AMPERSAND {
                buffer.push_str(&self.consume_entity());
            } else {
                buffer.push(ch);
                self.index += 1;
            }
        }
        if self.index > start {
            self.emit(TokenType::Text, vec![buffer], start);
        }
    }

    fn consume_entity(&mut self) -> String {
        let start = self.index;
        self.index += 1; // &
        let mut name = String::new();
        while !self.at_end() && self.peek(0) != chars::SEMICOLON && name.len() < 10 {
            name.push(self.peek(0));
            self.index += 1;
        }
        if self.peek(0) != chars::SEMICOLON {
            // Not an entity after all; emit the raw text.
            self.index = start + 1;
            return "&".to_string();
        }
        self.index += 1; // ;
        decode_entity(&name).unwrap_or_else(|| {
            let raw: String = self.chars[start..self.index].iter().collect();
            raw
        })
    }

    fn consume_comment(&mut self) {
        let start = self.index;
        if self.peek(3) != chars::MINUS {
            self.error(start, "Incomplete comment open");
            self.index += 2;
            return;
        }
        self.index += 4; // <!--
        let value_start = self.index;
        loop {
            if self.at_end() {
                self.error(start, "Unterminated comment");
                return;
            }
            if self.peek(0) == chars::MINUS && self.peek(1) == chars::MINUS && self.peek(2) == chars::GT {
                break;
            }
            self.index += 1;
        }
        let value: String = self.chars[value_start..self.index].iter().collect();
        self.index += 3; // -->
        self.emit(TokenType::Comment, vec![value], start);
    }

    fn consume_name(&mut self) -> String {
        let start = self.index;
        while !self.at_end() && chars::is_name_part(self.peek(0)) {
            self.index += 1;
        }
        self.chars[start..self.index].iter().collect()
    }

    /// Attribute names additionally allow binding sigils: `[x]`, `(x)`,
    /// `[(x)]`, `*x`, `#x`, `let-x`, `[class.foo]`, `[attr]`.
    fn consume_attr_name(&mut self) -> String {
        let start = self.index;
        while !self.at_end() {
            let ch = self.peek(0);
            if chars::is_name_part(ch)
                || ch == chars::LBRACKET
                || ch == chars::RBRACKET
                || ch == chars::LPAREN
                || ch == chars::RPAREN
                || ch == chars::STAR
                || ch == chars::HASH
            {
                self.index += 1;
            } else {
                break;
            }
        }
        self.chars[start..self.index].iter().collect()
    }

    fn skip_whitespace(&mut self) {
        while !self.at_end() && chars::is_whitespace(self.peek(0)) {
            self.index += 1;
        }
    }

    fn consume_tag_open(&mut self) {
        let start = self.index;
        self.index += 1; // <
        let name = self.consume_name();
        self.emit(TokenType::TagOpenStart, vec![name], start);

        loop {
            self.skip_whitespace();
            if self.at_end() {
                self.error(start, "Unterminated tag open");
                return;
            }
            let ch = self.peek(0);
            if ch == chars::SLASH && self.peek(1) == chars::GT {
                let end_start = self.index;
                self.index += 2;
                self.emit(TokenType::TagOpenEndVoid, Vec::new(), end_start);
                return;
            }
            if ch == chars::GT {
                let end_start = self.index;
                self.index += 1;
                self.emit(TokenType::TagOpenEnd, Vec::new(), end_start);
                return;
            }
            self.consume_attribute();
        }
    }

    fn consume_attribute(&mut self) {
        let start = self.index;
        let name = self.consume_attr_name();
        if name.is_empty() {
            self.error(start, format!("Unexpected character [{}]", self.peek(0)));
            self.index += 1;
            return;
        }
        self.emit(TokenType::AttrName, vec![name], start);

        self.skip_whitespace();
        if self.peek(0) != chars::EQ {
            return; // Bare attribute.
        }
        self.index += 1; // =
        self.skip_whitespace();

        let value_start = self.index;
        let mut buffer = String::new();
        if chars::is_quote(self.peek(0)) {
            let quote = self.peek(0);
            self.index += 1;
            loop {
                if self.at_end() {
                    self.error(value_start, "Unterminated attribute value");
                    return;
                }
                let ch = self.peek(0);
                if ch == quote {
                    self.index += 1;
                    break;
                }
                if ch == chars::AMPERSAND {
                    buffer.push_str(&self.consume_entity());
                } else {
                    buffer.push(ch);
                    self.index += 1;
                }
            }
        } else {
            while !self.at_end() {
                let ch = self.peek(0);
                if chars::is_whitespace(ch) || ch == chars::GT || ch == chars::SLASH {
                    break;
                }
                buffer.push(ch);
                self.index += 1;
            }
        }
        self.emit(TokenType::AttrValue, vec![buffer], value_start);
    }

    fn consume_tag_close(&mut self) {
        let start = self.index;
        self.index += 2; // </
        let name = self.consume_name();
        self.skip_whitespace();
        if self.peek(0) == chars::GT {
            self.index += 1;
            self.emit(TokenType::TagClose, vec![name], start);
        } else {
            self.error(start, format!("Unterminated closing tag </{}>", name));
            while !self.at_end() && self.peek(0) != chars::GT {
                self.index += 1;
            }
            if !self.at_end() {
                self.index += 1;
            }
        }
    }
}

fn decode_entity(name: &str) -> Option<String> {
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{00A0}",
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok()?
            } else {
                return None;
            };
            return char::from_u32(code).map(|c| c.to_string());
        }
    };
    Some(decoded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_types(source: &str) -> Vec<TokenType> {
        tokenize(source, "test.html")
            .tokens
            .iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_simple_tag() {
        assert_eq!(
            token_types("<div>x</div>"),
            vec![
                TokenType::TagOpenStart,
                TokenType::TagOpenEnd,
                TokenType::Text,
                TokenType::TagClose,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_binding_attr_names() {
        let result = tokenize("<div [title]=\"a\" (click)=\"b\" *if=\"c\" #marker></div>", "t");
        let names: Vec<&str> = result
            .tokens
            .iter()
            .filter(|t| t.token_type == TokenType::AttrName)
            .map(|t| t.part(0))
            .collect();
        assert_eq!(names, vec!["[title]", "(click)", "*if", "#marker"]);
    }

    #[test]
    fn test_entity_decoding() {
        let result = tokenize("<p>a &amp; b &#x41;</p>", "t");
        let text = result
            .tokens
            .iter()
            .find(|t| t.token_type == TokenType::Text)
            .expect("text token");
        assert_eq!(text.part(0), "a & b A");
    }

    #[test]
    fn test_unterminated_comment_reports_error() {
        let result = tokenize("<!-- never closed", "t");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].msg.contains("Unterminated comment"));
    }
}
