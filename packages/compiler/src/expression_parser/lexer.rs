//! Expression Lexer
//!
//! Tokenizes template expressions into tokens for the recursive-descent
//! parser.

use serde::{Deserialize, Serialize};

use crate::chars;

/// Token types in template expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TokenType {
    Character = 0,
    Identifier = 1,
    Keyword = 2,
    String = 3,
    Operator = 4,
    Number = 5,
    Error = 6,
}

const KEYWORDS: &[&str] = &["this", "true", "false", "null", "undefined", "in"];

/// Token representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub index: usize,
    pub end: usize,
    pub token_type: TokenType,
    pub num_value: f64,
    pub str_value: String,
}

impl Token {
    pub fn new(
        index: usize,
        end: usize,
        token_type: TokenType,
        num_value: f64,
        str_value: String,
    ) -> Self {
        Token {
            index,
            end,
            token_type,
            num_value,
            str_value,
        }
    }

    pub fn is_character(&self, code: char) -> bool {
        self.token_type == TokenType::Character && self.str_value.chars().next() == Some(code)
    }

    pub fn is_number(&self) -> bool {
        self.token_type == TokenType::Number
    }

    pub fn is_string(&self) -> bool {
        self.token_type == TokenType::String
    }

    pub fn is_identifier(&self) -> bool {
        self.token_type == TokenType::Identifier
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.token_type == TokenType::Keyword && self.str_value == keyword
    }

    pub fn is_operator(&self, operator: &str) -> bool {
        self.token_type == TokenType::Operator && self.str_value == operator
    }

    pub fn is_error(&self) -> bool {
        self.token_type == TokenType::Error
    }
}

pub fn new_character_token(index: usize, end: usize, code: char) -> Token {
    Token::new(
        index,
        end,
        TokenType::Character,
        code as u32 as f64,
        code.to_string(),
    )
}

pub fn new_identifier_token(index: usize, end: usize, text: String) -> Token {
    Token::new(index, end, TokenType::Identifier, 0.0, text)
}

pub fn new_keyword_token(index: usize, end: usize, text: String) -> Token {
    Token::new(index, end, TokenType::Keyword, 0.0, text)
}

pub fn new_operator_token(index: usize, end: usize, text: String) -> Token {
    Token::new(index, end, TokenType::Operator, 0.0, text)
}

pub fn new_string_token(index: usize, end: usize, text: String) -> Token {
    Token::new(index, end, TokenType::String, 0.0, text)
}

pub fn new_number_token(index: usize, end: usize, n: f64) -> Token {
    Token::new(index, end, TokenType::Number, n, String::new())
}

pub fn new_error_token(index: usize, end: usize, message: String) -> Token {
    Token::new(index, end, TokenType::Error, 0.0, message)
}

/// Lexer for template expressions
#[derive(Debug, Default)]
pub struct Lexer;

impl Lexer {
    pub fn new() -> Self {
        Lexer
    }

    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut scanner = Scanner::new(text);
        let mut tokens = Vec::new();
        while let Some(token) = scanner.scan_token() {
            tokens.push(token);
        }
        tokens
    }
}

struct Scanner<'a> {
    input: &'a str,
    chars: Vec<char>,
    index: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Scanner {
            input,
            chars: input.chars().collect(),
            index: 0,
        }
    }

    fn peek(&self, offset: usize) -> char {
        *self.chars.get(self.index + offset).unwrap_or(&chars::EOF)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn scan_token(&mut self) -> Option<Token> {
        while self.index < self.chars.len() && chars::is_whitespace(self.peek(0)) {
            self.advance();
        }
        if self.index >= self.chars.len() {
            return None;
        }

        let start = self.index;
        let ch = self.peek(0);

        if chars::is_identifier_start(ch) {
            return Some(self.scan_identifier(start));
        }
        if chars::is_digit(ch) || (ch == chars::PERIOD && chars::is_digit(self.peek(1))) {
            return Some(self.scan_number(start));
        }
        if chars::is_quote(ch) {
            return Some(self.scan_string(start));
        }

        match ch {
            '.' | '(' | ')' | '[' | ']' | '{' | '}' | ',' | ':' | ';' => {
                self.advance();
                Some(new_character_token(start, self.index, ch))
            }
            '?' => {
                self.advance();
                match self.peek(0) {
                    '.' => {
                        self.advance();
                        Some(new_operator_token(start, self.index, "?.".to_string()))
                    }
                    '?' => {
                        self.advance();
                        Some(new_operator_token(start, self.index, "??".to_string()))
                    }
                    _ => Some(new_operator_token(start, self.index, "?".to_string())),
                }
            }
            '+' | '-' | '*' | '/' | '%' => {
                self.advance();
                Some(new_operator_token(start, self.index, ch.to_string()))
            }
            '=' | '!' => {
                self.advance();
                let mut op = ch.to_string();
                if self.peek(0) == '=' {
                    self.advance();
                    op.push('=');
                    if self.peek(0) == '=' {
                        self.advance();
                        op.push('=');
                    }
                }
                Some(new_operator_token(start, self.index, op))
            }
            '<' | '>' => {
                self.advance();
                let mut op = ch.to_string();
                if self.peek(0) == '=' {
                    self.advance();
                    op.push('=');
                }
                Some(new_operator_token(start, self.index, op))
            }
            '&' | '|' => {
                self.advance();
                if self.peek(0) == ch {
                    self.advance();
                    let mut op = ch.to_string();
                    op.push(ch);
                    Some(new_operator_token(start, self.index, op))
                } else {
                    Some(new_error_token(
                        start,
                        self.index,
                        format!("Unexpected character [{}]", ch),
                    ))
                }
            }
            _ => {
                self.advance();
                Some(new_error_token(
                    start,
                    self.index,
                    format!("Unexpected character [{}]", ch),
                ))
            }
        }
    }

    fn scan_identifier(&mut self, start: usize) -> Token {
        while self.index < self.chars.len() && chars::is_identifier_part(self.peek(0)) {
            self.advance();
        }
        let text: String = self.chars[start..self.index].iter().collect();
        if KEYWORDS.contains(&text.as_str()) {
            new_keyword_token(start, self.index, text)
        } else {
            new_identifier_token(start, self.index, text)
        }
    }

    fn scan_number(&mut self, start: usize) -> Token {
        let mut seen_dot = false;
        loop {
            let ch = self.peek(0);
            if chars::is_digit(ch) {
                self.advance();
            } else if ch == chars::PERIOD && !seen_dot && chars::is_digit(self.peek(1)) {
                seen_dot = true;
                self.advance();
            } else if (ch == 'e' || ch == 'E') && chars::is_digit(self.peek(1)) {
                self.advance();
            } else if (ch == 'e' || ch == 'E')
                && (self.peek(1) == '+' || self.peek(1) == '-')
                && chars::is_digit(self.peek(2))
            {
                self.advance();
                self.advance();
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.index].iter().collect();
        match text.parse::<f64>() {
            Ok(n) => new_number_token(start, self.index, n),
            Err(_) => new_error_token(start, self.index, format!("Invalid number [{}]", text)),
        }
    }

    fn scan_string(&mut self, start: usize) -> Token {
        let quote = self.peek(0);
        self.advance();
        let mut buffer = String::new();
        loop {
            let ch = self.peek(0);
            if ch == chars::EOF && self.index >= self.chars.len() {
                return new_error_token(
                    start,
                    self.index,
                    format!("Unterminated string in [{}]", self.input),
                );
            }
            if ch == quote {
                self.advance();
                return new_string_token(start, self.index, buffer);
            }
            if ch == chars::BACKSLASH {
                self.advance();
                let escaped = self.peek(0);
                match escaped {
                    'n' => buffer.push('\n'),
                    't' => buffer.push('\t'),
                    'r' => buffer.push('\r'),
                    'u' => {
                        // \uXXXX
                        let hex: String = (1..=4).map(|i| self.peek(i)).collect();
                        match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                            Some(c) => {
                                buffer.push(c);
                                for _ in 0..4 {
                                    self.advance();
                                }
                            }
                            None => {
                                return new_error_token(
                                    start,
                                    self.index,
                                    format!("Invalid unicode escape [\\u{}]", hex),
                                );
                            }
                        }
                    }
                    other => buffer.push(other),
                }
                self.advance();
            } else {
                buffer.push(ch);
                self.advance();
            }
        }
    }
}
