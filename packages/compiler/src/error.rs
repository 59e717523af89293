//! Compiler error types.
//!
//! Every compile-time failure is fatal to the compile call that produced it;
//! nothing is cached for a failed input.

use std::fmt;

use crate::parse_util::ParseError;

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Debug)]
pub enum CompileError {
    /// Malformed markup. Carries the positioned parse errors.
    Markup(Vec<ParseError>),

    /// An embedded expression failed to parse. Carries the literal source
    /// text and the offset at which parsing failed.
    Statement {
        source: String,
        position: usize,
        message: String,
    },

    /// A selector string passed to `compile_selector` could not be parsed.
    Selector { selector: String, message: String },

    /// Wraps an inner failure with the binding key and literal source text
    /// that triggered it.
    Binding {
        key: String,
        source: String,
        inner: Box<CompileError>,
    },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Markup(errors) => {
                write!(f, "markup parse error: {}", format_parse_errors(errors))
            }
            CompileError::Statement {
                source,
                position,
                message,
            } => write!(
                f,
                "invalid statement `{source}` at offset {position}: {message}"
            ),
            CompileError::Selector { selector, message } => {
                write!(f, "invalid selector `{selector}`: {message}")
            }
            CompileError::Binding { key, source, inner } => {
                write!(f, "binding `{key}` (`{source}`): {inner}")
            }
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Binding { inner, .. } => Some(inner.as_ref()),
            _ => None,
        }
    }
}

impl CompileError {
    pub fn statement(source: &str, position: usize, message: impl Into<String>) -> Self {
        CompileError::Statement {
            source: source.to_string(),
            position,
            message: message.into(),
        }
    }

    pub fn in_binding(self, key: &str, source: &str) -> Self {
        CompileError::Binding {
            key: key.to_string(),
            source: source.to_string(),
            inner: Box::new(self),
        }
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.describe())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_wrapping() {
        let inner = CompileError::statement("value +", 7, "unexpected end of expression");
        let err = inner.in_binding("title", "value +");
        let msg = err.to_string();
        assert!(msg.contains("binding `title`"));
        assert!(msg.contains("value +"));
        assert!(msg.contains("offset 7"));
    }
}
