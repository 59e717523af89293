//! Parse Utilities
//!
//! Source files, locations, spans and positioned parse errors shared by the
//! markup and expression parsers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseSourceFile {
    pub content: String,
    pub url: String,
}

impl ParseSourceFile {
    pub fn new(content: String, url: String) -> Self {
        ParseSourceFile { content, url }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseLocation {
    pub file: ParseSourceFile,
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

impl ParseLocation {
    pub fn new(file: ParseSourceFile, offset: usize, line: usize, col: usize) -> Self {
        ParseLocation { file, offset, line, col }
    }

    pub fn describe(&self) -> String {
        format!("{}@{}:{}", self.file.url, self.line, self.col)
    }

    /// Return the source around the location, up to `max_chars` or
    /// `max_lines` on each side.
    pub fn get_context(&self, max_chars: usize, max_lines: usize) -> Option<(String, String)> {
        let content = &self.file.content;
        if content.is_empty() {
            return None;
        }

        let offset = self.offset.min(content.len());
        let mut start = offset;
        let mut chars = 0;
        let mut lines = 0;
        while chars < max_chars && start > 0 {
            start -= 1;
            chars += 1;
            if content.as_bytes()[start] == b'\n' {
                lines += 1;
                if lines >= max_lines {
                    break;
                }
            }
        }

        let mut end = offset;
        chars = 0;
        lines = 0;
        while chars < max_chars && end < content.len() {
            end += 1;
            chars += 1;
            if end < content.len() && content.as_bytes()[end] == b'\n' {
                lines += 1;
                if lines >= max_lines {
                    break;
                }
            }
        }

        Some((
            content[start..offset].to_string(),
            content[offset..end].to_string(),
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseSourceSpan {
    pub start: ParseLocation,
    pub end: ParseLocation,
    pub details: Option<String>,
}

impl ParseSourceSpan {
    pub fn new(start: ParseLocation, end: ParseLocation) -> Self {
        ParseSourceSpan { start, end, details: None }
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    /// The source text covered by this span.
    pub fn text(&self) -> String {
        self.start.file.content[self.start.offset..self.end.offset].to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseErrorLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseError {
    pub span: ParseSourceSpan,
    pub msg: String,
    pub level: ParseErrorLevel,
}

impl ParseError {
    pub fn new(span: ParseSourceSpan, msg: String) -> Self {
        ParseError {
            span,
            msg,
            level: ParseErrorLevel::Error,
        }
    }

    pub fn contextual_message(&self) -> String {
        if let Some((before, after)) = self.span.start.get_context(100, 3) {
            let level_str = match self.level {
                ParseErrorLevel::Warning => "WARNING",
                ParseErrorLevel::Error => "ERROR",
            };
            format!("{} (\"{}[{} ->]{}\")", self.msg, before, level_str, after)
        } else {
            self.msg.clone()
        }
    }

    pub fn describe(&self) -> String {
        let details = self
            .span
            .details
            .as_ref()
            .map(|d| format!(", {}", d))
            .unwrap_or_default();
        format!(
            "{}: {}{}",
            self.contextual_message(),
            self.span.start.describe(),
            details
        )
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Build a cursor-less span over a whole source string. Used where only the
/// raw offsets are known.
pub fn span_of(content: &str, url: &str, start: usize, end: usize) -> ParseSourceSpan {
    let file = ParseSourceFile::new(content.to_string(), url.to_string());
    let (line_s, col_s) = line_col(content, start);
    let (line_e, col_e) = line_col(content, end);
    ParseSourceSpan::new(
        ParseLocation::new(file.clone(), start, line_s, col_s),
        ParseLocation::new(file, end, line_e, col_e),
    )
}

fn line_col(content: &str, offset: usize) -> (usize, usize) {
    let mut line = 0;
    let mut col = 0;
    for (i, ch) in content.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_text() {
        let span = span_of("hello world", "test.html", 6, 11);
        assert_eq!(span.text(), "world");
        assert_eq!(span.start.col, 6);
    }

    #[test]
    fn test_line_col() {
        let span = span_of("a\nbc\nd", "test.html", 5, 6);
        assert_eq!(span.start.line, 2);
        assert_eq!(span.start.col, 0);
    }

    #[test]
    fn test_contextual_message() {
        let span = span_of("<div><span></div>", "t.html", 5, 11);
        let err = ParseError::new(span, "Unexpected closing tag".to_string());
        let msg = err.contextual_message();
        assert!(msg.contains("Unexpected closing tag"));
        assert!(msg.contains("ERROR ->"));
    }
}
