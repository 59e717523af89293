//! Selector parsing.
//!
//! `compile_selector` accepts a single compound selector of the form
//! `tag.class#id[attr="value"][flag]` and builds one element instruction
//! from it.

use crate::error::{CompileError, Result};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedSelector {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
}

pub fn parse_selector(selector: &str) -> Result<ParsedSelector> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(invalid(selector, "empty selector"));
    }

    let mut parsed = ParsedSelector::default();
    let chars: Vec<char> = selector.chars().collect();
    let mut index = 0;

    let read_name = |index: &mut usize| -> String {
        let start = *index;
        while *index < chars.len()
            && (chars[*index].is_ascii_alphanumeric() || chars[*index] == '-' || chars[*index] == '_')
        {
            *index += 1;
        }
        chars[start..*index].iter().collect()
    };

    if index < chars.len() && chars[index].is_ascii_alphabetic() {
        parsed.tag = read_name(&mut index);
    } else {
        parsed.tag = "div".to_string();
    }

    while index < chars.len() {
        match chars[index] {
            '.' => {
                index += 1;
                let name = read_name(&mut index);
                if name.is_empty() {
                    return Err(invalid(selector, "expected class name after '.'"));
                }
                parsed.classes.push(name);
            }
            '#' => {
                index += 1;
                let name = read_name(&mut index);
                if name.is_empty() {
                    return Err(invalid(selector, "expected id after '#'"));
                }
                parsed.id = Some(name);
            }
            '[' => {
                index += 1;
                let name = read_name(&mut index);
                if name.is_empty() {
                    return Err(invalid(selector, "expected attribute name after '['"));
                }
                let mut value = String::new();
                if index < chars.len() && chars[index] == '=' {
                    index += 1;
                    let quoted = index < chars.len() && (chars[index] == '"' || chars[index] == '\'');
                    let quote = if quoted { chars[index] } else { ']' };
                    if quoted {
                        index += 1;
                    }
                    while index < chars.len() && chars[index] != quote {
                        value.push(chars[index]);
                        index += 1;
                    }
                    if quoted {
                        if index >= chars.len() {
                            return Err(invalid(selector, "unterminated attribute value"));
                        }
                        index += 1;
                    }
                }
                if index >= chars.len() || chars[index] != ']' {
                    return Err(invalid(selector, "expected ']'"));
                }
                index += 1;
                parsed.attributes.push((name, value));
            }
            other => {
                return Err(invalid(selector, format!("unexpected character '{}'", other)));
            }
        }
    }

    Ok(parsed)
}

fn invalid(selector: &str, message: impl Into<String>) -> CompileError {
    CompileError::Selector {
        selector: selector.to_string(),
        message: message.into(),
    }
}
