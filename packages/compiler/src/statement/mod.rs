//! Statement Parser
//!
//! Parses one expression string into dependency metadata: the free variables,
//! dotted property chains and called functions the expression can be affected
//! by. Dependency extraction never under-reports; over-reporting is the safe
//! direction and is accepted throughout.

mod collector;

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::cache::BoundedCache;
use crate::error::Result;
use crate::expression_parser::{Ast, Parser};

use collector::DependencyCollector;

/// Synthetic declaration name used to parse JSON-literal-looking statements
/// (`{...}` / `[...]`) through the assignment grammar; stripped from every
/// result set afterwards.
const SYNTHETIC_DECL: &str = "__json__";

/// Parsed dependency metadata for one expression string. Immutable; the
/// cache hands out defensive copies (the AST itself is shared behind `Rc`).
#[derive(Debug, Clone, PartialEq)]
pub struct StatementInfo {
    pub statement: String,
    pub is_plain_value: bool,
    pub functions: IndexSet<String>,
    pub variables: IndexSet<String>,
    pub chain_props: IndexSet<String>,
    pub ast: Option<Rc<Ast>>,
}

impl StatementInfo {
    fn plain(statement: String) -> Self {
        StatementInfo {
            statement,
            is_plain_value: true,
            functions: IndexSet::new(),
            variables: IndexSet::new(),
            chain_props: IndexSet::new(),
            ast: None,
        }
    }

    /// Every key a state mutation could arrive under that this statement
    /// depends on: chain roots plus function roots.
    pub fn source_keys(&self) -> IndexSet<String> {
        let mut keys = IndexSet::new();
        for chain in &self.chain_props {
            keys.insert(root_segment(chain).to_string());
        }
        for function in &self.functions {
            keys.insert(root_segment(function).to_string());
        }
        keys
    }
}

fn root_segment(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

/// Parses expression strings into [`StatementInfo`], caching by trimmed text.
#[derive(Debug)]
pub struct StatementParser {
    parser: Parser,
    cache: RefCell<BoundedCache<String, StatementInfo>>,
}

impl StatementParser {
    pub fn new(cache_capacity: usize) -> Self {
        StatementParser {
            parser: Parser::new(),
            cache: RefCell::new(BoundedCache::new(cache_capacity)),
        }
    }

    /// Parse a binding-position expression.
    pub fn parse(&self, raw: &str) -> Result<StatementInfo> {
        self.parse_with(raw, false)
    }

    /// Parse an action-position expression (event handler bodies may contain
    /// assignments and `;` chains).
    pub fn parse_action(&self, raw: &str) -> Result<StatementInfo> {
        self.parse_with(raw, true)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn reset(&self) {
        self.cache.borrow_mut().clear();
    }

    fn parse_with(&self, raw: &str, action: bool) -> Result<StatementInfo> {
        let normalized = raw.trim().to_string();
        if let Some(info) = self.cache.borrow().get(&normalized) {
            return Ok(info.clone());
        }

        let info = self.analyze(&normalized, action)?;
        self.cache
            .borrow_mut()
            .insert(normalized, info.clone());
        Ok(info)
    }

    fn analyze(&self, statement: &str, action: bool) -> Result<StatementInfo> {
        if statement.is_empty() {
            return Ok(StatementInfo::plain(statement.to_string()));
        }

        // JSON-literal-looking text cannot be parsed in statement position;
        // wrap it as a synthetic declaration and strip the synthetic entry
        // from the results.
        let looks_like_json = statement.starts_with('{') || statement.starts_with('[');
        let (source, offset) = if looks_like_json {
            (format!("{} = {}", SYNTHETIC_DECL, statement), true)
        } else {
            (statement.to_string(), false)
        };

        let ast = if action || offset {
            self.parser.parse_action(&source, 0)?
        } else {
            self.parser.parse_binding(&source, 0)?
        };

        let mut collector = DependencyCollector::new();
        collector.visit(&ast);
        let (functions, mut chain_props) = collector.into_parts();

        // Unwrap the synthetic assignment so consumers see the literal
        // itself; spans keep referring to the wrapped source, so subexpr
        // slicing is done relative to the root span.
        let ast = if offset {
            chain_props.shift_remove(SYNTHETIC_DECL);
            match ast {
                Ast::PropertyWrite(write) => *write.value,
                other => other,
            }
        } else {
            ast
        };

        let mut variables = IndexSet::new();
        for chain in &chain_props {
            let root = root_segment(chain);
            if !functions.contains(root) {
                variables.insert(root.to_string());
            }
        }

        Ok(StatementInfo {
            statement: statement.to_string(),
            is_plain_value: false,
            functions,
            variables,
            chain_props,
            ast: Some(Rc::new(ast)),
        })
    }
}

impl Default for StatementParser {
    fn default() -> Self {
        StatementParser::new(512)
    }
}
