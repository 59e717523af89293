//! Dependency collector.
//!
//! Walks the expression AST with one exhaustive match per node kind and
//! collects called function paths and dotted property chains. A chain breaks
//! at any keyed access with a non-literal key and at any
//! non-member/non-identifier/non-literal subexpression; the broken remainder
//! may start a new chain.

use indexmap::IndexSet;

use crate::expression_parser::ast::*;

pub struct DependencyCollector {
    functions: IndexSet<String>,
    chains: IndexSet<String>,
}

impl DependencyCollector {
    pub fn new() -> Self {
        DependencyCollector {
            functions: IndexSet::new(),
            chains: IndexSet::new(),
        }
    }

    pub fn into_parts(self) -> (IndexSet<String>, IndexSet<String>) {
        (self.functions, self.chains)
    }

    pub fn visit(&mut self, ast: &Ast) {
        match ast {
            Ast::PropertyRead(_)
            | Ast::SafePropertyRead(_)
            | Ast::KeyedRead(_)
            | Ast::SafeKeyedRead(_) => {
                if let Some(path) = self.resolve_path(ast) {
                    self.record_chain(&path);
                }
            }
            Ast::Call(call) => self.visit_call(&call.receiver, &call.args),
            Ast::SafeCall(call) => self.visit_call(&call.receiver, &call.args),
            Ast::PropertyWrite(write) => {
                let mut path = self.resolve_path(&write.receiver).unwrap_or_default();
                path.push(write.name.clone());
                self.record_chain(&path);
                self.visit(&write.value);
            }
            Ast::KeyedWrite(write) => {
                if let Some(path) = self.resolve_path(&write.receiver) {
                    self.record_chain(&path);
                }
                self.visit(&write.key);
                self.visit(&write.value);
            }
            Ast::Binary(binary) => {
                self.visit(&binary.left);
                self.visit(&binary.right);
            }
            Ast::Conditional(cond) => {
                self.visit(&cond.condition);
                self.visit(&cond.true_exp);
                self.visit(&cond.false_exp);
            }
            Ast::PrefixNot(not) => self.visit(&not.expression),
            Ast::Unary(unary) => self.visit(&unary.expr),
            Ast::LiteralArray(array) => {
                for expr in &array.expressions {
                    self.visit(expr);
                }
            }
            Ast::LiteralMap(map) => {
                for key in &map.keys {
                    if let LiteralMapKey::Computed { key } = key {
                        self.visit(key);
                    }
                }
                for value in &map.values {
                    self.visit(value);
                }
            }
            Ast::Chain(chain) => {
                for expr in &chain.expressions {
                    self.visit(expr);
                }
            }
            Ast::Empty(_)
            | Ast::ImplicitReceiver(_)
            | Ast::ThisReceiver(_)
            | Ast::LiteralPrimitive(_) => {}
        }
    }

    fn visit_call(&mut self, receiver: &Ast, args: &[Box<Ast>]) {
        match self.resolve_path(receiver) {
            Some(path) if !path.is_empty() => {
                self.functions.insert(path.join("."));
                // The receiver object itself is still a dependency.
                if path.len() > 1 {
                    self.record_chain(&path[..path.len() - 1]);
                }
            }
            Some(_) => {}
            None => self.visit(receiver),
        }
        for arg in args {
            self.visit(arg);
        }
    }

    /// Resolve a member chain to its dotted path. Returns `None` when the
    /// node is not a pure member chain; any dependencies inside the broken
    /// part have been collected by the time this returns.
    fn resolve_path(&mut self, ast: &Ast) -> Option<Vec<String>> {
        match ast {
            // Leading `this.` is equivalent to the implicit receiver.
            Ast::ImplicitReceiver(_) | Ast::ThisReceiver(_) => Some(Vec::new()),
            Ast::PropertyRead(read) => self.resolve_segment(&read.receiver, &read.name),
            Ast::SafePropertyRead(read) => self.resolve_segment(&read.receiver, &read.name),
            Ast::KeyedRead(read) => self.resolve_keyed(&read.receiver, &read.key),
            Ast::SafeKeyedRead(read) => self.resolve_keyed(&read.receiver, &read.key),
            _ => {
                self.visit(ast);
                None
            }
        }
    }

    fn resolve_segment(&mut self, receiver: &Ast, name: &str) -> Option<Vec<String>> {
        match self.resolve_path(receiver) {
            Some(mut path) => {
                path.push(name.to_string());
                Some(path)
            }
            // The receiver broke the chain; a new chain starts at this
            // segment (over-reporting the bare name is the safe direction).
            None => Some(vec![name.to_string()]),
        }
    }

    fn resolve_keyed(&mut self, receiver: &Ast, key: &Ast) -> Option<Vec<String>> {
        if let Ast::LiteralPrimitive(literal) = key {
            match literal {
                LiteralPrimitive::String { value, .. } => {
                    return self.resolve_segment(receiver, value);
                }
                LiteralPrimitive::Number { value, .. } => {
                    return self.resolve_segment(receiver, &format_index(*value));
                }
                _ => {}
            }
        }
        // Non-literal key: the receiver chain is recorded as-is and the key
        // is analyzed as an independent expression.
        if let Some(path) = self.resolve_path(receiver) {
            self.record_chain(&path);
        }
        self.visit(key);
        None
    }

    fn record_chain(&mut self, path: &[String]) {
        if !path.is_empty() {
            self.chains.insert(path.join("."));
        }
    }
}

fn format_index(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
