//! Expression evaluation.
//!
//! Evaluates compiled expression ASTs against a scope with loosely-typed
//! coercion, and applies assignments for two-way bindings and event actions.

use trellis_compiler::expression_parser::ast::*;

use crate::error::{Result, RuntimeError};
use crate::scope::Scope;
use crate::value::Value;

pub fn evaluate(ast: &Ast, scope: &Scope) -> Result<Value> {
    match ast {
        Ast::Empty(_) => Ok(Value::Undefined),
        Ast::ImplicitReceiver(_) | Ast::ThisReceiver(_) => {
            Ok(Value::Object(scope.context.borrow().clone()))
        }
        Ast::Chain(chain) => {
            let mut last = Value::Undefined;
            for expr in &chain.expressions {
                last = evaluate(expr, scope)?;
            }
            Ok(last)
        }
        Ast::Conditional(cond) => {
            if evaluate(&cond.condition, scope)?.is_truthy() {
                evaluate(&cond.true_exp, scope)
            } else {
                evaluate(&cond.false_exp, scope)
            }
        }
        Ast::PropertyRead(read) => property_read(&read.receiver, &read.name, scope, false),
        Ast::SafePropertyRead(read) => property_read(&read.receiver, &read.name, scope, true),
        Ast::KeyedRead(read) => {
            let receiver = evaluate(&read.receiver, scope)?;
            let key = evaluate(&read.key, scope)?;
            Ok(keyed_get(&receiver, &key))
        }
        Ast::SafeKeyedRead(read) => {
            let receiver = evaluate(&read.receiver, scope)?;
            if receiver.is_nil() {
                return Ok(Value::Undefined);
            }
            let key = evaluate(&read.key, scope)?;
            Ok(keyed_get(&receiver, &key))
        }
        Ast::LiteralPrimitive(literal) => Ok(match literal {
            LiteralPrimitive::String { value, .. } => Value::Str(value.clone()),
            LiteralPrimitive::Number { value, .. } => Value::Number(*value),
            LiteralPrimitive::Boolean { value, .. } => Value::Bool(*value),
            LiteralPrimitive::Null { .. } => Value::Null,
            LiteralPrimitive::Undefined { .. } => Value::Undefined,
        }),
        Ast::LiteralArray(array) => {
            let mut items = Vec::with_capacity(array.expressions.len());
            for expr in &array.expressions {
                items.push(evaluate(expr, scope)?);
            }
            Ok(Value::Array(items))
        }
        Ast::LiteralMap(map) => {
            let mut object = indexmap::IndexMap::new();
            for (key, value) in map.keys.iter().zip(map.values.iter()) {
                let key = match key {
                    LiteralMapKey::Ident { key } | LiteralMapKey::Quoted { key } => key.clone(),
                    LiteralMapKey::Computed { key } => {
                        evaluate(key, scope)?.to_display_string()
                    }
                };
                object.insert(key, evaluate(value, scope)?);
            }
            Ok(Value::Object(object))
        }
        Ast::Binary(binary) => {
            binary_op(&binary.operation, &binary.left, &binary.right, scope)
        }
        Ast::PrefixNot(not) => Ok(Value::Bool(!evaluate(&not.expression, scope)?.is_truthy())),
        Ast::Unary(unary) => {
            let value = evaluate(&unary.expr, scope)?.coerce_number();
            Ok(Value::Number(if unary.operator == "-" { -value } else { value }))
        }
        Ast::Call(call) => invoke(&call.receiver, &call.args, scope, false),
        Ast::SafeCall(call) => invoke(&call.receiver, &call.args, scope, true),
        Ast::PropertyWrite(write) => {
            let value = evaluate(&write.value, scope)?;
            assign(ast, scope, value.clone())?;
            Ok(value)
        }
        Ast::KeyedWrite(write) => {
            let value = evaluate(&write.value, scope)?;
            assign(ast, scope, value.clone())?;
            Ok(value)
        }
    }
}

/// Apply `value` to the target of an assignable expression: a property
/// chain or keyed access rooted in the scope.
pub fn assign(ast: &Ast, scope: &Scope, value: Value) -> Result<()> {
    let path = assignment_path(ast, scope)?;
    let (root, rest) = path
        .split_first()
        .ok_or_else(|| RuntimeError::eval("expression is not assignable"))?;

    if rest.is_empty() {
        scope.write(root, value);
        return Ok(());
    }

    let mut current = scope
        .lookup(root)
        .unwrap_or_else(|| Value::Object(indexmap::IndexMap::new()));
    write_path(&mut current, rest, value)?;
    scope.write(root, current);
    Ok(())
}

/// Resolve the segments of an assignment target, evaluating computed keys.
fn assignment_path(ast: &Ast, scope: &Scope) -> Result<Vec<String>> {
    match ast {
        Ast::ImplicitReceiver(_) | Ast::ThisReceiver(_) => Ok(Vec::new()),
        Ast::PropertyRead(read) => {
            let mut path = assignment_path(&read.receiver, scope)?;
            path.push(read.name.clone());
            Ok(path)
        }
        Ast::PropertyWrite(write) => {
            let mut path = assignment_path(&write.receiver, scope)?;
            path.push(write.name.clone());
            Ok(path)
        }
        Ast::KeyedRead(read) => {
            let mut path = assignment_path(&read.receiver, scope)?;
            path.push(evaluate(&read.key, scope)?.to_display_string());
            Ok(path)
        }
        Ast::KeyedWrite(write) => {
            let mut path = assignment_path(&write.receiver, scope)?;
            path.push(evaluate(&write.key, scope)?.to_display_string());
            Ok(path)
        }
        _ => Err(RuntimeError::eval("expression is not assignable")),
    }
}

fn write_path(target: &mut Value, path: &[String], value: Value) -> Result<()> {
    let (segment, rest) = path.split_first().expect("non-empty path");
    match target {
        Value::Object(map) => {
            if rest.is_empty() {
                map.insert(segment.clone(), value);
                return Ok(());
            }
            let entry = map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(indexmap::IndexMap::new()));
            write_path(entry, rest, value)
        }
        Value::Array(items) => {
            let index: usize = segment
                .parse()
                .map_err(|_| RuntimeError::eval(format!("invalid array index `{}`", segment)))?;
            let slot = items
                .get_mut(index)
                .ok_or_else(|| RuntimeError::eval(format!("index {} out of bounds", index)))?;
            if rest.is_empty() {
                *slot = value;
                Ok(())
            } else {
                write_path(slot, rest, value)
            }
        }
        other => Err(RuntimeError::eval(format!(
            "cannot assign into a {}",
            other.type_name()
        ))),
    }
}

fn property_read(receiver: &Ast, name: &str, scope: &Scope, safe: bool) -> Result<Value> {
    if receiver.is_implicit_receiver() || matches!(receiver, Ast::ThisReceiver(_)) {
        return Ok(scope.lookup(name).unwrap_or(Value::Undefined));
    }
    let receiver = evaluate(receiver, scope)?;
    if receiver.is_nil() {
        if safe {
            return Ok(Value::Undefined);
        }
        return Err(RuntimeError::eval(format!(
            "cannot read `{}` of {}",
            name,
            receiver.type_name()
        )));
    }
    Ok(member_get(&receiver, name))
}

fn member_get(receiver: &Value, name: &str) -> Value {
    match receiver {
        Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Undefined),
        Value::Array(items) => match name {
            "length" => Value::Number(items.len() as f64),
            _ => name
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index).cloned())
                .unwrap_or(Value::Undefined),
        },
        Value::Str(s) => match name {
            "length" => Value::Number(s.chars().count() as f64),
            _ => Value::Undefined,
        },
        _ => Value::Undefined,
    }
}

fn keyed_get(receiver: &Value, key: &Value) -> Value {
    match receiver {
        Value::Array(items) => {
            let index = key.coerce_number();
            if index.fract() == 0.0 && index >= 0.0 {
                items
                    .get(index as usize)
                    .cloned()
                    .unwrap_or(Value::Undefined)
            } else {
                Value::Undefined
            }
        }
        _ => member_get(receiver, &key.to_display_string()),
    }
}

fn invoke(receiver: &Ast, args: &[Box<Ast>], scope: &Scope, safe: bool) -> Result<Value> {
    let callee = match receiver {
        Ast::PropertyRead(read)
            if read.receiver.is_implicit_receiver()
                || matches!(*read.receiver, Ast::ThisReceiver(_)) =>
        {
            scope.lookup(&read.name).unwrap_or(Value::Undefined)
        }
        other => evaluate(other, scope)?,
    };

    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(evaluate(arg, scope)?);
    }

    match callee {
        Value::Func(f) => Ok(f(&values)),
        value if value.is_nil() && safe => Ok(Value::Undefined),
        value => Err(RuntimeError::eval(format!(
            "{} is not a function",
            value.type_name()
        ))),
    }
}

fn binary_op(op: &str, left: &Ast, right: &Ast, scope: &Scope) -> Result<Value> {
    // Short-circuiting forms evaluate the right side lazily.
    match op {
        "&&" => {
            let left = evaluate(left, scope)?;
            return if left.is_truthy() { evaluate(right, scope) } else { Ok(left) };
        }
        "||" => {
            let left = evaluate(left, scope)?;
            return if left.is_truthy() { Ok(left) } else { evaluate(right, scope) };
        }
        "??" => {
            let left = evaluate(left, scope)?;
            return if left.is_nil() { evaluate(right, scope) } else { Ok(left) };
        }
        _ => {}
    }

    let lhs = evaluate(left, scope)?;
    let rhs = evaluate(right, scope)?;
    let result = match op {
        "+" => match (&lhs, &rhs) {
            (Value::Str(_), _) | (_, Value::Str(_)) => {
                Value::Str(format!("{}{}", lhs.to_display_string(), rhs.to_display_string()))
            }
            _ => Value::Number(lhs.coerce_number() + rhs.coerce_number()),
        },
        "-" => Value::Number(lhs.coerce_number() - rhs.coerce_number()),
        "*" => Value::Number(lhs.coerce_number() * rhs.coerce_number()),
        "/" => Value::Number(lhs.coerce_number() / rhs.coerce_number()),
        "%" => Value::Number(lhs.coerce_number() % rhs.coerce_number()),
        "==" => Value::Bool(loose_eq(&lhs, &rhs)),
        "!=" => Value::Bool(!loose_eq(&lhs, &rhs)),
        "===" => Value::Bool(lhs == rhs),
        "!==" => Value::Bool(lhs != rhs),
        "<" => compare(&lhs, &rhs, |ord| ord == std::cmp::Ordering::Less),
        ">" => compare(&lhs, &rhs, |ord| ord == std::cmp::Ordering::Greater),
        "<=" => compare(&lhs, &rhs, |ord| ord != std::cmp::Ordering::Greater),
        ">=" => compare(&lhs, &rhs, |ord| ord != std::cmp::Ordering::Less),
        "in" => Value::Bool(contains_key(&rhs, &lhs)),
        other => {
            return Err(RuntimeError::eval(format!("unknown operator `{}`", other)));
        }
    };
    Ok(result)
}

fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    if lhs == rhs {
        return true;
    }
    match (lhs, rhs) {
        (Value::Null | Value::Undefined, Value::Null | Value::Undefined) => true,
        (Value::Number(_), _) | (_, Value::Number(_)) | (Value::Bool(_), _) | (_, Value::Bool(_)) => {
            let l = lhs.coerce_number();
            let r = rhs.coerce_number();
            !l.is_nan() && !r.is_nan() && l == r
        }
        _ => false,
    }
}

fn compare(lhs: &Value, rhs: &Value, test: impl Fn(std::cmp::Ordering) -> bool) -> Value {
    let ordering = match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => {
            let l = lhs.coerce_number();
            let r = rhs.coerce_number();
            match l.partial_cmp(&r) {
                Some(ordering) => ordering,
                None => return Value::Bool(false),
            }
        }
    };
    Value::Bool(test(ordering))
}

fn contains_key(container: &Value, key: &Value) -> bool {
    match container {
        Value::Object(map) => map.contains_key(&key.to_display_string()),
        Value::Array(items) => {
            let index = key.coerce_number();
            index.fract() == 0.0 && index >= 0.0 && (index as usize) < items.len()
        }
        _ => false,
    }
}
