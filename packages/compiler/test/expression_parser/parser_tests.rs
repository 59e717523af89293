//! Expression parser tests.

use trellis_compiler::error::CompileError;
use trellis_compiler::expression_parser::ast::*;
use trellis_compiler::expression_parser::Parser;

fn binding(text: &str) -> Ast {
    Parser::new()
        .parse_binding(text, 0)
        .unwrap_or_else(|e| panic!("`{}` should parse: {}", text, e))
}

fn action(text: &str) -> Ast {
    Parser::new()
        .parse_action(text, 0)
        .unwrap_or_else(|e| panic!("`{}` should parse: {}", text, e))
}

#[test]
fn parses_property_chains() {
    match binding("a.b.c") {
        Ast::PropertyRead(read) => {
            assert_eq!(read.name, "c");
            match *read.receiver {
                Ast::PropertyRead(inner) => {
                    assert_eq!(inner.name, "b");
                    assert!(matches!(*inner.receiver, Ast::PropertyRead(_)));
                }
                other => panic!("unexpected receiver {:?}", other),
            }
        }
        other => panic!("expected property read, got {:?}", other),
    }
}

#[test]
fn parses_keyed_and_safe_access() {
    assert!(matches!(binding("items[0]"), Ast::KeyedRead(_)));
    assert!(matches!(binding("user?.name"), Ast::SafePropertyRead(_)));
    assert!(matches!(binding("user?.[key]"), Ast::SafeKeyedRead(_)));
    assert!(matches!(binding("callback?.()"), Ast::SafeCall(_)));
}

#[test]
fn parses_calls_with_arguments() {
    match binding("format(value, 2)") {
        Ast::Call(call) => {
            assert_eq!(call.args.len(), 2);
            assert!(matches!(*call.receiver, Ast::PropertyRead(_)));
        }
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn binary_precedence() {
    // 1 + 2 * 3 parses as 1 + (2 * 3)
    match binding("1 + 2 * 3") {
        Ast::Binary(add) => {
            assert_eq!(add.operation, "+");
            match *add.right {
                Ast::Binary(mul) => assert_eq!(mul.operation, "*"),
                other => panic!("expected multiplication on the right, got {:?}", other),
            }
        }
        other => panic!("expected binary, got {:?}", other),
    }
}

#[test]
fn conditional_is_right_associative() {
    match binding("a ? b : c ? d : e") {
        Ast::Conditional(outer) => {
            assert!(matches!(*outer.false_exp, Ast::Conditional(_)));
        }
        other => panic!("expected conditional, got {:?}", other),
    }
}

#[test]
fn parses_literals() {
    assert!(matches!(
        binding("[1, 'two', true, null]"),
        Ast::LiteralArray(LiteralArray { expressions, .. }) if expressions.len() == 4
    ));
    match binding("{a: 1, \"b\": 2, [key]: 3}") {
        Ast::LiteralMap(map) => {
            assert!(matches!(map.keys[0], LiteralMapKey::Ident { .. }));
            assert!(matches!(map.keys[1], LiteralMapKey::Quoted { .. }));
            assert!(matches!(map.keys[2], LiteralMapKey::Computed { .. }));
        }
        other => panic!("expected map, got {:?}", other),
    }
}

#[test]
fn actions_allow_assignment_and_chains() {
    assert!(matches!(action("value = 1"), Ast::PropertyWrite(_)));
    assert!(matches!(action("map[k] = v"), Ast::KeyedWrite(_)));
    match action("a = 1; b = 2") {
        Ast::Chain(chain) => assert_eq!(chain.expressions.len(), 2),
        other => panic!("expected chain, got {:?}", other),
    }
}

#[test]
fn bindings_reject_assignment_and_chains() {
    assert!(Parser::new().parse_binding("value = 1", 0).is_err());
    assert!(Parser::new().parse_binding("a; b", 0).is_err());
}

#[test]
fn literals_are_not_assignable() {
    let err = Parser::new().parse_action("1 = 2", 0).unwrap_err();
    assert!(err.to_string().contains("not assignable"));
}

#[test]
fn errors_carry_source_and_position() {
    match Parser::new().parse_binding("items[", 0).unwrap_err() {
        CompileError::Statement { source, position, .. } => {
            assert_eq!(source, "items[");
            assert_eq!(position, 6);
        }
        other => panic!("expected statement error, got {:?}", other),
    }
}

#[test]
fn ast_serializes_through_serde() {
    let ast = binding("items[0].name ?? 'anonymous'");
    let json = serde_json::to_string(&ast).expect("serializes");
    let back: Ast = serde_json::from_str(&json).expect("deserializes");
    assert_eq!(ast, back);
}

#[test]
fn spans_map_back_to_source() {
    let offset = 10;
    let ast = Parser::new().parse_binding("a.b", offset).expect("parses");
    let span = ast.source_span();
    assert_eq!(span.start, offset);
    assert_eq!(span.end, offset + 3);
}
