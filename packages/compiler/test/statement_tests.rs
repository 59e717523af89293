//! Statement parser tests: dependency extraction, caching and the
//! JSON-literal wrapping path.

use trellis_compiler::statement::{StatementInfo, StatementParser};

fn parse(text: &str) -> StatementInfo {
    StatementParser::default()
        .parse(text)
        .unwrap_or_else(|e| panic!("`{}` should parse: {}", text, e))
}

fn set(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[test]
fn simple_chain_yields_chain_and_root_variable() {
    let info = parse("obj.value");
    assert_eq!(info.chain_props.iter().cloned().collect::<Vec<_>>(), set(&["obj.value"]));
    assert_eq!(info.variables.iter().cloned().collect::<Vec<_>>(), set(&["obj"]));
}

#[test]
fn keyed_access_with_dynamic_key_breaks_the_chain() {
    let info = parse("obj[x]");
    assert!(info.chain_props.contains("obj"));
    assert!(info.chain_props.contains("x"));
    assert!(!info.chain_props.contains("obj.x"));
    assert!(info.variables.contains("obj"));
    assert!(info.variables.contains("x"));
}

#[test]
fn literal_keys_extend_the_chain() {
    let info = parse("rows[0].cells['name']");
    assert!(info.chain_props.contains("rows.0.cells.name"));
    assert_eq!(info.variables.iter().cloned().collect::<Vec<_>>(), set(&["rows"]));
}

#[test]
fn leading_this_is_stripped() {
    let direct = parse("value.length");
    let with_this = parse("this.value.length");
    assert_eq!(direct.chain_props, with_this.chain_props);
    assert_eq!(direct.variables, with_this.variables);
}

#[test]
fn call_roots_are_functions_not_variables() {
    let info = parse("getValue()");
    assert!(info.functions.contains("getValue"));
    assert!(info.variables.is_empty());
}

#[test]
fn method_calls_keep_the_receiver_dependency() {
    let info = parse("user.describe(locale)");
    assert!(info.functions.contains("user.describe"));
    assert!(info.variables.contains("user"));
    assert!(info.variables.contains("locale"));
}

#[test]
fn operators_break_chains_into_separate_dependencies() {
    let info = parse("a.b + c.d * 2");
    assert!(info.chain_props.contains("a.b"));
    assert!(info.chain_props.contains("c.d"));
    assert!(info.variables.contains("a"));
    assert!(info.variables.contains("c"));
}

#[test]
fn conditional_reports_all_branches() {
    // Over-reporting is required: every branch could matter.
    let info = parse("flag ? shown.title : hidden.title");
    assert!(info.variables.contains("flag"));
    assert!(info.variables.contains("shown"));
    assert!(info.variables.contains("hidden"));
}

#[test]
fn json_literal_is_wrapped_and_synthetic_entry_stripped() {
    let info = parse("{width: size, height: size * 2}");
    assert!(info.variables.contains("size"));
    assert!(!info.variables.iter().any(|v| v.contains("__json__")));
    assert!(!info.chain_props.iter().any(|v| v.contains("__json__")));
    // The stored AST is the literal itself.
    assert!(matches!(
        info.ast.as_deref(),
        Some(trellis_compiler::expression_parser::Ast::LiteralMap(_))
    ));
}

#[test]
fn array_literal_wrapping() {
    let info = parse("[first, second.value]");
    assert!(info.variables.contains("first"));
    assert!(info.chain_props.contains("second.value"));
}

#[test]
fn empty_statement_is_a_plain_value() {
    let info = parse("");
    assert!(info.is_plain_value);
    assert!(info.ast.is_none());
    assert!(info.variables.is_empty());
}

#[test]
fn results_are_cached_by_normalized_text() {
    let parser = StatementParser::default();
    let a = parser.parse("count + 1").expect("parses");
    let b = parser.parse("  count + 1  ").expect("parses");
    assert_eq!(parser.cache_len(), 1);
    assert_eq!(a, b);
}

#[test]
fn cached_copies_are_defensive() {
    let parser = StatementParser::default();
    let mut first = parser.parse("count").expect("parses");
    first.variables.insert("injected".to_string());
    let second = parser.parse("count").expect("parses");
    assert!(!second.variables.contains("injected"));
}

#[test]
fn reset_clears_the_cache() {
    let parser = StatementParser::default();
    parser.parse("a.b").expect("parses");
    parser.reset();
    assert_eq!(parser.cache_len(), 0);
}

#[test]
fn source_keys_cover_chains_and_functions() {
    let info = parse("getTitle() + user.name");
    let keys = info.source_keys();
    assert!(keys.contains("getTitle"));
    assert!(keys.contains("user"));
}

#[test]
fn parse_errors_carry_the_offending_source() {
    let err = StatementParser::default().parse("value +").unwrap_err();
    assert!(err.to_string().contains("value +"));
}
