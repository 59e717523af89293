//! Expression lexer tests.

use trellis_compiler::expression_parser::lexer::{Lexer, Token, TokenType};

fn lex(text: &str) -> Vec<Token> {
    Lexer::new().tokenize(text)
}

#[test]
fn tokenizes_identifiers_keywords_and_members() {
    let tokens = lex("this.user.name");
    assert!(tokens[0].is_keyword("this"));
    assert!(tokens[1].is_character('.'));
    assert_eq!(tokens[2].str_value, "user");
    assert_eq!(tokens[4].str_value, "name");
}

#[test]
fn tokenizes_numbers() {
    let tokens = lex("0 42 3.14 .5 1e3 2.5e-2");
    let values: Vec<f64> = tokens.iter().map(|t| t.num_value).collect();
    assert_eq!(values, vec![0.0, 42.0, 3.14, 0.5, 1000.0, 0.025]);
    assert!(tokens.iter().all(|t| t.token_type == TokenType::Number));
}

#[test]
fn tokenizes_strings_with_escapes() {
    let tokens = lex(r#"'it\'s' "a\nb" 'A'"#);
    assert_eq!(tokens[0].str_value, "it's");
    assert_eq!(tokens[1].str_value, "a\nb");
    assert_eq!(tokens[2].str_value, "A");
}

#[test]
fn tokenizes_compound_operators() {
    let tokens = lex("a === b !== c <= d >= e && f || g ?? h?.i");
    let operators: Vec<&str> = tokens
        .iter()
        .filter(|t| t.token_type == TokenType::Operator)
        .map(|t| t.str_value.as_str())
        .collect();
    assert_eq!(operators, vec!["===", "!==", "<=", ">=", "&&", "||", "??", "?."]);
}

#[test]
fn token_spans_cover_the_source() {
    let tokens = lex("abc + 12");
    assert_eq!((tokens[0].index, tokens[0].end), (0, 3));
    assert_eq!((tokens[1].index, tokens[1].end), (4, 5));
    assert_eq!((tokens[2].index, tokens[2].end), (6, 8));
}

#[test]
fn unterminated_string_is_an_error_token() {
    let tokens = lex("'open");
    assert!(tokens[0].is_error());
    assert!(tokens[0].str_value.contains("Unterminated string"));
}

#[test]
fn lone_ampersand_is_an_error_token() {
    let tokens = lex("a & b");
    assert!(tokens[1].is_error());
}
