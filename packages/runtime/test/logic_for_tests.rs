//! Repetition (`*for`) logic element tests: identity-preserving
//! reconciliation, duplicate pairing, implicit variables.

use indexmap::IndexMap;
use trellis_runtime::{Engine, NodeRef, Value};

fn items(values: &[&str]) -> Value {
    Value::Array(values.iter().map(|v| Value::from(*v)).collect())
}

fn single(key: &str, value: Value) -> IndexMap<String, Value> {
    let mut map = IndexMap::new();
    map.insert(key.to_string(), value);
    map
}

fn li_nodes(body: &NodeRef) -> Vec<NodeRef> {
    body.children()
        .into_iter()
        .filter(|node| node.tag() == "li")
        .collect()
}

#[test]
fn renders_items_in_order() {
    let engine = Engine::new();
    let body = engine.document().body();
    engine
        .render(
            r#"<li *for="item in items">{{item}}</li>"#,
            vec![("items".to_string(), items(&["a", "b", "c"]))],
            &body,
        )
        .expect("renders");
    assert_eq!(body.text_content(), "abc");
    assert_eq!(li_nodes(&body).len(), 3);
}

#[test]
fn rotation_reuses_every_child_by_identity() {
    // P5: [A, B, C] -> [C, A, B]: zero removes, three remains, order
    // matches the new array, all three children reused.
    let engine = Engine::new();
    let body = engine.document().body();
    let reference = engine
        .render(
            r#"<li *for="item in items">{{item}}</li>"#,
            vec![("items".to_string(), items(&["A", "B", "C"]))],
            &body,
        )
        .expect("renders");

    let before = li_nodes(&body);
    assert_eq!(body.text_content(), "ABC");

    reference
        .set_state(single("items", items(&["C", "A", "B"])))
        .expect("rotates");

    let after = li_nodes(&body);
    assert_eq!(body.text_content(), "CAB");
    assert_eq!(after.len(), 3);
    // Same three nodes, permuted: C's node leads, then A's, then B's.
    assert_eq!(after[0], before[2]);
    assert_eq!(after[1], before[0]);
    assert_eq!(after[2], before[1]);
}

#[test]
fn duplicate_values_pair_one_for_one() {
    // P6: [X, X] -> [X] removes exactly one child.
    let engine = Engine::new();
    let body = engine.document().body();
    let reference = engine
        .render(
            r#"<li *for="item in items">{{item}}</li>"#,
            vec![("items".to_string(), items(&["X", "X"]))],
            &body,
        )
        .expect("renders");

    let before = li_nodes(&body);
    assert_eq!(before.len(), 2);

    reference
        .set_state(single("items", items(&["X"])))
        .expect("shrinks");

    let after = li_nodes(&body);
    assert_eq!(after.len(), 1);
    // Positional pairing keeps the first occurrence's child.
    assert_eq!(after[0], before[0]);
    assert_eq!(body.text_content(), "X");
}

#[test]
fn identical_snapshot_takes_the_fast_path() {
    let engine = Engine::new();
    let body = engine.document().body();
    let reference = engine
        .render(
            r#"<li *for="item in items">{{item}}-{{suffix}}</li>"#,
            vec![
                ("items".to_string(), items(&["a", "b"])),
                ("suffix".to_string(), Value::from("1")),
            ],
            &body,
        )
        .expect("renders");
    assert_eq!(body.text_content(), "a-1b-1");

    let before = li_nodes(&body);
    // Same array identity: children are forwarded, not rebuilt.
    reference
        .set_state(single("suffix", Value::from("2")))
        .expect("updates");
    assert_eq!(body.text_content(), "a-2b-2");
    assert_eq!(li_nodes(&body), before);
}

#[test]
fn insertion_lands_before_the_correct_anchor() {
    let engine = Engine::new();
    let body = engine.document().body();
    let reference = engine
        .render(
            r#"<li *for="item in items">{{item}}</li>"#,
            vec![("items".to_string(), items(&["a", "c"]))],
            &body,
        )
        .expect("renders");
    let before = li_nodes(&body);

    reference
        .set_state(single("items", items(&["a", "b", "c"])))
        .expect("inserts");
    let after = li_nodes(&body);
    assert_eq!(body.text_content(), "abc");
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[1]);
}

#[test]
fn removal_then_empty_keeps_the_region_well_defined() {
    let engine = Engine::new();
    let body = engine.document().body();
    let reference = engine
        .render(
            r#"<li *for="item in items">{{item}}</li>"#,
            vec![("items".to_string(), items(&["a", "b"]))],
            &body,
        )
        .expect("renders");

    reference
        .set_state(single("items", items(&[])))
        .expect("clears");
    assert_eq!(body.text_content(), "");
    assert_eq!(li_nodes(&body).len(), 0);

    // The end marker still brackets the region: repopulation works.
    reference
        .set_state(single("items", items(&["z"])))
        .expect("repopulates");
    assert_eq!(body.text_content(), "z");
}

#[test]
fn implicit_variables_refresh_each_pass() {
    let engine = Engine::new();
    let body = engine.document().body();
    let reference = engine
        .render(
            r#"<li *for="entry, pos in items">{{pos}}:{{entry}}/{{length}} </li>"#,
            vec![("items".to_string(), items(&["a", "b"]))],
            &body,
        )
        .expect("renders");
    assert_eq!(body.text_content(), "0:a/2 1:b/2 ");

    reference
        .set_state(single("items", items(&["b", "a", "c"])))
        .expect("reorders");
    assert_eq!(body.text_content(), "0:b/3 1:a/3 2:c/3 ");
}

#[test]
fn let_variables_derive_from_the_item() {
    let engine = Engine::new();
    let body = engine.document().body();
    let rows = Value::Array(vec![
        Value::object([("name".to_string(), Value::from("ada"))]),
        Value::object([("name".to_string(), Value::from("grace"))]),
    ]);
    engine
        .render(
            r#"<li *for="row in rows" let-who="row.name">{{who}} </li>"#,
            vec![("rows".to_string(), rows)],
            &body,
        )
        .expect("renders");
    assert_eq!(body.text_content(), "ada grace ");
}

#[test]
fn nested_repetition() {
    let engine = Engine::new();
    let body = engine.document().body();
    let grid = Value::Array(vec![
        Value::Array(vec![Value::from("a"), Value::from("b")]),
        Value::Array(vec![Value::from("c")]),
    ]);
    engine
        .render(
            r#"<ul *for="row in grid"><li *for="cell in row">{{cell}}</li></ul>"#,
            vec![("grid".to_string(), grid)],
            &body,
        )
        .expect("renders");
    assert_eq!(body.text_content(), "abc");
}
