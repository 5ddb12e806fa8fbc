use rusqlite::types::Value;
use serde_json::json;
use storekit_core::error::is_bad_request;
use storekit_core::{Condition, ErrorKind, JsonEqValue};

#[test]
fn or_of_two_equalities_keeps_param_order() {
    let cond = Condition::or(vec![Condition::eq("a", 1), Condition::eq("b", 2)]);

    assert_eq!(cond.condition(), "((\"a\" = ?) OR (\"b\" = ?))");
    assert_eq!(cond.params(), vec![Value::Integer(1), Value::Integer(2)]);
}

#[test]
fn nested_groups_emit_params_depth_first() {
    let cond = Condition::and(vec![
        Condition::eq("a", 1),
        Condition::or(vec![Condition::gt("b", 2), Condition::lt("c", 3)]),
        Condition::not(vec![Condition::eq("d", "x"), Condition::is_null("e")]),
    ]);

    assert_eq!(
        cond.condition(),
        "((\"a\" = ?) AND (((\"b\" > ?) OR (\"c\" < ?))) AND (NOT ((\"d\" = ?) AND (\"e\" IS NULL))))"
    );
    assert_eq!(
        cond.params(),
        vec![
            Value::Integer(1),
            Value::Integer(2),
            Value::Integer(3),
            Value::Text("x".to_string()),
        ]
    );
}

#[test]
fn empty_groups_render_neutral_predicates() {
    assert_eq!(Condition::or(Vec::new()).condition(), "(1 = 0)");
    assert_eq!(Condition::and(Vec::new()).condition(), "(1 = 1)");
    assert_eq!(Condition::not(Vec::new()).condition(), "NOT (1 = 1)");
}

#[test]
fn between_list_requires_exactly_two_values() {
    let ok = Condition::between_list("age", vec![Value::Integer(18), Value::Integer(65)]).unwrap();
    assert_eq!(ok.condition(), "\"age\" BETWEEN ? AND ?");
    assert_eq!(ok.params(), vec![Value::Integer(18), Value::Integer(65)]);

    let err = Condition::between_list("age", vec![Value::Integer(18)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    let err = Condition::between_list("age", Vec::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn in_list_emits_one_placeholder_per_value() {
    let cond = Condition::is_in("id", [3_i64, 1, 2]);
    assert_eq!(cond.condition(), "\"id\" IN (?, ?, ?)");
    assert_eq!(
        cond.params(),
        vec![Value::Integer(3), Value::Integer(1), Value::Integer(2)]
    );

    let cond = Condition::not_in("name", vec!["x"]);
    assert_eq!(cond.condition(), "\"name\" NOT IN (?)");
}

#[test]
fn pattern_predicates_wrap_value_with_wildcards() {
    assert_eq!(
        Condition::starts("name", "ab").params(),
        vec![Value::Text("ab%".to_string())]
    );
    assert_eq!(
        Condition::ends("name", "ab").params(),
        vec![Value::Text("%ab".to_string())]
    );

    let contains = Condition::contains("score", "12");
    assert_eq!(contains.condition(), "CAST(\"score\" AS TEXT) LIKE ?");
    assert_eq!(contains.params(), vec![Value::Text("%12%".to_string())]);
}

#[test]
fn eq_ci_lowercases_value() {
    let cond = Condition::eq_ci("email", "John@Example.COM");
    assert_eq!(cond.condition(), "LOWER(\"email\") = ?");
    assert_eq!(
        cond.params(),
        vec![Value::Text("john@example.com".to_string())]
    );
}

#[test]
fn qualified_column_is_quoted_per_part() {
    let cond = Condition::ne("agent.name", "bob");
    assert_eq!(cond.condition(), "\"agent\".\"name\" != ?");
}

#[test]
fn match_many_has_one_clause_per_column() {
    let cond = Condition::match_many("red car", ["title", "body", "tags"]).unwrap();
    let sql = cond.condition();

    assert_eq!(sql.matches(" OR ").count(), 2);
    assert_eq!(sql.matches("LIKE ?").count(), 6);
    assert!(sql.starts_with("((\"title\" LIKE ? AND \"title\" LIKE ?) OR "));
    assert_eq!(cond.params().len(), 6);
    assert_eq!(cond.params()[0], Value::Text("%red%".to_string()));
    assert_eq!(cond.params()[1], Value::Text("%car%".to_string()));
}

#[test]
fn match_rejects_blank_text_and_missing_columns() {
    let err = Condition::matches("title", "   ").unwrap_err();
    assert!(is_bad_request(&err));

    let err = Condition::match_many("word", Vec::<String>::new()).unwrap_err();
    assert!(is_bad_request(&err));
}

#[test]
fn json_eq_casts_by_constructor_type() {
    let int = Condition::json_eq("meta", ["stats", "count"], JsonEqValue::Int(3)).unwrap();
    assert_eq!(
        int.condition(),
        "CAST(json_extract(\"meta\", ?) AS INTEGER) = ?"
    );
    assert_eq!(
        int.params(),
        vec![
            Value::Text("$.\"stats\".\"count\"".to_string()),
            Value::Integer(3)
        ]
    );

    let float = Condition::json_eq("meta", ["ratio"], JsonEqValue::Float(0.5)).unwrap();
    assert!(float.condition().contains("AS REAL"));

    let text = Condition::json_eq("meta", ["kind"], JsonEqValue::Text("a".to_string())).unwrap();
    assert!(text.condition().contains("AS TEXT"));

    let list = Condition::json_eq("meta", ["id"], JsonEqValue::BigIntList(vec![7, 9])).unwrap();
    assert_eq!(
        list.condition(),
        "CAST(json_extract(\"meta\", ?) AS INTEGER) IN (?, ?)"
    );
    assert_eq!(list.params().len(), 3);
}

#[test]
fn json_contains_keeps_last_value_per_key() {
    let cond = Condition::json_contains(
        "meta",
        [
            ("kind", json!("a")),
            ("level", json!(2)),
            ("kind", json!("b")),
            ("gone", json!(null)),
        ],
    )
    .unwrap();

    assert_eq!(
        cond.condition(),
        "(json_extract(\"meta\", ?) = ? AND json_extract(\"meta\", ?) = ? AND json_type(\"meta\", ?) = 'null')"
    );
    assert_eq!(
        cond.params(),
        vec![
            Value::Text("$.\"level\"".to_string()),
            Value::Integer(2),
            Value::Text("$.\"kind\"".to_string()),
            Value::Text("b".to_string()),
            Value::Text("$.\"gone\"".to_string()),
        ]
    );
}

#[test]
fn raw_passes_through_untouched() {
    let cond = Condition::raw("length(name) > ?", vec![Value::Integer(3)]);
    assert_eq!(cond.condition(), "length(name) > ?");
    assert_eq!(cond.params(), vec![Value::Integer(3)]);
}

#[test]
fn json_contains_compares_nested_objects_by_key() {
    let cond = Condition::json_contains("meta", [("tags", json!({"role": "lead", "area": "ops"}))])
        .unwrap();

    assert_eq!(
        cond.condition(),
        "((json_type(\"meta\", ?) = 'object' AND json_remove(json_extract(\"meta\", ?), ?, ?) = '{}' \
         AND json_extract(\"meta\", ?) = ? AND json_extract(\"meta\", ?) = ?))"
    );
    assert!(cond
        .params()
        .contains(&Value::Text("$.\"tags\".\"role\"".to_string())));
}

#[test]
fn json_segments_with_double_quotes_are_rejected() {
    let err = Condition::json_eq("meta", ["a\"b"], JsonEqValue::Int(1)).unwrap_err();
    assert!(is_bad_request(&err));

    let err = Condition::json_contains("meta", [("tags", json!({"x\"y": 1}))]).unwrap_err();
    assert!(is_bad_request(&err));

    let err = Condition::json_contains_value("meta", ["ok", "no\""], "v").unwrap_err();
    assert!(is_bad_request(&err));
}
