use tb_core::canon_json::to_canonical_bytes;

#[test]
fn canonical_bytes_sort_keys_recursively() {
    let value = serde_json::json!({
        "zeta": { "b": 2, "a": 1 },
        "alpha": [ { "y": true, "x": false } ]
    });
    let bytes = to_canonical_bytes(&value).expect("canonical bytes");
    assert_eq!(
        String::from_utf8(bytes).expect("utf8"),
        r#"{"alpha":[{"x":false,"y":true}],"zeta":{"a":1,"b":2}}"#
    );
}

#[test]
fn canonical_bytes_reject_floats() {
    let value = serde_json::json!({ "score": 0.875 });
    let err = to_canonical_bytes(&value).expect_err("floats forbidden");
    assert_eq!(err.code, "TB_CANON_JSON_FLOAT_FORBIDDEN");
}

#[test]
fn canonical_bytes_are_stable_across_key_insertion_order() {
    let mut first = serde_json::Map::new();
    first.insert("b".to_string(), serde_json::json!(1));
    first.insert("a".to_string(), serde_json::json!(2));

    let mut second = serde_json::Map::new();
    second.insert("a".to_string(), serde_json::json!(2));
    second.insert("b".to_string(), serde_json::json!(1));

    assert_eq!(
        to_canonical_bytes(&serde_json::Value::Object(first)).expect("bytes"),
        to_canonical_bytes(&serde_json::Value::Object(second)).expect("bytes")
    );
}
