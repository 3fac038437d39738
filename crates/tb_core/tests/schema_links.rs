use jsonschema::JSONSchema;
use tb_core::links::{persist_links, SyncLinkV1};

fn link_file_schema() -> serde_json::Value {
    serde_json::json!({
      "$schema": "https://json-schema.org/draft/2020-12/schema",
      "$id": "tb://schemas/link-file/v1",
      "type": "object",
      "required": ["schema_version", "links"],
      "properties": {
        "schema_version": { "const": 1 },
        "links": {
          "type": "array",
          "items": { "$ref": "#/$defs/link" }
        }
      },
      "$defs": {
        "link": {
          "type": "object",
          "required": ["obs_id", "rem_id", "score_milli", "created_at", "last_synced", "stale_runs"],
          "properties": {
            "obs_id": { "type": "string", "minLength": 1 },
            "rem_id": { "type": "string", "minLength": 1 },
            "score_milli": { "type": "integer", "minimum": 0, "maximum": 1000 },
            "created_at": { "type": "string" },
            "last_synced": { "type": ["string", "null"] },
            "rem_list_id": { "type": "string" },
            "rem_title_hash": { "type": "string", "pattern": "^blake3:[0-9a-f]{64}$" },
            "rem_last_known_title": { "type": "string" },
            "stale_runs": { "type": "integer", "minimum": 0 }
          },
          "additionalProperties": false
        }
      },
      "additionalProperties": false
    })
}

#[test]
fn persisted_link_file_matches_the_schema() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sync_links_vault-1.json");

    let link = SyncLinkV1 {
        obs_id: "o1".to_string(),
        rem_id: "r1".to_string(),
        score_milli: 875,
        created_at: "2025-01-01T00:00:00Z".to_string(),
        last_synced: Some("2025-01-02T00:00:00Z".to_string()),
        rem_list_id: Some("L-default".to_string()),
        rem_title_hash: Some(tb_core::text::title_hash("Buy milk")),
        rem_last_known_title: Some("Buy milk".to_string()),
        stale_runs: 0,
    };
    persist_links(&path, &[link]).expect("persist");

    let bytes = std::fs::read(&path).expect("read link file");
    let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("parse link file");
    let schema = JSONSchema::compile(&link_file_schema()).expect("compile link schema");
    assert!(schema.is_valid(&payload));
}

#[test]
fn schema_rejects_fractional_scores() {
    let schema = JSONSchema::compile(&link_file_schema()).expect("compile link schema");
    let invalid = serde_json::json!({
      "schema_version": 1,
      "links": [{
        "obs_id": "o1",
        "rem_id": "r1",
        "score_milli": 0.875,
        "created_at": "2025-01-01T00:00:00Z",
        "last_synced": null,
        "stale_runs": 0
      }]
    });
    assert!(!schema.is_valid(&invalid));
}
