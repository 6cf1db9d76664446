//! Tool input schemas compile and agree with what the tools accept.

use quarry_mcp::ToolRegistry;
use serde_json::{Value, json};

fn validator(tool: &str) -> jsonschema::Validator {
    let registry = ToolRegistry::builtin();
    let schema = &registry.get(tool).expect(tool).input_schema;
    jsonschema::validator_for(schema).expect("schema compiles")
}

#[test]
fn every_schema_compiles() {
    for tool in ToolRegistry::builtin().list() {
        assert!(
            jsonschema::validator_for(&tool.input_schema).is_ok(),
            "{} has an invalid input schema",
            tool.name
        );
    }
}

#[test]
fn select_rows_schema() {
    let v = validator("select_rows");
    let accepted: [Value; 3] = [
        json!({ "table": "orders" }),
        json!({ "table": "orders", "db": "shop", "columns": ["id"], "where": {"user_id": 42}, "limit": 10 }),
        json!({ "table": "orders", "where": [{"field": "total", "op": ">", "value": 5}], "order_by": "-total" }),
    ];
    for args in &accepted {
        assert!(v.is_valid(args), "rejected {args}");
    }

    let rejected: [Value; 5] = [
        json!({}),
        json!({ "table": "orders; drop" }),
        json!({ "table": "orders", "limit": 5000 }),
        json!({ "table": "orders", "limit": 0 }),
        json!({ "table": "orders", "sql": "SELECT 1" }),
    ];
    for args in &rejected {
        assert!(!v.is_valid(args), "accepted {args}");
    }
}

#[test]
fn use_database_requires_db() {
    let v = validator("use_database");
    assert!(v.is_valid(&json!({ "db": "shop" })));
    assert!(!v.is_valid(&json!({})));
}

#[test]
fn infer_database_schema() {
    let v = validator("infer_database");
    assert!(v.is_valid(&json!({})));
    assert!(v.is_valid(&json!({ "project_root": "/srv/app", "include_evidence": true })));
    assert!(!v.is_valid(&json!({ "include_evidence": "yes" })));
}
