//! Catalog-backed tools: list_databases, list_tables, describe_table,
//! refresh_schema.

use super::common::*;
use quarry_catalog::StaticMetadataSource;
use quarry_core::GuardrailsConfig;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn list_databases_is_sorted_and_cached() {
    let ctx = TestContext::setup();

    let first = ctx.call_ok("list_databases", json!({})).await;
    assert_eq!(first, json!(["crm", "shop", "shop_test"]));

    let second = ctx.call_ok("list_databases", json!(null)).await;
    assert_eq!(first, second);
    assert_eq!(ctx.source.fetches(), 1);
}

#[tokio::test]
async fn system_databases_are_hidden() {
    let ctx = TestContext::builder()
        .metadata(
            StaticMetadataSource::default()
                .with_table("mysql", "user", &[("id", "int")])
                .with_database("information_schema")
                .with_table("app", "things", &[("id", "int")]),
        )
        .build();

    assert_eq!(ctx.call_ok("list_databases", json!({})).await, json!(["app"]));
    let error = ctx.call_err("list_tables", json!({ "db": "mysql" })).await;
    assert_error_kind(&error, "UnknownDatabase");
}

#[tokio::test]
async fn list_tables_for_explicit_database() {
    let ctx = TestContext::setup();
    let tables = ctx.call_ok("list_tables", json!({ "db": "shop" })).await;
    assert_eq!(tables, json!(["orders", "users"]));
}

#[tokio::test]
async fn list_tables_rejects_unknown_and_malformed_names() {
    let ctx = TestContext::setup();

    let error = ctx.call_err("list_tables", json!({ "db": "warehouse" })).await;
    assert_error_kind(&error, "UnknownDatabase");
    assert_eq!(error["retryable"], false);

    let error = ctx
        .call_err("list_tables", json!({ "db": "shop`; DROP DATABASE shop; --" }))
        .await;
    assert_error_kind(&error, "InvalidIdentifier");
    assert!(!error["message"].as_str().unwrap().contains("DROP"));
}

#[tokio::test]
async fn describe_table_reports_columns_in_order() {
    let ctx = TestContext::setup();
    let table = ctx
        .call_ok("describe_table", json!({ "db": "shop", "table": "orders" }))
        .await;

    assert_eq!(table["db"], "shop");
    assert_eq!(table["table"], "orders");
    assert_eq!(table["primary_key"], json!(["id"]));
    let names: Vec<_> = table["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["id", "total", "user_id"]);
    assert_eq!(table["columns"][1]["data_type"], "decimal");
}

#[tokio::test]
async fn describe_table_reports_comment_defaults_and_indexes() {
    let ctx = TestContext::setup();
    let table = ctx
        .call_ok("describe_table", json!({ "db": "shop", "table": "orders" }))
        .await;

    assert_eq!(table["comment"], "Customer orders");
    assert_eq!(table["columns"][1]["default"], "0.00");
    assert_eq!(table["columns"][2]["default"], json!(null));
    assert_eq!(
        table["indexes"],
        json!([
            {"name": "PRIMARY", "columns": ["id"], "unique": true, "index_type": "BTREE"},
            {"name": "idx_user", "columns": ["user_id"], "unique": false, "index_type": "BTREE"}
        ])
    );

    let users = ctx
        .call_ok("describe_table", json!({ "db": "shop", "table": "users" }))
        .await;
    assert_eq!(users["comment"], "");
    assert_eq!(users["indexes"], json!([]));
    assert_eq!(users["primary_key"], json!(["id"]));
}

#[tokio::test]
async fn describe_unknown_table() {
    let ctx = TestContext::setup();
    let error = ctx
        .call_err("describe_table", json!({ "db": "crm", "table": "orders" }))
        .await;
    assert_error_kind(&error, "UnknownTable");
}

#[tokio::test]
async fn describe_table_requires_table_argument() {
    let ctx = TestContext::setup();
    let error = ctx.call_err("describe_table", json!({ "db": "shop" })).await;
    assert_error_kind(&error, "InvalidArguments");
    assert!(error["message"].as_str().unwrap().contains("table"));
}

#[tokio::test]
async fn refresh_schema_publishes_new_generation() {
    let ctx = TestContext::setup();
    assert_eq!(
        ctx.call_ok("list_tables", json!({ "db": "crm" })).await,
        json!(["contacts"])
    );

    ctx.source.replace(
        shop_metadata().with_table("crm", "deals", &[("id", "int"), ("amount", "decimal")]),
    );
    // The cached snapshot is still served until a refresh.
    assert_eq!(
        ctx.call_ok("list_tables", json!({ "db": "crm" })).await,
        json!(["contacts"])
    );

    let refreshed = ctx.call_ok("refresh_schema", json!({})).await;
    assert_eq!(refreshed["generation"], 2);
    assert_eq!(refreshed["databases"], json!(["crm", "shop", "shop_test"]));
    assert_eq!(
        ctx.call_ok("list_tables", json!({ "db": "crm" })).await,
        json!(["contacts", "deals"])
    );
}

#[tokio::test]
async fn unavailable_catalog_is_retryable() {
    let project = project(&[]);
    let server = server_with(
        Arc::new(DownSource),
        Arc::new(RecordingExecutor::default()),
        project.path(),
        &GuardrailsConfig::default(),
    );
    let session = quarry_mcp::Session::new();
    let request = quarry_mcp::JsonRpcRequest::new(
        1,
        "tools/call",
        Some(json!({ "name": "list_databases", "arguments": {} })),
    );
    let result = server.handle_request(request, &session).await.result.unwrap();

    assert_eq!(result["isError"], true);
    let error = &result["content"][1]["json"]["error"];
    assert_error_kind(error, "CatalogUnavailable");
    assert_eq!(error["retryable"], true);
    let message = error["message"].as_str().unwrap();
    assert!(!message.contains("connection refused"), "{message}");
    assert!(!result["content"][0]["text"].as_str().unwrap().contains("connection refused"));
}
