//! infer_database and the session default database.

use super::common::*;
use serde_json::json;

#[tokio::test]
async fn env_file_selects_and_remembers_database() {
    let ctx = TestContext::builder()
        .file(".env", "DB_HOST=127.0.0.1\nDB_NAME=crm\n")
        .build();

    let inferred = ctx.call_ok("infer_database", json!({})).await;
    assert_eq!(inferred, json!({ "db": "crm" }));

    let current = ctx.call_ok("current_database", json!({})).await;
    assert_eq!(current, json!({ "db": "crm" }));

    // Later calls default to the inferred database.
    assert_eq!(ctx.call_ok("list_tables", json!({})).await, json!(["contacts"]));
}

#[tokio::test]
async fn evidence_is_aggregate_only() {
    let ctx = TestContext::builder()
        .file(".env", "DB_PASSWORD=hunter2\nDATABASE_URL=mysql://app:hunter2@db:3306/shop\n")
        .file("src/repo.sql", "SELECT * FROM orders;")
        .build();

    let inferred = ctx
        .call_ok("infer_database", json!({ "include_evidence": true }))
        .await;
    assert_eq!(inferred["db"], "shop");

    let evidence = &inferred["evidence"];
    assert_eq!(evidence["candidates_count"], 3);
    assert_eq!(evidence["files_scanned"], 2);
    assert_eq!(evidence["method"], "highest_score");
    assert_eq!(evidence["candidates"][0]["database"], "shop");
    assert_eq!(evidence["candidates"][0]["matches"]["connection_string"], 1);
    assert_eq!(evidence["candidates"][0]["matches"]["table_literal"], 1);

    let text = evidence.to_string();
    let root = ctx.project.path().to_string_lossy().to_string();
    for leaked in [root.as_str(), "hunter2", "repo.sql", ".env", "DATABASE_URL", "SELECT"] {
        assert!(!text.contains(leaked), "evidence leaked {leaked}: {text}");
    }
}

#[tokio::test]
async fn shared_table_literal_is_ambiguous() {
    let ctx = TestContext::builder()
        .file("app.js", "db.query('SELECT email FROM users WHERE id = ?')")
        .build();

    let error = ctx.call_err("infer_database", json!({})).await;
    assert_error_kind(&error, "AmbiguousInference");
    assert_eq!(ctx.call_ok("current_database", json!({})).await, json!({ "db": null }));
}

#[tokio::test]
async fn no_signals_found() {
    let ctx = TestContext::builder().file("README.md", "# hello").build();
    let error = ctx.call_err("infer_database", json!({})).await;
    assert_error_kind(&error, "NoSignalsFound");
}

#[tokio::test]
async fn explicit_project_root_overrides_configured_one() {
    let ctx = TestContext::setup();
    let other = project(&[("config/database.yml", "database: shop_test\n")]);

    let inferred = ctx
        .call_ok(
            "infer_database",
            json!({ "project_root": other.path().to_string_lossy() }),
        )
        .await;
    assert_eq!(inferred["db"], "shop_test");
}

#[tokio::test]
async fn session_database_close_to_winner_is_ambiguous() {
    let ctx = TestContext::builder()
        .file(".env", "DB_NAME=shop_test\n")
        .file("config/database.yml", "url: mysql://h:3306/crm\n")
        .build();

    ctx.call_ok("use_database", json!({ "db": "shop_test" })).await;
    let error = ctx.call_err("infer_database", json!({})).await;
    assert_error_kind(&error, "AmbiguousInference");
    assert_eq!(
        ctx.call_ok("current_database", json!({})).await,
        json!({ "db": "shop_test" })
    );
}

#[tokio::test]
async fn automatic_inference_on_first_use() {
    let ctx = TestContext::builder()
        .file(".env", "MYSQL_DATABASE=shop\n")
        .build();

    let output = ctx.call_ok("select_rows", json!({ "table": "orders" })).await;
    assert_eq!(output["db"], "shop");
    assert_eq!(ctx.call_ok("current_database", json!({})).await, json!({ "db": "shop" }));
}

#[tokio::test]
async fn use_database_validates_name() {
    let ctx = TestContext::setup();

    let error = ctx.call_err("use_database", json!({ "db": "nowhere" })).await;
    assert_error_kind(&error, "UnknownDatabase");

    let error = ctx.call_err("use_database", json!({})).await;
    assert_error_kind(&error, "InvalidArguments");

    assert_eq!(
        ctx.call_ok("use_database", json!({ "db": "shop" })).await,
        json!({ "db": "shop" })
    );
    assert_eq!(ctx.call_ok("list_tables", json!({})).await, json!(["orders", "users"]));
}

#[tokio::test]
async fn dropped_session_database_is_forgotten_after_refresh() {
    let ctx = TestContext::setup();
    ctx.call_ok("use_database", json!({ "db": "crm" })).await;

    ctx.source.replace(
        quarry_catalog::StaticMetadataSource::default()
            .with_table("shop", "orders", &[("id", "int")]),
    );
    ctx.call_ok("refresh_schema", json!({})).await;

    assert_eq!(ctx.call_ok("current_database", json!({})).await, json!({ "db": null }));
    // A single remaining database becomes the default.
    assert_eq!(ctx.call_ok("list_tables", json!({})).await, json!(["orders"]));
}
