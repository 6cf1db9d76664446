//! select_rows: validation, compilation, bounded execution.

use super::common::*;
use quarry_catalog::StaticMetadataSource;
use quarry_core::GuardrailsConfig;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn compiles_single_parameterized_select() {
    let ctx = TestContext::setup();
    let output = ctx
        .call_ok(
            "select_rows",
            json!({
                "db": "shop",
                "table": "orders",
                "columns": ["id", "total"],
                "where": { "user_id": 42 },
                "limit": 10
            }),
        )
        .await;

    assert_eq!(output["db"], "shop");
    assert_eq!(output["table"], "orders");
    assert_eq!(output["columns"], json!(["id", "total"]));
    assert_eq!(output["row_count"], 3);
    assert_eq!(output["limit"], 10);
    assert_eq!(output["rows"][0]["id"], 1);

    let queries = ctx.executor.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(
        queries[0].sql,
        "SELECT `id`, `total` FROM `shop`.`orders` WHERE `user_id` = ? LIMIT ?"
    );
    assert_eq!(serde_json::to_value(&queries[0].params).unwrap(), json!([42, 10]));
}

#[tokio::test]
async fn rows_are_truncated_to_the_limit() {
    let ctx = TestContext::builder()
        .executor(RecordingExecutor::with_rows(20))
        .build();
    let output = ctx
        .call_ok("select_rows", json!({ "db": "shop", "table": "orders", "limit": 5 }))
        .await;
    assert_eq!(output["row_count"], 5);
    assert_eq!(output["rows"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn unknown_column_compiles_nothing() {
    let ctx = TestContext::setup();
    let error = ctx
        .call_err(
            "select_rows",
            json!({ "db": "shop", "table": "orders", "columns": ["secret"] }),
        )
        .await;
    assert_error_kind(&error, "UnknownColumn");
    assert!(ctx.executor.queries().is_empty());
}

#[tokio::test]
async fn unknown_table() {
    let ctx = TestContext::setup();
    let error = ctx
        .call_err("select_rows", json!({ "db": "shop", "table": "payments" }))
        .await;
    assert_error_kind(&error, "UnknownTable");
}

#[tokio::test]
async fn limit_bounds() {
    let ctx = TestContext::setup();

    for bad in [5000, 1001, 0, -1] {
        let error = ctx
            .call_err(
                "select_rows",
                json!({ "db": "shop", "table": "orders", "limit": bad }),
            )
            .await;
        assert_error_kind(&error, "LimitOutOfRange");
    }
    for bad in [json!(10000000000000000000u64), json!(1e20), json!(2.5)] {
        let error = ctx
            .call_err(
                "select_rows",
                json!({ "db": "shop", "table": "orders", "limit": bad }),
            )
            .await;
        assert_error_kind(&error, "LimitOutOfRange");
    }
    assert!(ctx.executor.queries().is_empty());

    let output = ctx
        .call_ok("select_rows", json!({ "db": "shop", "table": "orders", "limit": 500 }))
        .await;
    assert_eq!(output["limit"], 500);

    let output = ctx
        .call_ok("select_rows", json!({ "db": "shop", "table": "orders" }))
        .await;
    assert_eq!(output["limit"], 100);
}

#[tokio::test]
async fn configured_ceiling_below_absolute_maximum() {
    let ctx = TestContext::builder()
        .guardrails(GuardrailsConfig {
            default_limit: 20,
            max_limit: 50,
            ..Default::default()
        })
        .build();

    let error = ctx
        .call_err("select_rows", json!({ "db": "shop", "table": "orders", "limit": 51 }))
        .await;
    assert_error_kind(&error, "LimitOutOfRange");

    let output = ctx
        .call_ok("select_rows", json!({ "db": "shop", "table": "orders" }))
        .await;
    assert_eq!(output["limit"], 20);
}

#[tokio::test]
async fn filter_values_never_reach_the_template() {
    let ctx = TestContext::setup();
    ctx.call_ok(
        "select_rows",
        json!({
            "db": "shop",
            "table": "orders",
            "where": [
                { "field": "user_id", "op": "in", "value": [1, 2, 3] },
                { "field": "total", "op": ">=", "value": "0 OR 1=1; DROP TABLE orders" }
            ],
            "order_by": "-total",
            "limit": 10
        }),
    )
    .await;

    let query = &ctx.executor.queries()[0];
    assert_eq!(
        query.sql,
        "SELECT `id`, `total`, `user_id` FROM `shop`.`orders` \
         WHERE (`user_id` IN (?, ?, ?) AND `total` >= ?) ORDER BY `total` DESC LIMIT ?"
    );
    assert!(!query.sql.contains("DROP"));
    assert_eq!(query.params.len(), 5);
}

#[tokio::test]
async fn malformed_filter_and_order_by() {
    let ctx = TestContext::setup();

    let error = ctx
        .call_err(
            "select_rows",
            json!({
                "db": "shop",
                "table": "orders",
                "where": { "field": "total", "op": "; DELETE", "value": 1 }
            }),
        )
        .await;
    assert_error_kind(&error, "InvalidFilter");

    let error = ctx
        .call_err(
            "select_rows",
            json!({ "db": "shop", "table": "orders", "where": { "nope": 1 } }),
        )
        .await;
    assert_error_kind(&error, "InvalidFilter");

    let error = ctx
        .call_err(
            "select_rows",
            json!({
                "db": "shop",
                "table": "orders",
                "columns": ["id"],
                "order_by": "total"
            }),
        )
        .await;
    assert_error_kind(&error, "InvalidOrderBy");
    assert!(ctx.executor.queries().is_empty());
}

#[tokio::test]
async fn driver_errors_are_generic() {
    let ctx = TestContext::builder()
        .executor(RecordingExecutor::failing())
        .build();
    let error = ctx
        .call_err("select_rows", json!({ "db": "shop", "table": "orders" }))
        .await;
    assert_error_kind(&error, "QueryFailed");
    assert_eq!(error["retryable"], false);
    let message = error["message"].as_str().unwrap();
    assert!(!message.contains("secret"));
    assert!(!message.contains("SELECT"));
}

#[tokio::test]
async fn slow_queries_time_out() {
    // A zero timeout expires as soon as the query first yields.
    let ctx = TestContext::builder()
        .executor(RecordingExecutor::slow(Duration::from_millis(200)))
        .guardrails(GuardrailsConfig {
            query_timeout_secs: 0,
            ..Default::default()
        })
        .build();
    let error = ctx
        .call_err("select_rows", json!({ "db": "shop", "table": "orders" }))
        .await;
    assert_error_kind(&error, "QueryTimeout");
    assert_eq!(error["retryable"], true);
}

#[tokio::test]
async fn no_default_database_without_signals() {
    let ctx = TestContext::setup();
    let error = ctx.call_err("select_rows", json!({ "table": "orders" })).await;
    assert_error_kind(&error, "NoDefaultDatabase");
}

#[tokio::test]
async fn table_without_whitelisted_columns_never_reaches_the_database() {
    let ctx = TestContext::builder()
        .metadata(StaticMetadataSource::default().with_table("shop", "weird", &[("bad-col", "int")]))
        .build();

    let error = ctx
        .call_err("select_rows", json!({ "db": "shop", "table": "weird" }))
        .await;
    assert_error_kind(&error, "UnknownColumn");
    assert!(ctx.executor.queries().is_empty());
}
