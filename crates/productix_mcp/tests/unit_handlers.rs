use std::sync::Arc;

use chrono::NaiveDate;
use productix_core::{
    InMemoryStore, NewBatch, NewProduct, NewShift, ProductionStore, ProductivityService,
    ProductixError,
};
use productix_mcp::McpError;
use productix_mcp::middleware::LoggingMiddleware;
use productix_mcp::types::{CreateBatchParams, RecordShiftParams};
use serde_json::json;

#[tokio::test]
async fn service_over_logging_store_builds_reports() {
    let store = Arc::new(LoggingMiddleware::new(InMemoryStore::new()));
    let product = store
        .create_product(
            1,
            NewProduct {
                name: "Doors".into(),
                description: None,
                input_fields: vec!["wood".into()],
                output_fields: vec!["doors".into()],
            },
        )
        .await
        .unwrap();
    let batch = store
        .create_batch(
            1,
            CreateBatchParams {
                product_id: product.id,
                start_date: "2025-07-01".into(),
                end_date: Some("2025-07-31".into()),
            }
            .into_new_batch()
            .unwrap(),
        )
        .await
        .unwrap();
    let shift: RecordShiftParams = serde_json::from_value(json!({
        "batch_id": batch.id,
        "date": "2025-07-01T06:00:00",
        "shift_no": "morning",
        "input_materials": "{\"wood\": {\"amount\": 40, \"unitPrice\": 2.5}}",
        "output_products": {"doors": 8}
    }))
    .unwrap();
    store
        .record_shift(1, shift.into_new_shift().unwrap())
        .await
        .unwrap();

    let svc = ProductivityService::new(store);
    let report = svc.batch_report(1, batch.id).await.unwrap();
    assert_eq!(report.total_input_cost, 100.0);
    assert_eq!(report.cost_per_unit, 12.5);
    assert_eq!(report.productivity_ratio, 0.2);
}

#[tokio::test]
async fn unknown_product_batch_is_not_found() {
    let store = LoggingMiddleware::new(InMemoryStore::new());
    let err = store
        .create_batch(
            1,
            NewBatch {
                product_id: 99,
                start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                end_date: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        McpError::from(err).status(),
        axum::http::StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn shift_on_unknown_batch_is_not_found() {
    let store = LoggingMiddleware::new(InMemoryStore::new());
    let err = store
        .record_shift(
            1,
            NewShift {
                batch_id: 5,
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                shift_label: "night".into(),
                input_materials: json!({}),
                output_products: json!({}),
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ProductixError::NotFound(_)));
}
