//! Shared fixtures for unit tests: a seeded in-memory store and a canned
//! completion client.
#![cfg(test)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use productix_core::{
    BatchId, CompletionRequest, InMemoryStore, NewBatch, NewProduct, NewShift, OrgId, ProductId,
    ProductionStore, ProductixError, TextCompletion,
};
use serde_json::json;

pub struct Fixture {
    pub org: OrgId,
    pub product_id: ProductId,
    pub batch_id: BatchId,
}

/// One product with one open batch holding a single morning shift:
/// steel 100 @ 5, plastic 50 @ 3, finished 130.
pub async fn seeded_store() -> (Arc<InMemoryStore>, Fixture) {
    let org = 1;
    let store = Arc::new(InMemoryStore::new());
    let product = store
        .create_product(
            org,
            NewProduct {
                name: "Chair".into(),
                description: None,
                input_fields: vec!["steel".into(), "plastic".into()],
                output_fields: vec!["finished".into()],
            },
        )
        .await
        .expect("product");
    let date = NaiveDate::from_ymd_opt(2025, 3, 1).expect("date");
    let batch = store
        .create_batch(
            org,
            NewBatch {
                product_id: product.id,
                start_date: date,
                end_date: None,
            },
        )
        .await
        .expect("batch");
    store
        .record_shift(
            org,
            NewShift {
                batch_id: batch.id,
                date,
                shift_label: "morning".into(),
                input_materials: json!({
                    "steel": {"amount": 100, "unit_price": 5},
                    "plastic": {"amount": 50, "unit_price": 3}
                }),
                output_products: json!({"finished": 130}),
                notes: None,
            },
        )
        .await
        .expect("shift");
    (
        store,
        Fixture {
            org,
            product_id: product.id,
            batch_id: batch.id,
        },
    )
}

/// Completion client that always answers with the same text.
pub struct CannedCompletion {
    reply: String,
}

impl CannedCompletion {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl TextCompletion for CannedCompletion {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, ProductixError> {
        Ok(self.reply.clone())
    }
}
