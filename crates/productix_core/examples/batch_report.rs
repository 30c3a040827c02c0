use std::sync::Arc;

use chrono::NaiveDate;
use productix_core::{
    InMemoryStore, NewBatch, NewProduct, NewShift, ProductionStore, ProductivityService,
};
use serde_json::json;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let org = 1;
    let store = Arc::new(InMemoryStore::new());
    let product = store
        .create_product(
            org,
            NewProduct {
                name: "Chair".into(),
                description: Some("stacking chair".into()),
                input_fields: vec!["steel".into(), "plastic".into()],
                output_fields: vec!["chairs".into()],
            },
        )
        .await?;
    let start = NaiveDate::from_ymd_opt(2025, 3, 1).ok_or("bad date")?;
    let batch = store
        .create_batch(
            org,
            NewBatch {
                product_id: product.id,
                start_date: start,
                end_date: None,
            },
        )
        .await?;
    for (label, steel, chairs) in [("morning", 100, 130), ("evening", 90, 120)] {
        store
            .record_shift(
                org,
                NewShift {
                    batch_id: batch.id,
                    date: start,
                    shift_label: label.into(),
                    input_materials: json!({
                        "steel": {"amount": steel, "unit_price": 5},
                        "plastic": {"amount": 50, "unit_price": 3},
                    }),
                    output_products: json!({"chairs": chairs}),
                    notes: None,
                },
            )
            .await?;
    }

    let service = ProductivityService::new(store);
    let report = service.batch_report(org, batch.id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    let daily = service.daily_report(org, batch.id).await?;
    println!("{}", serde_json::to_string_pretty(&daily)?);
    Ok(())
}
