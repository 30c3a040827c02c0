//! Organization-wide summary metrics.

use std::collections::HashMap;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateTotals;
use crate::model::{Batch, Product, ProductId, ShiftRecord};
use crate::normalize::normalize_shift;
use crate::ratio::guarded_ratio;
use crate::rollup::PeriodSummary;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ProductSummary {
    pub product_id: ProductId,
    pub name: String,
    pub batch_count: usize,
    #[serde(flatten)]
    pub summary: PeriodSummary,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DashboardSummary {
    pub total_products: usize,
    /// Batches still open.
    pub running_batches: usize,
    pub shifts_today: usize,
    pub total_output_units: f64,
    pub total_input_cost: f64,
    pub avg_cost_per_unit: f64,
    /// Mean of per-product productivity ratios, over products that have both
    /// output and input recorded.
    pub avg_productivity_ratio: f64,
    pub per_product: Vec<ProductSummary>,
}

pub fn summarize(
    products: &[Product],
    batches: &[Batch],
    shifts: &[ShiftRecord],
    today: NaiveDate,
) -> DashboardSummary {
    let product_of: HashMap<_, _> = batches.iter().map(|b| (b.id, b.product_id)).collect();

    let mut per_product: HashMap<ProductId, AggregateTotals> = HashMap::new();
    for record in shifts {
        if let Some(product_id) = product_of.get(&record.batch_id) {
            per_product
                .entry(*product_id)
                .or_default()
                .add_shift(&normalize_shift(record));
        }
    }

    let mut total_output_units = 0.0;
    let mut total_input_cost = 0.0;
    let mut ratios = Vec::new();
    let summaries: Vec<ProductSummary> = products
        .iter()
        .map(|product| {
            let totals = per_product.remove(&product.id).unwrap_or_default();
            let summary = PeriodSummary::from_totals(&totals);
            total_output_units += summary.total_output;
            total_input_cost += summary.total_input_cost;
            if summary.total_output > 0.0 && summary.total_input_amount > 0.0 {
                ratios.push(summary.productivity_ratio);
            }
            ProductSummary {
                product_id: product.id,
                name: product.name.clone(),
                batch_count: batches.iter().filter(|b| b.product_id == product.id).count(),
                summary,
            }
        })
        .collect();

    DashboardSummary {
        total_products: products.len(),
        running_batches: batches.iter().filter(|b| b.is_open()).count(),
        shifts_today: shifts.iter().filter(|s| s.date == today).count(),
        total_output_units,
        total_input_cost,
        avg_cost_per_unit: guarded_ratio(total_input_cost, total_output_units),
        avg_productivity_ratio: guarded_ratio(ratios.iter().sum(), ratios.len() as f64),
        per_product: summaries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BatchStatus;
    use serde_json::json;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).expect("date")
    }

    fn product(id: ProductId, name: &str) -> Product {
        Product {
            id,
            organization_id: 1,
            name: name.into(),
            description: None,
            input_fields: vec![],
            output_fields: vec![],
        }
    }

    fn batch(id: i64, product_id: ProductId, status: BatchStatus) -> Batch {
        Batch {
            id,
            organization_id: 1,
            product_id,
            batch_number: "BATCH-001".into(),
            start_date: day(1),
            end_date: None,
            status,
        }
    }

    fn record(id: i64, batch_id: i64, d: u32, steel: f64, out: f64) -> ShiftRecord {
        ShiftRecord {
            id,
            organization_id: 1,
            batch_id,
            date: day(d),
            shift_label: "morning".into(),
            input_materials: json!({"steel": {"amount": steel, "unit_price": 2}}),
            output_products: json!({"units": {"amount": out}}),
            notes: None,
        }
    }

    #[test]
    fn summarizes_counts_and_averages() {
        let products = vec![product(1, "Juice"), product(2, "Cans"), product(3, "Idle")];
        let batches = vec![
            batch(10, 1, BatchStatus::Open),
            batch(11, 2, BatchStatus::Closed),
            batch(12, 3, BatchStatus::Open),
        ];
        let shifts = vec![
            record(1, 10, 2, 10.0, 20.0),
            record(2, 10, 3, 10.0, 20.0),
            record(3, 11, 3, 50.0, 25.0),
        ];
        let s = summarize(&products, &batches, &shifts, day(3));
        assert_eq!(s.total_products, 3);
        assert_eq!(s.running_batches, 2);
        assert_eq!(s.shifts_today, 2);
        assert_eq!(s.total_output_units, 65.0);
        assert_eq!(s.total_input_cost, 140.0);
        assert!((s.avg_cost_per_unit - 140.0 / 65.0).abs() < 1e-9);
        // Juice 40/20 = 2.0, Cans 25/50 = 0.5, Idle excluded.
        assert_eq!(s.avg_productivity_ratio, 1.25);
        assert_eq!(s.per_product.len(), 3);
        assert_eq!(s.per_product[2].summary.shift_count, 0);
    }

    #[test]
    fn empty_organization_is_all_zero() {
        let s = summarize(&[], &[], &[], day(1));
        assert_eq!(s, DashboardSummary::default());
    }
}
