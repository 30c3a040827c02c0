//! Batch-level productivity report.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateTotals;
use crate::model::{Batch, BatchId, BatchStatus, ProductId};
use crate::ratio::guarded_ratio;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct FieldTotals {
    pub inputs: BTreeMap<String, f64>,
    pub outputs: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct InputStats {
    pub total_used: f64,
    /// Effective price: total cost divided by amount used.
    pub unit_price: f64,
    pub total_cost: f64,
    pub cost_per_output_unit: f64,
    /// Total output per unit of this input.
    pub productivity_ratio: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct BatchReport {
    pub batch_id: BatchId,
    pub batch_number: String,
    pub product_id: ProductId,
    pub status: BatchStatus,
    pub totals: FieldTotals,
    pub total_input_cost: f64,
    pub total_output: f64,
    pub total_input_amount: f64,
    pub cost_per_unit: f64,
    pub productivity_ratio: f64,
    /// Sorted, each field once.
    pub missing_unit_prices: Vec<String>,
    pub per_input_stats: BTreeMap<String, InputStats>,
    pub shift_count: usize,
}

impl BatchReport {
    /// Compose a report from aggregated totals. Pure; building twice from the
    /// same totals yields identical reports.
    pub fn build(batch: &Batch, totals: &AggregateTotals) -> Self {
        let per_input_stats = totals
            .input_totals
            .iter()
            .map(|(name, &used)| {
                let cost = totals.input_costs.get(name).copied().unwrap_or(0.0);
                let stats = InputStats {
                    total_used: used,
                    unit_price: guarded_ratio(cost, used),
                    total_cost: cost,
                    cost_per_output_unit: guarded_ratio(cost, totals.total_output),
                    productivity_ratio: guarded_ratio(totals.total_output, used),
                };
                (name.clone(), stats)
            })
            .collect();

        Self {
            batch_id: batch.id,
            batch_number: batch.batch_number.clone(),
            product_id: batch.product_id,
            status: batch.status,
            totals: FieldTotals {
                inputs: totals.input_totals.clone(),
                outputs: totals.output_totals.clone(),
            },
            total_input_cost: totals.total_input_cost,
            total_output: totals.total_output,
            total_input_amount: totals.total_input_amount,
            cost_per_unit: guarded_ratio(totals.total_input_cost, totals.total_output),
            productivity_ratio: guarded_ratio(totals.total_output, totals.total_input_amount),
            missing_unit_prices: totals.missing_unit_prices.iter().cloned().collect(),
            per_input_stats,
            shift_count: totals.shift_count,
        }
    }
}
