//! Productivity over flat input/output maps: ad-hoc calculations, and the
//! same ratios applied to every recorded shift.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ProductixError;
use crate::model::{Batch, BatchId, FieldMap, Product, ProductId, ShiftId, ShiftRecord};
use crate::normalize::{FieldKind, normalize_fields, normalize_shift};
use crate::ratio::guarded_ratio;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CalculationInput {
    /// Field name to amount (number, numeric string or `{amount}` object).
    #[serde(default)]
    pub inputs: serde_json::Value,
    #[serde(default)]
    pub outputs: serde_json::Value,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CalculationResult {
    pub processed_inputs: BTreeMap<String, f64>,
    pub processed_outputs: BTreeMap<String, f64>,
    pub total_input: f64,
    pub total_output: f64,
    /// Total output over total input.
    pub combined_productivity: f64,
    /// Total output over each single input.
    pub single_productivity: BTreeMap<String, f64>,
    pub skipped_fields: Vec<String>,
}

pub fn calculate(input: &CalculationInput) -> Result<CalculationResult, ProductixError> {
    let inputs = normalize_fields(&input.inputs, FieldKind::Input);
    let outputs = normalize_fields(&input.outputs, FieldKind::Output);

    if outputs.fields.is_empty() {
        return Err(ProductixError::InvalidInput(
            "output data is missing".to_string(),
        ));
    }

    let processed_inputs: BTreeMap<String, f64> = inputs
        .fields
        .iter()
        .map(|(k, q)| (k.clone(), q.amount))
        .collect();
    let processed_outputs: BTreeMap<String, f64> = outputs
        .fields
        .iter()
        .map(|(k, q)| (k.clone(), q.amount))
        .collect();

    let total_input: f64 = processed_inputs.values().sum();
    let total_output: f64 = processed_outputs.values().sum();

    let single_productivity = processed_inputs
        .iter()
        .map(|(k, &v)| (k.clone(), guarded_ratio(total_output, v)))
        .collect();

    let mut skipped_fields = inputs.skipped;
    skipped_fields.extend(outputs.skipped);

    Ok(CalculationResult {
        combined_productivity: guarded_ratio(total_output, total_input),
        processed_inputs,
        processed_outputs,
        total_input,
        total_output,
        single_productivity,
        skipped_fields,
    })
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ShiftProductivity {
    pub shift_id: ShiftId,
    pub batch_id: BatchId,
    pub batch_number: String,
    pub date: NaiveDate,
    pub shift_label: String,
    pub inputs: BTreeMap<String, f64>,
    pub outputs: BTreeMap<String, f64>,
    pub combined_productivity: f64,
    /// Keyed `"<input> / <output>"`: that output over that input.
    pub single_productivity: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ProductProductivity {
    pub product_id: ProductId,
    pub product_name: String,
    pub records: Vec<ShiftProductivity>,
}

fn amounts(fields: &FieldMap) -> BTreeMap<String, f64> {
    fields.iter().map(|(k, q)| (k.clone(), q.amount)).collect()
}

pub fn shift_productivity(batch: &Batch, record: &ShiftRecord) -> ShiftProductivity {
    let shift = normalize_shift(record);
    let inputs = amounts(&shift.inputs);
    let outputs = amounts(&shift.outputs);

    let mut single_productivity = BTreeMap::new();
    for (input, &used) in &inputs {
        for (output, &made) in &outputs {
            single_productivity.insert(format!("{input} / {output}"), guarded_ratio(made, used));
        }
    }

    ShiftProductivity {
        shift_id: record.id,
        batch_id: batch.id,
        batch_number: batch.batch_number.clone(),
        date: shift.date,
        shift_label: shift.shift_label,
        combined_productivity: guarded_ratio(outputs.values().sum(), inputs.values().sum()),
        inputs,
        outputs,
        single_productivity,
    }
}

/// Every shift's productivity, grouped by product. Products without shifts
/// are listed with no records.
pub fn productivity_records(
    products: &[Product],
    batches: &[Batch],
    shifts: &[ShiftRecord],
) -> Vec<ProductProductivity> {
    products
        .iter()
        .map(|product| {
            let records = batches
                .iter()
                .filter(|b| b.product_id == product.id)
                .flat_map(|batch| {
                    shifts
                        .iter()
                        .filter(move |s| s.batch_id == batch.id)
                        .map(move |s| shift_productivity(batch, s))
                })
                .collect();
            ProductProductivity {
                product_id: product.id,
                product_name: product.name.clone(),
                records,
            }
        })
        .collect()
}
