//! Parameter and result types shared by the MCP tools and the HTTP routes.

use productix_core::analysis::SectionedAnalysis;
use productix_core::calculator::{CalculationInput, CalculationResult, ProductProductivity};
use productix_core::utils::parse_date;
use productix_core::{
    AnalysisKind, AnalysisRecord, Batch, BatchId, BatchStatus, BatchUpdate, NewBatch, NewShift,
    Product, ProductId, ProductUpdate, ShiftId, ShiftRecord, ShiftUpdate,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::McpError;

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ProductIdParam {
    pub product_id: ProductId,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct BatchIdParam {
    pub batch_id: BatchId,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ShiftIdParam {
    pub shift_id: ShiftId,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateProductParams {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub update: ProductUpdate,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct ListBatchesParams {
    /// Restrict to one product's batches
    pub product_id: Option<ProductId>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CreateBatchParams {
    pub product_id: ProductId,
    /// Start date (YYYY-MM-DD)
    pub start_date: String,
    /// Planned end date (YYYY-MM-DD)
    pub end_date: Option<String>,
}

impl CreateBatchParams {
    pub fn into_new_batch(self) -> Result<NewBatch, McpError> {
        Ok(NewBatch {
            product_id: self.product_id,
            start_date: required_date("start_date", &self.start_date)?,
            end_date: optional_date("end_date", self.end_date.as_deref())?,
        })
    }
}

/// Batch fields to change; dates as YYYY-MM-DD.
#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct BatchChanges {
    pub batch_number: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// `open` or `closed`
    pub status: Option<BatchStatus>,
}

impl BatchChanges {
    pub fn into_update(self) -> Result<BatchUpdate, McpError> {
        Ok(BatchUpdate {
            batch_number: self.batch_number,
            start_date: optional_date("start_date", self.start_date.as_deref())?,
            end_date: optional_date("end_date", self.end_date.as_deref())?,
            status: self.status,
        })
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateBatchParams {
    pub batch_id: BatchId,
    #[serde(flatten)]
    pub changes: BatchChanges,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct RecordShiftParams {
    pub batch_id: BatchId,
    /// Production date (YYYY-MM-DD)
    pub date: String,
    /// Shift label such as morning, evening or night
    #[serde(alias = "shift_no")]
    pub shift_label: String,
    /// Field name to amount, or to {amount, unit_price}
    #[serde(default)]
    pub input_materials: serde_json::Value,
    /// Field name to amount
    #[serde(default)]
    pub output_products: serde_json::Value,
    #[serde(alias = "admin_notes")]
    pub notes: Option<String>,
}

impl RecordShiftParams {
    pub fn into_new_shift(self) -> Result<NewShift, McpError> {
        Ok(NewShift {
            batch_id: self.batch_id,
            date: required_date("date", &self.date)?,
            shift_label: self.shift_label,
            input_materials: self.input_materials,
            output_products: self.output_products,
            notes: self.notes,
        })
    }
}

/// Shift fields to change. Field maps replace the stored ones whole.
#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct ShiftChanges {
    /// Production date (YYYY-MM-DD)
    pub date: Option<String>,
    #[serde(alias = "shift_no")]
    pub shift_label: Option<String>,
    pub input_materials: Option<serde_json::Value>,
    pub output_products: Option<serde_json::Value>,
    #[serde(alias = "admin_notes")]
    pub notes: Option<String>,
}

impl ShiftChanges {
    pub fn into_update(self) -> Result<ShiftUpdate, McpError> {
        Ok(ShiftUpdate {
            date: optional_date("date", self.date.as_deref())?,
            shift_label: self.shift_label,
            input_materials: self.input_materials,
            output_products: self.output_products,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateShiftParams {
    pub shift_id: ShiftId,
    #[serde(flatten)]
    pub changes: ShiftChanges,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct ListShiftsParams {
    /// Restrict to one batch's shifts
    pub batch_id: Option<BatchId>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct HistoryParams {
    /// calculation, calculation_analysis, batch_analysis or agent_report
    pub kind: Option<AnalysisKind>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct TrendLength {
    /// Number of most recent entries (default 3)
    pub n: Option<u32>,
}

impl TrendLength {
    pub fn resolve(&self) -> Result<usize, McpError> {
        match self.n {
            None => Ok(productix_core::service::DEFAULT_TREND_LENGTH),
            Some(0) => Err(McpError::Validation("n must be at least 1".into())),
            Some(n) => Ok(n as usize),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ShiftTrendParams {
    pub batch_id: BatchId,
    /// Number of most recent shifts (default 3)
    pub n: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct BatchTrendParams {
    pub product_id: ProductId,
    /// Number of most recent batches (default 3)
    pub n: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CalculateParams {
    #[serde(flatten)]
    pub input: CalculationInput,
    /// Also request an AI efficiency analysis
    #[serde(default)]
    pub with_analysis: bool,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct QuestionParams {
    pub question: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GoalParams {
    /// What the report should achieve, e.g. "reduce steel cost per unit"
    pub goal: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ProductsResult {
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct BatchesResult {
    pub batches: Vec<Batch>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ShiftsResult {
    pub shifts: Vec<ShiftRecord>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ProductivityRecordsResult {
    pub products: Vec<ProductProductivity>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct HistoryResult {
    pub analyses: Vec<AnalysisRecord>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct Deleted {
    pub id: i64,
    pub deleted: bool,
}

impl Deleted {
    pub fn new(id: i64) -> Self {
        Self { id, deleted: true }
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CalculationResponse {
    #[serde(flatten)]
    pub calculation: CalculationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<SectionedAnalysis>,
}

// === Prompt Parameters ===

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct BatchReviewParams {
    pub batch_id: BatchId,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CostReductionParams {
    pub product_id: Option<ProductId>,
    pub focus: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DailyPerformanceParams {
    pub batch_id: BatchId,
    pub date: Option<String>,
}

fn required_date(field: &str, raw: &str) -> Result<chrono::NaiveDate, McpError> {
    parse_date(raw).ok_or_else(|| McpError::Validation(format!("{field}: unrecognized date {raw:?}")))
}

fn optional_date(field: &str, raw: Option<&str>) -> Result<Option<chrono::NaiveDate>, McpError> {
    raw.map(|d| required_date(field, d)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shift_params_accept_legacy_names() {
        let p: RecordShiftParams = serde_json::from_value(json!({
            "batch_id": 3,
            "date": "2025-06-01",
            "shift_no": "night",
            "input_materials": {"steel": 5},
            "admin_notes": "late start"
        }))
        .expect("params");
        let shift = p.into_new_shift().expect("shift");
        assert_eq!(shift.shift_label, "night");
        assert_eq!(shift.notes.as_deref(), Some("late start"));
        assert!(shift.output_products.is_null());
    }

    #[test]
    fn bad_dates_are_validation_errors() {
        let p = CreateBatchParams {
            product_id: 1,
            start_date: "yesterday".into(),
            end_date: None,
        };
        assert!(matches!(p.into_new_batch(), Err(McpError::Validation(_))));
    }

    #[test]
    fn change_sets_parse_dates_and_keep_absent_fields_unset() {
        let p: UpdateShiftParams = serde_json::from_value(json!({
            "shift_id": 4,
            "date": "02/06/2025",
            "output_products": {"units": 9}
        }))
        .expect("params");
        assert_eq!(p.shift_id, 4);
        let update = p.changes.into_update().expect("update");
        assert_eq!(update.date, chrono::NaiveDate::from_ymd_opt(2025, 6, 2));
        assert!(update.shift_label.is_none());
        assert!(update.input_materials.is_none());

        let p: UpdateBatchParams = serde_json::from_value(json!({
            "batch_id": 2,
            "status": "open",
            "end_date": "soon"
        }))
        .expect("params");
        assert!(matches!(p.changes.into_update(), Err(McpError::Validation(_))));
    }

    #[test]
    fn trend_length_defaults_and_rejects_zero() {
        assert_eq!(TrendLength::default().resolve().expect("n"), 3);
        assert_eq!(TrendLength { n: Some(5) }.resolve().expect("n"), 5);
        assert!(TrendLength { n: Some(0) }.resolve().is_err());
    }

    #[test]
    fn calculate_params_are_flat() {
        let p: CalculateParams = serde_json::from_value(json!({
            "inputs": {"labor": 10},
            "outputs": {"units": 20},
            "with_analysis": true
        }))
        .expect("params");
        assert!(p.with_analysis);
        assert_eq!(p.input.outputs, json!({"units": 20}));
    }
}
