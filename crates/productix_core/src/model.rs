//! Domain records shared by the store, the aggregation engine and the servers.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub type OrgId = i64;
pub type ProductId = i64;
pub type BatchId = i64;
pub type ShiftId = i64;
pub type AnalysisId = i64;

/// Canonical field name to quantity mapping. Ordered so every derived view is
/// deterministic regardless of record order.
pub type FieldMap = BTreeMap<String, FieldQuantity>;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Product {
    pub id: ProductId,
    pub organization_id: OrgId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Input field names operators fill in per shift.
    #[serde(default)]
    pub input_fields: Vec<String>,
    #[serde(default)]
    pub output_fields: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_fields: Vec<String>,
    #[serde(default)]
    pub output_fields: Vec<String>,
}

/// Partial product edit; absent fields keep their current value.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub input_fields: Option<Vec<String>>,
    pub output_fields: Option<Vec<String>>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    #[default]
    Open,
    Closed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Open => "open",
            BatchStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Batch {
    pub id: BatchId,
    pub organization_id: OrgId,
    pub product_id: ProductId,
    /// Per-product sequence label such as `BATCH-007`.
    pub batch_number: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: BatchStatus,
}

impl Batch {
    pub fn is_open(&self) -> bool {
        self.status == BatchStatus::Open
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct NewBatch {
    pub product_id: ProductId,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Partial batch edit; absent fields keep their current value.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct BatchUpdate {
    pub batch_number: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<BatchStatus>,
}

/// One shift's raw production data as captured by operators.
///
/// `input_materials` and `output_products` stay loosely typed: values may be
/// bare numbers, numeric strings or `{amount, unit_price}` objects, and the
/// whole mapping may arrive JSON-encoded in a string. See [`crate::normalize`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ShiftRecord {
    pub id: ShiftId,
    pub organization_id: OrgId,
    pub batch_id: BatchId,
    pub date: NaiveDate,
    #[serde(alias = "shift_no")]
    pub shift_label: String,
    #[serde(default)]
    pub input_materials: serde_json::Value,
    #[serde(default)]
    pub output_products: serde_json::Value,
    #[serde(default, alias = "admin_notes")]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct NewShift {
    pub batch_id: BatchId,
    pub date: NaiveDate,
    #[serde(alias = "shift_no")]
    pub shift_label: String,
    #[serde(default)]
    pub input_materials: serde_json::Value,
    #[serde(default)]
    pub output_products: serde_json::Value,
    #[serde(default, alias = "admin_notes")]
    pub notes: Option<String>,
}

/// Partial shift edit; absent fields keep their current value.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ShiftUpdate {
    pub date: Option<NaiveDate>,
    pub shift_label: Option<String>,
    pub input_materials: Option<serde_json::Value>,
    pub output_products: Option<serde_json::Value>,
    pub notes: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Plain productivity calculation, no model involved.
    Calculation,
    CalculationAnalysis,
    BatchAnalysis,
    AgentReport,
}

impl AnalysisKind {
    /// Whether a text-completion model produced the record.
    pub fn is_ai(&self) -> bool {
        !matches!(self, AnalysisKind::Calculation)
    }
}

/// A stored calculation or AI result. `payload` holds the response exactly
/// as it was returned to the caller.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct AnalysisRecord {
    pub id: AnalysisId,
    pub organization_id: OrgId,
    pub kind: AnalysisKind,
    #[serde(default)]
    pub batch_id: Option<BatchId>,
    pub created_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewAnalysisRecord {
    pub kind: AnalysisKind,
    pub batch_id: Option<BatchId>,
    pub payload: serde_json::Value,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct FieldQuantity {
    pub amount: f64,
    pub unit_price: f64,
}

impl FieldQuantity {
    pub fn new(amount: f64, unit_price: f64) -> Self {
        Self { amount, unit_price }
    }

    pub fn cost(&self) -> f64 {
        self.amount * self.unit_price
    }

    pub fn has_price(&self) -> bool {
        self.unit_price > 0.0
    }
}

/// A shift after its field maps have been coerced into canonical form.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct NormalizedShift {
    pub date: NaiveDate,
    pub shift_label: String,
    pub inputs: FieldMap,
    pub outputs: FieldMap,
}
