//! Request-scoped orchestration: fetch from the store, normalize, aggregate,
//! build the requested view.

use std::sync::Arc;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::aggregate;
use crate::analysis::{self, AgentReport, BatchAnalysis, SectionedAnalysis};
use crate::calculator::{self, CalculationInput, CalculationResult, ProductProductivity};
use crate::dashboard::{self, DashboardSummary};
use crate::model::{
    AnalysisKind, AnalysisRecord, BatchId, BatchStatus, NewAnalysisRecord, OrgId, ProductId,
};
use crate::normalize::normalize_shifts;
use crate::observability;
use crate::report::BatchReport;
use crate::rollup::{self, BatchTrendEntry, DailyEntry, ShiftTrendEntry};
use crate::store::ProductionStore;
use crate::{ProductixError, TextCompletion};

/// Length of shift and batch trends when the caller does not choose one.
pub const DEFAULT_TREND_LENGTH: usize = 3;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DailyReport {
    pub batch_id: BatchId,
    pub daily_summary: Vec<DailyEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ShiftTrend {
    pub batch_id: BatchId,
    pub shifts: Vec<ShiftTrendEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct BatchTrend {
    pub product_id: ProductId,
    pub batches: Vec<BatchTrendEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CalculationAnalysis {
    pub calculation: CalculationResult,
    pub analysis: SectionedAnalysis,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct BatchAnalysisReport {
    pub batch_id: BatchId,
    pub batch_number: String,
    pub status: BatchStatus,
    pub report: BatchReport,
    pub analysis: BatchAnalysis,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct BatchRef {
    pub id: BatchId,
    pub batch_number: String,
}

/// A product's field layout plus its batches, for building shift entry forms.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ProductFields {
    pub product_id: ProductId,
    pub name: String,
    pub input_fields: Vec<String>,
    pub output_fields: Vec<String>,
    pub batches: Vec<BatchRef>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct AnalysisCount {
    /// Stored results produced by a completion model.
    pub analysis_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ChatAnswer {
    pub question: String,
    pub answer: String,
}

#[derive(Clone)]
pub struct ProductivityService {
    store: Arc<dyn ProductionStore>,
}

impl ProductivityService {
    pub fn new(store: Arc<dyn ProductionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ProductionStore> {
        &self.store
    }

    /// Aggregated report over every shift of the batch. A batch without
    /// shifts yields an all-zero report.
    pub async fn batch_report(
        &self,
        org: OrgId,
        batch_id: BatchId,
    ) -> Result<BatchReport, ProductixError> {
        let batch = self.store.get_batch(org, batch_id).await?;
        let shifts = self.store.list_shifts(org, batch_id).await?;
        let normalized = normalize_shifts(&shifts);
        let report = BatchReport::build(&batch, &aggregate(&normalized));
        debug!(
            org,
            batch_id,
            shifts = report.shift_count,
            missing_prices = report.missing_unit_prices.len(),
            "built batch report"
        );
        observability::record_report("batch");
        Ok(report)
    }

    pub async fn daily_report(
        &self,
        org: OrgId,
        batch_id: BatchId,
    ) -> Result<DailyReport, ProductixError> {
        let shifts = self.store.list_shifts(org, batch_id).await?;
        let daily_summary = rollup::daily_rollup(&normalize_shifts(&shifts));
        observability::record_report("daily");
        Ok(DailyReport {
            batch_id,
            daily_summary,
        })
    }

    pub async fn shift_trend(
        &self,
        org: OrgId,
        batch_id: BatchId,
        n: usize,
    ) -> Result<ShiftTrend, ProductixError> {
        let shifts = self.store.list_shifts(org, batch_id).await?;
        let trend = rollup::recent_shifts(&normalize_shifts(&shifts), n);
        observability::record_report("shift_trend");
        Ok(ShiftTrend {
            batch_id,
            shifts: trend,
        })
    }

    pub async fn batch_trend(
        &self,
        org: OrgId,
        product_id: ProductId,
        n: usize,
    ) -> Result<BatchTrend, ProductixError> {
        let batches = self.store.list_batches(org, Some(product_id)).await?;
        let mut with_shifts = Vec::with_capacity(batches.len());
        for batch in batches {
            let shifts = self.store.list_shifts(org, batch.id).await?;
            with_shifts.push((batch, normalize_shifts(&shifts)));
        }
        observability::record_report("batch_trend");
        Ok(BatchTrend {
            product_id,
            batches: rollup::recent_batches(&with_shifts, n),
        })
    }

    pub async fn dashboard(
        &self,
        org: OrgId,
        today: NaiveDate,
    ) -> Result<DashboardSummary, ProductixError> {
        let products = self.store.list_products(org).await?;
        let batches = self.store.list_batches(org, None).await?;
        let shifts = self.store.list_org_shifts(org).await?;
        observability::record_report("dashboard");
        Ok(dashboard::summarize(&products, &batches, &shifts, today))
    }

    pub async fn product_fields(
        &self,
        org: OrgId,
        product_id: ProductId,
    ) -> Result<ProductFields, ProductixError> {
        let product = self.store.get_product(org, product_id).await?;
        let batches = self.store.list_batches(org, Some(product_id)).await?;
        Ok(ProductFields {
            product_id: product.id,
            name: product.name,
            input_fields: product.input_fields,
            output_fields: product.output_fields,
            batches: batches
                .into_iter()
                .map(|b| BatchRef {
                    id: b.id,
                    batch_number: b.batch_number,
                })
                .collect(),
        })
    }

    pub async fn productivity_records(
        &self,
        org: OrgId,
    ) -> Result<Vec<ProductProductivity>, ProductixError> {
        let products = self.store.list_products(org).await?;
        let batches = self.store.list_batches(org, None).await?;
        let shifts = self.store.list_org_shifts(org).await?;
        observability::record_report("productivity_records");
        Ok(calculator::productivity_records(&products, &batches, &shifts))
    }

    /// Store a result in the organization's analysis history.
    async fn remember<T: Serialize>(
        &self,
        org: OrgId,
        kind: AnalysisKind,
        batch_id: Option<BatchId>,
        result: &T,
    ) -> Result<AnalysisRecord, ProductixError> {
        let record = NewAnalysisRecord {
            kind,
            batch_id,
            payload: serde_json::to_value(result)?,
        };
        let saved = self.store.save_analysis(org, record).await?;
        debug!(org, id = saved.id, ?kind, "analysis stored");
        Ok(saved)
    }

    pub async fn analysis_history(
        &self,
        org: OrgId,
        kind: Option<AnalysisKind>,
    ) -> Result<Vec<AnalysisRecord>, ProductixError> {
        self.store.list_analyses(org, kind).await
    }

    pub async fn analysis_count(&self, org: OrgId) -> Result<AnalysisCount, ProductixError> {
        let history = self.store.list_analyses(org, None).await?;
        Ok(AnalysisCount {
            analysis_count: history.iter().filter(|r| r.kind.is_ai()).count(),
        })
    }

    pub async fn calculate(
        &self,
        org: OrgId,
        input: &CalculationInput,
    ) -> Result<CalculationResult, ProductixError> {
        let calculation = calculator::calculate(input)?;
        self.remember(org, AnalysisKind::Calculation, None, &calculation)
            .await?;
        Ok(calculation)
    }

    pub async fn calculate_with_analysis(
        &self,
        org: OrgId,
        input: &CalculationInput,
        client: &dyn TextCompletion,
    ) -> Result<CalculationAnalysis, ProductixError> {
        let calculation = calculator::calculate(input)?;
        let reply = client
            .complete(analysis::calculation_analysis_request(&calculation))
            .await?;
        let result = CalculationAnalysis {
            analysis: analysis::parse_sectioned_analysis(&reply),
            calculation,
        };
        self.remember(org, AnalysisKind::CalculationAnalysis, None, &result)
            .await?;
        Ok(result)
    }

    /// Forecast and inefficiency breakdown for a batch. Requires at least one
    /// recorded shift.
    pub async fn analyze_batch(
        &self,
        org: OrgId,
        batch_id: BatchId,
        client: &dyn TextCompletion,
    ) -> Result<BatchAnalysisReport, ProductixError> {
        let batch = self.store.get_batch(org, batch_id).await?;
        let shifts = self.store.list_shifts(org, batch_id).await?;
        if shifts.is_empty() {
            return Err(ProductixError::NotFound(format!(
                "no shift entries recorded for batch {batch_id}"
            )));
        }
        let report = BatchReport::build(&batch, &aggregate(&normalize_shifts(&shifts)));
        let reply = client
            .complete(analysis::batch_analysis_request(&batch, &shifts))
            .await?;
        let parsed = analysis::parse_batch_analysis(&reply)?;
        info!(org, batch_id, "batch analysis completed");
        let result = BatchAnalysisReport {
            batch_id,
            batch_number: batch.batch_number,
            status: batch.status,
            report,
            analysis: parsed,
        };
        self.remember(org, AnalysisKind::BatchAnalysis, Some(batch_id), &result)
            .await?;
        Ok(result)
    }

    async fn context(&self, org: OrgId) -> Result<String, ProductixError> {
        let products = self.store.list_products(org).await?;
        let batches = self.store.list_batches(org, None).await?;
        let shifts = self.store.list_org_shifts(org).await?;
        Ok(analysis::records_context(&products, &batches, &shifts))
    }

    /// Answer a free-form question using only the organization's records.
    pub async fn ask(
        &self,
        org: OrgId,
        question: &str,
        client: &dyn TextCompletion,
    ) -> Result<ChatAnswer, ProductixError> {
        if question.trim().is_empty() {
            return Err(ProductixError::InvalidInput(
                "question must not be empty".into(),
            ));
        }
        let context = self.context(org).await?;
        let answer = client
            .complete(analysis::chat_request(&context, question))
            .await?;
        Ok(ChatAnswer {
            question: question.to_string(),
            answer,
        })
    }

    pub async fn agent_report(
        &self,
        org: OrgId,
        goal: &str,
        client: &dyn TextCompletion,
    ) -> Result<AgentReport, ProductixError> {
        if goal.trim().is_empty() {
            return Err(ProductixError::InvalidInput("goal must not be empty".into()));
        }
        let context = self.context(org).await?;
        let report = analysis::agent_report(client, &context, goal).await?;
        let stored = serde_json::json!({
            "goal": goal,
            "plan": report.plan,
            "report": report.report,
        });
        self.remember(org, AnalysisKind::AgentReport, None, &stored)
            .await?;
        Ok(report)
    }
}
