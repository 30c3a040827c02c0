use std::sync::Arc;

use rmcp::Json;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, GetPromptRequestParams, GetPromptResult, ListPromptsResult, ListResourcesResult,
    PaginatedRequestParams, RawResource, ReadResourceRequestParams, ReadResourceResult,
    ResourceContents,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer};
use rmcp::{prompt, prompt_handler, prompt_router, tool, tool_handler, tool_router};
use tracing::info;

use productix_core::analysis::AgentReport;
use productix_core::dashboard::DashboardSummary;
use productix_core::service::{
    AnalysisCount, BatchAnalysisReport, BatchTrend, ChatAnswer, DailyReport, ProductFields,
    ShiftTrend,
};
use productix_core::utils::today;
use productix_core::{
    Batch, BatchReport, NewProduct, OrgId, Product, ProductionStore, ProductivityService,
    ShiftRecord, TextCompletion,
};

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
mod prompts;
mod test_utils;
pub mod types;

pub use error::{McpError, McpResult};
use types::{
    BatchIdParam, BatchReviewParams, BatchTrendParams, BatchesResult, CalculateParams,
    CalculationResponse, CostReductionParams, CreateBatchParams, DailyPerformanceParams, Deleted,
    GoalParams, HistoryParams, HistoryResult, ListBatchesParams, ListShiftsParams,
    ProductIdParam, ProductivityRecordsResult, ProductsResult, QuestionParams, RecordShiftParams,
    ShiftIdParam, ShiftTrendParams, ShiftsResult, TrendLength, UpdateBatchParams,
    UpdateProductParams, UpdateShiftParams,
};

pub const DASHBOARD_RESOURCE_URI: &str = "productix://organization/dashboard";

/// MCP handler bound to a single organization.
#[derive(Clone)]
pub struct ProductixMcpHandler {
    service: ProductivityService,
    org: OrgId,
    completion: Option<Arc<dyn TextCompletion>>,
    tool_router: rmcp::handler::server::tool::ToolRouter<ProductixMcpHandler>,
    prompt_router: rmcp::handler::server::router::prompt::PromptRouter<ProductixMcpHandler>,
}

fn tool_err(e: impl Into<McpError>) -> String {
    e.into().to_string()
}

#[tool_router]
#[prompt_router]
impl ProductixMcpHandler {
    pub fn new(store: Arc<dyn ProductionStore>, org: OrgId) -> Self {
        Self {
            service: ProductivityService::new(store),
            org,
            completion: None,
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    /// Enable the AI-backed tools.
    pub fn with_completion(mut self, client: Arc<dyn TextCompletion>) -> Self {
        self.completion = Some(client);
        self
    }

    pub fn org(&self) -> OrgId {
        self.org
    }

    pub fn tool_count(&self) -> usize {
        self.tool_router.list_all().len()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompt_router.list_all().len()
    }

    fn completion(&self) -> McpResult<&dyn TextCompletion> {
        self.completion
            .as_deref()
            .ok_or(McpError::CompletionUnavailable)
    }

    #[tool(name = "list_products", description = "List the organization's products")]
    async fn list_products(&self) -> Result<Json<ProductsResult>, String> {
        let products = self
            .service
            .store()
            .list_products(self.org)
            .await
            .map_err(tool_err)?;
        Ok(Json(ProductsResult { products }))
    }

    #[tool(
        name = "create_product",
        description = "Create a product with its input and output field names"
    )]
    async fn create_product(
        &self,
        params: Parameters<NewProduct>,
    ) -> Result<Json<Product>, String> {
        let created = self
            .service
            .store()
            .create_product(self.org, params.0)
            .await
            .map_err(tool_err)?;
        info!(org = self.org, product_id = created.id, "product created");
        Ok(Json(created))
    }

    #[tool(
        name = "update_product",
        description = "Change a product's name, description or field names; omitted values are kept"
    )]
    async fn update_product(
        &self,
        params: Parameters<UpdateProductParams>,
    ) -> Result<Json<Product>, String> {
        let p = params.0;
        self.service
            .store()
            .update_product(self.org, p.product_id, p.update)
            .await
            .map(Json)
            .map_err(tool_err)
    }

    #[tool(
        name = "delete_product",
        description = "Delete a product together with its batches and their shifts"
    )]
    async fn delete_product(
        &self,
        params: Parameters<ProductIdParam>,
    ) -> Result<Json<Deleted>, String> {
        let id = params.0.product_id;
        self.service
            .store()
            .delete_product(self.org, id)
            .await
            .map_err(tool_err)?;
        info!(org = self.org, product_id = id, "product deleted");
        Ok(Json(Deleted::new(id)))
    }

    #[tool(
        name = "get_product_fields",
        description = "Input and output field names of a product plus its batches"
    )]
    async fn get_product_fields(
        &self,
        params: Parameters<ProductIdParam>,
    ) -> Result<Json<ProductFields>, String> {
        self.service
            .product_fields(self.org, params.0.product_id)
            .await
            .map(Json)
            .map_err(tool_err)
    }

    #[tool(
        name = "list_batches",
        description = "List production batches, optionally for one product"
    )]
    async fn list_batches(
        &self,
        params: Parameters<ListBatchesParams>,
    ) -> Result<Json<BatchesResult>, String> {
        let batches = self
            .service
            .store()
            .list_batches(self.org, params.0.product_id)
            .await
            .map_err(tool_err)?;
        Ok(Json(BatchesResult { batches }))
    }

    #[tool(
        name = "create_batch",
        description = "Open a new batch for a product; the batch number is assigned automatically"
    )]
    async fn create_batch(
        &self,
        params: Parameters<CreateBatchParams>,
    ) -> Result<Json<Batch>, String> {
        let new_batch = params.0.into_new_batch()?;
        let created = self
            .service
            .store()
            .create_batch(self.org, new_batch)
            .await
            .map_err(tool_err)?;
        Ok(Json(created))
    }

    #[tool(
        name = "close_batch",
        description = "Close a batch; no further shifts can be recorded against it"
    )]
    async fn close_batch(&self, params: Parameters<BatchIdParam>) -> Result<Json<Batch>, String> {
        let closed = self
            .service
            .store()
            .close_batch(self.org, params.0.batch_id, today())
            .await
            .map_err(tool_err)?;
        Ok(Json(closed))
    }

    #[tool(name = "get_batch", description = "Fetch one batch")]
    async fn get_batch(&self, params: Parameters<BatchIdParam>) -> Result<Json<Batch>, String> {
        self.service
            .store()
            .get_batch(self.org, params.0.batch_id)
            .await
            .map(Json)
            .map_err(tool_err)
    }

    #[tool(
        name = "update_batch",
        description = "Change a batch's number, dates or status; setting status open reopens a closed batch"
    )]
    async fn update_batch(
        &self,
        params: Parameters<UpdateBatchParams>,
    ) -> Result<Json<Batch>, String> {
        let p = params.0;
        let update = p.changes.into_update()?;
        self.service
            .store()
            .update_batch(self.org, p.batch_id, update)
            .await
            .map(Json)
            .map_err(tool_err)
    }

    #[tool(
        name = "delete_batch",
        description = "Delete a batch together with its shifts"
    )]
    async fn delete_batch(&self, params: Parameters<BatchIdParam>) -> Result<Json<Deleted>, String> {
        let id = params.0.batch_id;
        self.service
            .store()
            .delete_batch(self.org, id)
            .await
            .map_err(tool_err)?;
        info!(org = self.org, batch_id = id, "batch deleted");
        Ok(Json(Deleted::new(id)))
    }

    #[tool(
        name = "record_shift",
        description = "Record one shift's input materials and output products for an open batch"
    )]
    async fn record_shift(
        &self,
        params: Parameters<RecordShiftParams>,
    ) -> Result<Json<ShiftRecord>, String> {
        let shift = params.0.into_new_shift()?;
        let recorded = self
            .service
            .store()
            .record_shift(self.org, shift)
            .await
            .map_err(tool_err)?;
        Ok(Json(recorded))
    }

    #[tool(
        name = "list_shifts",
        description = "List recorded shifts, optionally for one batch, oldest first"
    )]
    async fn list_shifts(
        &self,
        params: Parameters<ListShiftsParams>,
    ) -> Result<Json<ShiftsResult>, String> {
        let store = self.service.store();
        let shifts = match params.0.batch_id {
            Some(batch_id) => store.list_shifts(self.org, batch_id).await,
            None => store.list_org_shifts(self.org).await,
        }
        .map_err(tool_err)?;
        Ok(Json(ShiftsResult { shifts }))
    }

    #[tool(name = "get_shift", description = "Fetch one recorded shift")]
    async fn get_shift(
        &self,
        params: Parameters<ShiftIdParam>,
    ) -> Result<Json<ShiftRecord>, String> {
        self.service
            .store()
            .get_shift(self.org, params.0.shift_id)
            .await
            .map(Json)
            .map_err(tool_err)
    }

    #[tool(
        name = "update_shift",
        description = "Correct a recorded shift of an open batch; given field maps replace the stored ones"
    )]
    async fn update_shift(
        &self,
        params: Parameters<UpdateShiftParams>,
    ) -> Result<Json<ShiftRecord>, String> {
        let p = params.0;
        let update = p.changes.into_update()?;
        self.service
            .store()
            .update_shift(self.org, p.shift_id, update)
            .await
            .map(Json)
            .map_err(tool_err)
    }

    #[tool(
        name = "delete_shift",
        description = "Delete a recorded shift of an open batch"
    )]
    async fn delete_shift(&self, params: Parameters<ShiftIdParam>) -> Result<Json<Deleted>, String> {
        let id = params.0.shift_id;
        self.service
            .store()
            .delete_shift(self.org, id)
            .await
            .map_err(tool_err)?;
        Ok(Json(Deleted::new(id)))
    }

    #[tool(
        name = "get_batch_report",
        description = "Totals, cost per unit, productivity ratio and per-input statistics for a batch"
    )]
    async fn get_batch_report(
        &self,
        params: Parameters<BatchIdParam>,
    ) -> Result<Json<BatchReport>, String> {
        self.service
            .batch_report(self.org, params.0.batch_id)
            .await
            .map(Json)
            .map_err(tool_err)
    }

    #[tool(
        name = "get_daily_report",
        description = "Per-day totals and ratios for a batch, oldest day first"
    )]
    async fn get_daily_report(
        &self,
        params: Parameters<BatchIdParam>,
    ) -> Result<Json<DailyReport>, String> {
        self.service
            .daily_report(self.org, params.0.batch_id)
            .await
            .map(Json)
            .map_err(tool_err)
    }

    #[tool(
        name = "get_shift_trend",
        description = "Summaries of the most recent shifts of a batch"
    )]
    async fn get_shift_trend(
        &self,
        params: Parameters<ShiftTrendParams>,
    ) -> Result<Json<ShiftTrend>, String> {
        let p = params.0;
        let n = TrendLength { n: p.n }.resolve()?;
        self.service
            .shift_trend(self.org, p.batch_id, n)
            .await
            .map(Json)
            .map_err(tool_err)
    }

    #[tool(
        name = "get_batch_trend",
        description = "Summaries of the most recent batches of a product"
    )]
    async fn get_batch_trend(
        &self,
        params: Parameters<BatchTrendParams>,
    ) -> Result<Json<BatchTrend>, String> {
        let p = params.0;
        let n = TrendLength { n: p.n }.resolve()?;
        self.service
            .batch_trend(self.org, p.product_id, n)
            .await
            .map(Json)
            .map_err(tool_err)
    }

    #[tool(
        name = "get_dashboard_summary",
        description = "Organization overview: products, running batches, today's shifts and cost figures"
    )]
    async fn get_dashboard_summary(&self) -> Result<Json<DashboardSummary>, String> {
        self.service
            .dashboard(self.org, today())
            .await
            .map(Json)
            .map_err(tool_err)
    }

    #[tool(
        name = "get_productivity_records",
        description = "Combined and per input/output productivity of every shift, grouped by product"
    )]
    async fn get_productivity_records(&self) -> Result<Json<ProductivityRecordsResult>, String> {
        let products = self
            .service
            .productivity_records(self.org)
            .await
            .map_err(tool_err)?;
        Ok(Json(ProductivityRecordsResult { products }))
    }

    #[tool(
        name = "list_analysis_history",
        description = "Stored calculations and AI results, newest first, optionally of one kind"
    )]
    async fn list_analysis_history(
        &self,
        params: Parameters<HistoryParams>,
    ) -> Result<Json<HistoryResult>, String> {
        let analyses = self
            .service
            .analysis_history(self.org, params.0.kind)
            .await
            .map_err(tool_err)?;
        Ok(Json(HistoryResult { analyses }))
    }

    #[tool(
        name = "get_analysis_count",
        description = "Number of stored AI analyses for the organization"
    )]
    async fn get_analysis_count(&self) -> Result<Json<AnalysisCount>, String> {
        self.service
            .analysis_count(self.org)
            .await
            .map(Json)
            .map_err(tool_err)
    }

    #[tool(
        name = "calculate_productivity",
        description = "Ad-hoc productivity over given input and output amounts, optionally with AI analysis"
    )]
    async fn calculate_productivity(
        &self,
        params: Parameters<CalculateParams>,
    ) -> Result<Json<CalculationResponse>, String> {
        let p = params.0;
        if !p.with_analysis {
            let calculation = self
                .service
                .calculate(self.org, &p.input)
                .await
                .map_err(tool_err)?;
            return Ok(Json(CalculationResponse {
                calculation,
                analysis: None,
            }));
        }
        let client = self.completion()?;
        let result = self
            .service
            .calculate_with_analysis(self.org, &p.input, client)
            .await
            .map_err(tool_err)?;
        Ok(Json(CalculationResponse {
            calculation: result.calculation,
            analysis: Some(result.analysis),
        }))
    }

    #[tool(
        name = "analyze_batch",
        description = "AI forecast of next-shift output, top inefficiencies and recommendations for a batch"
    )]
    async fn analyze_batch(
        &self,
        params: Parameters<BatchIdParam>,
    ) -> Result<Json<BatchAnalysisReport>, String> {
        let client = self.completion()?;
        self.service
            .analyze_batch(self.org, params.0.batch_id, client)
            .await
            .map(Json)
            .map_err(tool_err)
    }

    #[tool(
        name = "ask_production_data",
        description = "Answer a question using only the organization's production records"
    )]
    async fn ask_production_data(
        &self,
        params: Parameters<QuestionParams>,
    ) -> Result<Json<ChatAnswer>, String> {
        let client = self.completion()?;
        self.service
            .ask(self.org, &params.0.question, client)
            .await
            .map(Json)
            .map_err(tool_err)
    }

    #[tool(
        name = "production_agent_report",
        description = "Plan and write a report toward a stated goal from the organization's records"
    )]
    async fn production_agent_report(
        &self,
        params: Parameters<GoalParams>,
    ) -> Result<Json<AgentReport>, String> {
        let client = self.completion()?;
        self.service
            .agent_report(self.org, &params.0.goal, client)
            .await
            .map(Json)
            .map_err(tool_err)
    }

    // === MCP Prompts ===

    #[prompt(
        name = "batch-review",
        description = "Review a batch's cost and productivity with daily and shift trends"
    )]
    async fn batch_review(&self, params: Parameters<BatchReviewParams>) -> GetPromptResult {
        prompts::batch_review_prompt(params.0.batch_id)
    }

    #[prompt(
        name = "cost-reduction",
        description = "Find the inputs and batches where cost per unit can be reduced"
    )]
    async fn cost_reduction(&self, params: Parameters<CostReductionParams>) -> GetPromptResult {
        let focus = params
            .0
            .focus
            .unwrap_or_else(|| "input cost per output unit".to_string());
        prompts::cost_reduction_prompt(params.0.product_id, &focus)
    }

    #[prompt(
        name = "daily-performance",
        description = "Assess one production day of a batch against the preceding days"
    )]
    async fn daily_performance(
        &self,
        params: Parameters<DailyPerformanceParams>,
    ) -> GetPromptResult {
        prompts::daily_performance_prompt(params.0.batch_id, params.0.date.as_deref())
    }
}

#[tool_handler]
#[prompt_handler(router = self.prompt_router)]
impl rmcp::ServerHandler for ProductixMcpHandler {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo::new(
            rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .build(),
        )
        .with_instructions(
            "Productix MCP server - records production shifts per batch and reports \
             input cost, output, cost per unit and productivity ratios.",
        )
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let resource = RawResource::new(DASHBOARD_RESOURCE_URI, "Organization Dashboard");

        let mut res = resource.no_annotation();
        res.description =
            Some("Current dashboard summary of the organization's production".to_string());
        res.mime_type = Some("application/json".to_string());

        Ok(ListResourcesResult {
            resources: vec![res],
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        if request.uri != DASHBOARD_RESOURCE_URI {
            return Err(ErrorData::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            ));
        }
        let summary = self
            .service
            .dashboard(self.org, today())
            .await
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        let text = serde_json::to_string_pretty(&summary)
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;

        Ok(ReadResourceResult::new(vec![
            ResourceContents::TextResourceContents {
                uri: request.uri.clone(),
                mime_type: Some("application/json".to_string()),
                text,
                meta: None,
            },
        ]))
    }
}
