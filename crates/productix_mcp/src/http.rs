//! REST surface of the multi-tenant HTTP server.
//!
//! Every data route authenticates a bearer JWT and scopes all store access
//! to the token's organization.

use std::sync::Arc;

use axum::debug_handler;
use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    response::IntoResponse,
    routing::{get, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use productix_core::analysis::AgentReport;
use productix_core::dashboard::DashboardSummary;
use productix_core::observability::Health;
use productix_core::calculator::ProductProductivity;
use productix_core::service::{
    AnalysisCount, BatchAnalysisReport, BatchTrend, ChatAnswer, DailyReport, ProductFields,
    ShiftTrend,
};
use productix_core::utils::today;
use productix_core::{
    AnalysisRecord, Batch, BatchId, BatchReport, NewProduct, Product, ProductId, ProductUpdate,
    ProductionStore, ProductivityService, ShiftId, ShiftRecord, TextCompletion,
};
use tracing::info;

use crate::auth::{TenantClaims, TokenKey};
use crate::error::McpError;
use crate::types::{
    BatchChanges, CalculateParams, CalculationResponse, CreateBatchParams, GoalParams,
    HistoryParams, ListBatchesParams, ListShiftsParams, QuestionParams, RecordShiftParams,
    ShiftChanges, TrendLength,
};

pub struct AppState {
    pub service: ProductivityService,
    pub tokens: TokenKey,
    pub completion: Option<Arc<dyn TextCompletion>>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    fn completion(&self) -> Result<&dyn TextCompletion, McpError> {
        self.completion
            .as_deref()
            .ok_or(McpError::CompletionUnavailable)
    }
}

type ApiResult<T> = Result<T, (StatusCode, String)>;

fn map_err(e: impl Into<McpError>) -> (StatusCode, String) {
    let e = e.into();
    (e.status(), e.to_string())
}

impl FromRequestParts<Arc<AppState>> for TenantClaims {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        state.tokens.authenticate_headers(&parts.headers).map_err(map_err)
    }
}

#[debug_handler]
async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(Health::readiness()))
}

#[debug_handler]
async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default();
    ([("content-type", "text/plain; version=0.0.4")], body)
}

#[debug_handler]
async fn list_products(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
) -> ApiResult<Json<Vec<Product>>> {
    state
        .service
        .store()
        .list_products(tenant.org_id)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn create_product(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Json(product): Json<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    tenant.require_product_admin().map_err(map_err)?;
    let created = state
        .service
        .store()
        .create_product(tenant.org_id, product)
        .await
        .map_err(map_err)?;
    info!(org = tenant.org_id, product_id = created.id, "product created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[debug_handler]
async fn get_product(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(product_id): Path<ProductId>,
) -> ApiResult<Json<Product>> {
    state
        .service
        .store()
        .get_product(tenant.org_id, product_id)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn update_product(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(product_id): Path<ProductId>,
    Json(update): Json<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    tenant.require_product_admin().map_err(map_err)?;
    state
        .service
        .store()
        .update_product(tenant.org_id, product_id, update)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn delete_product(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(product_id): Path<ProductId>,
) -> ApiResult<StatusCode> {
    tenant.require_product_admin().map_err(map_err)?;
    state
        .service
        .store()
        .delete_product(tenant.org_id, product_id)
        .await
        .map_err(map_err)?;
    info!(org = tenant.org_id, product_id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
async fn product_fields(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(product_id): Path<ProductId>,
) -> ApiResult<Json<ProductFields>> {
    state
        .service
        .product_fields(tenant.org_id, product_id)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn product_trend(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(product_id): Path<ProductId>,
    Query(length): Query<TrendLength>,
) -> ApiResult<Json<BatchTrend>> {
    let n = length.resolve().map_err(map_err)?;
    state
        .service
        .batch_trend(tenant.org_id, product_id, n)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn list_batches(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Query(params): Query<ListBatchesParams>,
) -> ApiResult<Json<Vec<Batch>>> {
    state
        .service
        .store()
        .list_batches(tenant.org_id, params.product_id)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn create_batch(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Json(params): Json<CreateBatchParams>,
) -> ApiResult<(StatusCode, Json<Batch>)> {
    let new_batch = params.into_new_batch().map_err(map_err)?;
    let created = state
        .service
        .store()
        .create_batch(tenant.org_id, new_batch)
        .await
        .map_err(map_err)?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[debug_handler]
async fn get_batch(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(batch_id): Path<BatchId>,
) -> ApiResult<Json<Batch>> {
    state
        .service
        .store()
        .get_batch(tenant.org_id, batch_id)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn update_batch(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(batch_id): Path<BatchId>,
    Json(changes): Json<BatchChanges>,
) -> ApiResult<Json<Batch>> {
    tenant.require_product_admin().map_err(map_err)?;
    let update = changes.into_update().map_err(map_err)?;
    state
        .service
        .store()
        .update_batch(tenant.org_id, batch_id, update)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn delete_batch(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(batch_id): Path<BatchId>,
) -> ApiResult<StatusCode> {
    tenant.require_product_admin().map_err(map_err)?;
    state
        .service
        .store()
        .delete_batch(tenant.org_id, batch_id)
        .await
        .map_err(map_err)?;
    info!(org = tenant.org_id, batch_id, "batch deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
async fn batch_report(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(batch_id): Path<BatchId>,
) -> ApiResult<Json<BatchReport>> {
    state
        .service
        .batch_report(tenant.org_id, batch_id)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn daily_report(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(batch_id): Path<BatchId>,
) -> ApiResult<Json<DailyReport>> {
    state
        .service
        .daily_report(tenant.org_id, batch_id)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn shift_trend(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(batch_id): Path<BatchId>,
    Query(length): Query<TrendLength>,
) -> ApiResult<Json<ShiftTrend>> {
    let n = length.resolve().map_err(map_err)?;
    state
        .service
        .shift_trend(tenant.org_id, batch_id, n)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn close_batch(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(batch_id): Path<BatchId>,
) -> ApiResult<Json<Batch>> {
    state
        .service
        .store()
        .close_batch(tenant.org_id, batch_id, today())
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn record_shift(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Json(params): Json<RecordShiftParams>,
) -> ApiResult<(StatusCode, Json<ShiftRecord>)> {
    let shift = params.into_new_shift().map_err(map_err)?;
    let recorded = state
        .service
        .store()
        .record_shift(tenant.org_id, shift)
        .await
        .map_err(map_err)?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

#[debug_handler]
async fn list_shifts(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Query(params): Query<ListShiftsParams>,
) -> ApiResult<Json<Vec<ShiftRecord>>> {
    let store = state.service.store();
    match params.batch_id {
        Some(batch_id) => store.list_shifts(tenant.org_id, batch_id).await,
        None => store.list_org_shifts(tenant.org_id).await,
    }
    .map(Json)
    .map_err(map_err)
}

#[debug_handler]
async fn get_shift(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(shift_id): Path<ShiftId>,
) -> ApiResult<Json<ShiftRecord>> {
    state
        .service
        .store()
        .get_shift(tenant.org_id, shift_id)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn update_shift(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(shift_id): Path<ShiftId>,
    Json(changes): Json<ShiftChanges>,
) -> ApiResult<Json<ShiftRecord>> {
    let update = changes.into_update().map_err(map_err)?;
    state
        .service
        .store()
        .update_shift(tenant.org_id, shift_id, update)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn delete_shift(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(shift_id): Path<ShiftId>,
) -> ApiResult<StatusCode> {
    state
        .service
        .store()
        .delete_shift(tenant.org_id, shift_id)
        .await
        .map_err(map_err)?;
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
async fn dashboard_summary(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
) -> ApiResult<Json<DashboardSummary>> {
    state
        .service
        .dashboard(tenant.org_id, today())
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn calculate(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Json(params): Json<CalculateParams>,
) -> ApiResult<Json<CalculationResponse>> {
    if !params.with_analysis {
        let calculation = state
            .service
            .calculate(tenant.org_id, &params.input)
            .await
            .map_err(map_err)?;
        return Ok(Json(CalculationResponse {
            calculation,
            analysis: None,
        }));
    }
    let client = state.completion().map_err(map_err)?;
    let result = state
        .service
        .calculate_with_analysis(tenant.org_id, &params.input, client)
        .await
        .map_err(map_err)?;
    Ok(Json(CalculationResponse {
        calculation: result.calculation,
        analysis: Some(result.analysis),
    }))
}

#[debug_handler]
async fn productivity_records(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
) -> ApiResult<Json<Vec<ProductProductivity>>> {
    state
        .service
        .productivity_records(tenant.org_id)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn analysis_history(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<Vec<AnalysisRecord>>> {
    state
        .service
        .analysis_history(tenant.org_id, params.kind)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn analysis_count(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
) -> ApiResult<Json<AnalysisCount>> {
    state
        .service
        .analysis_count(tenant.org_id)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn ai_analysis(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Path(batch_id): Path<BatchId>,
) -> ApiResult<Json<BatchAnalysisReport>> {
    let client = state.completion().map_err(map_err)?;
    state
        .service
        .analyze_batch(tenant.org_id, batch_id, client)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn chat(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Json(params): Json<QuestionParams>,
) -> ApiResult<Json<ChatAnswer>> {
    let client = state.completion().map_err(map_err)?;
    state
        .service
        .ask(tenant.org_id, &params.question, client)
        .await
        .map(Json)
        .map_err(map_err)
}

#[debug_handler]
async fn agent_report(
    State(state): State<Arc<AppState>>,
    tenant: TenantClaims,
    Json(params): Json<GoalParams>,
) -> ApiResult<Json<AgentReport>> {
    let client = state.completion().map_err(map_err)?;
    state
        .service
        .agent_report(tenant.org_id, &params.goal, client)
        .await
        .map(Json)
        .map_err(map_err)
}

/// REST routes plus `/health` and `/metrics`. Layers and the `/mcp` service
/// are added by the binary.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/{id}/fields", get(product_fields))
        .route("/products/{id}/trend", get(product_trend))
        .route("/batches", get(list_batches).post(create_batch))
        .route(
            "/batches/{id}",
            get(get_batch).put(update_batch).delete(delete_batch),
        )
        .route("/batches/{id}/report", get(batch_report))
        .route("/batches/{id}/daily_report", get(daily_report))
        .route("/batches/{id}/trend", get(shift_trend))
        .route("/batches/{id}/close", put(close_batch))
        .route("/batches/{id}/ai_analysis", get(ai_analysis))
        .route("/shifts", get(list_shifts).post(record_shift))
        .route(
            "/shifts/{id}",
            get(get_shift).put(update_shift).delete(delete_shift),
        )
        .route("/dashboard/summary", get(dashboard_summary))
        .route("/analytics/productivity_records", get(productivity_records))
        .route("/analytics/history", get(analysis_history))
        .route("/analytics/analysis_count", get(analysis_count))
        .route("/productivity/calculate", post(calculate))
        .route("/chat", post(chat))
        .route("/agent/report", post(agent_report))
        .with_state(state)
}
