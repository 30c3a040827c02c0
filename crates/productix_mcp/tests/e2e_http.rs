use std::net::SocketAddr;
use std::sync::Arc;

use productix_core::{InMemoryStore, ProductivityService};
use productix_mcp::auth::{Role, TenantClaims, TokenKey};
use productix_mcp::http::{AppState, router};
use reqwest::{Client, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};

struct TestServer {
    addr: SocketAddr,
    tokens: TokenKey,
    http: Client,
}

impl TestServer {
    async fn start() -> Self {
        let tokens = TokenKey::new(&SecretString::new("e2e-secret".into()));
        let state = Arc::new(AppState {
            service: ProductivityService::new(Arc::new(InMemoryStore::new())),
            tokens: tokens.clone(),
            completion: None,
            metrics: None,
        });
        let app = router(state);

        // bind to ephemeral port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = axum::serve(listener, app.into_make_service());
        tokio::spawn(async move {
            server.await.ok();
        });

        Self {
            addr,
            tokens,
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn token(&self, org: i64, role: Role) -> String {
        self.tokens
            .issue(TenantClaims::new(org, role), 1)
            .expect("token")
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let res = self
            .http
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        let res = self
            .http
            .request(method, self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    /// Product with one batch holding one shift; returns (product_id, batch_id).
    async fn seed(&self, token: &str) -> (i64, i64) {
        let (status, product) = self
            .send(
                reqwest::Method::POST,
                "/products",
                token,
                json!({
                    "name": "Chair",
                    "input_fields": ["steel", "plastic"],
                    "output_fields": ["finished"]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let product_id = product["id"].as_i64().unwrap();

        let (status, batch) = self
            .send(
                reqwest::Method::POST,
                "/batches",
                token,
                json!({"product_id": product_id, "start_date": "2025-03-01"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(batch["batch_number"], "BATCH-001");
        let batch_id = batch["id"].as_i64().unwrap();

        let (status, _) = self
            .send(
                reqwest::Method::POST,
                "/shifts",
                token,
                json!({
                    "batch_id": batch_id,
                    "date": "2025-03-01",
                    "shift_label": "morning",
                    "input_materials": {
                        "steel": {"amount": 100, "unit_price": 5},
                        "plastic": {"amount": 50, "unit_price": 3}
                    },
                    "output_products": {"finished": 130}
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        (product_id, batch_id)
    }
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::start().await;
    let res = srv.http.get(srv.url("/health")).send().await.unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn data_routes_require_a_valid_token() {
    let srv = TestServer::start().await;
    let res = srv.http.get(srv.url("/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let (status, _) = srv.get("/products", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_admins_create_products() {
    let srv = TestServer::start().await;
    let user = srv.token(1, Role::OrgUser);
    let (status, _) = srv
        .send(
            reqwest::Method::POST,
            "/products",
            &user,
            json!({"name": "Chair"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn batch_report_and_daily_rollup() {
    let srv = TestServer::start().await;
    let admin = srv.token(1, Role::OrgAdmin);
    let (_, batch_id) = srv.seed(&admin).await;

    let (status, report) = srv
        .get(&format!("/batches/{batch_id}/report"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_input_cost"], 650.0);
    assert_eq!(report["total_output"], 130.0);
    assert_eq!(report["cost_per_unit"], 5.0);
    assert_eq!(report["missing_unit_prices"], json!([]));

    let (status, daily) = srv
        .get(&format!("/batches/{batch_id}/daily_report"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(daily["daily_summary"].as_array().unwrap().len(), 1);
    assert_eq!(daily["daily_summary"][0]["date"], "2025-03-01");
}

#[tokio::test]
async fn other_tenants_see_not_found() {
    let srv = TestServer::start().await;
    let admin = srv.token(1, Role::OrgAdmin);
    let (product_id, batch_id) = srv.seed(&admin).await;

    let stranger = srv.token(2, Role::SystemAdmin);
    let (status, _) = srv
        .get(&format!("/batches/{batch_id}/report"), &stranger)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = srv
        .get(&format!("/products/{product_id}/trend"), &stranger)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, products) = srv.get("/products", &stranger).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products, json!([]));
}

#[tokio::test]
async fn closed_batch_rejects_changes() {
    let srv = TestServer::start().await;
    let admin = srv.token(1, Role::OrgAdmin);
    let (_, batch_id) = srv.seed(&admin).await;

    let close = format!("/batches/{batch_id}/close");
    let (status, batch) = srv
        .send(reqwest::Method::PUT, &close, &admin, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(batch["status"], "closed");

    let (status, _) = srv
        .send(reqwest::Method::PUT, &close, &admin, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = srv
        .send(
            reqwest::Method::POST,
            "/shifts",
            &admin,
            json!({"batch_id": batch_id, "date": "2025-03-02", "shift_label": "night"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn trend_length_is_validated() {
    let srv = TestServer::start().await;
    let admin = srv.token(1, Role::OrgAdmin);
    let (product_id, batch_id) = srv.seed(&admin).await;

    let (status, _) = srv
        .get(&format!("/batches/{batch_id}/trend?n=0"), &admin)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, trend) = srv
        .get(&format!("/products/{product_id}/trend?n=2"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trend["batches"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn calculate_requires_outputs() {
    let srv = TestServer::start().await;
    let user = srv.token(1, Role::OrgUser);
    let (status, _) = srv
        .send(
            reqwest::Method::POST,
            "/productivity/calculate",
            &user,
            json!({"inputs": {"labor": 8}, "outputs": {}}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = srv
        .send(
            reqwest::Method::POST,
            "/productivity/calculate",
            &user,
            json!({"inputs": {"labor": 8}, "outputs": {"units": 16}}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["combined_productivity"], 2.0);
}

#[tokio::test]
async fn ai_routes_unavailable_without_backend() {
    let srv = TestServer::start().await;
    let user = srv.token(1, Role::OrgUser);
    let (status, _) = srv
        .send(
            reqwest::Method::POST,
            "/chat",
            &user,
            json!({"question": "How many batches are open?"}),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn dashboard_counts_running_batches() {
    let srv = TestServer::start().await;
    let admin = srv.token(1, Role::OrgAdmin);
    srv.seed(&admin).await;

    let (status, summary) = srv.get("/dashboard/summary", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_products"], 1);
    assert_eq!(summary["running_batches"], 1);
    assert_eq!(summary["total_input_cost"], 650.0);
}

#[tokio::test]
async fn shift_correction_changes_the_report() {
    let srv = TestServer::start().await;
    let admin = srv.token(1, Role::OrgAdmin);
    let (product_id, batch_id) = srv.seed(&admin).await;

    let (status, shifts) = srv
        .get(&format!("/shifts?batch_id={batch_id}"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    let shift_id = shifts[0]["id"].as_i64().unwrap();

    let (status, shift) = srv
        .send(
            reqwest::Method::PUT,
            &format!("/shifts/{shift_id}"),
            &admin,
            json!({"output_products": {"finished": 260}, "admin_notes": "recount"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shift["notes"], "recount");

    let (status, report) = srv
        .get(&format!("/batches/{batch_id}/report"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["batch_number"], "BATCH-001");
    assert_eq!(report["product_id"], product_id);
    assert_eq!(report["status"], "open");
    assert_eq!(report["total_output"], 260.0);
    assert_eq!(report["cost_per_unit"], 2.5);
}

#[tokio::test]
async fn deleted_batch_is_gone_with_its_shifts() {
    let srv = TestServer::start().await;
    let admin = srv.token(1, Role::OrgAdmin);
    let (_, batch_id) = srv.seed(&admin).await;

    let res = srv
        .http
        .delete(srv.url(&format!("/batches/{batch_id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (status, _) = srv.get(&format!("/batches/{batch_id}"), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, shifts) = srv.get("/shifts", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shifts, json!([]));
}

#[tokio::test]
async fn catalog_edits_are_admin_only() {
    let srv = TestServer::start().await;
    let admin = srv.token(1, Role::OrgAdmin);
    let user = srv.token(1, Role::OrgUser);
    let (product_id, batch_id) = srv.seed(&admin).await;

    let res = srv
        .http
        .delete(srv.url(&format!("/products/{product_id}")))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let (status, _) = srv
        .send(
            reqwest::Method::PUT,
            &format!("/batches/{batch_id}"),
            &user,
            json!({"status": "closed"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, product) = srv
        .send(
            reqwest::Method::PUT,
            &format!("/products/{product_id}"),
            &admin,
            json!({"name": "Armchair"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["name"], "Armchair");
    assert_eq!(product["output_fields"], json!(["finished"]));

    let (status, fields) = srv
        .get(&format!("/products/{product_id}/fields"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fields["batches"][0]["batch_number"], "BATCH-001");
}

#[tokio::test]
async fn calculations_land_in_history() {
    let srv = TestServer::start().await;
    let user = srv.token(1, Role::OrgUser);
    let (status, _) = srv
        .send(
            reqwest::Method::POST,
            "/productivity/calculate",
            &user,
            json!({"inputs": {"labor": 8}, "outputs": {"units": 16}}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, history) = srv.get("/analytics/history?kind=calculation", &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["kind"], "calculation");

    let (status, count) = srv.get("/analytics/analysis_count", &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count["analysis_count"], 0);

    let other = srv.token(2, Role::OrgUser);
    let (_, history) = srv.get("/analytics/history", &other).await;
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn productivity_records_grouped_by_product() {
    let srv = TestServer::start().await;
    let admin = srv.token(1, Role::OrgAdmin);
    let (product_id, _) = srv.seed(&admin).await;

    let (status, products) = srv.get("/analytics/productivity_records", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products[0]["product_id"], product_id);
    let record = &products[0]["records"][0];
    assert_eq!(record["batch_number"], "BATCH-001");
    assert_eq!(record["single_productivity"]["steel / finished"], 1.3);
}
