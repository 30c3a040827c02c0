use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use productix_core::http_client::ReqwestCompletionClient;
use productix_core::{InMemoryStore, ProductionStore, ProductivityService, TextCompletion};
use productix_mcp::ProductixMcpHandler;
use productix_mcp::auth::TokenKey;
use productix_mcp::config::{ServerConfig, env_filter, log_filter_with};
use productix_mcp::http::{AppState, router};
use productix_mcp::middleware::LoggingMiddleware;

/// Optional AI backend; the server runs without it and AI routes answer 503.
fn completion_client() -> Option<Arc<dyn TextCompletion>> {
    let config = match productix_core::config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            info!(reason = %e, "AI features disabled");
            return None;
        }
    };
    match ReqwestCompletionClient::from_config(&config) {
        Ok(client) => {
            info!(model = %config.model, "AI features enabled");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to build completion client; AI features disabled");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let log_filter = log_filter_with(|k| std::env::var(k).ok());
    tracing_subscriber::fmt()
        .compact()
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter(&log_filter))
        .init();
    tracing::info!(%log_filter, "productix_mcp:http: log filter");

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration; aborting startup");
            std::process::exit(1);
        }
    };

    let handle = PrometheusBuilder::new().install_recorder()?;

    let store: Arc<dyn ProductionStore> = Arc::new(LoggingMiddleware::new(InMemoryStore::new()));
    let completion = completion_client();
    let state = Arc::new(AppState {
        service: ProductivityService::new(store.clone()),
        tokens: TokenKey::new(&config.jwt_secret),
        completion: completion.clone(),
        metrics: Some(handle),
    });

    let mut app = router(state);

    if let Some(org) = config.mcp_org_id {
        let mut handler = ProductixMcpHandler::new(store.clone(), org);
        if let Some(client) = completion {
            handler = handler.with_completion(client);
        }
        let factory = move || -> Result<_, std::io::Error> { Ok(handler.clone()) };
        let session = Arc::new(
            rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default(),
        );
        let mcp_service =
            rmcp::transport::streamable_http_server::tower::StreamableHttpService::new(
                factory,
                session,
                rmcp::transport::streamable_http_server::tower::StreamableHttpServerConfig::default(),
            );
        app = app.nest_service("/mcp", mcp_service);
        info!(org, "MCP endpoint mounted at /mcp");
    }

    #[allow(deprecated)]
    let app = app
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(axum::extract::DefaultBodyLimit::max(config.max_body_bytes));

    let addr = config.address;
    info!(%addr, max_body_bytes = config.max_body_bytes, "starting HTTP server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app.into_make_service());
    if let Err(e) = server
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("failed to install ctrl+c handler: {e}");
            }
        })
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
