use std::sync::Arc;

use productix_core::http_client::ReqwestCompletionClient;
use productix_core::{InMemoryStore, ProductionStore};
use productix_mcp::ProductixMcpHandler;
use productix_mcp::config::{env_filter, log_filter_with, stdio_org_id_with};
use productix_mcp::middleware::LoggingMiddleware;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_filter = log_filter_with(|k| std::env::var(k).ok());
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter(&log_filter))
        .init();
    tracing::info!("productix_mcp: log filter: {}", log_filter);

    let org = stdio_org_id_with(|k| std::env::var(k).ok())?;
    let store: Arc<dyn ProductionStore> = Arc::new(LoggingMiddleware::new(InMemoryStore::new()));
    let mut handler = ProductixMcpHandler::new(store, org);

    match productix_core::config::Config::from_env() {
        Ok(config) => {
            let client = ReqwestCompletionClient::from_config(&config)?;
            handler = handler.with_completion(Arc::new(client));
            tracing::info!(model = %config.model, "productix_mcp: AI tools enabled");
        }
        Err(e) => tracing::info!("productix_mcp: AI tools disabled: {}", e),
    }

    tracing::info!(
        org,
        "productix_mcp: registered {} tools and {} prompts",
        handler.tool_count(),
        handler.prompt_count()
    );

    // Start RMCP server over stdio transport so it's immediately usable with MCP clients
    tracing::info!("productix_mcp: starting stdio MCP server...");

    use rmcp::serve_server;
    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let server = serve_server(handler, transport).await?;

    tracing::info!("productix_mcp: service initialized as server");

    server.waiting().await?;

    Ok(())
}
