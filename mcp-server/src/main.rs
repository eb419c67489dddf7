use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use lotto645::config;
use lotto645::database::create_database;
use lotto645_mcp::mcp_handler::{MCPHandler, stdio};
use lotto645_mcp::use_cases::{
    ApiUseCase, DrawUseCase, FavoritesUseCase, NumberUseCase, ReportUseCase,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Let's pick your lotto numbers.");

    let db_conn = create_database(&config.database_url)?;
    let db_conn_arc = Arc::new(db_conn);

    let number_use_case = NumberUseCase::new();
    let draw_use_case = DrawUseCase::new(Arc::clone(&db_conn_arc));
    let api_use_case = ApiUseCase::new(Arc::clone(&db_conn_arc), config.api_url.clone());
    let favorites_use_case = FavoritesUseCase::new(Arc::clone(&db_conn_arc));
    let report_use_case = ReportUseCase::new(Arc::clone(&db_conn_arc), config.report_path.clone());

    let handler = MCPHandler::new(
        Arc::new(number_use_case),
        Arc::new(draw_use_case),
        Arc::new(api_use_case),
        Arc::new(favorites_use_case),
        Arc::new(report_use_case),
    );

    let (reader, writer) = stdio();

    handler.serve(reader, writer).await.inspect_err(|e| {
        tracing::error!("serving error: {:?}", e);
    })?;

    Ok(())
}
