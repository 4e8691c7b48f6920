use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use synthbio_core::{init_tracing, METRICS};
use synthbio_engine::{CliEngine, QueryService, RetrievalEngine};
use synthbiod::{router, serve, AppState, ServerArgs};
use tokio::net::TcpListener;
use tracing::{info, warn, Level};

/// SynthBio query gateway daemon
#[derive(Parser)]
#[command(name = "synthbiod")]
#[command(about = "HTTP gateway in front of the GraphRAG query engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON log lines
    #[arg(long = "json-logs")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json_logs, level);

    let engine_config = cli.server.engine.engine_config();
    let policy = engine_config.citation_policy;
    let timeout_secs = engine_config.timeout_secs;
    let engine = CliEngine::new(engine_config);
    if let Err(e) = engine.resolve_workspace() {
        warn!(error = %e, "engine workspace not ready; queries will fail until it is");
    }
    info!(
        engine = %engine.describe(),
        method = %engine.method(),
        root = %cli.server.engine.root.display(),
        timeout_secs,
        "engine configured"
    );

    let service = QueryService::new(Arc::new(engine), policy, timeout_secs);
    let cors = cli.server.cors_layer()?;
    let app = router(AppState::new(service), cors);

    let addr = cli.server.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    serve(listener, app, shutdown_signal())
        .await
        .context("server error")?;

    METRICS.flush();
    info!("synthbiod stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
}
