use clap::Parser;
use std::sync::Arc;

use edge_gatekeeper::config::Args;
use edge_gatekeeper::handlers;
use edge_gatekeeper::state::AppState;
use edge_gatekeeper::store;
use edge_gatekeeper::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing();

    let store = store::open(&args.store).await?;
    let state = Arc::new(AppState::new(&args, store)?);

    if let Some(ops_port) = args.ops_port {
        let ops_listener = tokio::net::TcpListener::bind(("0.0.0.0", ops_port)).await?;
        tracing::info!(port = ops_port, "Ops endpoints on /health and /metrics");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(ops_listener, handlers::ops_router()).await {
                tracing::error!(error = %e, "ops listener stopped");
            }
        });
    }

    let app = handlers::router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;

    tracing::info!(port = args.port, origin = %args.origin, "Gatekeeper running");
    tracing::info!(
        limit = args.rate_limit,
        window_secs = args.rate_window,
        mode = ?args.unblock_mode,
        "Rate limit: {} requests per {} seconds",
        args.rate_limit,
        args.rate_window
    );
    if args.admin_secret.is_none() {
        tracing::warn!("ADMIN_SECRET not set, /admin/unblock will refuse every request");
    }
    if args.turnstile_secret_key.is_none() {
        tracing::warn!("TURNSTILE_SECRET_KEY not set, challenge verification will always fail");
    }

    axum::serve(listener, app).await?;
    Ok(())
}
