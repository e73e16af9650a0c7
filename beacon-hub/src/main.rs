//! Entry point for the `beacon-hub` binary: the control plane that
//! authenticates agent connections, aggregates them into the registry, and
//! exposes the HTTP API that dispatches commands down to them.

use std::sync::Arc;

use beacon_core::AgentRegistry;
use beacon_hub::Dispatcher;
use beacon_hub::HubConfig;
use beacon_hub::agent_conn;
use beacon_hub::http;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = HubConfig::from_env();
    let registry = Arc::new(AgentRegistry::new());
    let dispatcher = Arc::new(Dispatcher::new(registry.clone(), config.rpc_timeout));

    let agent_listener = TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "listening for agent connections");
    let agent_accept = tokio::spawn(agent_conn::accept_loop(agent_listener, registry));

    let http_listener = TcpListener::bind(&config.http_addr).await?;
    info!(addr = %config.http_addr, "listening for HTTP API requests");
    let app = http::router(dispatcher);

    tokio::select! {
        result = axum::serve(http_listener, app) => { result?; },
        _ = tokio::signal::ctrl_c() => { info!("received shutdown signal"); },
    }

    agent_accept.abort();
    Ok(())
}
