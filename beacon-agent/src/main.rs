//! Entry point for the `beacon-agent` binary: the per-host daemon that
//! dials the hub, maintains the session, and runs the command executor.

use std::sync::Arc;

use beacon_agent::AgentConfig;
use beacon_agent::connector;
use beacon_agent::handlers::HandlerRegistry;
use beacon_agent::handlers::execute::ExecuteCommandHandler;
use beacon_agent::handlers::history::HistoryHandler;
use beacon_agent::handlers::telemetry::TelemetryReportHandler;
use beacon_core::CommandExecutor;
use beacon_protocol::Action;
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Arc::new(AgentConfig::from_env());
    let executor = Arc::new(CommandExecutor::new(config.executor.clone()));

    let registry = Arc::new(
        HandlerRegistry::builder()
            .register(
                Action::ExecuteCommand,
                Arc::new(ExecuteCommandHandler::new(executor.clone())),
            )
            .register(
                Action::GetCommandHistory,
                Arc::new(HistoryHandler::new(executor.clone())),
            )
            .register(Action::TelemetryReport, Arc::new(TelemetryReportHandler))
            .build(),
    );

    info!(agent_id = %config.agent_id, hub_url = %config.hub_url, "starting beacon-agent");

    tokio::select! {
        () = connector::run(config, registry) => {},
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    Ok(())
}
