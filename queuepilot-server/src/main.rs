use anyhow::Result;
use queuepilot_server::config::Config;
use queuepilot_server::telemetry::{DisabledTelemetry, TcpTelemetryPublisher, TelemetrySink};
use queuepilot_server::Pipeline;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("queuepilot={}", config.log_level).parse()?)
                .add_directive(format!("queuepilot_server={}", config.log_level).parse()?),
        )
        .init();

    let telemetry: Box<dyn TelemetrySink> = match &config.telemetry {
        Some(collector) => {
            Box::new(TcpTelemetryPublisher::connect(&collector.host, collector.port).await?)
        }
        None => {
            tracing::info!("Telemetry disabled");
            Box::new(DisabledTelemetry)
        }
    };

    let shutdown = CancellationToken::new();
    let (pipeline, server) =
        Pipeline::launch(&config.pipeline, &config.control, telemetry, shutdown.clone()).await?;
    let server_task = tokio::spawn(server.run(shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl-C, shutting down");

    pipeline.shutdown().await?;
    server_task.await??;

    Ok(())
}
