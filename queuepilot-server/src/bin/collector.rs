use anyhow::Result;
use queuepilot_server::collector::Collector;
use queuepilot_server::config::CollectorConfig;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let config = CollectorConfig::from_env_and_args()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("queuepilot_server={}", config.log_level).parse()?),
        )
        .init();

    let collector = Collector::bind(&config).await?;
    tracing::info!(
        "Collector started: telemetry on {}, metrics on http://{}/metrics",
        collector.telemetry_addr(),
        collector.http_addr()
    );

    let shutdown = CancellationToken::new();
    let run = tokio::spawn(collector.run(shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl-C, shutting down");
    shutdown.cancel();

    run.await??;
    Ok(())
}
