use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use whiteboard_latex::config::{ServerArgs, ServerConfig};
use whiteboard_latex::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::try_from(args)?;

    tracing::info!(
        "Starting whiteboard-latex-server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!(
        "Binding to {}:{} (engine: {}, uploads: {})",
        config.host,
        config.port,
        config.recognizer.engine,
        config.upload_dir.display()
    );

    server::run(config).await
}
