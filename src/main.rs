use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use webp_convert::{BatchOrchestrator, Config, encoder};

#[derive(Parser)]
#[command(name = "webp-convert")]
#[command(author, version, about = "Convert uploaded images to WebP over HTTP")]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config and PORT)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> webp_convert::Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "webp_convert=trace,tower_http=debug".to_string()
        } else {
            "webp_convert=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env()?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    config.validate()?;

    tracing::info!(
        address = %config.server.bind_address,
        work_dir = %config.batch.work_dir.display(),
        max_files = config.batch.max_files,
        "starting webp-convert"
    );

    let config = Arc::new(config);
    let encoder = encoder::from_config(&config.encoder);
    let orchestrator = Arc::new(BatchOrchestrator::from_config(encoder, &config));

    webp_convert::api::start_api_server(orchestrator, config).await
}
