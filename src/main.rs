use anyhow::Result;
use bnd_storefront::{
    cli::{Args, CliApp},
    utils::Config,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))
        })
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();
    init_tracing(args.verbose);

    tracing::debug!("🦀 Storefront starting...");

    let config = Config::from_env().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let mut app = CliApp::new(&config).await?;
    app.run(args).await?;

    tracing::debug!("🦀 Storefront stopped");
    Ok(())
}
