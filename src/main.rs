use anyhow::Result;
use bankflow::cli::Cli;
use bankflow::config::Settings;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::resolve(cli.config.as_deref())?;

    let filter = if cli.verbose {
        EnvFilter::new("bankflow=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    cli.run(settings).await
}
