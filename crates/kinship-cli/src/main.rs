use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use kinship_cli::cli::{Cli, Commands};
use kinship_cli::commands::{self, related::RelatedArgs};
use kinship_config::{ConfigLoader, KinshipConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => KinshipConfig::default(),
    };

    // Initialize logging; RUST_LOG wins over the config file, -l/-v over both
    let directive = match cli.level_override() {
        Some(level) => format!("kinship_core={0},kinship_cli={0}", level.to_string().to_lowercase()),
        None => std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.directive()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_writer(std::io::stderr)
        .init();

    debug!("Effective config: {:?}", config);

    match cli.command {
        Commands::Related {
            root,
            blocks,
            query,
            categories,
            breadcrumb,
        } => {
            let args = RelatedArgs {
                root,
                blocks,
                query,
                categories,
                breadcrumb,
            };
            commands::related::execute(&config, args, cli.format).await?
        }

        Commands::Categories => commands::categories::execute(cli.format)?,
    }

    Ok(())
}
