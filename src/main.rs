use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bonusvarsler::app::AppContext;
use bonusvarsler::cli::{commands, Cli, Commands, ServiceAction};
use bonusvarsler::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config, cli.db)?;

    match cli.command {
        Commands::Resolve { target } => {
            commands::resolve(&ctx, &target).await?;
        }
        Commands::Check { target } => {
            commands::check(&ctx, &target)?;
        }
        Commands::Refresh => {
            commands::refresh(&ctx).await?;
        }
        Commands::ClearCache => {
            commands::clear_cache(&ctx)?;
        }
        Commands::Services { action } => match action {
            None => commands::list_services(&ctx).await?,
            Some(ServiceAction::Enable { id }) => {
                commands::set_service_enabled(&ctx, &id, true).await?
            }
            Some(ServiceAction::Disable { id }) => {
                commands::set_service_enabled(&ctx, &id, false).await?
            }
        },
        Commands::Hide { target } => {
            commands::hide(&ctx, &target)?;
        }
        Commands::Unhide { target } => {
            commands::unhide(&ctx, &target)?;
        }
        Commands::Activated { url } => {
            commands::activated(&ctx, &url).await?;
        }
        Commands::Probe { url } => {
            commands::probe(&ctx, &url).await?;
        }
    }

    Ok(())
}
