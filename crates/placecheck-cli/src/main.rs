mod commands;

use clap::{Parser, Subcommand};
use placecheck_core::Plan;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "placecheck")]
#[command(about = "Extract and diagnose Naver place listings from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a listing URL to its identifier and canonical URL.
    Resolve { url: String },
    /// Extract the listing record and print it as JSON.
    Extract {
        url: String,
        /// Skip the headless browser tier.
        #[arg(long)]
        static_only: bool,
    },
    /// Extract, score and print the diagnosis report as JSON.
    Diagnose {
        url: String,
        #[arg(long, default_value = "free")]
        plan: Plan,
        /// Competitor search term (pro plan only).
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        static_only: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = placecheck_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let output = match cli.command {
        Commands::Resolve { url } => commands::resolve(&url)?,
        Commands::Extract { url, static_only } => {
            commands::extract(&config, &url, static_only).await?
        }
        Commands::Diagnose {
            url,
            plan,
            search,
            static_only,
        } => commands::diagnose(&config, &url, plan, search.as_deref(), static_only).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests;
