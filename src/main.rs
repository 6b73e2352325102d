use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use mkthist::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for mkthist::AppCommand {
    fn from(cmd: Commands) -> mkthist::AppCommand {
        match cmd {
            Commands::History {
                items,
                start,
                end,
                currency,
                volume,
                metals,
            } => mkthist::AppCommand::History {
                items,
                start,
                end,
                currency,
                volume,
                metals,
            },
            Commands::Rate { code } => mkthist::AppCommand::Rate { code },
            Commands::Coins { filter } => mkthist::AppCommand::Coins { filter },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch and summarize market history for a date range
    History {
        /// Comma-separated item names; defaults to the configured watchlist
        #[arg(long, value_delimiter = ',')]
        items: Vec<String>,

        /// Range start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Range end date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Convert values into this currency instead of the configured one
        #[arg(long)]
        currency: Option<String>,

        /// Chart traded volume instead of price (cryptocurrencies only)
        #[arg(long)]
        volume: bool,

        /// Chart precious metals instead of cryptocurrencies
        #[arg(long)]
        metals: bool,
    },
    /// Resolve one exchange rate against the USD base
    Rate { code: String },
    /// List available coins and their API identifiers
    Coins { filter: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => mkthist::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = mkthist::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
currency: "USD"

providers:
  coingecko:
    base_url: "https://api.coingecko.com"
    # api_key: "CG-..."
  metals_dev:
    base_url: "https://api.metals.dev"
    api_key: ""
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
