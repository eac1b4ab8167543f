//! shop-dashboard server binary

use anyhow::Result;
use clap::{Parser, Subcommand};
use shop_dashboard::config::ShopConfig;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "shop-dashboard")]
#[command(version)]
#[command(about = "Repair shop job board with live labor time accrual", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service and accrual engine
    Serve {
        /// Load this config file instead of the standard search path
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the listening port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show {
        /// Load this config file instead of the standard search path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the recommended user config file path
    Path,
}

fn load_config(path: Option<&Path>) -> Result<ShopConfig> {
    path.map_or_else(ShopConfig::load, ShopConfig::load_from)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port } => {
            shop_dashboard::observability::init()?;
            let mut config = load_config(config.as_deref())?;
            if let Some(port) = port {
                config.server.port = port;
            }
            shop_dashboard::server::run(config).await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show { config } => {
                print!("{}", load_config(config.as_deref())?.to_toml()?);
                Ok(())
            }
            ConfigCommands::Path => {
                println!("{}", ShopConfig::recommended_path().display());
                Ok(())
            }
        },
    }
}
