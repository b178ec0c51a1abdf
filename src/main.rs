//! pacechat - Relay Server
//!
//! Accepts chat messages over HTTP and relays per-session histories to the
//! generative model.

use anyhow::Result;
use clap::{Parser, Subcommand};
use pacechat::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pacechat")]
#[command(about = "Speed-reading chat relay server")]
#[command(version)]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, global = true, env = "PACECHAT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Port to listen on (overrides config and SERVER_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind (overrides config and SERVER_HOST)
        #[arg(long)]
        host: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pacechat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_yaml_and_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.server_port = port;
            }
            if let Some(host) = host {
                config.server_host = host;
            }
            pacechat::start_server(config).await
        }
    }
}
