//! Relay server binary.
//!
//! # Usage
//!
//! ```bash
//! relay-server --bind 0.0.0.0:9696 --credentials credentials.toml
//! ```

use clap::Parser;
use relay_server::{Server, ServerRuntimeConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// WebSocket relay server
#[derive(Parser, Debug)]
#[command(name = "relay-server")]
#[command(about = "Multi-threaded WebSocket relay")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, env = "RELAY_BIND", default_value = "0.0.0.0:9696")]
    bind: String,

    /// Path to a TOML file listing accepted relay op 0 passwords
    #[arg(short, long, env = "RELAY_CREDENTIALS")]
    credentials: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RELAY_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let credentials = match &args.credentials {
        Some(path) => relay_server::config::CredentialsFile::load(path)?.into_credentials(),
        None => {
            tracing::warn!("no --credentials file given; relay op 0 will accept no password");
            relay_core::Credentials::new(Vec::new())
        }
    };

    tracing::info!(bind = %args.bind, "relay server starting");

    let config = ServerRuntimeConfig { bind_address: args.bind };
    let server = Server::bind(config, credentials).await?;

    tracing::info!(addr = %server.local_addr()?, "relay server listening");

    server.run().await?;

    Ok(())
}
