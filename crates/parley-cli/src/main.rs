//! Parley terminal client.
//!
//! # Usage
//!
//! ```bash
//! # Log in and chat with bob
//! PARLEY_PASSWORD=secret parley --user alice --peer bob
//!
//! # Create the account first
//! parley --user alice --password secret --register
//! ```

use std::time::Duration;

use clap::Parser;
use parley_cli::{AppEvent, LineDriver, Runtime, input};
use parley_client::ApiClient;
use parley_core::{ConnectionConfig, ReconnectPolicy};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Longest accepted reconnect interval, one day.
const MAX_RECONNECT_SECS: u64 = 24 * 60 * 60;

/// Parley terminal client
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Real-time chat over WebSocket with history from the REST API")]
#[command(version)]
struct Args {
    /// Base URL of the REST API
    #[arg(long, env = "PARLEY_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    /// WebSocket endpoint
    #[arg(long, env = "PARLEY_WS_URL", default_value = "ws://localhost:8080/ws")]
    ws_url: String,

    /// Username to log in as
    #[arg(short, long)]
    user: String,

    /// Password
    #[arg(long, env = "PARLEY_PASSWORD", hide_env_values = true)]
    password: String,

    /// Register the account before logging in
    #[arg(long)]
    register: bool,

    /// Open a conversation with this user on start
    #[arg(short, long)]
    peer: Option<String>,

    /// Seconds between reconnect attempts (1 to 86400)
    #[arg(
        long,
        default_value = "5",
        value_parser = clap::value_parser!(u64).range(1..=MAX_RECONNECT_SECS)
    )]
    reconnect_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut api = ApiClient::new(&args.api_url);
    api.status().await?;

    if args.register {
        api.register(&args.user, &args.password).await?;
        tracing::info!(user = %args.user, "registered");
    }
    api.login(&args.user, &args.password).await?;

    let config = ConnectionConfig {
        policy: ReconnectPolicy::fixed(Duration::from_secs(args.reconnect_secs)),
    };

    let mut driver = LineDriver::stdio(args.ws_url, api);
    if let Some(peer) = args.peer {
        driver.queue(AppEvent::SelectPeer { peer });
    }

    println!("logged in as {}; {}", args.user, input::HELP);
    let mut runtime = Runtime::new(driver, args.user, config);
    runtime.run().await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(reconnect: &str) -> Result<Args, clap::Error> {
        Args::try_parse_from([
            "parley",
            "--user",
            "alice",
            "--password",
            "secret",
            "--reconnect-secs",
            reconnect,
        ])
    }

    #[test]
    fn reconnect_interval_in_range_is_accepted() {
        assert_eq!(parse("1").unwrap().reconnect_secs, 1);
        assert_eq!(parse("86400").unwrap().reconnect_secs, MAX_RECONNECT_SECS);
    }

    #[test]
    fn reconnect_interval_out_of_range_is_rejected() {
        for value in ["0", "86401", "18446744073709551615"] {
            let err = parse(value).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation, "{value}");
        }
    }
}
