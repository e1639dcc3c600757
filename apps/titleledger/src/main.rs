//! # titleledger - Vehicle Title Registry
//!
//! The binary for the title registry.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │            apps/titleledger (THE BINARY)         │
//! │                                                  │
//! │   ┌─────────────┐          ┌─────────────┐       │
//! │   │    CLI      │          │  HTTP API   │       │
//! │   │   (clap)    │          │   (axum)    │       │
//! │   └──────┬──────┘          └──────┬──────┘       │
//! │          └───────────┬────────────┘              │
//! │                      ▼                           │
//! │             ┌──────────────────┐                 │
//! │             │ titleledger-core │                 │
//! │             │  (THE REGISTRY)  │                 │
//! │             └──────────────────┘                 │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! titleledger init
//! titleledger invoke init_title V1 1HGCM82633A004352 Honda Civic ABC123 Alice
//! titleledger invoke set_owner V1 Bob
//! titleledger show V1
//! titleledger server --host 0.0.0.0 --port 8080
//! ```

use clap::Parser;
use titleledger::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable selecting the log format ("json" or text).
const LOG_FORMAT_ENV: &str = "TITLELEDGER_LOG_FORMAT";

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = cli::execute(cli).await {
        tracing::error!(kind = e.kind(), "Error: {}", e);
        std::process::exit(1);
    }
}

/// Install the tracing subscriber on stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let log_format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "text".to_string());

    let default_filter = if verbose {
        "titleledger=debug,tower_http=debug"
    } else {
        "titleledger=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
