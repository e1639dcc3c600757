//! # titleledger CLI Module
//!
//! Command-line dispatcher for the title registry.
//!
//! ## Available Commands
//!
//! - `invoke` - Run any registry operation by name
//! - `query` - Print the raw bytes stored at a key
//! - `show` - Print a decoded title
//! - `list` - List indexed title ids
//! - `audit` - Check the index against stored records
//! - `init` - Create a database and reset the registry
//! - `server` - Start the HTTP server

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use titleledger_core::LedgerError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// titleledger - vehicle title registry on a key-value ledger
#[derive(Parser, Debug)]
#[command(name = "titleledger")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the ledger database
    #[arg(short = 'D', long, global = true, default_value = "titleledger.db")]
    pub database: PathBuf,

    /// Ledger backend: "redb" (durable file) or "memory" (discarded on exit)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Optional TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a registry operation by name (initialize, init_title, set_owner, ...)
    Invoke {
        /// Operation name
        function: String,

        /// Positional string arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print the raw bytes stored at a key
    Query {
        /// Ledger key
        key: String,
    },

    /// Print a decoded title record
    Show {
        /// Title id
        id: String,
    },

    /// List indexed title ids
    List,

    /// Check the index for dangling and duplicate entries
    Audit,

    /// Create the database and reset the registry
    Init {
        /// Recreate the database even if it exists
        #[arg(short, long)]
        force: bool,

        /// Integer written to the legacy seed key
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        seed: String,
    },

    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the config file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), LedgerError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let ctx = Context {
        database: cli.database,
        backend: cli.backend,
        json_mode: cli.json_mode,
        config,
    };

    match cli.command {
        Some(Commands::Invoke { function, args }) => cmd_invoke(&ctx, &function, &args),
        Some(Commands::Query { key }) => cmd_query(&ctx, &key),
        Some(Commands::Show { id }) => cmd_show(&ctx, &id),
        Some(Commands::List) => cmd_list(&ctx),
        Some(Commands::Audit) => cmd_audit(&ctx),
        Some(Commands::Init { force, seed }) => cmd_init(&ctx, force, &seed),
        Some(Commands::Server { host, port }) => {
            if !cli.quiet {
                print_banner();
            }
            cmd_server(&ctx, host, port).await
        }
        None => cmd_list(&ctx),
    }
}

/// Print the startup banner.
fn print_banner() {
    println!();
    println!("  titleledger v{}", env!("CARGO_PKG_VERSION"));
    println!("  Vehicle title registry on a key-value ledger");
    println!();
}
