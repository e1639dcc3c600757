//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState, SharedRegistry};
use crate::config::AppConfig;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use titleledger_core::{LedgerError, LedgerStore, MemoryLedger, RedbLedger, Registry};

/// Settings shared by every command.
#[derive(Debug)]
pub struct Context {
    pub database: PathBuf,
    pub backend: String,
    pub json_mode: bool,
    pub config: AppConfig,
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// INVOKE COMMAND
// =============================================================================

/// Run a registry operation by name.
pub fn cmd_invoke(ctx: &Context, function: &str, args: &[String]) -> Result<(), LedgerError> {
    let registry = open_registry(ctx)?;
    let payload = registry.invoke_named(function, args)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "function": function,
            "success": true,
            "payload": payload.as_deref().map(String::from_utf8_lossy),
        }));
        return Ok(());
    }

    match payload {
        Some(bytes) => write_raw(&bytes)?,
        None => println!("{} succeeded", function),
    }
    Ok(())
}

// =============================================================================
// QUERY COMMAND
// =============================================================================

/// Print the raw bytes stored at a key.
pub fn cmd_query(ctx: &Context, key: &str) -> Result<(), LedgerError> {
    let registry = open_registry(ctx)?;
    let bytes = registry.raw_read(&[key.to_string()])?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "key": key,
            "value": String::from_utf8_lossy(&bytes),
        }));
        return Ok(());
    }
    write_raw(&bytes)
}

fn write_raw(bytes: &[u8]) -> Result<(), LedgerError> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(bytes)
        .and_then(|()| stdout.write_all(b"\n"))
        .map_err(|e| LedgerError::Io(format!("Write stdout: {}", e)))
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Print a decoded title record.
pub fn cmd_show(ctx: &Context, id: &str) -> Result<(), LedgerError> {
    let registry = open_registry(ctx)?;
    let title = registry.read_title(id)?;

    if ctx.json_mode {
        print_json(&serde_json::json!(title));
        return Ok(());
    }

    println!("Title {}", title.id);
    println!("==========");
    println!("VIN:   {}", title.vin);
    println!("Make:  {}", title.make);
    println!("Model: {}", title.model);
    println!("Rego:  {}", title.rego);
    println!("Owner: {}", title.owner);
    Ok(())
}

// =============================================================================
// LIST COMMAND
// =============================================================================

/// List indexed title ids.
pub fn cmd_list(ctx: &Context) -> Result<(), LedgerError> {
    let registry = open_registry(ctx)?;
    let ids = registry.title_ids()?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "count": ids.len(),
            "ids": ids,
        }));
        return Ok(());
    }

    println!("Indexed titles: {}", ids.len());
    for id in &ids {
        println!("  {}", id);
    }
    Ok(())
}

// =============================================================================
// AUDIT COMMAND
// =============================================================================

/// Check the index for dangling and duplicate entries.
pub fn cmd_audit(ctx: &Context) -> Result<(), LedgerError> {
    let registry = open_registry(ctx)?;
    let report = registry.audit()?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "consistent": report.is_consistent(),
            "report": report,
        }));
        return Ok(());
    }

    println!("Index Audit");
    println!("===========");
    println!("Indexed entries: {}", report.indexed);
    if report.is_consistent() {
        println!("Index is consistent");
        return Ok(());
    }
    for id in &report.dangling {
        println!("  dangling:  {}", id);
    }
    for (id, count) in &report.duplicates {
        println!("  duplicate: {} (x{})", id, count);
    }
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create the database (redb backend) and run `initialize` with `seed`.
pub fn cmd_init(ctx: &Context, force: bool, seed: &str) -> Result<(), LedgerError> {
    if ctx.backend == "redb" && ctx.database.exists() {
        if !force {
            return Err(LedgerError::Config(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(&ctx.database)
            .map_err(|e| LedgerError::Io(format!("Remove database: {}", e)))?;
        tracing::info!(path = %ctx.database.display(), "removed existing database");
    }

    let registry = open_registry(ctx)?;
    registry.initialize(&[seed.to_string()])?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "database": ctx.database.to_string_lossy(),
            "backend": ctx.backend,
            "initialized": true,
        }));
    } else {
        println!(
            "Initialized {} registry at {:?}",
            ctx.backend, ctx.database
        );
    }
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    ctx: &Context,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), LedgerError> {
    let registry = open_registry(ctx)?;
    let host = host.unwrap_or_else(|| ctx.config.server.host.clone());
    let port = port.unwrap_or(ctx.config.server.port);
    let allow_raw_write = ctx.config.registry.allow_raw_write;

    println!("Configuration:");
    println!("  Host:      {}", host);
    println!("  Port:      {}", port);
    println!("  Backend:   {}", ctx.backend);
    println!("  Database:  {:?}", ctx.database);
    println!("  Raw write: {}", if allow_raw_write { "enabled" } else { "disabled" });
    println!();
    println!("Endpoints:");
    println!("  POST /invoke       - Run an operation");
    println!("  POST /query        - Raw read");
    println!("  GET  /titles       - List indexed ids");
    println!("  GET  /titles/{{id}}  - Decoded title");
    println!("  GET  /audit        - Index audit");
    println!("  GET  /health       - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, AppState::new(registry, allow_raw_write)).await
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the configured backend and wrap it in a registry.
pub fn open_registry(ctx: &Context) -> Result<SharedRegistry, LedgerError> {
    let store: Arc<dyn LedgerStore> = match ctx.backend.as_str() {
        "redb" => Arc::new(RedbLedger::open(&ctx.database)?),
        "memory" => {
            tracing::debug!("using in-memory ledger; state is discarded on exit");
            Arc::new(MemoryLedger::new())
        }
        other => {
            return Err(LedgerError::Config(format!(
                "Unknown backend '{}'. Use: redb, memory",
                other
            )));
        }
    };
    Registry::with_config(store, ctx.config.registry_config())
}
