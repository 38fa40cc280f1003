// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # SIGIL Registry Node
//!
//! Entry point for the `sigil-node` binary. Parses CLI arguments, initializes
//! logging and metrics, opens the ledger, and serves the HTTP API.
//!
//! The binary supports four subcommands:
//!
//! - `run`: start the registry node
//! - `init`: initialize the data directory and generate a node key
//! - `sign`: sign an invoked-document envelope with the node key
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use sigil_protocol::config::PROTOCOL_VERSION;
use sigil_protocol::crypto::EcKeypair;
use sigil_protocol::identity::{sign_envelope, InvokedDocument};
use sigil_protocol::storage::LedgerDb;

use cli::{Commands, SigilNodeCli, NODE_KEY_FILE};
use logging::LogFormat;
use metrics::NodeMetrics;

/// Ledger directory inside the data directory.
const LEDGER_DIR: &str = "ledger";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = SigilNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Sign(args) => sign_file(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the registry node: API server and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(&args.log_level, args.log_format);

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting sigil-node"
    );

    // --- Ledger ---
    let db_path = args.data_dir.join(LEDGER_DIR);
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create ledger directory: {}", db_path.display()))?;
    let ledger = LedgerDb::open(&db_path)
        .with_context(|| format!("failed to open ledger at {}", db_path.display()))?;
    tracing::info!(
        path = %db_path.display(),
        records = ledger.record_count(),
        "ledger opened"
    );

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);

    // --- Application state ---
    let validator = args.schema_validator();
    tracing::info!(?validator, "schema limits");
    let app_state = api::AppState::new(
        format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        ledger,
        validator,
        Arc::clone(&node_metrics),
    );
    let ledger_handle = Arc::clone(&app_state.ledger);

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    ledger_handle
        .lock()
        .flush()
        .context("failed to flush ledger")?;
    tracing::info!("sigil-node stopped");
    Ok(())
}

/// Initializes a data directory and generates the node's P-256 key.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("sigil_node=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing node");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let key_path = data_dir.join(NODE_KEY_FILE);
    if key_path.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to replace it",
            key_path.display()
        );
    }

    let keypair = EcKeypair::generate();
    let public_key = keypair.public_key().to_multibase();

    std::fs::write(&key_path, hex::encode(keypair.secret_key_bytes()))
        .with_context(|| format!("failed to write node key to {}", key_path.display()))?;

    // Restrict permissions on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!(
        public_key = %public_key,
        key_path = %key_path.display(),
        "node keypair generated"
    );

    println!("Node initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Node key       : {}", key_path.display());
    println!("  Public key     : {}", public_key);

    Ok(())
}

/// Signs an envelope file and prints the signed JSON to stdout.
fn sign_file(args: cli::SignArgs) -> Result<()> {
    let keypair = load_keypair(&args.key_path())?;

    let raw = std::fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let mut envelope = InvokedDocument::from_json(&raw)
        .with_context(|| format!("{} is not an invoked document", args.input.display()))?;

    sign_envelope(&mut envelope, &keypair).context("failed to sign envelope")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&envelope).context("failed to encode envelope")?
    );
    Ok(())
}

fn load_keypair(path: &Path) -> Result<EcKeypair> {
    let encoded = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read node key from {}", path.display()))?;
    EcKeypair::from_hex(encoded.trim())
        .with_context(|| format!("{} does not hold a P-256 secret key", path.display()))
}

/// Prints version information to stdout.
fn print_version() {
    println!("sigil-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol   {}", PROTOCOL_VERSION);
    println!("contract   {}", sigil_protocol::config::CONTRACT_NAME);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler can't be
/// installed, that signal is never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(NODE_KEY_FILE);
        let keypair = EcKeypair::generate();
        std::fs::write(&path, format!("{}\n", hex::encode(keypair.secret_key_bytes()))).unwrap();

        let loaded = load_keypair(&path).unwrap();
        assert_eq!(loaded.public_key(), keypair.public_key());
    }

    #[test]
    fn garbage_key_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(NODE_KEY_FILE);
        std::fs::write(&path, "not-a-key").unwrap();
        assert!(load_keypair(&path).is_err());
        assert!(load_keypair(&dir.path().join("missing.key")).is_err());
    }
}
