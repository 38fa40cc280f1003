//! # CLI Interface
//!
//! Defines the command-line argument structure for `sigil-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `sign`,
//! and `version`. Every flag that matters in a deployment has a `SIGIL_*`
//! environment fallback.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sigil_protocol::config::{
    DEFAULT_MAX_SERVICES, DEFAULT_MAX_VERIFICATION_METHODS, DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT,
};
use sigil_protocol::identity::SchemaValidator;

use crate::logging::LogFormat;

/// File name of the node's signing key inside the data directory.
pub const NODE_KEY_FILE: &str = "node.key";

/// SIGIL registry node.
///
/// Serves the DID document and credential-metadata contracts over
/// JSON-RPC, backed by a sled ledger, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "sigil-node",
    about = "SIGIL DID registry node",
    version,
    propagate_version = true
)]
pub struct SigilNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the SIGIL node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the registry node.
    Run(RunArgs),
    /// Initialize a data directory and generate a P-256 node key.
    Init(InitArgs),
    /// Sign an unsigned invoked-document envelope with the node key.
    Sign(SignArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Data directory holding the ledger and the node key.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "SIGIL_DATA_DIR", default_value = ".sigil")]
    pub data_dir: PathBuf,

    /// Port for the JSON-RPC and REST API.
    #[arg(long, env = "SIGIL_API_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "SIGIL_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Log filter directives. `RUST_LOG` wins when set.
    #[arg(
        long,
        env = "SIGIL_LOG_LEVEL",
        default_value = "sigil_node=info,sigil_contracts=info,tower_http=info"
    )]
    pub log_level: String,

    /// Log output format.
    #[arg(long, env = "SIGIL_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Reject documents whose `@context` lacks the W3C DID core context.
    #[arg(long, env = "SIGIL_REQUIRE_DID_CORE_CONTEXT")]
    pub require_did_core_context: bool,

    /// Maximum verification methods per document.
    #[arg(long, env = "SIGIL_MAX_VERIFICATION_METHODS", default_value_t = DEFAULT_MAX_VERIFICATION_METHODS)]
    pub max_verification_methods: usize,

    /// Maximum services per document.
    #[arg(long, env = "SIGIL_MAX_SERVICES", default_value_t = DEFAULT_MAX_SERVICES)]
    pub max_services: usize,
}

impl RunArgs {
    /// The schema limits this node enforces.
    pub fn schema_validator(&self) -> SchemaValidator {
        SchemaValidator {
            require_did_core_context: self.require_did_core_context,
            max_verification_methods: self.max_verification_methods,
            max_services: self.max_services,
        }
    }
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "SIGIL_DATA_DIR", default_value = ".sigil")]
    pub data_dir: PathBuf,

    /// Replace an existing node key.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `sign` subcommand.
#[derive(Parser, Debug)]
pub struct SignArgs {
    /// Unsigned envelope (JSON). The proof's `proofValue` is filled in.
    pub input: PathBuf,

    /// Key file to sign with. Defaults to the key in the data directory.
    #[arg(long, short = 'k', env = "SIGIL_NODE_KEY")]
    pub key: Option<PathBuf>,

    /// Data directory holding the node key.
    #[arg(long, short = 'd', env = "SIGIL_DATA_DIR", default_value = ".sigil")]
    pub data_dir: PathBuf,
}

impl SignArgs {
    pub fn key_path(&self) -> PathBuf {
        self.key
            .clone()
            .unwrap_or_else(|| self.data_dir.join(NODE_KEY_FILE))
    }
}
