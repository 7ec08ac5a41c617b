use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use nbs_sdk::Endpoint;
use nbs_server::ServerConfig;
use nbs_store::WipeStrategy;

pub const DEFAULT_COMMAND_ENDPOINT: &str = "tcp://127.0.0.1:5555";
pub const DEFAULT_QUERY_ENDPOINT: &str = "tcp://127.0.0.1:5556";

#[derive(Parser)]
#[command(name = "nbs", about = "NBS: namespaced blob store", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the NBS server
    Serve(ServeArgs),
    /// Store a blob (fire-and-forget)
    Save(SaveArgs),
    /// Print a blob to stdout
    Load(QueryArgs),
    /// Check whether a blob exists
    Contains(QueryArgs),
    /// Remove a blob (fire-and-forget)
    Delete(CommandArgs),
    /// Remove every blob in a namespace (fire-and-forget)
    DeleteAll(NamespaceArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// Command channel endpoint, e.g. tcp://0.0.0.0:5555 or ipc:///run/nbs.cmd
    #[arg(long = "command-bind")]
    pub command_bind: Vec<String>,
    /// Query channel endpoint
    #[arg(long = "query-bind")]
    pub query_bind: Vec<String>,
    /// Per-channel queue limit
    #[arg(long)]
    pub hwm: Option<usize>,
    #[arg(long)]
    pub wipe: Option<WipeStrategy>,
    /// Empty directory mirrored by the `mirror` wipe strategy
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,
}

impl ServeArgs {
    /// Overlay the flags that were given on top of `base`.
    pub fn apply(self, mut base: ServerConfig) -> ServerConfig {
        if let Some(root) = self.root {
            base.root = root;
        }
        if !self.command_bind.is_empty() {
            base.command_endpoints = self.command_bind;
        }
        if !self.query_bind.is_empty() {
            base.query_endpoints = self.query_bind;
        }
        if let Some(hwm) = self.hwm {
            base.high_water_mark = hwm;
        }
        if let Some(strategy) = self.wipe {
            base.wipe.strategy = strategy;
        }
        if let Some(dir) = self.staging_dir {
            base.wipe.staging_dir = dir;
        }
        base
    }
}

#[derive(Args)]
pub struct SaveArgs {
    pub namespace: String,
    pub name: String,
    /// Blob content; read from --file or stdin when omitted
    #[arg(conflicts_with = "file")]
    pub content: Option<String>,
    #[arg(long)]
    pub file: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_COMMAND_ENDPOINT)]
    pub command: Endpoint,
}

#[derive(Args)]
pub struct CommandArgs {
    pub namespace: String,
    pub name: String,
    #[arg(long, default_value = DEFAULT_COMMAND_ENDPOINT)]
    pub command: Endpoint,
}

#[derive(Args)]
pub struct NamespaceArgs {
    pub namespace: String,
    #[arg(long, default_value = DEFAULT_COMMAND_ENDPOINT)]
    pub command: Endpoint,
}

#[derive(Args)]
pub struct QueryArgs {
    pub namespace: String,
    pub name: String,
    #[arg(long, default_value = DEFAULT_QUERY_ENDPOINT)]
    pub query: Endpoint,
}
