use std::path::{Path, PathBuf};

use nbs_protocol::Endpoint;
use nbs_store::WipeConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_HIGH_WATER_MARK: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory holding one subdirectory per namespace.
    pub root: PathBuf,
    /// Bind addresses for the fire-and-forget command channel.
    pub command_endpoints: Vec<String>,
    /// Bind addresses for the request/reply query channel.
    pub query_endpoints: Vec<String>,
    /// Messages each channel queues before producers are held back.
    pub high_water_mark: usize,
    pub wipe: WipeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("nbs-data"),
            command_endpoints: Vec::new(),
            query_endpoints: Vec::new(),
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            wipe: WipeConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Check everything that must hold before the server binds anything.
    pub fn validate(&self) -> ServerResult<()> {
        self.command_endpoints()?;
        self.query_endpoints()?;
        if self.high_water_mark == 0 {
            return Err(ServerError::Config("high_water_mark must be at least 1".into()));
        }
        if self.root.as_os_str().is_empty() {
            return Err(ServerError::Config("root must not be empty".into()));
        }
        Ok(())
    }

    /// Parsed command endpoints; at least one is required.
    pub fn command_endpoints(&self) -> ServerResult<Vec<Endpoint>> {
        parse_endpoints("command", &self.command_endpoints)
    }

    /// Parsed query endpoints; at least one is required.
    pub fn query_endpoints(&self) -> ServerResult<Vec<Endpoint>> {
        parse_endpoints("query", &self.query_endpoints)
    }
}

fn parse_endpoints(channel: &'static str, raw: &[String]) -> ServerResult<Vec<Endpoint>> {
    if raw.is_empty() {
        return Err(ServerError::NoEndpoints { channel });
    }
    raw.iter()
        .map(|r| Endpoint::parse(r).map_err(ServerError::from))
        .collect()
}
