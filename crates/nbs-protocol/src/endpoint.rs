use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ProtocolError, ProtocolResult};

pub const TCP_SCHEME: &str = "tcp://";
pub const IPC_SCHEME: &str = "ipc://";

/// `tcp://*:port` binds every IPv4 interface.
const WILDCARD_HOST: &str = "*";
const ANY_ADDRESS: &str = "0.0.0.0";

/// Address a channel binds to or a client connects to.
///
/// ```
/// use nbs_protocol::Endpoint;
///
/// let endpoint: Endpoint = "tcp://127.0.0.1:5555".parse().unwrap();
/// assert_eq!(endpoint.to_string(), "tcp://127.0.0.1:5555");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `tcp://host:port`; port `0` binds an ephemeral port.
    Tcp { host: String, port: u16 },
    /// `ipc:///path/to/socket`, a Unix domain socket.
    Ipc { path: PathBuf },
}

impl Endpoint {
    /// Parse `tcp://host:port` (`*` for any IPv4 interface) or `ipc://path`.
    pub fn parse(raw: &str) -> ProtocolResult<Self> {
        let invalid = |reason: &str| ProtocolError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason: reason.to_string(),
        };

        if let Some(rest) = raw.strip_prefix(TCP_SCHEME) {
            let (host, port) = rest
                .rsplit_once(':')
                .ok_or_else(|| invalid("expected tcp://host:port"))?;
            let host = match host.trim_start_matches('[').trim_end_matches(']') {
                "" => return Err(invalid("missing host")),
                WILDCARD_HOST => ANY_ADDRESS,
                host => host,
            };
            let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
            return Ok(Self::Tcp { host: host.to_string(), port });
        }

        if let Some(path) = raw.strip_prefix(IPC_SCHEME) {
            if path.is_empty() {
                return Err(invalid("missing socket path"));
            }
            return Ok(Self::Ipc { path: PathBuf::from(path) });
        }

        Err(invalid("unsupported scheme; use tcp:// or ipc://"))
    }
}

impl FromStr for Endpoint {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } if host.contains(':') => write!(f, "{TCP_SCHEME}[{host}]:{port}"),
            Self::Tcp { host, port } => write!(f, "{TCP_SCHEME}{host}:{port}"),
            Self::Ipc { path } => write!(f, "{IPC_SCHEME}{}", path.display()),
        }
    }
}

/// Where a listener actually ended up after binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoundEndpoint {
    Tcp(SocketAddr),
    Ipc(PathBuf),
}

impl BoundEndpoint {
    /// The endpoint a client should connect to.
    pub fn to_endpoint(&self) -> Endpoint {
        match self {
            Self::Tcp(addr) => Endpoint::Tcp {
                host: addr.ip().to_string(),
                port: addr.port(),
            },
            Self::Ipc(path) => Endpoint::Ipc { path: path.clone() },
        }
    }
}

impl fmt::Display for BoundEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_endpoint().fmt(f)
    }
}
