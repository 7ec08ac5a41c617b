use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("no {channel} endpoints configured; at least one is required")]
    NoEndpoints { channel: &'static str },

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("cannot bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] nbs_store::StoreError),

    #[error("protocol error: {0}")]
    Protocol(#[from] nbs_protocol::ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
