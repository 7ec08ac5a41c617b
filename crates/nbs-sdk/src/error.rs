use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("cannot connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server closed the connection")]
    Disconnected,

    #[error("protocol error: {0}")]
    Protocol(#[from] nbs_protocol::ProtocolError),
}

pub type SdkResult<T> = Result<T, SdkError>;
