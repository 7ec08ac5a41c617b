use thiserror::Error;

/// Why a received message could not be turned into a command or query.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty message")]
    Empty,

    #[error("unknown verb {verb:?}")]
    UnknownVerb { verb: String },

    #[error("malformed {verb}: expected {expected} arguments, got {actual}")]
    Arity {
        verb: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("framing error: {0}")]
    FramingError(String),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("unexpected reply to {verb}: {reply:?}")]
    UnexpectedReply { verb: &'static str, reply: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
