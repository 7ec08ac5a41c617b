use std::fmt;
use std::io;
use std::path::PathBuf;

/// Which half of a blob key a segment belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Namespace,
    Name,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Namespace => write!(f, "namespace"),
            Self::Name => write!(f, "name"),
        }
    }
}

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A namespace or name cannot be used as a single path segment.
    #[error("invalid {kind} {segment:?}: {reason}")]
    InvalidSegment {
        kind: SegmentKind,
        segment: String,
        reason: String,
    },

    /// The root directory could not be created or is not writable.
    #[error("root directory {path:?} is unusable: {reason}")]
    UnusableRoot { path: PathBuf, reason: String },

    /// The wipe staging directory could not be prepared.
    #[error("staging directory {path:?} is unusable: {reason}")]
    UnusableStaging { path: PathBuf, reason: String },

    /// A background wipe worker panicked before finishing.
    #[error("wipe worker for {0:?} panicked")]
    WipePanicked(PathBuf),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
