//! Wire protocol for NBS.
//!
//! Defines the endpoint syntax and multi-part framing shared by both
//! channels, the closed set of command and query verbs, and the single-part
//! replies sent on the query channel.

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod reply;

pub use codec::{FrameCodec, MAX_MESSAGE_SIZE};
pub use endpoint::{BoundEndpoint, Endpoint, IPC_SCHEME, TCP_SCHEME};
pub use error::{DecodeError, ProtocolError, ProtocolResult};
pub use message::{preview, Command, CommandVerb, Query, QueryVerb, PREVIEW_LEN};
pub use reply::{Reply, ABSENT, PRESENT, SENTINEL};
