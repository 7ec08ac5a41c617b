//! NBS server.
//!
//! Fronts a namespaced blob store with two channels: a fire-and-forget
//! command channel for `SAVE`, `DELETE` and `DELETE_ALL`, and a strict
//! request/reply query channel for `LOAD` and `CONTAINS`. A single dispatch
//! loop multiplexes both and performs every store operation.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod server;
pub mod socket;

pub use config::{ServerConfig, DEFAULT_HIGH_WATER_MARK};
pub use context::ServerContext;
pub use dispatch::Dispatcher;
pub use error::{ServerError, ServerResult};
pub use server::NbsServer;
pub use nbs_protocol::{BoundEndpoint, Endpoint};
pub use socket::{CommandInbox, PullSocket, QueryInbox, QueryRequest, RepSocket};
