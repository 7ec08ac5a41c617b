use nbs_store::{BlobStore, FsBlobStore};

use crate::config::ServerConfig;

/// Everything the dispatch loop needs, built once at startup and passed by
/// reference to every operation.
#[derive(Debug)]
pub struct ServerContext<S = FsBlobStore> {
    store: S,
    config: ServerConfig,
}

impl<S: BlobStore> ServerContext<S> {
    /// Bundle an opened store with the configuration it was opened from.
    pub fn new(store: S, config: ServerConfig) -> Self {
        Self { store, config }
    }

    /// The blob store every operation runs against.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The configuration the server was bound with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
