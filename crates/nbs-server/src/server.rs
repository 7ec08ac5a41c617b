use std::future::Future;

use nbs_protocol::BoundEndpoint;
use nbs_store::FsBlobStore;
use tracing::info;

use crate::config::ServerConfig;
use crate::context::ServerContext;
use crate::dispatch::Dispatcher;
use crate::error::ServerResult;
use crate::socket::{PullSocket, RepSocket};

/// NBS server: a bound command socket, a bound query socket, and the store
/// they front.
pub struct NbsServer {
    context: ServerContext<FsBlobStore>,
    commands: PullSocket,
    queries: RepSocket,
}

impl NbsServer {
    /// Validate the configuration, open the store, and bind every endpoint.
    ///
    /// Any failure here is fatal: the server must not start serving with a
    /// missing channel or an unusable root.
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let command_endpoints = config.command_endpoints()?;
        let query_endpoints = config.query_endpoints()?;

        let store = FsBlobStore::open(&config.root, config.wipe.clone())?;
        let commands = PullSocket::bind(&command_endpoints, config.high_water_mark).await?;
        let queries = RepSocket::bind(&query_endpoints, config.high_water_mark).await?;

        info!(
            root = %config.root.display(),
            high_water_mark = config.high_water_mark,
            "NBS server ready"
        );
        Ok(Self {
            context: ServerContext::new(store, config),
            commands,
            queries,
        })
    }

    /// Store and configuration the dispatcher runs against.
    pub fn context(&self) -> &ServerContext<FsBlobStore> {
        &self.context
    }

    /// Where the command channel is listening.
    pub fn command_endpoints(&self) -> &[BoundEndpoint] {
        self.commands.local_endpoints()
    }

    /// Where the query channel is listening.
    pub fn query_endpoints(&self) -> &[BoundEndpoint] {
        self.queries.local_endpoints()
    }

    /// Serve until the process is terminated.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve_until<F>(mut self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()>,
    {
        let config = self.context.config();
        info!(
            root = %config.root.display(),
            wipe = %config.wipe.strategy,
            "dispatching"
        );
        let dispatcher = Dispatcher::new(&self.context);
        tokio::select! {
            () = dispatcher.run(self.commands.inbox_mut(), self.queries.inbox_mut()) => {}
            () = shutdown => info!("shutdown requested"),
        }
        Ok(())
    }
}
