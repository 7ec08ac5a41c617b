//! Client SDK for NBS.
//!
//! [`CommandClient`] pushes `SAVE`, `DELETE` and `DELETE_ALL` onto the
//! command channel without waiting for any acknowledgement.
//! [`QueryClient`] issues `LOAD` and `CONTAINS` and waits for the reply.
//! The two channels are independent, so a query sent right after a command
//! may not yet observe it.

pub mod command;
pub mod error;
pub mod query;
mod transport;

pub use command::CommandClient;
pub use error::{SdkError, SdkResult};
pub use query::QueryClient;

// Re-export key types
pub use nbs_protocol::{Command, Endpoint, Query, Reply};

#[cfg(test)]
pub(crate) mod testing {
    use std::future::Future;
    use std::path::PathBuf;
    use std::time::Duration;

    use nbs_server::{NbsServer, ServerConfig};
    use tokio::sync::oneshot;

    use super::*;

    /// A server on ephemeral endpoints, stopped when dropped.
    pub struct TestServer {
        pub command: Endpoint,
        pub query: Endpoint,
        pub root: PathBuf,
        _stop: oneshot::Sender<()>,
        _dir: tempfile::TempDir,
    }

    pub async fn spawn_server() -> TestServer {
        spawn(|_| ("tcp://127.0.0.1:0".to_string(), "tcp://127.0.0.1:0".to_string())).await
    }

    #[cfg(unix)]
    pub async fn spawn_ipc_server() -> TestServer {
        spawn(|dir| {
            (
                format!("ipc://{}", dir.join("command.sock").display()),
                format!("ipc://{}", dir.join("query.sock").display()),
            )
        })
        .await
    }

    async fn spawn(endpoints: impl FnOnce(&std::path::Path) -> (String, String)) -> TestServer {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        let (command, query) = endpoints(dir.path());
        let config = ServerConfig {
            root: root.clone(),
            command_endpoints: vec![command],
            query_endpoints: vec![query],
            ..ServerConfig::default()
        };
        let server = NbsServer::bind(config).await.unwrap();
        let command = server.command_endpoints()[0].to_endpoint();
        let query = server.query_endpoints()[0].to_endpoint();

        let (stop, stopped) = oneshot::channel::<()>();
        tokio::spawn(server.serve_until(async {
            let _ = stopped.await;
        }));
        TestServer {
            command,
            query,
            root,
            _stop: stop,
            _dir: dir,
        }
    }

    /// Poll `check` until it holds, panicking after a few seconds.
    pub async fn eventually<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        for _ in 0..500 {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition did not hold in time");
    }

    pub async fn load(endpoint: &Endpoint, namespace: &str, name: &str) -> Option<Vec<u8>> {
        let mut client = QueryClient::connect(endpoint).await.unwrap();
        client.load(namespace, name).await.unwrap()
    }

    pub async fn contains(endpoint: &Endpoint, namespace: &str, name: &str) -> bool {
        let mut client = QueryClient::connect(endpoint).await.unwrap();
        client.contains(namespace, name).await.unwrap()
    }
}
