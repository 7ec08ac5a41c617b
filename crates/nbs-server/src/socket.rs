//! Channel endpoints: a PULL-style command socket and a REP-style query
//! socket.
//!
//! Each socket binds one listener per configured endpoint. Connection tasks
//! only move framed messages between their stream and a bounded queue sized
//! by the high-water mark; once the queue is full, readers stop pulling from
//! their streams and the peers are held back by the transport. The
//! dispatcher owns the receiving half of both queues.

use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::Bytes;
use nbs_protocol::{BoundEndpoint, Endpoint, FrameCodec, Reply};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::error::{ServerError, ServerResult};

#[cfg(unix)]
use std::path::{Path, PathBuf};
#[cfg(unix)]
use tokio::net::UnixListener;

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Raw multi-part messages waiting on the command channel.
pub type CommandInbox = mpsc::Receiver<Vec<Bytes>>;
/// Queries waiting on the query channel, each carrying its reply slot.
pub type QueryInbox = mpsc::Receiver<QueryRequest>;

/// One received query and the slot its single reply goes into.
#[derive(Debug)]
pub struct QueryRequest {
    pub parts: Vec<Bytes>,
    reply_to: oneshot::Sender<Vec<Bytes>>,
}

impl QueryRequest {
    /// Pair a query with the receiver its reply will arrive on.
    pub fn new(parts: Vec<Bytes>) -> (Self, oneshot::Receiver<Vec<Bytes>>) {
        let (reply_to, reply_rx) = oneshot::channel();
        (Self { parts, reply_to }, reply_rx)
    }

    /// Send the reply. A peer that disconnected meanwhile is not an error.
    pub fn respond(self, reply: Reply) {
        if self.reply_to.send(reply.encode()).is_err() {
            debug!("query peer went away before its reply was sent");
        }
    }
}

trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

type BoxStream = Box<dyn AsyncStream>;

enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Ipc(UnixListener, PathBuf),
}

impl Listener {
    async fn bind(endpoint: &Endpoint) -> ServerResult<Self> {
        let bind_error = |source: io::Error| ServerError::Bind {
            endpoint: endpoint.to_string(),
            source,
        };
        match endpoint {
            Endpoint::Tcp { host, port } => {
                let listener = TcpListener::bind((host.as_str(), *port))
                    .await
                    .map_err(bind_error)?;
                Ok(Self::Tcp(listener))
            }
            #[cfg(unix)]
            Endpoint::Ipc { path } => {
                remove_stale_socket(path).map_err(bind_error)?;
                let listener = UnixListener::bind(path).map_err(bind_error)?;
                Ok(Self::Ipc(listener, path.clone()))
            }
            #[cfg(not(unix))]
            Endpoint::Ipc { .. } => Err(ServerError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "ipc endpoints require a Unix platform".into(),
            }),
        }
    }

    fn bound(&self) -> io::Result<BoundEndpoint> {
        match self {
            Self::Tcp(listener) => listener.local_addr().map(BoundEndpoint::Tcp),
            #[cfg(unix)]
            Self::Ipc(_, path) => Ok(BoundEndpoint::Ipc(path.clone())),
        }
    }

    async fn accept(&self) -> io::Result<(BoxStream, String)> {
        match self {
            Self::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                stream.set_nodelay(true)?;
                Ok((Box::new(stream), peer.to_string()))
            }
            #[cfg(unix)]
            Self::Ipc(listener, path) => {
                let (stream, _) = listener.accept().await?;
                Ok((Box::new(stream), path.display().to_string()))
            }
        }
    }
}

#[cfg(unix)]
fn remove_stale_socket(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::FileTypeExt;

    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => std::fs::remove_file(path),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "path exists and is not a socket",
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// The bound listeners of one channel.
///
/// Each accept task owns the connection tasks it spawned, so aborting it
/// tears those down too. Dropping this aborts everything and unlinks any
/// `ipc://` socket files.
struct Listeners {
    bound: Vec<BoundEndpoint>,
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for Listeners {
    fn drop(&mut self) {
        self.tasks.iter().for_each(JoinHandle::abort);
        for endpoint in &self.bound {
            if let BoundEndpoint::Ipc(path) = endpoint {
                if let Err(e) = std::fs::remove_file(path) {
                    debug!(path = %path.display(), error = %e, "socket file not removed");
                }
            }
        }
    }
}

/// Bind every endpoint and start one accept task per listener.
async fn bind_all<F, Fut>(channel: &'static str, endpoints: &[Endpoint], serve: F) -> ServerResult<Listeners>
where
    F: Fn(BoxStream, String) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if endpoints.is_empty() {
        return Err(ServerError::NoEndpoints { channel });
    }
    // Partially bound channels are torn down by `Listeners::drop`.
    let mut listeners = Listeners {
        bound: Vec::with_capacity(endpoints.len()),
        tasks: Vec::with_capacity(endpoints.len()),
    };
    for endpoint in endpoints {
        let listener = Listener::bind(endpoint).await?;
        let local = listener.bound()?;
        info!(channel, endpoint = %local, "channel bound");
        listeners.bound.push(local);

        let serve = serve.clone();
        listeners.tasks.push(tokio::spawn(async move {
            let mut connections = JoinSet::new();
            loop {
                tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            debug!(channel, %peer, "peer connected");
                            connections.spawn(serve(stream, peer));
                        }
                        Err(e) => {
                            warn!(channel, error = %e, "accept failed");
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        }
                    },
                    Some(_) = connections.join_next(), if !connections.is_empty() => {}
                }
            }
        }));
    }
    Ok(listeners)
}

/// Ingest-only socket for the command channel. Nothing is ever written back
/// to command peers.
pub struct PullSocket {
    inbox: CommandInbox,
    listeners: Listeners,
}

impl PullSocket {
    /// Bind every command endpoint. At most `high_water_mark` messages queue
    /// before readers stop pulling from their peers.
    pub async fn bind(endpoints: &[Endpoint], high_water_mark: usize) -> ServerResult<Self> {
        let (tx, inbox) = mpsc::channel(high_water_mark.max(1));
        let listeners = bind_all("command", endpoints, move |stream, peer| {
            pull_connection(stream, peer, tx.clone())
        })
        .await?;
        Ok(Self { inbox, listeners })
    }

    /// Addresses actually bound, with ephemeral ports resolved.
    pub fn local_endpoints(&self) -> &[BoundEndpoint] {
        &self.listeners.bound
    }

    /// Messages from every command peer, in per-peer arrival order.
    pub fn inbox_mut(&mut self) -> &mut CommandInbox {
        &mut self.inbox
    }
}

async fn pull_connection(mut stream: BoxStream, peer: String, tx: mpsc::Sender<Vec<Bytes>>) {
    loop {
        match FrameCodec::read_message(&mut stream).await {
            Ok(Some(parts)) => {
                if tx.send(parts).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(channel = "command", %peer, error = %e, "dropping connection after bad frame");
                break;
            }
        }
    }
    debug!(channel = "command", %peer, "peer disconnected");
}

/// Strict request/reply socket for the query channel. Each connection waits
/// for the reply to its current request before reading the next one.
pub struct RepSocket {
    inbox: QueryInbox,
    listeners: Listeners,
}

impl RepSocket {
    /// Bind every query endpoint. At most `high_water_mark` requests queue
    /// before readers stop pulling from their peers.
    pub async fn bind(endpoints: &[Endpoint], high_water_mark: usize) -> ServerResult<Self> {
        let (tx, inbox) = mpsc::channel(high_water_mark.max(1));
        let listeners = bind_all("query", endpoints, move |stream, peer| {
            rep_connection(stream, peer, tx.clone())
        })
        .await?;
        Ok(Self { inbox, listeners })
    }

    /// Addresses actually bound, with ephemeral ports resolved.
    pub fn local_endpoints(&self) -> &[BoundEndpoint] {
        &self.listeners.bound
    }

    /// Requests from every query peer; each must be answered exactly once.
    pub fn inbox_mut(&mut self) -> &mut QueryInbox {
        &mut self.inbox
    }
}

async fn rep_connection(mut stream: BoxStream, peer: String, tx: mpsc::Sender<QueryRequest>) {
    loop {
        let parts = match FrameCodec::read_message(&mut stream).await {
            Ok(Some(parts)) => parts,
            Ok(None) => break,
            Err(e) => {
                warn!(channel = "query", %peer, error = %e, "dropping connection after bad frame");
                break;
            }
        };
        let (request, reply_rx) = QueryRequest::new(parts);
        if tx.send(request).await.is_err() {
            break;
        }
        let Ok(reply) = reply_rx.await else {
            break;
        };
        if let Err(e) = FrameCodec::write_message(&mut stream, &reply).await {
            warn!(channel = "query", %peer, error = %e, "failed to send reply");
            break;
        }
    }
    debug!(channel = "query", %peer, "peer disconnected");
}
