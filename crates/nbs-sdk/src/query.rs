use bytes::Bytes;
use nbs_protocol::{Endpoint, FrameCodec, Query, Reply};
use tracing::debug;

use crate::error::{SdkError, SdkResult};
use crate::transport::{connect, BoxStream};

/// Client for the query channel. Each request waits for its single reply
/// before the next one may be sent.
pub struct QueryClient {
    endpoint: Endpoint,
    stream: BoxStream,
}

impl QueryClient {
    /// Connect to a query endpoint.
    pub async fn connect(endpoint: &Endpoint) -> SdkResult<Self> {
        let stream = connect(endpoint).await?;
        Ok(Self {
            endpoint: endpoint.clone(),
            stream,
        })
    }

    /// The endpoint this client is connected to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Fetch a blob. `None` covers both a missing blob and a server-side
    /// failure, since the wire reply does not distinguish them.
    pub async fn load(&mut self, namespace: &str, name: &str) -> SdkResult<Option<Vec<u8>>> {
        let reply = self
            .request(Query::Load {
                namespace: Bytes::copy_from_slice(namespace.as_bytes()),
                name: Bytes::copy_from_slice(name.as_bytes()),
            })
            .await?;
        Ok(match reply {
            Reply::Blob(data) => Some(data.to_vec()),
            _ => None,
        })
    }

    /// Whether `namespace/name` currently exists.
    pub async fn contains(&mut self, namespace: &str, name: &str) -> SdkResult<bool> {
        let reply = self
            .request(Query::Contains {
                namespace: Bytes::copy_from_slice(namespace.as_bytes()),
                name: Bytes::copy_from_slice(name.as_bytes()),
            })
            .await?;
        Ok(reply == Reply::Present)
    }

    /// Send a query and decode its reply.
    pub async fn request(&mut self, query: Query) -> SdkResult<Reply> {
        let verb = query.verb();
        debug!(verb = verb.as_str(), "sending query");
        let parts = self.request_raw(&query.encode()).await?;
        Ok(Reply::decode(verb, &parts)?)
    }

    /// Send an arbitrary multi-part message and return the raw reply.
    pub async fn request_raw(&mut self, parts: &[Bytes]) -> SdkResult<Vec<Bytes>> {
        FrameCodec::write_message(&mut self.stream, parts).await?;
        FrameCodec::read_message(&mut self.stream)
            .await?
            .ok_or(SdkError::Disconnected)
    }
}
