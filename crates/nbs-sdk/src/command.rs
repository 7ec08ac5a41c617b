use bytes::Bytes;
use nbs_protocol::{Command, Endpoint, FrameCodec};
use tracing::debug;

use crate::error::SdkResult;
use crate::transport::{connect, BoxStream};

/// Client for the command channel.
///
/// Commands are fire-and-forget: a successful call means the message was
/// handed to the server, not that the store has applied it.
pub struct CommandClient {
    endpoint: Endpoint,
    stream: BoxStream,
}

impl CommandClient {
    /// Connect to a command endpoint.
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

    /// Store `content` under `namespace/name`, overwriting any previous blob.
    pub async fn save(&mut self, namespace: &str, name: &str, content: impl Into<Bytes>) -> SdkResult<()> {
        self.send(Command::Save {
            namespace: Bytes::copy_from_slice(namespace.as_bytes()),
            name: Bytes::copy_from_slice(name.as_bytes()),
            content: content.into(),
        })
        .await
    }

    /// Remove one blob. Deleting a missing blob is not an error.
    pub async fn delete(&mut self, namespace: &str, name: &str) -> SdkResult<()> {
        self.send(Command::Delete {
            namespace: Bytes::copy_from_slice(namespace.as_bytes()),
            name: Bytes::copy_from_slice(name.as_bytes()),
        })
        .await
    }

    /// Remove a whole namespace. The server empties it in the background.
    pub async fn delete_all(&mut self, namespace: &str) -> SdkResult<()> {
        self.send(Command::DeleteAll {
            namespace: Bytes::copy_from_slice(namespace.as_bytes()),
        })
        .await
    }

    /// Send an already-built command.
    pub async fn send(&mut self, command: Command) -> SdkResult<()> {
        debug!(verb = command.verb().as_str(), "sending command");
        self.send_raw(&command.encode()).await
    }

    /// Send an arbitrary multi-part message, well-formed or not.
    pub async fn send_raw(&mut self, parts: &[Bytes]) -> SdkResult<()> {
        FrameCodec::write_message(&mut self.stream, parts).await?;
        Ok(())
    }
}
