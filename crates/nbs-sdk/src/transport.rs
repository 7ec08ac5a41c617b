use nbs_protocol::Endpoint;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{SdkError, SdkResult};

pub(crate) trait ClientStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ClientStream for T {}

pub(crate) type BoxStream = Box<dyn ClientStream>;

/// Open a stream to `endpoint`.
pub(crate) async fn connect(endpoint: &Endpoint) -> SdkResult<BoxStream> {
    let connect_err = |source| SdkError::Connect {
        endpoint: endpoint.to_string(),
        source,
    };
    let stream: BoxStream = match endpoint {
        Endpoint::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port))
                .await
                .map_err(connect_err)?;
            stream.set_nodelay(true).map_err(connect_err)?;
            Box::new(stream)
        }
        #[cfg(unix)]
        Endpoint::Ipc { path } => Box::new(
            tokio::net::UnixStream::connect(path)
                .await
                .map_err(connect_err)?,
        ),
        #[cfg(not(unix))]
        Endpoint::Ipc { .. } => {
            return Err(connect_err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "ipc endpoints require Unix domain sockets",
            )))
        }
    };
    debug!(%endpoint, "connected");
    Ok(stream)
}
