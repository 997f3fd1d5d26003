use super::PostRequest;
use crate::{
    config::RpcConfig,
    error::{ConfigError, TransportError},
    transport::{Reply, Transport},
};
use async_bincode::{tokio::AsyncBincodeStream, AsyncDestination};
use futures::{future::BoxFuture, SinkExt, StreamExt};
use std::{io, net::SocketAddr, time::Duration};
use tokio::{io::BufStream, net::TcpStream};

/// Client side of the TCP transport.
#[derive(Debug, Clone, Copy)]
pub struct TcpTransport(pub SocketAddr);

impl TcpTransport {
    pub fn from_config(config: &RpcConfig) -> Result<Self, ConfigError> {
        Ok(Self(config.socket_addr()?))
    }

    async fn connect(
        &self,
    ) -> io::Result<AsyncBincodeStream<BufStream<TcpStream>, Reply, PostRequest, AsyncDestination>>
    {
        let sock = TcpStream::connect(self.0).await?;
        let sock = BufStream::new(sock);
        let sock = AsyncBincodeStream::from(sock).for_async();
        Ok(sock)
    }

    async fn send_recv(&self, req: PostRequest) -> Result<Reply, TransportError> {
        let mut sock = self.connect().await?;
        sock.send(req).await.map_err(frame_error)?;
        sock.next()
            .await
            .ok_or(TransportError::Closed)?
            .map_err(frame_error)
    }
}

/// Socket failures stay I/O errors; anything else means the peer sent garbage.
fn frame_error(err: bincode::Error) -> TransportError {
    match *err {
        bincode::ErrorKind::Io(err) => TransportError::Io(err),
        other => TransportError::Malformed(other.to_string()),
    }
}

impl Transport for TcpTransport {
    fn post<'a>(
        &'a self,
        path: &'a str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Reply, TransportError>> {
        let req = PostRequest {
            path: path.to_owned(),
            body,
        };
        Box::pin(async move {
            tokio::time::timeout(timeout, self.send_recv(req))
                .await
                .map_err(|_| TransportError::Timeout)?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_failures_are_io_errors() {
        let reset = Box::new(bincode::ErrorKind::Io(io::ErrorKind::ConnectionReset.into()));
        assert!(matches!(
            frame_error(reset),
            TransportError::Io(ref err) if err.kind() == io::ErrorKind::ConnectionReset
        ));

        let garbage = Box::new(bincode::ErrorKind::InvalidTagEncoding(9));
        assert!(matches!(frame_error(garbage), TransportError::Malformed(_)));
    }

    #[tokio::test]
    async fn peer_hanging_up_is_not_malformed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            drop(sock);
        });

        let err = TcpTransport(addr)
            .post("/x", Vec::new(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed | TransportError::Io(_)));
    }
}
