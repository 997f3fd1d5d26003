use super::PostRequest;
use crate::transport::{Reply, RouteTable};
use async_bincode::tokio::AsyncBincodeStream;
use futures::{SinkExt, StreamExt};
use std::{io, net::Ipv4Addr, sync::Arc};
use tokio::{io::BufStream, net::TcpListener, task};

/// Server side of the TCP transport, answering from a [`RouteTable`].
#[derive(Debug, Clone)]
pub struct Server {
    routes: Arc<RouteTable>,
}

impl Server {
    pub fn new(routes: RouteTable) -> Self {
        Self {
            routes: Arc::new(routes),
        }
    }

    pub async fn serve_tcp(self, port: u16) -> io::Result<()> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
        self.serve(listener).await
    }

    /// Accept connections forever, one task per connection.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        tracing::info!(addr = ?listener.local_addr()?, "serving rpc over tcp");
        loop {
            let routes = self.routes.clone();
            let (sock, addr) = listener.accept().await?;
            let mut sock =
                AsyncBincodeStream::<_, PostRequest, Reply, _>::from(BufStream::new(sock))
                    .for_async();

            task::spawn(async move {
                match sock.next().await {
                    Some(Ok(PostRequest { path, body })) => {
                        let reply = routes.handle(&path, body).await;
                        tracing::debug!(%addr, %path, status = reply.status, "answered");
                        if let Err(err) = sock.send(reply).await {
                            tracing::debug!(%addr, "sending reply: {err}");
                        }
                    }
                    Some(Err(err)) => tracing::debug!(%addr, "reading request: {err}"),
                    None => {}
                }
            });
        }
    }
}
