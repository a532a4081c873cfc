use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::SocketError;

/// An open bidirectional text channel
#[async_trait]
pub trait RealtimeChannel: Send {
    /// Next text frame, or `None` once the channel has closed.
    ///
    /// Must be cancel safe: the socket driver polls it inside `select!`.
    async fn recv(&mut self) -> Option<Result<String, SocketError>>;

    /// Write one text frame
    async fn send(&mut self, text: String) -> Result<(), SocketError>;

    /// Close the channel. Errors are logged, not returned.
    async fn close(&mut self);
}

/// Opens realtime channels
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn RealtimeChannel>, SocketError>;
}

/// `RealtimeConnector` backed by tokio-tungstenite
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

#[async_trait]
impl RealtimeConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn RealtimeChannel>, SocketError> {
        info!("Connecting to {}", url);

        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| SocketError::Connection(e.to_string()))?;

        Ok(Box::new(WsChannel {
            stream,
            failed: false,
        }))
    }
}

struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// Set after a protocol error so the next `recv` reports the close
    failed: bool,
}

#[async_trait]
impl RealtimeChannel for WsChannel {
    async fn recv(&mut self) -> Option<Result<String, SocketError>> {
        if self.failed {
            return None;
        }

        loop {
            match self.stream.next().await? {
                Ok(WsMessage::Text(text)) => return Some(Ok(text)),
                Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => warn!("Dropping non-UTF-8 binary frame"),
                },
                Ok(WsMessage::Close(frame)) => {
                    debug!("Server closed the socket: {:?}", frame);
                    return None;
                }
                // Ping/pong frames are answered by tungstenite itself
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return None
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(SocketError::Connection(e.to_string())));
                }
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), SocketError> {
        self.stream
            .send(WsMessage::Text(text))
            .await
            .map_err(|e| SocketError::Connection(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("Error while closing socket: {}", e);
        }
    }
}
