//! WebSocket transport built on `tokio-tungstenite`.
//!
//! Both `ws://` and `wss://` endpoints work; TLS is negotiated through
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream). Only text frames
//! carry protocol events. Binary frames are skipped, and ping/pong is
//! answered by tungstenite itself.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use crate::error::TriviaError;
use crate::transport::Transport;

/// The underlying WebSocket stream type.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by a WebSocket connection.
///
/// `recv` is cancel-safe: the stream only yields a frame once it is fully
/// read, so dropping the future mid-way loses nothing.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open a WebSocket connection to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::Io`] when the URL is invalid or the handshake
    /// fails. I/O error kinds are preserved; anything else maps to
    /// [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(endpoint: &str) -> Result<Self, TriviaError> {
        debug!(%endpoint, "opening WebSocket connection");

        let (stream, _response) = tokio_tungstenite::connect_async(endpoint)
            .await
            .map_err(handshake_error)?;

        info!(%endpoint, "WebSocket connection established");
        Ok(Self::from_stream(stream))
    }

    /// Like [`connect`](Self::connect), bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::Timeout`] if the deadline passes first.
    pub async fn connect_with_timeout(
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, TriviaError> {
        tokio::time::timeout(timeout, Self::connect(endpoint))
            .await
            .map_err(|_| TriviaError::Timeout)?
    }

    /// Wrap an already-established stream (custom TLS, headers, proxies).
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

fn handshake_error(err: tokio_tungstenite::tungstenite::Error) -> TriviaError {
    let kind = match &err {
        tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
        _ => std::io::ErrorKind::Other,
    };
    TriviaError::Io(std::io::Error::new(kind, err))
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), TriviaError> {
        if self.closed {
            return Err(TriviaError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| TriviaError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TriviaError>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Close(close)) => {
                    debug!(?close, "server sent close frame");
                    return None;
                }
                Ok(Message::Binary(bytes)) => {
                    warn!(len = bytes.len(), "skipping binary frame");
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => return Some(Err(TriviaError::TransportReceive(e.to_string()))),
            }
        }
        None
    }

    async fn close(&mut self) -> Result<(), TriviaError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| TriviaError::TransportSend(e.to_string()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    type ServerStream = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Accept one WebSocket client on an ephemeral port and run `handler` on it.
    async fn serve_once<F, Fut>(handler: F) -> String
    where
        F: FnOnce(ServerStream) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });
        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn invalid_url_is_an_io_error() {
        let err = WebSocketTransport::connect("not a url").await.unwrap_err();
        assert!(matches!(err, TriviaError::Io(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_an_io_error() {
        let err = WebSocketTransport::connect("ws://127.0.0.1:1")
            .await
            .unwrap_err();
        assert!(matches!(err, TriviaError::Io(_)));
    }

    #[tokio::test]
    async fn connect_with_timeout_reports_timeout() {
        let err = WebSocketTransport::connect_with_timeout(
            "ws://192.0.2.1:1",
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TriviaError::Timeout));
    }

    #[tokio::test]
    async fn text_frames_arrive_in_order_and_binary_is_skipped() {
        let url = serve_once(|mut ws| async move {
            ws.send(Message::Text(r#"{"event":"point_awarded"}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();
            ws.send(Message::Text(r#"{"event":"wrong_answer"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"event":"point_awarded"}"#
        );
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"event":"wrong_answer"}"#
        );
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn sent_frames_reach_the_server() {
        let url = serve_once(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(text)).await.unwrap();
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport
            .send(r#"{"event":"join_game"}"#.to_string())
            .await
            .unwrap();
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"event":"join_game"}"#
        );
    }

    #[tokio::test]
    async fn send_after_close_is_rejected_and_close_is_idempotent() {
        let url = serve_once(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
            .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("late".to_string()).await.unwrap_err();
        assert!(matches!(err, TriviaError::TransportClosed));
    }
}
