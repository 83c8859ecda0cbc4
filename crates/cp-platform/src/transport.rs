//! WebSocket transport over tokio-tungstenite.
//!
//! The session layer speaks text frames only; control frames are handled
//! here (tungstenite answers pings automatically) and binary frames are
//! dropped.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use cp_core::ports::{Connection, Transport};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>> {
        let (stream, response) = connect_async(url)
            .await
            .context("websocket connect failed")?;
        tracing::debug!(status = %response.status(), "websocket handshake complete");
        let (sink, stream) = stream.split();
        Ok(Box::new(WsConnection { sink, stream }))
    }
}

pub struct WsConnection {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send_text(&mut self, frame: &str) -> Result<()> {
        self.sink
            .send(Message::Text(frame.to_string()))
            .await
            .context("websocket send failed")
    }

    async fn recv_text(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "websocket closed by server");
                    return None;
                }
                Ok(_) => continue,
                Err(e) => {
                    return Some(Err(anyhow::Error::new(e).context("websocket receive failed")))
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.sink.close().await {
            tracing::debug!(error = %e, "websocket close handshake failed");
        }
    }
}
