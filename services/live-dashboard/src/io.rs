//! I/O traits and implementations for the backend client
//!
//! The HTTP and websocket traits let the snapshot loader and the change
//! stream subscriber be exercised with mockall mocks or in-memory fakes
//! instead of a live backend.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::DashboardError;

/// HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request with extra headers
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> crate::Result<HttpResponse>;
}

/// Production HTTP client using reqwest
#[derive(Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> crate::Result<HttpResponse> {
        tracing::debug!("GET {}", url);
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DashboardError::Http(format!("GET {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| DashboardError::Http(format!("Reading response body: {}", e)))?;

        tracing::debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}

/// Reading half of a text-frame socket
#[async_trait]
pub trait FrameReader: Send {
    /// Read the next text frame
    ///
    /// Returns `Ok(None)` once the remote side closed the socket.
    async fn read_frame(&mut self) -> crate::Result<Option<String>>;
}

/// Writing half of a text-frame socket
#[async_trait]
pub trait FrameWriter: Send {
    async fn send_frame(&mut self, frame: String) -> crate::Result<()>;

    async fn close(&mut self) -> crate::Result<()>;
}

/// Socket pair containing a reader and writer
pub struct SocketPair {
    pub reader: Box<dyn FrameReader>,
    pub writer: Box<dyn FrameWriter>,
}

/// Opens text-frame sockets
#[async_trait]
pub trait SocketConnector: Send + Sync {
    async fn connect(&self, url: &str) -> crate::Result<SocketPair>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Websocket reader backed by tokio-tungstenite
pub struct WsFrameReader {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FrameReader for WsFrameReader {
    async fn read_frame(&mut self) -> crate::Result<Option<String>> {
        loop {
            match self.stream.next().await {
                None => return Ok(None),
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!("Websocket closed by remote: {:?}", frame);
                    return Ok(None);
                }
                // ping/pong are answered by tungstenite itself
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(DashboardError::SubscriptionChannel(format!(
                        "Websocket read failed: {}",
                        e
                    )))
                }
            }
        }
    }
}

/// Websocket writer backed by tokio-tungstenite
pub struct WsFrameWriter {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameWriter for WsFrameWriter {
    async fn send_frame(&mut self, frame: String) -> crate::Result<()> {
        self.sink.send(Message::text(frame)).await.map_err(|e| {
            DashboardError::SubscriptionChannel(format!("Websocket send failed: {}", e))
        })
    }

    async fn close(&mut self) -> crate::Result<()> {
        self.sink.close().await.map_err(|e| {
            DashboardError::SubscriptionChannel(format!("Websocket close failed: {}", e))
        })
    }
}

/// Production socket connector using tokio-tungstenite
#[derive(Debug, Default)]
pub struct WsSocketConnector;

#[async_trait]
impl SocketConnector for WsSocketConnector {
    async fn connect(&self, url: &str) -> crate::Result<SocketPair> {
        tracing::debug!("Opening websocket to {}", redact_query(url));
        let (stream, response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            DashboardError::SubscriptionChannel(format!(
                "Websocket connect to {} failed: {}",
                redact_query(url),
                e
            ))
        })?;
        tracing::debug!("Websocket upgrade -> {}", response.status());

        let (sink, stream) = stream.split();
        Ok(SocketPair {
            reader: Box::new(WsFrameReader { stream }),
            writer: Box::new(WsFrameWriter { sink }),
        })
    }
}

/// Strip the query string, which carries the access key
fn redact_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
