//! Clients for a running Tingxie server: the page transport over WebSocket
//! and the translation proxy over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, Url};
use serde::Deserialize;
use tingxie_api::DictionaryClient;
use tingxie_core::{ClientMessage, ServerMessage, WordPage};
use tingxie_session::{PageTransport, SessionError, TranslationLookup};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

const RECONNECT_BASE_MS: u64 = 800;
const RECONNECT_MAX_MS: u64 = 30_000;
/// Attempts per request. Four attempts fit inside the default page timeout.
const CONNECT_MAX_ATTEMPTS: u32 = 4;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn reconnect_delay_ms(attempt: u32) -> u64 {
    let exp = attempt.saturating_sub(1).min(10);
    let factor = 1u64 << exp;
    (RECONNECT_BASE_MS.saturating_mul(factor)).min(RECONNECT_MAX_MS)
}

fn is_permanent_connect_error(err: &tungstenite::Error) -> bool {
    match err {
        tungstenite::Error::Url(_) | tungstenite::Error::HttpFormat(_) => true,
        tungstenite::Error::Http(resp) => resp.status().is_client_error(),
        _ => false,
    }
}

fn transport_error(e: impl std::fmt::Display) -> SessionError {
    SessionError::Transport(e.to_string())
}

// =============================================================================
// Page transport
// =============================================================================

/// Page transport over the server's `/ws` channel.
///
/// Requests are serialized over one lazily opened connection. A failed
/// exchange drops the connection; the next request reconnects with capped
/// exponential backoff.
pub struct WsTransport {
    url: String,
    stream: Mutex<Option<WsStream>>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<WsStream, SessionError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    info!(url = %self.url, attempt, "Connected to page transport");
                    return Ok(stream);
                }
                Err(e) if is_permanent_connect_error(&e) || attempt >= CONNECT_MAX_ATTEMPTS => {
                    return Err(SessionError::Transport(format!(
                        "cannot connect to {} after {} attempt(s): {}",
                        self.url, attempt, e
                    )));
                }
                Err(e) => {
                    let delay_ms = reconnect_delay_ms(attempt);
                    warn!(
                        url = %self.url,
                        attempt,
                        delay_ms,
                        error = %e,
                        "Connect failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    async fn exchange(
        stream: &mut WsStream,
        request: &ClientMessage,
    ) -> Result<ServerMessage, SessionError> {
        let json = request.to_json()?;
        stream.send(Message::text(json)).await.map_err(transport_error)?;

        while let Some(frame) = stream.next().await {
            match frame.map_err(transport_error)? {
                Message::Text(text) => return Ok(ServerMessage::from_json(text.as_str())?),
                Message::Close(_) => break,
                _ => continue,
            }
        }
        Err(SessionError::Transport("connection closed by server".to_string()))
    }

    /// Send one frame and wait for its reply.
    pub async fn call(&self, request: ClientMessage) -> Result<ServerMessage, SessionError> {
        let mut slot = self.stream.lock().await;
        let mut stream = match slot.take() {
            Some(stream) => stream,
            None => self.connect().await?,
        };

        match Self::exchange(&mut stream, &request).await {
            Ok(reply) => {
                *slot = Some(stream);
                Ok(reply)
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Dropping page transport connection");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl PageTransport for WsTransport {
    async fn request_page(&self, page: i64, page_size: u32) -> Result<WordPage, SessionError> {
        debug!(page, page_size, "Requesting page");
        let request = ClientMessage::RequestPage {
            page,
            page_size: Some(page_size),
        };
        match self.call(request).await? {
            ServerMessage::WordList(page) => Ok(page),
            ServerMessage::Error { message } => Err(SessionError::Transport(message)),
            other => Err(SessionError::Transport(format!("unexpected reply: {:?}", other))),
        }
    }
}

// =============================================================================
// Translations
// =============================================================================

#[derive(Debug, Deserialize)]
struct TranslationBody {
    translation: Option<String>,
    error: Option<String>,
}

/// Translation lookups through a Tingxie server's `/translate/{word}` route.
pub struct HttpTranslationLookup {
    client: Client,
    base_url: Url,
}

impl HttpTranslationLookup {
    /// Derive the HTTP origin from the server's WebSocket endpoint.
    pub fn for_server(ws_url: &str, timeout: Duration) -> Result<Self, SessionError> {
        let mut base_url = Url::parse(ws_url).map_err(transport_error)?;
        let scheme = match base_url.scheme() {
            "ws" | "http" => "http",
            "wss" | "https" => "https",
            other => {
                return Err(SessionError::Transport(format!(
                    "unsupported server scheme '{}'",
                    other
                )))
            }
        };
        base_url.set_scheme(scheme).map_err(|_| {
            SessionError::Transport(format!("cannot use {} over {}", ws_url, scheme))
        })?;
        base_url.set_path("/");
        base_url.set_query(None);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self { client, base_url })
    }

    fn url_for(&self, word: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.clear().push("translate").push(word);
        }
        url
    }
}

#[async_trait]
impl TranslationLookup for HttpTranslationLookup {
    async fn lookup(&self, word: &str) -> Result<String, SessionError> {
        let response = self
            .client
            .get(self.url_for(word))
            .send()
            .await
            .map_err(|e| SessionError::Translation(e.to_string()))?;
        let status = response.status();
        let body: TranslationBody = response.json().await.map_err(|e| {
            SessionError::Translation(format!("unexpected response ({}): {}", status, e))
        })?;

        match (status.is_success(), body.translation, body.error) {
            (true, Some(translation), _) => Ok(translation),
            (_, _, Some(error)) => Err(SessionError::Translation(error)),
            _ => Err(SessionError::Translation(format!("server returned {}", status))),
        }
    }
}

/// Direct lookups against the upstream dictionary, for local sessions.
pub struct DictionaryLookup<D>(pub D);

#[async_trait]
impl<D: DictionaryClient> TranslationLookup for DictionaryLookup<D> {
    async fn lookup(&self, word: &str) -> Result<String, SessionError> {
        self.0
            .define(word)
            .await
            .map_err(|e| SessionError::Translation(e.to_string()))
    }
}
