//! WebSocket connection for one live broadcast.
//!
//! Reads frames strictly in order, decodes each into a `RoundEvent`, and
//! hands every round event to the handler as its own spawned task so the
//! read loop and the keep-alive ping never wait on prediction work.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{format_error_chain, Error, RoundEvent, AUTH_NOT_VALID};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tracing::{debug, info, warn};

use crate::auth::QuizAuth;

/// Receives round events; each call runs on its own task.
#[async_trait]
pub trait RoundHandler: Send + Sync + 'static {
    async fn handle(&self, event: RoundEvent);
}

/// How a session ended when it ended normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnd {
    /// Present when the broadcast ended irregularly.
    pub reason: Option<String>,
}

/// Strip non-printable control characters (C0, DEL, C1) before decoding.
pub fn sanitize_frame(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

/// Decode one text frame.
///
/// A frame carrying the auth error is fatal (`Error::AuthInvalid`); any
/// other failure is a droppable decode error.
pub fn decode_frame(text: &str) -> Result<RoundEvent, Error> {
    let value: serde_json::Value = serde_json::from_str(&sanitize_frame(text))?;

    if value.get("error").and_then(|e| e.as_str()) == Some(AUTH_NOT_VALID) {
        return Err(Error::AuthInvalid("live socket rejected the token".into()));
    }

    Ok(serde_json::from_value(value)?)
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

/// One long-lived connection to a broadcast's live-event socket.
pub struct SessionConnection {
    address: String,
    auth: QuizAuth,
    heartbeat: Duration,
}

impl SessionConnection {
    pub fn new(address: &str, auth: QuizAuth, heartbeat: Duration) -> Self {
        Self {
            address: address.to_string(),
            auth,
            heartbeat,
        }
    }

    /// Stream the broadcast until it ends.
    ///
    /// * `Ok(SessionEnd)`: a `broadcastEnded` frame arrived.
    /// * `Err(Error::AuthInvalid)`: fatal, do not retry.
    /// * `Err(Error::ConnectionLost)`: recoverable; rediscover and reconnect.
    ///
    /// Handler tasks still running when this returns are left to finish on
    /// their own.
    pub async fn run<H: RoundHandler>(&self, handler: Arc<H>) -> Result<SessionEnd, Error> {
        let ws_stream = self.connect().await?;
        info!("WebSocket connected: {}", self.address);

        let (mut write, mut read) = ws_stream.split();
        let mut heartbeat = tokio::time::interval(self.heartbeat);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if let Err(e) = write.send(tungstenite::Message::Ping(Vec::new())).await {
                        return Err(Error::ConnectionLost(format!(
                            "keep-alive ping failed: {}",
                            format_error_chain(&e)
                        )));
                    }
                }
                msg_opt = read.next() => {
                    match msg_opt {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            match decode_frame(&text) {
                                Ok(RoundEvent::BroadcastEnded(frame)) => {
                                    match frame.reason.as_deref() {
                                        Some(reason) => warn!("Broadcast ended irregularly: {}", reason),
                                        None => info!("Broadcast ended"),
                                    }
                                    let _ = write.close().await;
                                    return Ok(SessionEnd { reason: frame.reason });
                                }
                                Ok(RoundEvent::Interaction) => {}
                                Ok(RoundEvent::Unknown) => {
                                    debug!("Ignoring frame: {}", preview(&text));
                                }
                                Ok(event) => {
                                    debug!("Dispatching {} event", event.kind());
                                    let handler = handler.clone();
                                    tokio::spawn(async move {
                                        handler.handle(event).await;
                                    });
                                }
                                Err(e) if e.is_fatal() => return Err(e),
                                Err(e) => {
                                    warn!("Dropping undecodable frame: {} (raw: {})", e, preview(&text));
                                }
                            }
                        }
                        Some(Ok(tungstenite::Message::Ping(data))) => {
                            let _ = write.send(tungstenite::Message::Pong(data)).await;
                        }
                        Some(Ok(tungstenite::Message::Close(_))) => {
                            return Err(Error::ConnectionLost(format!(
                                "{} closed unexpectedly",
                                self.address
                            )));
                        }
                        Some(Err(e)) => {
                            return Err(Error::ConnectionLost(format_error_chain(&e)));
                        }
                        None => {
                            return Err(Error::ConnectionLost(format!(
                                "{} stream ended",
                                self.address
                            )));
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    async fn connect(
        &self,
    ) -> Result<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        Error,
    > {
        let mut request = self
            .address
            .as_str()
            .into_client_request()
            .map_err(|e| Error::WebSocket(format_error_chain(&e)))?;

        for (name, value) in self.auth.header_pairs() {
            let value = HeaderValue::from_str(&value)
                .map_err(|e| Error::WebSocket(format!("invalid {name} header: {e}")))?;
            request.headers_mut().insert(name, value);
        }

        match tokio_tungstenite::connect_async(request).await {
            Ok((stream, _)) => Ok(stream),
            Err(tungstenite::Error::Http(resp)) if resp.status().as_u16() == 401 => Err(
                Error::AuthInvalid(format!("socket upgrade refused for {}", self.address)),
            ),
            Err(e) => Err(Error::ConnectionLost(format!(
                "could not connect to {}: {}",
                self.address,
                format_error_chain(&e)
            ))),
        }
    }
}
