use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use super::{Driver, TransportEvent};
use crate::core::config::ReconnectPolicy;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// WebSocket client driver
///
/// Pure transport layer, no protocol parsing
pub struct WsDriver {
    url: Url,
    policy: ReconnectPolicy,
}

/// How a connected session ended
enum SessionEnd {
    /// The socket closed; reconnect if the policy allows
    Disconnected,
    /// The relay went away; stop for good
    Shutdown,
}

impl WsDriver {
    pub fn new(url: &str, policy: ReconnectPolicy) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid WebSocket URL '{}'", url))?;
        Ok(Self { url, policy })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Wait before the next attempt. `failures` counts consecutive failed
    /// connects; 0 means a live session just dropped. The first retry of
    /// either kind waits `initial_delay_ms`.
    fn retry_delay(&self, failures: u32) -> Duration {
        self.policy.delay(failures.saturating_sub(1))
    }

    async fn session(
        &self,
        ws: WsStream,
        inbound_tx: &mpsc::Sender<TransportEvent>,
        outbound_rx: &mut mpsc::Receiver<String>,
    ) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                msg = stream.next() => {
                    let event = match msg {
                        Some(Ok(Message::Text(text))) => TransportEvent::Text(text.to_string()),
                        Some(Ok(Message::Binary(data))) => TransportEvent::Binary(data.to_vec()),
                        Some(Ok(Message::Close(frame))) => {
                            debug!("WebSocket closed by peer: {:?}", frame);
                            return SessionEnd::Disconnected;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            warn!("WebSocket error: {}", e);
                            return SessionEnd::Disconnected;
                        }
                        None => return SessionEnd::Disconnected,
                    };
                    if inbound_tx.send(event).await.is_err() {
                        return SessionEnd::Shutdown;
                    }
                }
                msg = outbound_rx.recv() => {
                    match msg {
                        Some(data) => {
                            if let Err(e) = sink.send(Message::Text(data.into())).await {
                                warn!("WebSocket send failed: {}", e);
                                return SessionEnd::Disconnected;
                            }
                        }
                        None => {
                            let _ = sink.close().await;
                            return SessionEnd::Shutdown;
                        }
                    }
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Driver for WsDriver {
    type Inbound = TransportEvent;
    type Outbound = String;

    async fn run(
        self: Box<Self>,
        inbound_tx: mpsc::Sender<TransportEvent>,
        mut outbound_rx: mpsc::Receiver<String>,
    ) -> Result<()> {
        let mut failures: u32 = 0;
        let mut last_error = None;

        loop {
            if inbound_tx.send(TransportEvent::Connecting).await.is_err() {
                return Ok(());
            }

            let connected = tokio::select! {
                result = connect_async(self.url.as_str()) => result,
                _ = inbound_tx.closed() => {
                    debug!("Relay stopped while connecting to {}", self.url);
                    return Ok(());
                }
            };

            match connected {
                Ok((ws, _)) => {
                    info!("WebSocket connected to {}", self.url);
                    failures = 0;
                    last_error = None;

                    if inbound_tx.send(TransportEvent::Open).await.is_err() {
                        return Ok(());
                    }
                    let end = self.session(ws, &inbound_tx, &mut outbound_rx).await;
                    // The relay may already be gone; nothing left to tell it then.
                    let _ = inbound_tx.send(TransportEvent::Closed).await;
                    if let SessionEnd::Shutdown = end {
                        return Ok(());
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!("Connection to {} failed: {}", self.url, e);
                    last_error = Some(anyhow!(e).context(format!("connect to {}", self.url)));
                }
            }

            if !self.policy.enabled {
                info!("Reconnect disabled, transport stopped");
                return match last_error {
                    Some(e) => Err(e),
                    None => Ok(()),
                };
            }
            if !self.policy.allows(failures) {
                return Err(anyhow!(
                    "giving up on {} after {} failed attempts",
                    self.url,
                    failures
                ));
            }

            let delay = self.retry_delay(failures);
            info!("Reconnecting in {}ms...", delay.as_millis());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = inbound_tx.closed() => return Ok(()),
            }
        }
    }
}
