//! Webhook relay: the persistent inbound connection.
//!
//! The relay authenticates every new connection with a handshake frame, maps
//! each inbound frame's topic to a bus message type and publishes it with a
//! no-op reply. Delivery is fire-and-forget: dispatch results are not
//! inspected and frames lost while disconnected are not recovered here.

use std::future::Future;

use acaflow_protocol::{EventMessage, Handshake, Topic, WebhookFrame};
use anyhow::{Result, anyhow};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::core::{bus::Bus, config::RelayConfig, observability::names, reply::Reply};
use crate::driver::{Driver, TransportEvent};

/// Connection state of the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Disconnected,
    Connecting,
    /// Open, handshake being sent
    Authenticating,
    Open,
}

/// Why an inbound frame was dropped
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown topic '{0}'")]
    UnknownTopic(String),
    #[error("frame received before the handshake")]
    Unauthenticated,
}

impl FrameError {
    /// Metric label
    pub fn reason(&self) -> &'static str {
        match self {
            FrameError::Malformed(_) => "malformed",
            FrameError::UnknownTopic(_) => "unknown_topic",
            FrameError::Unauthenticated => "unauthenticated",
        }
    }
}

/// Map one wire frame to the bus message it is republished as
pub fn route(text: &str) -> Result<(Topic, EventMessage), FrameError> {
    let frame: WebhookFrame = serde_json::from_str(text)?;
    let topic = frame
        .topic()
        .ok_or_else(|| FrameError::UnknownTopic(frame.topic.clone()))?;
    Ok((topic, EventMessage::new(topic.message_type(), frame.body)))
}

pub struct WebhookRelay {
    bus: Bus,
    handshake: Handshake,
    channel_capacity: usize,
    state_tx: watch::Sender<RelayState>,
}

impl WebhookRelay {
    pub fn new(bus: Bus, config: &RelayConfig) -> Self {
        Self::with_handshake(
            bus,
            Handshake::new(&config.api_key, config.fast_forward),
            config.channel_capacity,
        )
    }

    pub fn with_handshake(bus: Bus, handshake: Handshake, channel_capacity: usize) -> Self {
        let (state_tx, _) = watch::channel(RelayState::Disconnected);
        Self {
            bus,
            handshake,
            channel_capacity: channel_capacity.max(1),
            state_tx,
        }
    }

    /// Watch connection state changes
    pub fn state(&self) -> watch::Receiver<RelayState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: RelayState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("Relay state: {:?} -> {:?}", previous, state);
        }
    }

    /// Run until the driver stops
    pub async fn run<D>(&self, driver: D) -> Result<()>
    where
        D: Driver<Inbound = TransportEvent, Outbound = String>,
    {
        self.run_until(driver, std::future::pending::<()>()).await
    }

    /// Run until the driver stops or `shutdown` completes. In-flight
    /// dispatches are awaited before returning.
    pub async fn run_until<D, F>(&self, driver: D, shutdown: F) -> Result<()>
    where
        D: Driver<Inbound = TransportEvent, Outbound = String>,
        F: Future<Output = ()>,
    {
        let (inbound_tx, mut inbound_rx) = mpsc::channel(self.channel_capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(self.channel_capacity);
        let driver_task = tokio::spawn(Box::new(driver).run(inbound_tx, outbound_rx));

        let metrics = self.bus.metrics();
        let mut dispatches = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Relay shutting down");
                    break;
                }
                Some(joined) = dispatches.join_next(), if !dispatches.is_empty() => {
                    if let Err(e) = joined {
                        error!("Dispatch task failed: {}", e);
                    }
                }
                event = inbound_rx.recv() => {
                    let Some(event) = event else {
                        debug!("Transport finished");
                        break;
                    };

                    match event {
                        TransportEvent::Connecting => self.set_state(RelayState::Connecting),
                        TransportEvent::Open => {
                            self.set_state(RelayState::Authenticating);
                            let frame = serde_json::to_string(&self.handshake)?;
                            if outbound_tx.send(frame).await.is_err() {
                                warn!("Transport closed before the handshake was sent");
                                break;
                            }
                            metrics.incr_counter(names::RELAY_CONNECTIONS_TOTAL, 1, &[]);
                            self.set_state(RelayState::Open);
                            info!("Relay connected");
                        }
                        TransportEvent::Text(text) => {
                            let routed = if *self.state_tx.borrow() == RelayState::Open {
                                route(&text)
                            } else {
                                Err(FrameError::Unauthenticated)
                            };

                            match routed {
                                Ok((topic, message)) => {
                                    metrics.incr_counter(
                                        names::RELAY_FRAMES_TOTAL,
                                        1,
                                        &[("topic", topic.as_str())],
                                    );
                                    let bus = self.bus.clone();
                                    dispatches.spawn(async move {
                                        bus.publish(message, Reply::noop()).await;
                                    });
                                }
                                Err(e) => {
                                    warn!("Dropping webhook frame: {}", e);
                                    metrics.incr_counter(
                                        names::RELAY_FRAMES_DROPPED_TOTAL,
                                        1,
                                        &[("reason", e.reason())],
                                    );
                                }
                            }
                        }
                        TransportEvent::Binary(data) => {
                            debug!("Ignoring binary frame ({} bytes)", data.len());
                        }
                        TransportEvent::Closed => {
                            self.set_state(RelayState::Disconnected);
                            warn!("Relay connection closed");
                        }
                    }
                }
            }
        }

        drop(outbound_tx);
        drop(inbound_rx);

        while let Some(joined) = dispatches.join_next().await {
            if let Err(e) = joined {
                error!("Dispatch task failed: {}", e);
            }
        }
        self.set_state(RelayState::Disconnected);

        match driver_task.await {
            Ok(result) => result,
            Err(e) => Err(anyhow!("transport task failed: {}", e)),
        }
    }
}
