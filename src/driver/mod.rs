//! Transport drivers for the webhook relay.
//!
//! A driver owns the socket lifecycle only: connect, reconnect and raw frame
//! I/O. It reports what happens as [`TransportEvent`]s and never parses frames.

#![forbid(unsafe_code)]

pub mod mock;
pub mod wsclient;

use tokio::sync::mpsc;

pub use mock::MockDriver;
pub use wsclient::WsDriver;

#[async_trait::async_trait]
pub trait Driver: Send + Sync + 'static {
    type Inbound: Send + 'static;
    type Outbound: Send + 'static;

    /// Run until the inbound receiver or the outbound sender is dropped, or
    /// the transport gives up.
    async fn run(
        self: Box<Self>,
        inbound_tx: mpsc::Sender<Self::Inbound>,
        outbound_rx: mpsc::Receiver<Self::Outbound>,
    ) -> anyhow::Result<()>;
}

/// What the transport observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A connection attempt started
    Connecting,
    /// The socket is open and writable
    Open,
    Text(String),
    Binary(Vec<u8>),
    /// The socket closed or failed after opening
    Closed,
}
