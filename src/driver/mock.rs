use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{Driver, TransportEvent};

/// In-memory driver for tests.
///
/// It pushes predefined inbound packets, then closes the inbound side and
/// records every outbound packet until the consumer hangs up.
pub struct MockDriver<I, O> {
    inbound_packets: Vec<I>,
    sent: Arc<Mutex<Vec<O>>>,
}

impl<I, O> MockDriver<I, O> {
    pub fn new(inbound_packets: Vec<I>) -> Self {
        Self {
            inbound_packets,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Outbound packets, shared with the running driver
    pub fn sent(&self) -> Arc<Mutex<Vec<O>>> {
        self.sent.clone()
    }
}

impl MockDriver<TransportEvent, String> {
    /// A session that opens, delivers `frames` as text and closes
    pub fn session<S: Into<String>>(frames: impl IntoIterator<Item = S>) -> Self {
        let mut packets = vec![TransportEvent::Connecting, TransportEvent::Open];
        packets.extend(frames.into_iter().map(|f| TransportEvent::Text(f.into())));
        packets.push(TransportEvent::Closed);
        Self::new(packets)
    }
}

#[async_trait::async_trait]
impl<I, O> Driver for MockDriver<I, O>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    type Inbound = I;
    type Outbound = O;

    async fn run(
        self: Box<Self>,
        inbound_tx: mpsc::Sender<Self::Inbound>,
        mut outbound_rx: mpsc::Receiver<Self::Outbound>,
    ) -> anyhow::Result<()> {
        let Self {
            inbound_packets,
            sent,
        } = *self;

        let drain = tokio::spawn(async move {
            while let Some(packet) = outbound_rx.recv().await {
                sent.lock().push(packet);
            }
        });

        for packet in inbound_packets {
            if inbound_tx.send(packet).await.is_err() {
                break;
            }
        }
        drop(inbound_tx);

        drain.await?;
        Ok(())
    }
}
