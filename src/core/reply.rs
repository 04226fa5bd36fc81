use std::fmt;
use std::sync::Arc;

use acaflow_protocol::ResponseEnvelope;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

type Callback = Box<dyn FnOnce(ResponseEnvelope) + Send>;

/// Callback through which a plugin answers a message.
///
/// Every plugin offered the same message receives a clone of the same reply;
/// only the first answer is delivered.
#[derive(Clone)]
pub struct Reply {
    slot: Arc<Mutex<Option<Callback>>>,
}

impl Reply {
    pub fn new(f: impl FnOnce(ResponseEnvelope) + Send + 'static) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(Box::new(f)))),
        }
    }

    /// Reply that discards the envelope (fire-and-forget publishes)
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Reply backed by a oneshot channel
    pub fn channel() -> (Self, oneshot::Receiver<ResponseEnvelope>) {
        let (tx, rx) = oneshot::channel();
        let reply = Self::new(move |envelope| {
            let _ = tx.send(envelope);
        });
        (reply, rx)
    }

    /// Deliver the envelope. Returns `false` if the reply was already answered.
    pub fn send(&self, envelope: ResponseEnvelope) -> bool {
        let callback = self.slot.lock().take();
        match callback {
            Some(callback) => {
                callback(envelope);
                true
            }
            None => {
                warn!(
                    "Reply already answered, dropping envelope with status {}",
                    envelope.status_code
                );
                false
            }
        }
    }

    pub fn is_answered(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("answered", &self.is_answered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn only_first_answer_is_delivered() {
        let (reply, rx) = Reply::channel();
        let clone = reply.clone();

        assert!(reply.send(ResponseEnvelope::success(200, json!({"n": 1}))));
        assert!(!clone.send(ResponseEnvelope::success(200, json!({"n": 2}))));
        assert!(clone.is_answered());

        let envelope = rx.await.unwrap();
        assert_eq!(envelope.body, json!({"n": 1}));
    }

    #[test]
    fn noop_accepts_one_answer() {
        let reply = Reply::noop();
        assert!(!reply.is_answered());
        assert!(reply.send(ResponseEnvelope::internal("x")));
        assert!(reply.is_answered());
    }
}
