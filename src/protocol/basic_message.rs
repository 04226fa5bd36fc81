//! Basic messages. Unlike the exchange families there is a single state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Family, LifecycleRecord};

lifecycle_states! {
    pub enum BasicMessageState: Family::BasicMessage {
        Received = "received" @terminal,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicMessageRecord {
    pub connection_id: String,
    #[serde(default = "received")]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_time: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn received() -> String {
    BasicMessageState::Received.to_string()
}

impl BasicMessageRecord {
    pub fn new(connection_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            state: received(),
            content: content.into(),
            ..Default::default()
        }
    }
}

impl LifecycleRecord for BasicMessageRecord {
    type State = BasicMessageState;

    fn state_tag(&self) -> &str {
        &self.state
    }

    fn exchange_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    fn thread_id(&self) -> Option<&str> {
        None
    }
}
