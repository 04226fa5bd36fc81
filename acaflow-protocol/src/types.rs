//! Frame and bus message types

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Message types
// ============================================================================

/// Bus message type tags published by the webhook relay
pub mod message_types {
    pub const CONNECTION_EVENT: &str = "aca-connection-event";
    pub const BASIC_MESSAGE_EVENT: &str = "aca-basic-message-event";
    pub const ISSUE_CREDENTIAL_EVENT: &str = "aca-issue-credential-event";
    pub const PRESENT_PROOF_EVENT: &str = "aca-present-proof-event";
}

// ============================================================================
// Topics
// ============================================================================

/// Webhook topics understood by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "connections")]
    Connections,
    #[serde(rename = "basicmessages")]
    BasicMessages,
    #[serde(rename = "issue_credential")]
    IssueCredential,
    #[serde(rename = "present_proof")]
    PresentProof,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::Connections,
        Topic::BasicMessages,
        Topic::IssueCredential,
        Topic::PresentProof,
    ];

    /// Parse a wire topic. Unknown topics yield `None`.
    pub fn parse(topic: &str) -> Option<Self> {
        match topic {
            "connections" => Some(Topic::Connections),
            "basicmessages" => Some(Topic::BasicMessages),
            "issue_credential" => Some(Topic::IssueCredential),
            "present_proof" => Some(Topic::PresentProof),
            _ => None,
        }
    }

    /// Wire name of the topic
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Connections => "connections",
            Topic::BasicMessages => "basicmessages",
            Topic::IssueCredential => "issue_credential",
            Topic::PresentProof => "present_proof",
        }
    }

    /// Bus message type the topic is republished under
    pub fn message_type(&self) -> &'static str {
        match self {
            Topic::Connections => message_types::CONNECTION_EVENT,
            Topic::BasicMessages => message_types::BASIC_MESSAGE_EVENT,
            Topic::IssueCredential => message_types::ISSUE_CREDENTIAL_EVENT,
            Topic::PresentProof => message_types::PRESENT_PROOF_EVENT,
        }
    }
}

// ============================================================================
// Relay frames
// ============================================================================

/// Frame sent once per connection, right after the socket opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub auth: String,
    /// Deliver only events after now (`true`) or replay buffered history too
    #[serde(rename = "fastForward")]
    pub fast_forward: bool,
}

impl Handshake {
    pub fn new(auth: impl Into<String>, fast_forward: bool) -> Self {
        Self {
            auth: auth.into(),
            fast_forward,
        }
    }
}

/// Inbound webhook frame. The topic is kept raw so unknown topics can be
/// dropped instead of failing the parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookFrame {
    pub topic: String,
    #[serde(default)]
    pub body: Value,
}

impl WebhookFrame {
    pub fn new(topic: impl Into<String>, body: Value) -> Self {
        Self {
            topic: topic.into(),
            body,
        }
    }

    pub fn topic(&self) -> Option<Topic> {
        Topic::parse(&self.topic)
    }
}

// ============================================================================
// Bus messages
// ============================================================================

/// Lifecycle event published onto the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

impl EventMessage {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

/// Command addressed to a controller plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub body: Value,
}

impl CommandMessage {
    pub fn new(kind: impl Into<String>, body: Value) -> Self {
        Self {
            kind: kind.into(),
            body,
        }
    }

    /// Command without parameters
    pub fn bare(kind: impl Into<String>) -> Self {
        Self::new(kind, Value::Null)
    }

    /// Body with `null` replaced by an empty object, so optional filter
    /// bodies decode into all-`None` structs.
    pub fn normalized_body(&self) -> Value {
        match &self.body {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn topic_maps_to_message_type() {
        assert_eq!(
            Topic::parse("issue_credential").map(|t| t.message_type()),
            Some("aca-issue-credential-event")
        );
        assert_eq!(
            Topic::parse("connections").map(|t| t.message_type()),
            Some("aca-connection-event")
        );
        assert_eq!(Topic::parse("revocation_registry"), None);
    }

    #[test]
    fn topic_names_round_trip() {
        for topic in Topic::ALL {
            assert_eq!(Topic::parse(topic.as_str()), Some(topic));
        }
    }

    #[test]
    fn handshake_uses_camel_case_flag() {
        let frame = serde_json::to_value(Handshake::new("key", true)).unwrap();
        assert_eq!(frame, json!({"auth": "key", "fastForward": true}));
    }

    #[test]
    fn command_body_defaults_to_null() {
        let cmd: CommandMessage = serde_json::from_value(json!({"type": "get-connections"})).unwrap();
        assert_eq!(cmd.body, Value::Null);
        assert_eq!(cmd.normalized_body(), json!({}));
    }

    #[test]
    fn event_message_serializes_type_field() {
        let msg = EventMessage::new("aca-connection-event", json!({"state": "active"}));
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "aca-connection-event", "payload": {"state": "active"}})
        );
    }
}
