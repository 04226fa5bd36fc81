use acaflow_protocol::{CommandMessage, EventMessage};
use serde::Serialize;
use serde_json::Value;

/// A message travelling over the plugin bus
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Lifecycle event republished by the webhook relay
    Event(EventMessage),
    /// Command addressed to a controller
    Command(CommandMessage),
}

impl Message {
    pub fn event(kind: impl Into<String>, payload: Value) -> Self {
        Message::Event(EventMessage::new(kind, payload))
    }

    pub fn command(kind: impl Into<String>, body: Value) -> Self {
        Message::Command(CommandMessage::new(kind, body))
    }

    /// Build a command from any serializable body
    pub fn command_from<B: Serialize>(
        kind: impl Into<String>,
        body: &B,
    ) -> Result<Self, serde_json::Error> {
        Ok(Message::command(kind, serde_json::to_value(body)?))
    }

    /// The `type` tag of the message
    pub fn kind(&self) -> &str {
        match self {
            Message::Event(e) => &e.kind,
            Message::Command(c) => &c.kind,
        }
    }

    pub fn as_event(&self) -> Option<&EventMessage> {
        match self {
            Message::Event(e) => Some(e),
            Message::Command(_) => None,
        }
    }

    pub fn as_command(&self) -> Option<&CommandMessage> {
        match self {
            Message::Command(c) => Some(c),
            Message::Event(_) => None,
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Message::Command(_))
    }
}

impl From<EventMessage> for Message {
    fn from(value: EventMessage) -> Self {
        Message::Event(value)
    }
}

impl From<CommandMessage> for Message {
    fn from(value: CommandMessage) -> Self {
        Message::Command(value)
    }
}
