use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::{bus::BusHandle, message::Message, reply::Reply};

// ============================================================================
// Metadata
// ============================================================================

#[derive(Clone, Debug)]
pub struct PluginMetadata {
    pub name: String,
    pub description: String,
    pub version: String,
}

impl PluginMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of offering a message to one plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The plugin claimed the message and handled it
    Success,
    /// The message does not belong to this plugin
    Ignored,
    /// The plugin claimed the message and failed
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Ignored => "ignored",
            Outcome::Error => "error",
        }
    }

    /// Whether the plugin claimed the message
    pub fn is_claimed(&self) -> bool {
        !matches!(self, Outcome::Ignored)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Plugin
// ============================================================================

/// A participant of the plugin bus.
///
/// Every message is offered to every plugin in registration order. A plugin
/// that does not own the message type must return [`Outcome::Ignored`]
/// without side effects.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Metadata (name must be unique on a bus)
    fn meta(&self) -> PluginMetadata;

    /// Called once, in registration order, before the first dispatch
    async fn initialize(&self, _bus: &BusHandle) -> Result<()> {
        Ok(())
    }

    /// Handle a message, answering through `reply` when there is a caller
    async fn handle_event(&self, message: &Message, reply: Reply) -> Outcome;
}
