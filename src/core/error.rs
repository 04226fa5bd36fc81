//! Error taxonomy shared by the bus, dispatchers and controllers.

use serde_json::Value;
use thiserror::Error;

use crate::protocol::Family;

/// Failure of a call to the agent's REST API
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// The agent answered with a non-2xx status
    #[error("agent responded with status {status}: {data}")]
    Remote { status: u16, data: Value },
    /// No response was obtained (connect, timeout, body read)
    #[error("agent transport error: {0}")]
    Transport(String),
}

impl AgentError {
    pub fn remote(status: u16, data: impl Into<Value>) -> Self {
        AgentError::Remote {
            status,
            data: data.into(),
        }
    }

    pub fn transport(diagnostic: impl Into<String>) -> Self {
        AgentError::Transport(diagnostic.into())
    }
}

/// A lifecycle record whose state matches none of its family's declared states
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {family} state '{state}'")]
pub struct UnknownStateError {
    pub family: Family,
    pub state: String,
}

/// Anything that can go wrong inside a plugin's dispatch entrypoint
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    UnknownState(#[from] UnknownStateError),
    #[error("invalid {kind} payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DispatchError {
    pub fn payload(kind: impl Into<String>, source: serde_json::Error) -> Self {
        DispatchError::Payload {
            kind: kind.into(),
            source,
        }
    }

    /// The agent failure behind this error, if any. Looks through
    /// `anyhow` wrapping so handler code can use `?` freely.
    pub fn agent_error(&self) -> Option<&AgentError> {
        match self {
            DispatchError::Agent(e) => Some(e),
            DispatchError::Other(e) => e.downcast_ref::<AgentError>(),
            _ => None,
        }
    }
}

/// Plugin bus failures
#[derive(Debug, Error)]
pub enum BusError {
    #[error("plugin '{0}' is already registered")]
    DuplicatePlugin(String),
    #[error("plugin '{plugin}' failed to initialize: {source}")]
    Initialize {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("no plugin claimed message '{0}'")]
    Unclaimed(String),
    #[error("message '{0}' was claimed but never answered")]
    NoResponse(String),
    #[error("plugin bus is closed")]
    Closed,
}

/// Failure of a typed command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("command failed with status {}: {}", .0.status_code, .0.body)]
    Failed(acaflow_protocol::ResponseEnvelope),
    #[error("failed to encode or decode command: {0}")]
    Codec(#[from] serde_json::Error),
}
