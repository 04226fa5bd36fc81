// Convenience re-exports: use acaflow::prelude::*;
pub use crate::AcaFlow;

pub use crate::core::{
    Bus, BusHandle, Command, ConfigStore, Configurable, Message, Outcome, Plugin, PluginMetadata,
    Reply,
};

pub use crate::agent::{AgentApi, ApiRequest, ApiResponse, Method};
pub use crate::controller::{
    BasicMessageCommand, ConnectionCommand, Controller, CredentialCommand, LedgerCommand,
    ProofCommand,
};
pub use crate::handler::{
    BasicMessageHandler, ConnectionHandler, CredentialHandler, EventContext, EventDispatcher,
    ProofHandler,
};
pub use crate::protocol::{
    BasicMessageRecord, ConnectionRecord, CredentialExchangeRecord, LifecycleRecord,
    LifecycleState, PresentationExchangeRecord,
};
pub use crate::relay::WebhookRelay;

pub use acaflow_protocol::{CommandMessage, EventMessage, ResponseEnvelope};

// Re-export async_trait for handler impls
pub use async_trait::async_trait;
