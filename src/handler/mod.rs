//! Protocol event dispatchers.
//!
//! An [`EventDispatcher`] is the plugin that recognizes one family's event
//! type, classifies the attached record and hands it to exactly one method of
//! a user handler through the family's [`StateRouter`].

pub mod basic_message;
pub mod connection;
pub mod issue_credential;
pub mod present_proof;

use std::panic::AssertUnwindSafe;
use std::sync::OnceLock;

use acaflow_protocol::{CommandMessage, ResponseEnvelope};
use async_trait::async_trait;
use futures::FutureExt;
use serde::Deserialize;
use tracing::{debug, error};

pub use basic_message::{BasicMessageHandler, BasicMessages};
pub use connection::{ConnectionHandler, Connections};
pub use issue_credential::{CredentialHandler, Credentials};
pub use present_proof::{ProofHandler, Proofs};

use crate::core::{
    bus::BusHandle,
    command::Command,
    error::{BusError, CommandError, DispatchError},
    message::Message,
    normalize::normalize,
    plugin::{Outcome, Plugin, PluginMetadata},
    reply::Reply,
};
use crate::protocol::{Family, LifecycleRecord, LifecycleState, classify};

/// What a handler method gets besides the record
#[derive(Clone)]
pub struct EventContext {
    bus: BusHandle,
    family: Family,
}

impl EventContext {
    pub fn new(bus: BusHandle, family: Family) -> Self {
        Self { bus, family }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn bus(&self) -> &BusHandle {
        &self.bus
    }

    /// Issue a typed command through the bus and decode its result
    pub async fn execute<C: Command>(&self, command: &C) -> Result<C::Output, CommandError> {
        self.bus.execute(command).await
    }

    /// Issue a raw command and get its envelope
    pub async fn request(&self, command: CommandMessage) -> Result<ResponseEnvelope, BusError> {
        self.bus.request(command).await
    }
}

/// Routes a classified state to one handler method
#[async_trait]
pub trait StateRouter: Send + Sync + 'static {
    type Record: LifecycleRecord;

    async fn route(
        &self,
        ctx: &EventContext,
        state: <Self::Record as LifecycleRecord>::State,
        record: &Self::Record,
    ) -> anyhow::Result<()>;
}

type StateOf<R> = <<R as StateRouter>::Record as LifecycleRecord>::State;

/// Plugin dispatching one family's events to a handler
pub struct EventDispatcher<R: StateRouter> {
    name: String,
    router: R,
    bus: OnceLock<BusHandle>,
}

impl<R: StateRouter> EventDispatcher<R> {
    pub fn new(router: R) -> Self {
        Self {
            name: format!("{}-events", Self::family()),
            router,
            bus: OnceLock::new(),
        }
    }

    /// Override the plugin name (needed to register two dispatchers of one family)
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn family() -> Family {
        <StateOf<R> as LifecycleState>::FAMILY
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    fn context(&self) -> EventContext {
        let bus = self.bus.get().cloned().unwrap_or_else(BusHandle::detached);
        EventContext::new(bus, Self::family())
    }

    async fn dispatch(&self, message: &Message) -> Result<Outcome, DispatchError> {
        let family = Self::family();
        let Some(event) = message.as_event() else {
            return Ok(Outcome::Ignored);
        };
        if event.kind != family.message_type() {
            return Ok(Outcome::Ignored);
        }

        let record = R::Record::deserialize(&event.payload)
            .map_err(|e| DispatchError::payload(&event.kind, e))?;
        let state = classify(&record)?;

        debug!(
            "{} {} -> {}",
            family,
            record.exchange_id().unwrap_or("-"),
            state
        );

        let ctx = self.context();
        let handled = AssertUnwindSafe(self.router.route(&ctx, state, &record))
            .catch_unwind()
            .await;

        match handled {
            Ok(Ok(())) => Ok(Outcome::Success),
            Ok(Err(e)) => {
                error!("{} handler failed in state '{}': {:#}", family, state, e);
                Ok(Outcome::Error)
            }
            Err(_) => {
                error!("{} handler panicked in state '{}'", family, state);
                Ok(Outcome::Error)
            }
        }
    }
}

#[async_trait]
impl<R: StateRouter> Plugin for EventDispatcher<R> {
    fn meta(&self) -> PluginMetadata {
        PluginMetadata::new(&self.name)
            .description(format!("Dispatches {} events", Self::family()))
    }

    async fn initialize(&self, bus: &BusHandle) -> anyhow::Result<()> {
        if self.bus.set(bus.clone()).is_err() {
            anyhow::bail!("dispatcher '{}' initialized twice", self.name);
        }
        Ok(())
    }

    async fn handle_event(&self, message: &Message, reply: Reply) -> Outcome {
        normalize(&reply, self.dispatch(message)).await
    }
}


#[cfg(test)]
mod tests {
    use acaflow_protocol::message_types;
    use serde_json::json;

    use super::testing::Calls;
    use super::*;
    use crate::core::bus::Bus;
    use crate::protocol::{ConnectionRecord, ConnectionState};

    /// Records which method saw which connection; fails on `error` records
    struct Recording {
        calls: Calls,
    }

    impl Recording {
        fn note(&self, method: &str, record: &ConnectionRecord) -> anyhow::Result<()> {
            self.calls.push(method, &record.connection_id);
            Ok(())
        }
    }

    #[async_trait]
    impl ConnectionHandler for Recording {
        async fn on_init(&self, _: &EventContext, r: &ConnectionRecord) -> anyhow::Result<()> {
            self.note("on_init", r)
        }
        async fn on_invitation(&self, _: &EventContext, r: &ConnectionRecord) -> anyhow::Result<()> {
            self.note("on_invitation", r)
        }
        async fn on_request(&self, _: &EventContext, r: &ConnectionRecord) -> anyhow::Result<()> {
            self.note("on_request", r)
        }
        async fn on_response(&self, _: &EventContext, r: &ConnectionRecord) -> anyhow::Result<()> {
            self.note("on_response", r)
        }
        async fn on_active(&self, _: &EventContext, r: &ConnectionRecord) -> anyhow::Result<()> {
            self.note("on_active", r)
        }
        async fn on_inactive(&self, _: &EventContext, _: &ConnectionRecord) -> anyhow::Result<()> {
            panic!("inactive handler exploded")
        }
        async fn on_error(&self, _: &EventContext, r: &ConnectionRecord) -> anyhow::Result<()> {
            self.note("on_error", r)?;
            anyhow::bail!("cannot handle {}", r.connection_id)
        }
    }

    fn dispatcher(calls: &Calls) -> EventDispatcher<Connections<Recording>> {
        EventDispatcher::new(Connections(Recording {
            calls: calls.clone(),
        }))
    }

    fn connection_event(payload: serde_json::Value) -> Message {
        Message::event(message_types::CONNECTION_EVENT, payload)
    }

    async fn run(
        plugin: &impl Plugin,
        message: Message,
    ) -> (Outcome, Option<ResponseEnvelope>) {
        let (reply, mut rx) = Reply::channel();
        let outcome = plugin.handle_event(&message, reply).await;
        (outcome, rx.try_recv().ok())
    }

    #[tokio::test]
    async fn invitation_is_routed_regardless_of_initiator() {
        let calls = Calls::default();
        let plugin = dispatcher(&calls);

        for (initiator, id) in [("external", "c1"), ("self", "c2")] {
            let message = connection_event(json!({
                "state": "invitation", "initiator": initiator, "connection_id": id
            }));
            let (outcome, envelope) = run(&plugin, message).await;
            assert_eq!(outcome, Outcome::Success);
            assert!(envelope.is_none());
        }

        assert_eq!(
            calls.take(),
            vec![
                ("on_invitation".to_string(), "c1".to_string()),
                ("on_invitation".to_string(), "c2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn every_state_reaches_its_own_method() {
        let calls = Calls::default();
        let plugin = dispatcher(&calls);

        for state in [
            ConnectionState::Init,
            ConnectionState::Invitation,
            ConnectionState::Request,
            ConnectionState::Response,
            ConnectionState::Active,
        ] {
            let record = ConnectionRecord::new(state.tag(), state);
            let message = connection_event(serde_json::to_value(&record).unwrap());
            assert_eq!(run(&plugin, message).await.0, Outcome::Success);
        }

        let methods: Vec<_> = calls
            .take()
            .into_iter()
            .map(|(method, id)| format!("{method}:{id}"))
            .collect();
        assert_eq!(
            methods,
            vec![
                "on_init:init",
                "on_invitation:invitation",
                "on_request:request",
                "on_response:response",
                "on_active:active",
            ]
        );
    }

    #[tokio::test]
    async fn foreign_messages_are_ignored() {
        let calls = Calls::default();
        let plugin = dispatcher(&calls);

        let other = Message::event(
            message_types::ISSUE_CREDENTIAL_EVENT,
            json!({"state": "active", "connection_id": "c1"}),
        );
        let command = Message::command("create-invitation", json!({"alias": "x"}));

        assert_eq!(run(&plugin, other).await, (Outcome::Ignored, None));
        assert_eq!(run(&plugin, command).await, (Outcome::Ignored, None));
        assert!(calls.take().is_empty());
    }

    #[tokio::test]
    async fn handler_failure_yields_error_without_envelope() {
        let calls = Calls::default();
        let plugin = dispatcher(&calls);

        let failing = connection_event(json!({"state": "error", "connection_id": "c9"}));
        assert_eq!(run(&plugin, failing).await, (Outcome::Error, None));

        let panicking = connection_event(json!({"state": "inactive", "connection_id": "c9"}));
        assert_eq!(run(&plugin, panicking).await, (Outcome::Error, None));
    }

    #[tokio::test]
    async fn unknown_state_fails_loudly() {
        let calls = Calls::default();
        let plugin = dispatcher(&calls);

        let message = connection_event(json!({"state": "start", "connection_id": "c1"}));
        let (outcome, envelope) = run(&plugin, message).await;

        assert_eq!(outcome, Outcome::Error);
        assert_eq!(
            envelope,
            Some(ResponseEnvelope::internal(
                "unknown connection state 'start'"
            ))
        );
        assert!(calls.take().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_is_a_dispatch_error() {
        let calls = Calls::default();
        let plugin = dispatcher(&calls);

        let (outcome, envelope) = run(&plugin, connection_event(json!({"state": 3}))).await;
        assert_eq!(outcome, Outcome::Error);
        assert_eq!(envelope.map(|e| e.status_code), Some(500));
    }

    #[tokio::test]
    async fn context_is_bound_to_the_bus() {
        let calls = Calls::default();
        let mut builder = Bus::builder();
        builder.register(dispatcher(&calls)).unwrap();
        let bus = builder.build().await.unwrap();

        assert_eq!(bus.plugins()[0].name, "connection-events");

        let report = bus
            .publish(
                connection_event(json!({"state": "active", "connection_id": "c1"})),
                Reply::noop(),
            )
            .await;
        assert_eq!(report.claimed_by(), vec!["connection-events"]);
    }

    #[test]
    fn detached_context_cannot_issue_commands() {
        let calls = Calls::default();
        let plugin = dispatcher(&calls);
        assert!(plugin.context().bus().is_closed());
    }
}
