use async_trait::async_trait;

use super::{EventContext, EventDispatcher, StateRouter};
use crate::protocol::{CredentialExchangeRecord, CredentialExchangeState};

type Record = CredentialExchangeRecord;

/// Reacts to credential exchange records, one method per state.
///
/// Issuer and holder both receive every state their side of the exchange
/// passes through; check [`CredentialExchangeRecord::role`] when a handler
/// serves both.
#[async_trait]
pub trait CredentialHandler: Send + Sync + 'static {
    async fn on_proposal_sent(&self, ctx: &EventContext, record: &Record) -> anyhow::Result<()>;

    async fn on_proposal_received(&self, ctx: &EventContext, record: &Record)
    -> anyhow::Result<()>;

    async fn on_offer_sent(&self, ctx: &EventContext, record: &Record) -> anyhow::Result<()>;

    async fn on_offer_received(&self, ctx: &EventContext, record: &Record) -> anyhow::Result<()>;

    async fn on_request_sent(&self, ctx: &EventContext, record: &Record) -> anyhow::Result<()>;

    async fn on_request_received(&self, ctx: &EventContext, record: &Record)
    -> anyhow::Result<()>;

    async fn on_credential_issued(&self, ctx: &EventContext, record: &Record)
    -> anyhow::Result<()>;

    async fn on_credential_received(
        &self,
        ctx: &EventContext,
        record: &Record,
    ) -> anyhow::Result<()>;

    async fn on_credential_acked(&self, ctx: &EventContext, record: &Record)
    -> anyhow::Result<()>;
}

/// Routes credential exchange states to a [`CredentialHandler`]
pub struct Credentials<H>(pub H);

#[async_trait]
impl<H: CredentialHandler> StateRouter for Credentials<H> {
    type Record = CredentialExchangeRecord;

    async fn route(
        &self,
        ctx: &EventContext,
        state: CredentialExchangeState,
        record: &Record,
    ) -> anyhow::Result<()> {
        use CredentialExchangeState as S;

        let handler = &self.0;
        match state {
            S::ProposalSent => handler.on_proposal_sent(ctx, record).await,
            S::ProposalReceived => handler.on_proposal_received(ctx, record).await,
            S::OfferSent => handler.on_offer_sent(ctx, record).await,
            S::OfferReceived => handler.on_offer_received(ctx, record).await,
            S::RequestSent => handler.on_request_sent(ctx, record).await,
            S::RequestReceived => handler.on_request_received(ctx, record).await,
            S::CredentialIssued => handler.on_credential_issued(ctx, record).await,
            S::CredentialReceived => handler.on_credential_received(ctx, record).await,
            S::CredentialAcked => handler.on_credential_acked(ctx, record).await,
        }
    }
}

impl<H: CredentialHandler> EventDispatcher<Credentials<H>> {
    pub fn credentials(handler: H) -> Self {
        Self::new(Credentials(handler))
    }
}

#[cfg(test)]
mod tests {
    use acaflow_protocol::message_types;
    use serde_json::json;

    use super::*;
    use crate::core::{message::Message, plugin::Outcome, plugin::Plugin, reply::Reply};
    use crate::protocol::LifecycleState;
    use crate::handler::testing::Calls;

    struct Recording(Calls);

    impl Recording {
        fn note(&self, method: &str, record: &Record) -> anyhow::Result<()> {
            self.0.push(method, &record.credential_exchange_id);
            Ok(())
        }
    }

    #[async_trait]
    impl CredentialHandler for Recording {
        async fn on_proposal_sent(&self, _: &EventContext, r: &Record) -> anyhow::Result<()> {
            self.note("on_proposal_sent", r)
        }
        async fn on_proposal_received(&self, _: &EventContext, r: &Record) -> anyhow::Result<()> {
            self.note("on_proposal_received", r)
        }
        async fn on_offer_sent(&self, _: &EventContext, r: &Record) -> anyhow::Result<()> {
            self.note("on_offer_sent", r)
        }
        async fn on_offer_received(&self, _: &EventContext, r: &Record) -> anyhow::Result<()> {
            self.note("on_offer_received", r)
        }
        async fn on_request_sent(&self, _: &EventContext, r: &Record) -> anyhow::Result<()> {
            self.note("on_request_sent", r)
        }
        async fn on_request_received(&self, _: &EventContext, r: &Record) -> anyhow::Result<()> {
            self.note("on_request_received", r)
        }
        async fn on_credential_issued(&self, _: &EventContext, r: &Record) -> anyhow::Result<()> {
            self.note("on_credential_issued", r)
        }
        async fn on_credential_received(
            &self,
            _: &EventContext,
            r: &Record,
        ) -> anyhow::Result<()> {
            self.note("on_credential_received", r)
        }
        async fn on_credential_acked(&self, _: &EventContext, r: &Record) -> anyhow::Result<()> {
            self.note("on_credential_acked", r)
        }
    }

    #[tokio::test]
    async fn offer_received_reaches_one_method() {
        let calls = Calls::default();
        let plugin = EventDispatcher::credentials(Recording(calls.clone()));
        assert_eq!(plugin.meta().name, "issue-credential-events");

        let message = Message::event(
            message_types::ISSUE_CREDENTIAL_EVENT,
            json!({"state": "offer_received", "credential_exchange_id": "e1"}),
        );
        let outcome = plugin.handle_event(&message, Reply::noop()).await;

        assert_eq!(outcome, Outcome::Success);
        assert_eq!(
            calls.take(),
            vec![("on_offer_received".to_string(), "e1".to_string())]
        );
    }

    #[tokio::test]
    async fn unknown_state_never_reaches_the_handler() {
        let calls = Calls::default();
        let plugin = EventDispatcher::credentials(Recording(calls.clone()));

        let (reply, rx) = Reply::channel();
        let message = Message::event(
            message_types::ISSUE_CREDENTIAL_EVENT,
            json!({"state": "done", "credential_exchange_id": "e1"}),
        );

        assert_eq!(plugin.handle_event(&message, reply).await, Outcome::Error);
        assert_eq!(rx.await.unwrap().status_code, 500);
        assert!(calls.take().is_empty());
    }

    #[tokio::test]
    async fn every_state_reaches_its_own_method() {
        let calls = Calls::default();
        let plugin = EventDispatcher::credentials(Recording(calls.clone()));

        for state in CredentialExchangeState::ALL {
            let record = CredentialExchangeRecord::new(state.tag(), *state);
            let message = Message::event(
                message_types::ISSUE_CREDENTIAL_EVENT,
                serde_json::to_value(&record).unwrap(),
            );
            assert_eq!(
                plugin.handle_event(&message, Reply::noop()).await,
                Outcome::Success
            );
        }

        let methods: Vec<_> = calls
            .take()
            .into_iter()
            .map(|(method, id)| format!("{method}:{id}"))
            .collect();
        assert_eq!(
            methods,
            vec![
                "on_proposal_sent:proposal_sent",
                "on_proposal_received:proposal_received",
                "on_offer_sent:offer_sent",
                "on_offer_received:offer_received",
                "on_request_sent:request_sent",
                "on_request_received:request_received",
                "on_credential_issued:credential_issued",
                "on_credential_received:credential_received",
                "on_credential_acked:credential_acked",
            ]
        );
    }

    #[tokio::test]
    async fn short_state_names_reach_the_same_methods() {
        let calls = Calls::default();
        let plugin = EventDispatcher::credentials(Recording(calls.clone()));

        for (tag, id) in [("issued", "e1"), ("stored", "e2")] {
            let message = Message::event(
                message_types::ISSUE_CREDENTIAL_EVENT,
                json!({"state": tag, "credential_exchange_id": id}),
            );
            assert_eq!(
                plugin.handle_event(&message, Reply::noop()).await,
                Outcome::Success
            );
        }

        assert_eq!(
            calls.take(),
            vec![
                ("on_credential_issued".to_string(), "e1".to_string()),
                ("on_credential_acked".to_string(), "e2".to_string()),
            ]
        );
    }
}
