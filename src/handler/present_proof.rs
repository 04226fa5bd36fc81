use async_trait::async_trait;

use super::{EventContext, EventDispatcher, StateRouter};
use crate::protocol::{PresentationExchangeRecord, PresentationExchangeState};

type Record = PresentationExchangeRecord;

/// Reacts to presentation exchange records, one method per state
#[async_trait]
pub trait ProofHandler: Send + Sync + 'static {
    async fn on_proposal_sent(&self, ctx: &EventContext, record: &Record) -> anyhow::Result<()>;

    async fn on_proposal_received(&self, ctx: &EventContext, record: &Record)
    -> anyhow::Result<()>;

    async fn on_request_sent(&self, ctx: &EventContext, record: &Record) -> anyhow::Result<()>;

    async fn on_request_received(&self, ctx: &EventContext, record: &Record)
    -> anyhow::Result<()>;

    async fn on_presentation_sent(&self, ctx: &EventContext, record: &Record)
    -> anyhow::Result<()>;

    async fn on_presentation_received(
        &self,
        ctx: &EventContext,
        record: &Record,
    ) -> anyhow::Result<()>;

    async fn on_verified(&self, ctx: &EventContext, record: &Record) -> anyhow::Result<()>;
}

/// Routes presentation exchange states to a [`ProofHandler`]
pub struct Proofs<H>(pub H);

#[async_trait]
impl<H: ProofHandler> StateRouter for Proofs<H> {
    type Record = PresentationExchangeRecord;

    async fn route(
        &self,
        ctx: &EventContext,
        state: PresentationExchangeState,
        record: &Record,
    ) -> anyhow::Result<()> {
        use PresentationExchangeState as S;

        let handler = &self.0;
        match state {
            S::ProposalSent => handler.on_proposal_sent(ctx, record).await,
            S::ProposalReceived => handler.on_proposal_received(ctx, record).await,
            S::RequestSent => handler.on_request_sent(ctx, record).await,
            S::RequestReceived => handler.on_request_received(ctx, record).await,
            S::PresentationSent => handler.on_presentation_sent(ctx, record).await,
            S::PresentationReceived => handler.on_presentation_received(ctx, record).await,
            S::Verified => handler.on_verified(ctx, record).await,
        }
    }
}

impl<H: ProofHandler> EventDispatcher<Proofs<H>> {
    pub fn proofs(handler: H) -> Self {
        Self::new(Proofs(handler))
    }
}
