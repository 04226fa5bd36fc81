use async_trait::async_trait;

use super::{EventContext, EventDispatcher, StateRouter};
use crate::protocol::{BasicMessageRecord, BasicMessageState};

#[async_trait]
pub trait BasicMessageHandler: Send + Sync + 'static {
    async fn on_received(&self, ctx: &EventContext, record: &BasicMessageRecord)
    -> anyhow::Result<()>;
}

pub struct BasicMessages<H>(pub H);

#[async_trait]
impl<H: BasicMessageHandler> StateRouter for BasicMessages<H> {
    type Record = BasicMessageRecord;

    async fn route(
        &self,
        ctx: &EventContext,
        state: BasicMessageState,
        record: &BasicMessageRecord,
    ) -> anyhow::Result<()> {
        match state {
            BasicMessageState::Received => self.0.on_received(ctx, record).await,
        }
    }
}

impl<H: BasicMessageHandler> EventDispatcher<BasicMessages<H>> {
    pub fn basic_messages(handler: H) -> Self {
        Self::new(BasicMessages(handler))
    }
}
