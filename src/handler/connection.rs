use async_trait::async_trait;

use super::{EventContext, EventDispatcher, StateRouter};
use crate::protocol::{ConnectionRecord, ConnectionState};

/// Reacts to connection records, one method per state
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    async fn on_init(&self, ctx: &EventContext, record: &ConnectionRecord) -> anyhow::Result<()>;

    async fn on_invitation(
        &self,
        ctx: &EventContext,
        record: &ConnectionRecord,
    ) -> anyhow::Result<()>;

    async fn on_request(&self, ctx: &EventContext, record: &ConnectionRecord)
    -> anyhow::Result<()>;

    async fn on_response(
        &self,
        ctx: &EventContext,
        record: &ConnectionRecord,
    ) -> anyhow::Result<()>;

    async fn on_active(&self, ctx: &EventContext, record: &ConnectionRecord) -> anyhow::Result<()>;

    async fn on_inactive(
        &self,
        ctx: &EventContext,
        record: &ConnectionRecord,
    ) -> anyhow::Result<()>;

    async fn on_error(&self, ctx: &EventContext, record: &ConnectionRecord) -> anyhow::Result<()>;
}

/// Routes connection states to a [`ConnectionHandler`]
pub struct Connections<H>(pub H);

#[async_trait]
impl<H: ConnectionHandler> StateRouter for Connections<H> {
    type Record = ConnectionRecord;

    async fn route(
        &self,
        ctx: &EventContext,
        state: ConnectionState,
        record: &ConnectionRecord,
    ) -> anyhow::Result<()> {
        let handler = &self.0;
        match state {
            ConnectionState::Init => handler.on_init(ctx, record).await,
            ConnectionState::Invitation => handler.on_invitation(ctx, record).await,
            ConnectionState::Request => handler.on_request(ctx, record).await,
            ConnectionState::Response => handler.on_response(ctx, record).await,
            ConnectionState::Active => handler.on_active(ctx, record).await,
            ConnectionState::Inactive => handler.on_inactive(ctx, record).await,
            ConnectionState::Error => handler.on_error(ctx, record).await,
        }
    }
}

impl<H: ConnectionHandler> EventDispatcher<Connections<H>> {
    pub fn connections(handler: H) -> Self {
        Self::new(Connections(handler))
    }
}
