//! Handlers that move every exchange forward without operator input

use std::sync::Arc;

use acaflow::controller::connection::AcceptRequest;
use acaflow::controller::issue_credential::{
    IssueCredential, SendCredentialRequest, StoreCredential,
};
use acaflow::controller::present_proof::VerifyPresentation;
use acaflow::prelude::*;
use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutoAcceptConfig {
    pub connections: bool,
    pub credentials: bool,
    pub proofs: bool,
}

impl Default for AutoAcceptConfig {
    fn default() -> Self {
        Self {
            connections: true,
            credentials: true,
            proofs: true,
        }
    }
}

impl Configurable for AutoAcceptConfig {
    const PREFIX: &'static str = "auto-accept";
}

#[derive(Clone)]
pub struct Autopilot {
    config: Arc<AutoAcceptConfig>,
}

impl Autopilot {
    pub fn new(config: AutoAcceptConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl ConnectionHandler for Autopilot {
    async fn on_init(&self, _ctx: &EventContext, record: &ConnectionRecord) -> Result<()> {
        debug!("Connection {} created", record.connection_id);
        Ok(())
    }

    async fn on_invitation(&self, _ctx: &EventContext, record: &ConnectionRecord) -> Result<()> {
        info!(
            "Invitation for connection {} ({})",
            record.connection_id,
            record.initiator.as_deref().unwrap_or("unknown")
        );
        Ok(())
    }

    async fn on_request(&self, ctx: &EventContext, record: &ConnectionRecord) -> Result<()> {
        if !self.config.connections || record.is_auto_accept() {
            return Ok(());
        }
        info!("Accepting connection request {}", record.connection_id);
        ctx.execute(&AcceptRequest::new(&record.connection_id)).await?;
        Ok(())
    }

    async fn on_response(&self, _ctx: &EventContext, record: &ConnectionRecord) -> Result<()> {
        debug!("Connection {} responded", record.connection_id);
        Ok(())
    }

    async fn on_active(&self, _ctx: &EventContext, record: &ConnectionRecord) -> Result<()> {
        info!(
            "Connection {} active with {}",
            record.connection_id,
            record.their_label.as_deref().unwrap_or("unnamed peer")
        );
        Ok(())
    }

    async fn on_inactive(&self, _ctx: &EventContext, record: &ConnectionRecord) -> Result<()> {
        info!("Connection {} inactive", record.connection_id);
        Ok(())
    }

    async fn on_error(&self, _ctx: &EventContext, record: &ConnectionRecord) -> Result<()> {
        warn!(
            "Connection {} failed: {}",
            record.connection_id,
            record.error_msg.as_deref().unwrap_or("no details")
        );
        Ok(())
    }
}

#[async_trait]
impl CredentialHandler for Autopilot {
    async fn on_proposal_sent(
        &self,
        _ctx: &EventContext,
        record: &CredentialExchangeRecord,
    ) -> Result<()> {
        debug!("Proposal sent for {}", record.credential_exchange_id);
        Ok(())
    }

    async fn on_proposal_received(
        &self,
        _ctx: &EventContext,
        record: &CredentialExchangeRecord,
    ) -> Result<()> {
        info!("Proposal received for {}", record.credential_exchange_id);
        Ok(())
    }

    async fn on_offer_sent(
        &self,
        _ctx: &EventContext,
        record: &CredentialExchangeRecord,
    ) -> Result<()> {
        debug!("Offer sent for {}", record.credential_exchange_id);
        Ok(())
    }

    async fn on_offer_received(
        &self,
        ctx: &EventContext,
        record: &CredentialExchangeRecord,
    ) -> Result<()> {
        if !self.config.credentials {
            return Ok(());
        }
        info!("Requesting offered credential {}", record.credential_exchange_id);
        ctx.execute(&SendCredentialRequest::new(&record.credential_exchange_id))
            .await?;
        Ok(())
    }

    async fn on_request_sent(
        &self,
        _ctx: &EventContext,
        record: &CredentialExchangeRecord,
    ) -> Result<()> {
        debug!("Request sent for {}", record.credential_exchange_id);
        Ok(())
    }

    async fn on_request_received(
        &self,
        ctx: &EventContext,
        record: &CredentialExchangeRecord,
    ) -> Result<()> {
        if !self.config.credentials || record.auto_issue == Some(true) {
            return Ok(());
        }
        info!("Issuing credential {}", record.credential_exchange_id);
        ctx.execute(&IssueCredential::new(&record.credential_exchange_id))
            .await?;
        Ok(())
    }

    async fn on_credential_issued(
        &self,
        _ctx: &EventContext,
        record: &CredentialExchangeRecord,
    ) -> Result<()> {
        info!("Credential issued for {}", record.credential_exchange_id);
        Ok(())
    }

    async fn on_credential_received(
        &self,
        ctx: &EventContext,
        record: &CredentialExchangeRecord,
    ) -> Result<()> {
        if !self.config.credentials {
            return Ok(());
        }
        info!("Storing credential {}", record.credential_exchange_id);
        ctx.execute(&StoreCredential::new(&record.credential_exchange_id))
            .await?;
        Ok(())
    }

    async fn on_credential_acked(
        &self,
        _ctx: &EventContext,
        record: &CredentialExchangeRecord,
    ) -> Result<()> {
        info!("Credential exchange {} complete", record.credential_exchange_id);
        Ok(())
    }
}

#[async_trait]
impl ProofHandler for Autopilot {
    async fn on_proposal_sent(
        &self,
        _ctx: &EventContext,
        record: &PresentationExchangeRecord,
    ) -> Result<()> {
        debug!("Proof proposal sent for {}", record.presentation_exchange_id);
        Ok(())
    }

    async fn on_proposal_received(
        &self,
        _ctx: &EventContext,
        record: &PresentationExchangeRecord,
    ) -> Result<()> {
        info!("Proof proposal received for {}", record.presentation_exchange_id);
        Ok(())
    }

    async fn on_request_sent(
        &self,
        _ctx: &EventContext,
        record: &PresentationExchangeRecord,
    ) -> Result<()> {
        debug!("Proof request sent for {}", record.presentation_exchange_id);
        Ok(())
    }

    async fn on_request_received(
        &self,
        _ctx: &EventContext,
        record: &PresentationExchangeRecord,
    ) -> Result<()> {
        // Choosing credentials needs a human or a policy; just surface it.
        info!("Proof requested in {}", record.presentation_exchange_id);
        Ok(())
    }

    async fn on_presentation_sent(
        &self,
        _ctx: &EventContext,
        record: &PresentationExchangeRecord,
    ) -> Result<()> {
        debug!("Presentation sent for {}", record.presentation_exchange_id);
        Ok(())
    }

    async fn on_presentation_received(
        &self,
        ctx: &EventContext,
        record: &PresentationExchangeRecord,
    ) -> Result<()> {
        if !self.config.proofs {
            return Ok(());
        }
        info!("Verifying presentation {}", record.presentation_exchange_id);
        ctx.execute(&VerifyPresentation::new(&record.presentation_exchange_id))
            .await?;
        Ok(())
    }

    async fn on_verified(
        &self,
        _ctx: &EventContext,
        record: &PresentationExchangeRecord,
    ) -> Result<()> {
        match record.is_verified() {
            Some(true) => info!("Presentation {} verified", record.presentation_exchange_id),
            _ => warn!("Presentation {} did not verify", record.presentation_exchange_id),
        }
        Ok(())
    }
}

#[async_trait]
impl BasicMessageHandler for Autopilot {
    async fn on_received(&self, _ctx: &EventContext, record: &BasicMessageRecord) -> Result<()> {
        info!("Message from {}: {}", record.connection_id, record.content);
        Ok(())
    }
}
