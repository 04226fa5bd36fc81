//! Proof presentation records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Family, LifecycleRecord, parse_timestamp};

lifecycle_states! {
    /// States of a presentation exchange, seen from either side
    pub enum PresentationExchangeState: Family::PresentProof {
        ProposalSent = "proposal_sent",
        ProposalReceived = "proposal_received",
        RequestSent = "request_sent",
        RequestReceived = "request_received",
        PresentationSent = "presentation_sent",
        PresentationReceived = "presentation_received",
        Verified = "verified" @terminal,
    }
}

/// Presentation exchange record snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresentationExchangeRecord {
    pub presentation_exchange_id: String,
    pub state: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiator: Option<String>,
    /// `prover` or `verifier`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_proposal_dict: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_request: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation: Option<Value>,
    /// The agent reports `"true"` or `"false"` as a string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_present: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PresentationExchangeRecord {
    pub fn new(
        presentation_exchange_id: impl Into<String>,
        state: PresentationExchangeState,
    ) -> Self {
        Self {
            presentation_exchange_id: presentation_exchange_id.into(),
            state: state.to_string(),
            ..Default::default()
        }
    }

    /// Verification outcome; `None` until the verifier has checked the proof
    pub fn is_verified(&self) -> Option<bool> {
        match self.verified.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        }
    }

    pub fn is_verifier(&self) -> bool {
        self.role.as_deref() == Some("verifier")
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref())
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.updated_at.as_deref())
    }
}

impl LifecycleRecord for PresentationExchangeRecord {
    type State = PresentationExchangeState;

    fn state_tag(&self) -> &str {
        &self.state
    }

    fn exchange_id(&self) -> Option<&str> {
        Some(&self.presentation_exchange_id)
    }

    fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::protocol::{classify, testing::assert_exclusive};

    #[test]
    fn states_are_exclusive() {
        assert_exclusive(|tag| PresentationExchangeRecord {
            presentation_exchange_id: "p1".into(),
            state: tag.into(),
            ..Default::default()
        });
    }

    #[test]
    fn verified_record() {
        let record: PresentationExchangeRecord = serde_json::from_value(json!({
            "presentation_exchange_id": "p1",
            "state": "verified",
            "verified": "true",
            "role": "verifier"
        }))
        .unwrap();
        assert_eq!(classify(&record).unwrap(), PresentationExchangeState::Verified);
        assert_eq!(record.is_verified(), Some(true));
        assert!(record.is_verifier());
    }

    #[test]
    fn state_tag_is_case_sensitive() {
        let record = PresentationExchangeRecord {
            presentation_exchange_id: "p1".into(),
            state: "Verified".into(),
            ..Default::default()
        };
        assert!(classify(&record).is_err());
    }
}
