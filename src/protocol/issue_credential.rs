//! Credential issuance records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Family, LifecycleRecord, parse_timestamp};

lifecycle_states! {
    /// States of a credential exchange, seen from either side
    pub enum CredentialExchangeState: Family::IssueCredential {
        ProposalSent = "proposal_sent",
        ProposalReceived = "proposal_received",
        OfferSent = "offer_sent",
        OfferReceived = "offer_received",
        RequestSent = "request_sent",
        RequestReceived = "request_received",
        CredentialIssued = "credential_issued" | "issued",
        CredentialReceived = "credential_received",
        /// Stored by the holder and acknowledged
        CredentialAcked = "credential_acked" | "stored" @terminal,
    }
}

/// Credential exchange record snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialExchangeRecord {
    pub credential_exchange_id: String,
    pub state: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiator: Option<String>,
    /// `issuer` or `holder`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_definition_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_proposal_dict: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_offer: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_request: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_offer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_issue: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_remove: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CredentialExchangeRecord {
    pub fn new(credential_exchange_id: impl Into<String>, state: CredentialExchangeState) -> Self {
        Self {
            credential_exchange_id: credential_exchange_id.into(),
            state: state.to_string(),
            ..Default::default()
        }
    }

    pub fn is_issuer(&self) -> bool {
        self.role.as_deref() == Some("issuer")
    }

    pub fn is_holder(&self) -> bool {
        self.role.as_deref() == Some("holder")
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref())
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.updated_at.as_deref())
    }
}

impl LifecycleRecord for CredentialExchangeRecord {
    type State = CredentialExchangeState;

    fn state_tag(&self) -> &str {
        &self.state
    }

    fn exchange_id(&self) -> Option<&str> {
        Some(&self.credential_exchange_id)
    }

    fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::protocol::{LifecycleState, classify, testing::assert_exclusive};

    #[test]
    fn states_are_exclusive() {
        assert_exclusive(record);
        assert_eq!(CredentialExchangeState::ALL.len(), 9);
    }

    #[test]
    fn offer_received_from_wire() {
        let record: CredentialExchangeRecord = serde_json::from_value(json!({
            "credential_exchange_id": "e1",
            "connection_id": "c1",
            "thread_id": "t1",
            "state": "offer_received",
            "role": "holder",
            "auto_issue": false
        }))
        .unwrap();

        assert_eq!(classify(&record).unwrap(), CredentialExchangeState::OfferReceived);
        assert_eq!(record.exchange_id(), Some("e1"));
        assert_eq!(record.thread_id(), Some("t1"));
        assert!(record.is_holder());
    }

    fn record(tag: &str) -> CredentialExchangeRecord {
        CredentialExchangeRecord {
            credential_exchange_id: "e1".into(),
            state: tag.into(),
            ..Default::default()
        }
    }

    #[test]
    fn short_state_names_classify() {
        assert_eq!(
            classify(&record("issued")).unwrap(),
            CredentialExchangeState::CredentialIssued
        );
        assert_eq!(
            classify(&record("stored")).unwrap(),
            CredentialExchangeState::CredentialAcked
        );

        let stored: CredentialExchangeState = serde_json::from_value(json!("stored")).unwrap();
        assert_eq!(stored, CredentialExchangeState::CredentialAcked);
        assert_eq!(stored.to_string(), "credential_acked");
    }

    #[test]
    fn undeclared_state_names_are_unknown() {
        for tag in ["done", "acked", "credential_stored"] {
            let err = classify(&record(tag)).unwrap_err();
            assert_eq!(err.family, Family::IssueCredential);
            assert_eq!(err.state, tag);
        }
    }

    #[test]
    fn only_acked_is_terminal() {
        for state in CredentialExchangeState::ALL {
            assert_eq!(
                state.is_terminal(),
                *state == CredentialExchangeState::CredentialAcked
            );
        }
    }
}
