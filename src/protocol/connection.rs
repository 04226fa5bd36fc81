//! Connection establishment records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Family, LifecycleRecord, parse_timestamp};

lifecycle_states! {
    /// States of a connection record
    pub enum ConnectionState: Family::Connection {
        Init = "init",
        Invitation = "invitation",
        Request = "request",
        Response = "response",
        Active = "active" @terminal,
        Inactive = "inactive" @terminal,
        Error = "error" @terminal,
    }
}

/// Connection record snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub connection_id: String,
    pub state: String,

    /// `self`, `external` or `multiuse`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub their_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub their_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub their_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invitation_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invitation_mode: Option<String>,
    /// `manual` or `auto`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConnectionRecord {
    pub fn new(connection_id: impl Into<String>, state: ConnectionState) -> Self {
        Self {
            connection_id: connection_id.into(),
            state: state.to_string(),
            ..Default::default()
        }
    }

    pub fn with_initiator(mut self, initiator: impl Into<String>) -> Self {
        self.initiator = Some(initiator.into());
        self
    }

    /// The invitation came from the other party
    pub fn is_external(&self) -> bool {
        self.initiator.as_deref() == Some("external")
    }

    pub fn is_auto_accept(&self) -> bool {
        self.accept.as_deref() == Some("auto")
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref())
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.updated_at.as_deref())
    }
}

impl LifecycleRecord for ConnectionRecord {
    type State = ConnectionState;

    fn state_tag(&self) -> &str {
        &self.state
    }

    fn exchange_id(&self) -> Option<&str> {
        Some(&self.connection_id)
    }

    fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref().or(self.request_id.as_deref())
    }
}
