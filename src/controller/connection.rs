//! Connection management commands

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Endpoint, ListResult};
use crate::agent::{ApiRequest, path_segment};
use crate::protocol::ConnectionRecord;

capability! {
    pub enum ConnectionCommand: "connections" {
        CreateInvitation(CreateInvitation) = "create-invitation" -> InvitationResult,
        ReceiveInvitation(ReceiveInvitation) = "receive-invitation" -> ConnectionRecord,
        AcceptInvitation(AcceptInvitation) = "accept-invitation" -> ConnectionRecord,
        AcceptRequest(AcceptRequest) = "accept-request" -> ConnectionRecord,
        GetConnections(GetConnections) = "get-connections" -> ListResult<ConnectionRecord>,
        GetConnection(GetConnection) = "get-connection" -> ConnectionRecord,
        RemoveConnection(RemoveConnection) = "remove-connection" -> Value,
    }
}

/// Reply of `create-invitation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitationResult {
    pub connection_id: String,
    pub invitation: Value,
    pub invitation_url: String,
    #[serde(default)]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateInvitation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_accept: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_use: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
}

impl Endpoint for CreateInvitation {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::post("/connections/create-invitation")
            .query_opt("alias", self.alias)
            .query_opt("auto_accept", self.auto_accept)
            .query_opt("multi_use", self.multi_use)
            .query_opt("public", self.public))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiveInvitation {
    /// The invitation message as produced by `create-invitation`
    pub invitation: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_accept: Option<bool>,
}

impl Endpoint for ReceiveInvitation {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::post("/connections/receive-invitation")
            .query_opt("alias", self.alias)
            .query_opt("auto_accept", self.auto_accept)
            .json(self.invitation))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptInvitation {
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_endpoint: Option<String>,
}

impl AcceptInvitation {
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            my_label: None,
            my_endpoint: None,
        }
    }
}

impl Endpoint for AcceptInvitation {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::post(format!(
            "/connections/{}/accept-invitation",
            path_segment(&self.connection_id)
        ))
        .query_opt("my_label", self.my_label)
        .query_opt("my_endpoint", self.my_endpoint))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptRequest {
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_endpoint: Option<String>,
}

impl AcceptRequest {
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            my_endpoint: None,
        }
    }
}

impl Endpoint for AcceptRequest {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::post(format!(
            "/connections/{}/accept-request",
            path_segment(&self.connection_id)
        ))
        .query_opt("my_endpoint", self.my_endpoint))
    }
}

/// Filter for `get-connections`; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetConnections {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initiator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_did: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub their_did: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub their_role: Option<String>,
}

impl Endpoint for GetConnections {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::get("/connections")
            .query_opt("alias", self.alias)
            .query_opt("initiator", self.initiator)
            .query_opt("invitation_key", self.invitation_key)
            .query_opt("my_did", self.my_did)
            .query_opt("state", self.state)
            .query_opt("their_did", self.their_did)
            .query_opt("their_role", self.their_role))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetConnection {
    pub connection_id: String,
}

impl Endpoint for GetConnection {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::get(format!("/connections/{}", path_segment(&self.connection_id))))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveConnection {
    pub connection_id: String,
}

impl Endpoint for RemoveConnection {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::delete(format!("/connections/{}", path_segment(&self.connection_id))))
    }
}
