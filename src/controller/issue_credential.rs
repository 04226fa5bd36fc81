//! Credential issuance commands (issue-credential 1.0)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{Endpoint, ListResult};
use crate::agent::{ApiRequest, path_segment};
use crate::protocol::CredentialExchangeRecord;

capability! {
    pub enum CredentialCommand: "issue-credential" {
        GetCredentialExchanges(GetCredentialExchanges) = "get-credential-exchanges"
            -> ListResult<CredentialExchangeRecord>,
        GetCredentialExchange(GetCredentialExchange) = "get-credential-exchange"
            -> CredentialExchangeRecord,
        SendCredential(SendCredential) = "send-credential" -> CredentialExchangeRecord,
        SendCredentialProposal(SendCredentialProposal) = "send-credential-proposal"
            -> CredentialExchangeRecord,
        SendCredentialOffer(SendCredentialOffer) = "send-credential-offer"
            -> CredentialExchangeRecord,
        SendOfferForRecord(SendOfferForRecord) = "send-offer-for-record"
            -> CredentialExchangeRecord,
        SendCredentialRequest(SendCredentialRequest) = "send-credential-request"
            -> CredentialExchangeRecord,
        IssueCredential(IssueCredential) = "issue-credential" -> CredentialExchangeRecord,
        StoreCredential(StoreCredential) = "store-credential" -> CredentialExchangeRecord,
        CredentialProblemReport(CredentialProblemReport) = "credential-problem-report" -> Value,
        RemoveCredentialExchange(RemoveCredentialExchange) = "remove-credential-exchange"
            -> Value,
    }
}

fn record_path(id: &str, action: &str) -> String {
    format!("/issue-credential/records/{}/{}", path_segment(id), action)
}

/// Filter for `get-credential-exchanges`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetCredentialExchanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

impl Endpoint for GetCredentialExchanges {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::get("/issue-credential/records")
            .query_opt("connection_id", self.connection_id)
            .query_opt("role", self.role)
            .query_opt("state", self.state)
            .query_opt("thread_id", self.thread_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetCredentialExchange {
    pub credential_exchange_id: String,
}

impl Endpoint for GetCredentialExchange {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::get(format!(
            "/issue-credential/records/{}",
            path_segment(&self.credential_exchange_id)
        )))
    }
}

/// Attributes offered or issued, as `{"@type": ..., "attributes": [{name, value}]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialPreview {
    #[serde(rename = "@type", default = "CredentialPreview::default_type")]
    pub kind: String,
    pub attributes: Vec<CredentialAttribute>,
}

impl CredentialPreview {
    const TYPE: &'static str = "issue-credential/1.0/credential-preview";

    fn default_type() -> String {
        Self::TYPE.to_string()
    }

    pub fn new<K: Into<String>, V: Into<String>>(
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            kind: Self::default_type(),
            attributes: attributes
                .into_iter()
                .map(|(name, value)| CredentialAttribute {
                    name: name.into(),
                    value: value.into(),
                    mime_type: None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialAttribute {
    pub name: String,
    pub value: String,
    #[serde(rename = "mime-type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Body shared by `send-credential` and `send-credential-proposal`.
///
/// Fields the agent accepts but this type does not name are forwarded as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialProposal {
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_proposal: Option<CredentialPreview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_remove: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Issue a credential in one step, skipping proposal and offer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SendCredential(pub CredentialProposal);

impl Endpoint for SendCredential {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        ApiRequest::post("/issue-credential/send").json_from(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SendCredentialProposal(pub CredentialProposal);

impl Endpoint for SendCredentialProposal {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        ApiRequest::post("/issue-credential/send-proposal").json_from(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendCredentialOffer {
    pub connection_id: String,
    pub cred_def_id: String,
    pub credential_preview: CredentialPreview,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_issue: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_remove: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<bool>,
}

impl Endpoint for SendCredentialOffer {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        ApiRequest::post("/issue-credential/send-offer").json_from(&self)
    }
}

/// Answer a received proposal with an offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendOfferForRecord {
    pub credential_exchange_id: String,
}

impl SendOfferForRecord {
    pub fn new(credential_exchange_id: impl Into<String>) -> Self {
        Self {
            credential_exchange_id: credential_exchange_id.into(),
        }
    }
}

impl Endpoint for SendOfferForRecord {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::post(record_path(&self.credential_exchange_id, "send-offer")))
    }
}

/// Answer a received offer with a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendCredentialRequest {
    pub credential_exchange_id: String,
}

impl SendCredentialRequest {
    pub fn new(credential_exchange_id: impl Into<String>) -> Self {
        Self {
            credential_exchange_id: credential_exchange_id.into(),
        }
    }
}

impl Endpoint for SendCredentialRequest {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::post(record_path(&self.credential_exchange_id, "send-request")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueCredential {
    pub credential_exchange_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl IssueCredential {
    pub fn new(credential_exchange_id: impl Into<String>) -> Self {
        Self {
            credential_exchange_id: credential_exchange_id.into(),
            comment: None,
        }
    }
}

impl Endpoint for IssueCredential {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        let body = match self.comment {
            Some(comment) => json!({ "comment": comment }),
            None => json!({}),
        };
        Ok(ApiRequest::post(record_path(&self.credential_exchange_id, "issue")).json(body))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreCredential {
    pub credential_exchange_id: String,
    /// Wallet id to store the credential under; the agent picks one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
}

impl StoreCredential {
    pub fn new(credential_exchange_id: impl Into<String>) -> Self {
        Self {
            credential_exchange_id: credential_exchange_id.into(),
            credential_id: None,
        }
    }
}

impl Endpoint for StoreCredential {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        let body = match self.credential_id {
            Some(id) => json!({ "credential_id": id }),
            None => json!({}),
        };
        Ok(ApiRequest::post(record_path(&self.credential_exchange_id, "store")).json(body))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialProblemReport {
    pub credential_exchange_id: String,
    pub description: String,
}

impl Endpoint for CredentialProblemReport {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::post(record_path(&self.credential_exchange_id, "problem-report"))
            .json(json!({ "description": self.description })))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveCredentialExchange {
    pub credential_exchange_id: String,
}

impl Endpoint for RemoveCredentialExchange {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::delete(format!(
            "/issue-credential/records/{}",
            path_segment(&self.credential_exchange_id)
        )))
    }
}
