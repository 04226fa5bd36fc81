//! Proof presentation commands (present-proof 1.0)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{Endpoint, ListResult};
use crate::agent::{ApiRequest, path_segment};
use crate::protocol::PresentationExchangeRecord;

capability! {
    pub enum ProofCommand: "present-proof" {
        GetPresentationExchanges(GetPresentationExchanges) = "get-presentation-exchanges"
            -> ListResult<PresentationExchangeRecord>,
        GetPresentationExchange(GetPresentationExchange) = "get-presentation-exchange"
            -> PresentationExchangeRecord,
        GetMatchingCredentials(GetMatchingCredentials) = "get-matching-credentials"
            -> Vec<Value>,
        SendPresentationProposal(SendPresentationProposal) = "send-presentation-proposal"
            -> PresentationExchangeRecord,
        SendPresentationRequest(SendPresentationRequest) = "send-presentation-request"
            -> PresentationExchangeRecord,
        SendRequestForProposal(SendRequestForProposal) = "send-request-for-proposal"
            -> PresentationExchangeRecord,
        SendPresentation(SendPresentation) = "send-presentation" -> PresentationExchangeRecord,
        VerifyPresentation(VerifyPresentation) = "verify-presentation"
            -> PresentationExchangeRecord,
        RemovePresentationExchange(RemovePresentationExchange) = "remove-presentation-exchange"
            -> Value,
    }
}

fn record_path(id: &str, action: &str) -> String {
    format!("/present-proof/records/{}/{}", path_segment(id), action)
}

/// Filter for `get-presentation-exchanges`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetPresentationExchanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

impl Endpoint for GetPresentationExchanges {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::get("/present-proof/records")
            .query_opt("connection_id", self.connection_id)
            .query_opt("role", self.role)
            .query_opt("state", self.state)
            .query_opt("thread_id", self.thread_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPresentationExchange {
    pub presentation_exchange_id: String,
}

impl Endpoint for GetPresentationExchange {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::get(format!(
            "/present-proof/records/{}",
            path_segment(&self.presentation_exchange_id)
        )))
    }
}

/// Wallet credentials able to satisfy a received proof request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetMatchingCredentials {
    pub presentation_exchange_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Comma-separated proof request referents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_query: Option<String>,
}

impl GetMatchingCredentials {
    pub fn new(presentation_exchange_id: impl Into<String>) -> Self {
        Self {
            presentation_exchange_id: presentation_exchange_id.into(),
            start: None,
            count: None,
            referent: None,
            extra_query: None,
        }
    }
}

impl Endpoint for GetMatchingCredentials {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::get(record_path(&self.presentation_exchange_id, "credentials"))
            .query_opt("start", self.start)
            .query_opt("count", self.count)
            .query_opt("referent", self.referent)
            .query_opt("extra_query", self.extra_query))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendPresentationProposal {
    pub connection_id: String,
    pub presentation_proposal: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_present: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<bool>,
}

impl Endpoint for SendPresentationProposal {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        ApiRequest::post("/present-proof/send-proposal").json_from(&self)
    }
}

/// Indy proof request: `{name, version, requested_attributes, requested_predicates}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendPresentationRequest {
    pub connection_id: String,
    pub proof_request: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<bool>,
}

impl Endpoint for SendPresentationRequest {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        ApiRequest::post("/present-proof/send-request").json_from(&self)
    }
}

/// Answer a received proposal with a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendRequestForProposal {
    pub presentation_exchange_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<bool>,
}

impl Endpoint for SendRequestForProposal {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        let body = match self.trace {
            Some(trace) => json!({ "trace": trace }),
            None => json!({}),
        };
        Ok(ApiRequest::post(record_path(&self.presentation_exchange_id, "send-request")).json(body))
    }
}

/// Present the requested attributes and predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendPresentation {
    pub presentation_exchange_id: String,
    #[serde(default)]
    pub requested_attributes: Map<String, Value>,
    #[serde(default)]
    pub requested_predicates: Map<String, Value>,
    #[serde(default)]
    pub self_attested_attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<bool>,
}

impl Endpoint for SendPresentation {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        let mut body = json!({
            "requested_attributes": self.requested_attributes,
            "requested_predicates": self.requested_predicates,
            "self_attested_attributes": self.self_attested_attributes,
        });
        if let Some(trace) = self.trace {
            body["trace"] = Value::Bool(trace);
        }
        Ok(ApiRequest::post(record_path(&self.presentation_exchange_id, "send-presentation"))
            .json(body))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyPresentation {
    pub presentation_exchange_id: String,
}

impl VerifyPresentation {
    pub fn new(presentation_exchange_id: impl Into<String>) -> Self {
        Self {
            presentation_exchange_id: presentation_exchange_id.into(),
        }
    }
}

impl Endpoint for VerifyPresentation {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::post(record_path(
            &self.presentation_exchange_id,
            "verify-presentation",
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovePresentationExchange {
    pub presentation_exchange_id: String,
}

impl Endpoint for RemovePresentationExchange {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::delete(format!(
            "/present-proof/records/{}",
            path_segment(&self.presentation_exchange_id)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Method;
    use crate::controller::{Capability, Controller};

    fn request(kind: &str, body: Value) -> ApiRequest {
        Controller::<ProofCommand>::decode(kind, body)
            .unwrap()
            .into_request()
            .unwrap()
    }

    #[test]
    fn every_tag_maps_to_one_request() {
        let id = json!({"presentation_exchange_id": "p1"});
        let cases = [
            ("get-presentation-exchanges", json!({}), Method::Get, "/present-proof/records"),
            ("get-presentation-exchange", id.clone(), Method::Get, "/present-proof/records/p1"),
            (
                "get-matching-credentials",
                id.clone(),
                Method::Get,
                "/present-proof/records/p1/credentials",
            ),
            (
                "send-presentation-proposal",
                json!({"connection_id": "c1", "presentation_proposal": {"attributes": []}}),
                Method::Post,
                "/present-proof/send-proposal",
            ),
            (
                "send-presentation-request",
                json!({"connection_id": "c1", "proof_request": {"name": "age"}}),
                Method::Post,
                "/present-proof/send-request",
            ),
            (
                "send-request-for-proposal",
                id.clone(),
                Method::Post,
                "/present-proof/records/p1/send-request",
            ),
            (
                "send-presentation",
                id.clone(),
                Method::Post,
                "/present-proof/records/p1/send-presentation",
            ),
            (
                "verify-presentation",
                id.clone(),
                Method::Post,
                "/present-proof/records/p1/verify-presentation",
            ),
            (
                "remove-presentation-exchange",
                id,
                Method::Delete,
                "/present-proof/records/p1",
            ),
        ];

        assert_eq!(cases.len(), ProofCommand::TAGS.len());
        for (kind, body, method, path) in cases {
            let req = request(kind, body);
            assert_eq!((req.method, req.path.as_str()), (method, path), "{kind}");
        }
    }

    #[test]
    fn presentation_body_has_all_sections() {
        let req = request(
            "send-presentation",
            json!({
                "presentation_exchange_id": "p1",
                "requested_attributes": {"attr1": {"cred_id": "w1", "revealed": true}}
            }),
        );
        assert_eq!(
            req.body,
            Some(json!({
                "requested_attributes": {"attr1": {"cred_id": "w1", "revealed": true}},
                "requested_predicates": {},
                "self_attested_attributes": {}
            }))
        );
    }

    #[test]
    fn matching_credentials_paging() {
        let req = request(
            "get-matching-credentials",
            json!({"presentation_exchange_id": "p1", "count": 10}),
        );
        assert_eq!(req.query_value("count"), Some("10"));
        assert_eq!(req.query_value("start"), None);
    }
}
