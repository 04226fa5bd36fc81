//! Schema and credential definition commands

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Endpoint;
use crate::agent::{ApiRequest, path_segment};

capability! {
    pub enum LedgerCommand: "ledger" {
        CreateSchema(CreateSchema) = "create-schema" -> SchemaSendResult,
        GetSchema(GetSchema) = "get-schema" -> SchemaGetResult,
        GetCreatedSchemas(GetCreatedSchemas) = "get-created-schemas" -> CreatedSchemas,
        CreateCredentialDefinition(CreateCredentialDefinition) = "create-credential-definition"
            -> CredentialDefinitionSendResult,
        GetCredentialDefinition(GetCredentialDefinition) = "get-credential-definition"
            -> CredentialDefinitionGetResult,
        GetCreatedCredentialDefinitions(GetCreatedCredentialDefinitions)
            = "get-created-credential-definitions" -> CreatedCredentialDefinitions,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSendResult {
    pub schema_id: String,
    #[serde(default)]
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaGetResult {
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedSchemas {
    pub schema_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialDefinitionSendResult {
    pub credential_definition_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialDefinitionGetResult {
    pub credential_definition: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedCredentialDefinitions {
    pub credential_definition_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSchema {
    pub schema_name: String,
    pub schema_version: String,
    pub attributes: Vec<String>,
}

impl Endpoint for CreateSchema {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        ApiRequest::post("/schemas").json_from(&self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetSchema {
    pub schema_id: String,
}

impl Endpoint for GetSchema {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::get(format!("/schemas/{}", path_segment(&self.schema_id))))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetCreatedSchemas {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_issuer_did: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
}

impl Endpoint for GetCreatedSchemas {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::get("/schemas/created")
            .query_opt("schema_id", self.schema_id)
            .query_opt("schema_issuer_did", self.schema_issuer_did)
            .query_opt("schema_name", self.schema_name)
            .query_opt("schema_version", self.schema_version))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCredentialDefinition {
    pub schema_id: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub support_revocation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_registry_size: Option<u32>,
}

fn default_tag() -> String {
    "default".to_string()
}

impl Endpoint for CreateCredentialDefinition {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        ApiRequest::post("/credential-definitions").json_from(&self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetCredentialDefinition {
    pub credential_definition_id: String,
}

impl Endpoint for GetCredentialDefinition {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::get(format!(
            "/credential-definitions/{}",
            path_segment(&self.credential_definition_id)
        )))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetCreatedCredentialDefinitions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_did: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_issuer_did: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
}

impl Endpoint for GetCreatedCredentialDefinitions {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::get("/credential-definitions/created")
            .query_opt("cred_def_id", self.cred_def_id)
            .query_opt("issuer_did", self.issuer_did)
            .query_opt("schema_id", self.schema_id)
            .query_opt("schema_issuer_did", self.schema_issuer_did)
            .query_opt("schema_name", self.schema_name)
            .query_opt("schema_version", self.schema_version))
    }
}
