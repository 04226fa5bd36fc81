//! Response envelope returned for every command

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

/// Uniform outcome of an outbound call.
///
/// A status in `200..=299` carries the capability's success body; any other
/// status carries `{"error": <diagnostic>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: Value,
}

impl ResponseEnvelope {
    /// Generic internal failure status
    pub const INTERNAL_ERROR: u16 = 500;

    pub fn new(status_code: u16, body: Value) -> Self {
        Self { status_code, body }
    }

    /// Success envelope
    pub fn success(status_code: u16, body: Value) -> Self {
        Self::new(status_code, body)
    }

    /// Error envelope wrapping the diagnostic as `{"error": diagnostic}`
    pub fn error(status_code: u16, diagnostic: impl Into<Value>) -> Self {
        Self::new(status_code, json!({ "error": diagnostic.into() }))
    }

    /// Error envelope with status 500
    pub fn internal(diagnostic: impl Into<Value>) -> Self {
        Self::error(Self::INTERNAL_ERROR, diagnostic)
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status_code)
    }

    /// The diagnostic of an error envelope
    pub fn error_body(&self) -> Option<&Value> {
        if self.is_success() {
            return None;
        }
        self.body.get("error")
    }

    /// Decode the success body into a typed result
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }
}
