use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::Endpoint;
use crate::agent::{ApiRequest, path_segment};

capability! {
    pub enum BasicMessageCommand: "basic-message" {
        SendBasicMessage(SendBasicMessage) = "send-basic-message" -> Value,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendBasicMessage {
    pub connection_id: String,
    pub content: String,
}

impl SendBasicMessage {
    pub fn new(connection_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            content: content.into(),
        }
    }
}

impl Endpoint for SendBasicMessage {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
        Ok(ApiRequest::post(format!(
            "/connections/{}/send-message",
            path_segment(&self.connection_id)
        ))
        .json(json!({ "content": self.content })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Method;
    use crate::controller::{Capability, Controller};

    #[test]
    fn send_message_request() {
        let req = Controller::<BasicMessageCommand>::decode(
            "send-basic-message",
            json!({"connection_id": "c1", "content": "hello"}),
        )
        .unwrap()
        .into_request()
        .unwrap();

        assert_eq!(req.method, Method::Post);
        assert_eq!(req.path, "/connections/c1/send-message");
        assert_eq!(req.body, Some(json!({"content": "hello"})));
    }
}
