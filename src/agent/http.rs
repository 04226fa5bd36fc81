//! reqwest-backed agent client

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{AgentApi, ApiRequest, ApiResponse, Method};
use crate::core::{config::AgentConfig, error::AgentError};

const API_KEY_HEADER: &str = "X-API-Key";

/// Talks to the agent's admin API over HTTP
pub struct HttpAgent {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpAgent {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("AcaFlow/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.admin_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build(&self, request: &ApiRequest) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
    }
}

/// Agent bodies are usually JSON; anything else is kept as text
fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[async_trait]
impl AgentApi for HttpAgent {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, AgentError> {
        debug!("Agent call: {}", request);

        let response = self
            .build(&request)
            .send()
            .await
            .map_err(|e| AgentError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::transport(e.to_string()))?;
        let body = parse_body(text);

        if (200..=299).contains(&status) {
            Ok(ApiResponse::new(status, body))
        } else {
            debug!("Agent call {} failed with status {}", request, status);
            Err(AgentError::remote(status, body))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn body_falls_back_to_text() {
        assert_eq!(parse_body(r#"{"a":1}"#.into()), json!({"a": 1}));
        assert_eq!(parse_body("Bad Request".into()), json!("Bad Request"));
        assert_eq!(parse_body("  ".into()), Value::Null);
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let agent = HttpAgent::new(&AgentConfig {
            admin_url: "http://agent:8031/".into(),
            api_key: Some("secret".into()),
        })
        .unwrap();
        assert_eq!(agent.base_url(), "http://agent:8031");

        let request = agent
            .build(&ApiRequest::get("/connections").query("state", "active"))
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://agent:8031/connections?state=active"
        );
        assert_eq!(request.headers()[API_KEY_HEADER], "secret");
    }

    #[tokio::test]
    async fn unreachable_agent_is_a_transport_error() {
        let agent = HttpAgent::new(&AgentConfig {
            admin_url: "http://127.0.0.1:1".into(),
            api_key: None,
        })
        .unwrap();
        let err = agent.call(ApiRequest::get("/status")).await.unwrap_err();
        assert!(matches!(err, AgentError::Transport(_)));
    }
}
