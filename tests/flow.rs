//! Webhook frames travel relay -> dispatcher -> controller -> agent.

use std::sync::Arc;

use acaflow::agent::{ApiResponse, MockAgent};
use acaflow::controller::basic_message::SendBasicMessage;
use acaflow::controller::connection::AcceptRequest;
use acaflow::core::observability::InMemoryMetrics;
use acaflow::driver::MockDriver;
use acaflow::prelude::*;
use acaflow::relay::RelayState;
use acaflow::wire::Handshake;
use anyhow::Result;
use serde_json::json;

struct Greeter;

#[async_trait]
impl ConnectionHandler for Greeter {
    async fn on_init(&self, _: &EventContext, _: &ConnectionRecord) -> Result<()> {
        Ok(())
    }

    async fn on_invitation(&self, _: &EventContext, _: &ConnectionRecord) -> Result<()> {
        Ok(())
    }

    async fn on_request(&self, ctx: &EventContext, record: &ConnectionRecord) -> Result<()> {
        let accepted = ctx.execute(&AcceptRequest::new(&record.connection_id)).await?;
        assert_eq!(accepted.state, "response");
        Ok(())
    }

    async fn on_response(&self, _: &EventContext, _: &ConnectionRecord) -> Result<()> {
        Ok(())
    }

    async fn on_active(&self, _: &EventContext, _: &ConnectionRecord) -> Result<()> {
        Ok(())
    }

    async fn on_inactive(&self, _: &EventContext, _: &ConnectionRecord) -> Result<()> {
        Ok(())
    }

    async fn on_error(&self, _: &EventContext, _: &ConnectionRecord) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl BasicMessageHandler for Greeter {
    async fn on_received(&self, ctx: &EventContext, record: &BasicMessageRecord) -> Result<()> {
        let reply = format!("pong: {}", record.content);
        ctx.execute(&SendBasicMessage::new(&record.connection_id, reply))
            .await?;
        Ok(())
    }
}

#[tokio::test]
async fn webhooks_drive_commands_to_the_agent() {
    let agent = Arc::new(MockAgent::new());
    agent.route(Method::Post, "/connections/c1/accept-request", |_| {
        Ok(ApiResponse::new(
            200,
            json!({"connection_id": "c1", "state": "response"}),
        ))
    });

    let metrics = Arc::new(InMemoryMetrics::new());
    let bus = AcaFlow::new()
        .agent(agent.clone())
        .metrics(metrics.clone())
        .plugin(EventDispatcher::connections(Greeter))
        .unwrap()
        .plugin(EventDispatcher::basic_messages(Greeter))
        .unwrap()
        .controllers()
        .build()
        .await
        .unwrap();

    let driver = MockDriver::session([
        json!({"topic": "connections", "body": {"connection_id": "c1", "state": "request"}})
            .to_string(),
        json!({"topic": "basicmessages", "body": {"connection_id": "c1", "content": "ping"}})
            .to_string(),
        json!({"topic": "connections", "body": {"connection_id": "c2", "state": "start"}})
            .to_string(),
        json!({"topic": "revocation_registry", "body": {}}).to_string(),
    ]);
    let sent = driver.sent();

    let relay = WebhookRelay::with_handshake(bus, Handshake::new("relay-secret", false), 8);
    let state = relay.state();
    relay.run(driver).await.unwrap();

    assert_eq!(
        *sent.lock(),
        vec![r#"{"auth":"relay-secret","fastForward":false}"#.to_string()]
    );
    assert_eq!(*state.borrow(), RelayState::Disconnected);

    let mut calls: Vec<_> = agent
        .requests()
        .into_iter()
        .map(|r| (r.to_string(), r.body))
        .collect();
    calls.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        calls,
        vec![
            ("POST /connections/c1/accept-request".to_string(), None),
            (
                "POST /connections/c1/send-message".to_string(),
                Some(json!({"content": "pong: ping"}))
            ),
        ]
    );

    assert_eq!(
        metrics.counter("relay_frames_total", &[("topic", "connections")]),
        2
    );
    assert_eq!(
        metrics.counter("relay_frames_dropped_total", &[("reason", "unknown_topic")]),
        1
    );
    assert_eq!(
        metrics.counter(
            "bus_dispatch_total",
            &[("plugin", "connection-events"), ("outcome", "error")]
        ),
        1
    );
}
