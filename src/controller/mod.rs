//! Controller plugins: turn command messages into agent REST calls.
//!
//! Each capability group is a closed enum of commands decoded from
//! `{type, body}`. A [`Controller`] claims only the tags of its group and
//! performs exactly one call per claimed command.

use std::marker::PhantomData;
use std::sync::Arc;

use acaflow_protocol::ResponseEnvelope;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::agent::{AgentApi, ApiRequest};
use crate::core::{
    error::DispatchError,
    message::Message,
    normalize::normalize,
    plugin::{Outcome, Plugin, PluginMetadata},
    reply::Reply,
};

/// A single command's REST mapping. Fails only when a typed body cannot be
/// serialized.
pub trait Endpoint {
    fn into_request(self) -> Result<ApiRequest, serde_json::Error>;
}

/// Declares a capability group: the command enum, its tags and the typed
/// [`Command`](crate::core::command::Command) impl of every command struct.
macro_rules! capability {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $group:literal {
            $(
                $variant:ident($cmd:ty) = $tag:literal -> $output:ty
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, serde::Deserialize)]
        #[serde(tag = "type", content = "body")]
        pub enum $name {
            $(
                #[serde(rename = $tag)]
                $variant($cmd),
            )+
        }

        impl $name {
            pub fn tag(&self) -> &'static str {
                match self {
                    $($name::$variant(_) => $tag,)+
                }
            }
        }

        impl $crate::controller::Capability for $name {
            const GROUP: &'static str = $group;
            const TAGS: &'static [&'static str] = &[$($tag),+];

            fn into_request(self) -> Result<$crate::agent::ApiRequest, serde_json::Error> {
                match self {
                    $($name::$variant(cmd) => $crate::controller::Endpoint::into_request(cmd),)+
                }
            }
        }

        $(
            impl $crate::core::command::Command for $cmd {
                const TYPE: &'static str = $tag;
                type Output = $output;
            }

            impl From<$cmd> for $name {
                fn from(cmd: $cmd) -> Self {
                    $name::$variant(cmd)
                }
            }
        )+
    };
}

pub mod basic_message;
pub mod connection;
pub mod issue_credential;
pub mod ledger;
pub mod present_proof;

pub use basic_message::BasicMessageCommand;
pub use connection::ConnectionCommand;
pub use issue_credential::CredentialCommand;
pub use ledger::LedgerCommand;
pub use present_proof::ProofCommand;

/// A group of commands served by one controller
pub trait Capability: DeserializeOwned + Send + Sync + 'static {
    /// Group name, used for the plugin name
    const GROUP: &'static str;

    /// Every command tag of the group
    const TAGS: &'static [&'static str];

    /// The one REST call this command maps to
    fn into_request(self) -> Result<ApiRequest, serde_json::Error>;

    fn owns(kind: &str) -> bool {
        Self::TAGS.contains(&kind)
    }
}

/// `{"results": [...]}` list replies
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ListResult<T> {
    pub results: Vec<T>,
}

/// Plugin serving one capability group against the agent
pub struct Controller<C> {
    name: String,
    api: Arc<dyn AgentApi>,
    _group: PhantomData<fn() -> C>,
}

impl<C: Capability> Controller<C> {
    pub fn new(api: Arc<dyn AgentApi>) -> Self {
        Self {
            name: format!("{}-controller", C::GROUP),
            api,
            _group: PhantomData,
        }
    }

    /// Decode a command of this group. The body may be absent for filter-only commands.
    pub fn decode(kind: &str, body: serde_json::Value) -> Result<C, DispatchError> {
        serde_json::from_value(json!({ "type": kind, "body": body }))
            .map_err(|e| DispatchError::payload(kind, e))
    }

    async fn dispatch(&self, message: &Message, reply: &Reply) -> Result<Outcome, DispatchError> {
        let Some(command) = message.as_command() else {
            return Ok(Outcome::Ignored);
        };
        if !C::owns(&command.kind) {
            return Ok(Outcome::Ignored);
        }

        let request = Self::decode(&command.kind, command.normalized_body())?
            .into_request()
            .map_err(|e| DispatchError::payload(&command.kind, e))?;
        debug!("{}: '{}' -> {}", self.name, command.kind, request);

        let response = self.api.call(request).await?;
        reply.send(ResponseEnvelope::success(response.status, response.body));
        Ok(Outcome::Success)
    }
}

#[async_trait]
impl<C: Capability> Plugin for Controller<C> {
    fn meta(&self) -> PluginMetadata {
        PluginMetadata::new(&self.name)
            .description(format!("Serves {} commands", C::TAGS.len()))
    }

    async fn handle_event(&self, message: &Message, reply: Reply) -> Outcome {
        normalize(&reply, self.dispatch(message, &reply)).await
    }
}

/// Every controller group bound to one agent, in a stable order
pub fn all(api: Arc<dyn AgentApi>) -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(Controller::<ConnectionCommand>::new(api.clone())),
        Arc::new(Controller::<CredentialCommand>::new(api.clone())),
        Arc::new(Controller::<ProofCommand>::new(api.clone())),
        Arc::new(Controller::<BasicMessageCommand>::new(api.clone())),
        Arc::new(Controller::<LedgerCommand>::new(api)),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use acaflow_protocol::message_types;
    use serde_json::{Value, json};

    use super::*;
    use crate::agent::MockAgent;
    use crate::core::error::AgentError;

    fn controller(agent: &Arc<MockAgent>) -> Controller<ConnectionCommand> {
        Controller::new(agent.clone())
    }

    async fn run(
        plugin: &impl Plugin,
        message: Message,
    ) -> (Outcome, Vec<ResponseEnvelope>) {
        let sent = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = sent.clone();
        let reply = Reply::new(move |env| sink.lock().push(env));
        let outcome = plugin.handle_event(&message, reply).await;
        let envelopes = sent.lock().clone();
        (outcome, envelopes)
    }

    #[tokio::test]
    async fn foreign_tag_is_ignored_without_calls() {
        let agent = Arc::new(MockAgent::new());
        let plugin = Controller::<CredentialCommand>::new(agent.clone());

        let message = Message::command("create-invitation", json!({"alias": "x"}));
        let (outcome, sent) = run(&plugin, message).await;

        assert_eq!(outcome, Outcome::Ignored);
        assert!(sent.is_empty());
        assert_eq!(agent.call_count(), 0);
    }

    #[tokio::test]
    async fn events_are_ignored() {
        let agent = Arc::new(MockAgent::new());
        let message = Message::event(message_types::CONNECTION_EVENT, json!({"state": "active"}));

        assert_eq!(run(&controller(&agent), message).await.0, Outcome::Ignored);
        assert_eq!(agent.call_count(), 0);
    }

    #[tokio::test]
    async fn one_call_and_status_passes_through() {
        let agent = Arc::new(MockAgent::new());
        agent.respond(201, json!({"connection_id": "c1", "invitation_url": "http://x"}));

        let message = Message::command("create-invitation", json!({"alias": "x"}));
        let (outcome, sent) = run(&controller(&agent), message).await;

        assert_eq!(outcome, Outcome::Success);
        assert_eq!(
            sent,
            vec![ResponseEnvelope::new(
                201,
                json!({"connection_id": "c1", "invitation_url": "http://x"})
            )]
        );
        assert_eq!(agent.call_count(), 1);
        assert_eq!(agent.last_request().unwrap().query_value("alias"), Some("x"));
    }

    #[tokio::test]
    async fn remote_failure_keeps_remote_status() {
        let agent = Arc::new(MockAgent::new());
        agent.fail(AgentError::remote(400, json!("Bad Request")));

        let message = Message::command("get-connection", json!({"connection_id": "c1"}));
        let (outcome, sent) = run(&controller(&agent), message).await;

        assert_eq!(outcome, Outcome::Error);
        assert_eq!(
            sent,
            vec![ResponseEnvelope::new(400, json!({"error": "Bad Request"}))]
        );
        assert_eq!(agent.call_count(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_500() {
        let agent = Arc::new(MockAgent::new());
        agent.fail(AgentError::transport("connection refused"));

        let message = Message::command("get-connections", Value::Null);
        let (outcome, sent) = run(&controller(&agent), message).await;

        assert_eq!(outcome, Outcome::Error);
        assert_eq!(
            sent,
            vec![ResponseEnvelope::internal("connection refused")]
        );
    }

    #[tokio::test]
    async fn invalid_body_is_500_without_calls() {
        let agent = Arc::new(MockAgent::new());

        let message = Message::command("get-connection", json!({"id": "c1"}));
        let (outcome, sent) = run(&controller(&agent), message).await;

        assert_eq!(outcome, Outcome::Error);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].status_code, 500);
        assert_eq!(agent.call_count(), 0);
    }

    #[test]
    fn tags_are_unique_across_groups() {
        let mut seen = HashSet::new();
        let groups = [
            ConnectionCommand::TAGS,
            CredentialCommand::TAGS,
            ProofCommand::TAGS,
            BasicMessageCommand::TAGS,
            LedgerCommand::TAGS,
        ];
        for tag in groups.iter().flat_map(|tags| tags.iter()) {
            assert!(seen.insert(*tag), "duplicate tag {tag}");
        }
        assert_eq!(seen.len(), 34);
    }

    #[test]
    fn all_controllers_have_distinct_names() {
        let agent: Arc<dyn AgentApi> = Arc::new(MockAgent::new());
        let names: HashSet<_> = all(agent).iter().map(|p| p.meta().name).collect();
        assert_eq!(names.len(), 5);
        assert!(names.contains("connections-controller"));
    }

    /// Group whose only command carries a body JSON cannot represent
    #[derive(serde::Deserialize)]
    #[serde(tag = "type", content = "body")]
    #[allow(dead_code)]
    enum Opaque {
        #[serde(rename = "send-opaque")]
        Raw(Value),
    }

    impl Capability for Opaque {
        const GROUP: &'static str = "opaque";
        const TAGS: &'static [&'static str] = &["send-opaque"];

        fn into_request(self) -> Result<ApiRequest, serde_json::Error> {
            let mut body = std::collections::BTreeMap::new();
            body.insert(vec![0u8], "bytes are not a map key");
            ApiRequest::post("/opaque").json_from(&body)
        }
    }

    #[tokio::test]
    async fn unserializable_body_never_reaches_the_agent() {
        let agent = Arc::new(MockAgent::new());
        let plugin = Controller::<Opaque>::new(agent.clone());

        let message = Message::command("send-opaque", json!({}));
        let (outcome, sent) = run(&plugin, message).await;

        assert_eq!(outcome, Outcome::Error);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].status_code, 500);
        assert_eq!(agent.call_count(), 0);
    }
}
