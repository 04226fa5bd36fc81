//! Lifecycle records and the state classifier.
//!
//! Each protocol family declares a closed set of states, one per literal
//! `state` tag the agent emits. Classification is a stateless lookup of the
//! record's tag: it names the current state and never judges transitions.

use std::fmt;

use acaflow_protocol::{Topic, message_types};
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};

use crate::core::error::UnknownStateError;

/// Declares a family's state enum with its wire tags.
///
/// `"tag" | "alias"` accepts older tags for the same state. States marked
/// `@terminal` end the exchange for dispatch purposes.
macro_rules! lifecycle_states {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $family:path {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $tag:literal $(| $alias:literal)* $(@$terminal:ident)?
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $tag $(, alias = $alias)*)]
                $variant,
            )+
        }

        impl $crate::protocol::LifecycleState for $name {
            const FAMILY: $crate::protocol::Family = $family;
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn tag(&self) -> &'static str {
                match self {
                    $($name::$variant => $tag,)+
                }
            }

            fn aliases(&self) -> &'static [&'static str] {
                match self {
                    $($name::$variant => &[$($alias),*],)+
                }
            }

            fn is_terminal(&self) -> bool {
                match self {
                    $($name::$variant => lifecycle_states!(@terminal $($terminal)?),)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::protocol::LifecycleState::tag(self))
            }
        }
    };
    (@terminal) => { false };
    (@terminal terminal) => { true };
}

pub mod basic_message;
pub mod connection;
pub mod issue_credential;
pub mod present_proof;

pub use basic_message::{BasicMessageRecord, BasicMessageState};
pub use connection::{ConnectionRecord, ConnectionState};
pub use issue_credential::{CredentialExchangeRecord, CredentialExchangeState};
pub use present_proof::{PresentationExchangeRecord, PresentationExchangeState};

/// Protocol family of a lifecycle record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Connection,
    IssueCredential,
    PresentProof,
    BasicMessage,
}

impl Family {
    pub const ALL: [Family; 4] = [
        Family::Connection,
        Family::IssueCredential,
        Family::PresentProof,
        Family::BasicMessage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Connection => "connection",
            Family::IssueCredential => "issue-credential",
            Family::PresentProof => "present-proof",
            Family::BasicMessage => "basic-message",
        }
    }

    /// Bus message type carrying this family's records
    pub fn message_type(&self) -> &'static str {
        match self {
            Family::Connection => message_types::CONNECTION_EVENT,
            Family::IssueCredential => message_types::ISSUE_CREDENTIAL_EVENT,
            Family::PresentProof => message_types::PRESENT_PROOF_EVENT,
            Family::BasicMessage => message_types::BASIC_MESSAGE_EVENT,
        }
    }

    /// Webhook topic the agent publishes this family's records on
    pub fn topic(&self) -> Topic {
        match self {
            Family::Connection => Topic::Connections,
            Family::IssueCredential => Topic::IssueCredential,
            Family::PresentProof => Topic::PresentProof,
            Family::BasicMessage => Topic::BasicMessages,
        }
    }

    pub fn from_message_type(kind: &str) -> Option<Family> {
        Self::ALL.into_iter().find(|f| f.message_type() == kind)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Topic> for Family {
    fn from(topic: Topic) -> Self {
        match topic {
            Topic::Connections => Family::Connection,
            Topic::IssueCredential => Family::IssueCredential,
            Topic::PresentProof => Family::PresentProof,
            Topic::BasicMessages => Family::BasicMessage,
        }
    }
}

/// Closed set of states of one protocol family
pub trait LifecycleState: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    const FAMILY: Family;

    /// Every declared state, in protocol order
    const ALL: &'static [Self];

    /// Literal tag carried in `record.state`
    fn tag(&self) -> &'static str;

    /// Older tags the agent may still emit for this state
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn is_terminal(&self) -> bool;
}

/// Snapshot of one exchange as delivered by the agent
pub trait LifecycleRecord: Serialize + DeserializeOwned + Send + Sync + 'static {
    type State: LifecycleState;

    /// Raw `state` field
    fn state_tag(&self) -> &str;

    /// Family-specific correlation id (`connection_id`, `credential_exchange_id`, ...)
    fn exchange_id(&self) -> Option<&str>;

    fn thread_id(&self) -> Option<&str>;
}

/// Whether `record` is currently in `state`
pub fn matches<R: LifecycleRecord>(state: R::State, record: &R) -> bool {
    let tag = record.state_tag();
    tag == state.tag() || state.aliases().contains(&tag)
}

/// Name the single declared state `record` is in
pub fn classify<R: LifecycleRecord>(record: &R) -> Result<R::State, UnknownStateError> {
    <R::State as LifecycleState>::ALL
        .iter()
        .copied()
        .find(|state| matches(*state, record))
        .ok_or_else(|| UnknownStateError {
            family: <R::State as LifecycleState>::FAMILY,
            state: record.state_tag().to_string(),
        })
}

/// Agent timestamps look like `2024-03-01 10:15:30.123456Z`
pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            DateTime::parse_from_rfc3339(&raw.replacen(' ', "T", 1))
                .map(|t| t.with_timezone(&Utc))
        })
        .ok()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_maps_topics_and_types() {
        for family in Family::ALL {
            assert_eq!(Family::from(family.topic()), family);
            assert_eq!(Family::from_message_type(family.message_type()), Some(family));
            assert_eq!(family.topic().message_type(), family.message_type());
        }
        assert_eq!(Family::from_message_type("aca-unknown"), None);
    }

    #[test]
    fn timestamps_accept_agent_format() {
        let ts = parse_timestamp(Some("2024-03-01 10:15:30.123456Z")).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T10:15:30.123456+00:00");
        assert!(parse_timestamp(Some("2024-03-01T10:15:30Z")).is_some());
        assert!(parse_timestamp(Some("yesterday")).is_none());
        assert!(parse_timestamp(None).is_none());
    }
}
