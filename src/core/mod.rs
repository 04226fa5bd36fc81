pub mod bus;
pub mod command;
pub mod config;
pub mod error;
pub mod message;
pub mod normalize;
pub mod observability;
pub mod plugin;
pub mod reply;

pub use bus::{Bus, BusBuilder, BusHandle, DispatchReport};
pub use command::Command;
pub use config::{AgentConfig, ConfigStore, Configurable, ReconnectPolicy, RelayConfig};
pub use error::{AgentError, BusError, CommandError, DispatchError, UnknownStateError};
pub use message::Message;
pub use normalize::{envelope_for, normalize, normalized};
pub use plugin::{Outcome, Plugin, PluginMetadata};
pub use reply::Reply;
