use serde::{Serialize, de::DeserializeOwned};

/// A typed command: its body serializes to the command message body, and a
/// success envelope decodes into `Output`.
pub trait Command: Serialize + Send + Sync {
    /// Capability tag carried in the command's `type` field
    const TYPE: &'static str;

    /// Success body shape
    type Output: DeserializeOwned;
}
