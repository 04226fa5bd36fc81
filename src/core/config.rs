//! Configuration system.
//!
//! TOML-based configuration with typed sections, plus environment overrides
//! for the handful of values deployments usually inject.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

// ============================================================================
// Configurable Trait
// ============================================================================

/// Trait for types that can be loaded from configuration
///
/// # Example
///
/// ```ignore
/// use serde::Deserialize;
/// use acaflow::core::config::Configurable;
///
/// #[derive(Debug, Deserialize, Default)]
/// pub struct AutoAcceptConfig {
///     pub connections: bool,
/// }
///
/// impl Configurable for AutoAcceptConfig {
///     const PREFIX: &'static str = "auto-accept";
/// }
/// ```
pub trait Configurable: DeserializeOwned + Default {
    /// Configuration section prefix (TOML section name)
    const PREFIX: &'static str;
}

// ============================================================================
// Configuration Store
// ============================================================================

/// Environment variables understood by [`ConfigStore::apply_env`]
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("ACAFLOW_ADMIN_URL", "agent.admin_url"),
    ("ACAFLOW_ADMIN_API_KEY", "agent.api_key"),
    ("ACAFLOW_RELAY_URL", "relay.url"),
    ("ACAFLOW_RELAY_API_KEY", "relay.api_key"),
    ("ACAFLOW_FAST_FORWARD", "relay.fast_forward"),
];

/// Configuration storage with TOML support
pub struct ConfigStore {
    data: toml::Value,
    path: Option<PathBuf>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl ConfigStore {
    pub fn empty() -> Self {
        Self {
            data: toml::Value::Table(Default::default()),
            path: None,
        }
    }

    /// Parse a TOML document held in memory
    pub fn parse(content: &str) -> Result<Self> {
        let data = toml::from_str(content).context("invalid TOML configuration")?;
        Ok(Self { data, path: None })
    }

    /// Load a TOML file; [`ConfigStore::reload`] re-reads the same path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from {}", path.display());
        Ok(Self {
            data: read_toml(path)?,
            path: Some(path.to_path_buf()),
        })
    }

    /// Deserialize the section named by `C::PREFIX`, or `C::default()` when
    /// the section is absent
    pub fn get<C: Configurable>(&self) -> Result<C> {
        debug!("Reading config section [{}]", C::PREFIX);
        match self.data.get(C::PREFIX) {
            Some(section) => section
                .clone()
                .try_into()
                .with_context(|| format!("invalid [{}] section", C::PREFIX)),
            None => Ok(C::default()),
        }
    }

    /// Get a raw TOML value by dotted key path, e.g. "relay.url"
    pub fn get_raw(&self, key: &str) -> Option<&toml::Value> {
        key.split('.')
            .try_fold(&self.data, |current, part| current.get(part))
    }

    /// Set a raw TOML value by dotted key path, creating tables on the way
    pub fn set_raw(&mut self, key: &str, value: toml::Value) -> Result<()> {
        let mut parts = key.split('.').peekable();
        let mut current = &mut self.data;

        while let Some(part) = parts.next() {
            let table = current
                .as_table_mut()
                .ok_or_else(|| anyhow!("Cannot set '{}': '{}' is not a table", key, part))?;

            if parts.peek().is_none() {
                table.insert(part.to_string(), value);
                return Ok(());
            }

            current = table
                .entry(part.to_string())
                .or_insert(toml::Value::Table(Default::default()));
        }

        Err(anyhow!("Empty configuration key"))
    }

    pub fn has_section(&self, prefix: &str) -> bool {
        self.data.get(prefix).is_some()
    }

    /// Override values from environment variables (see [`ENV_OVERRIDES`])
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(ENV_OVERRIDES, |name| std::env::var(name).ok())
    }

    fn apply_vars(
        &mut self,
        mapping: &[(&str, &str)],
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        for (var, key) in mapping {
            if let Some(raw) = lookup(var) {
                debug!("Config override {} -> {}", var, key);
                self.set_raw(key, env_value(&raw))?;
            }
        }
        Ok(())
    }

    /// Re-read the file this store was loaded from
    pub fn reload(&mut self) -> Result<()> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| anyhow!("cannot reload a configuration that has no file"))?;
        info!("Reloading configuration from {}", path.display());
        self.data = read_toml(path)?;
        Ok(())
    }

    /// File backing this store, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Layer `other` over this store; tables merge key by key, any other
    /// value in `other` replaces ours
    pub fn merge(&mut self, other: &ConfigStore) {
        overlay(&mut self.data, &other.data);
    }
}

/// "true"/"false" become booleans, everything else stays a string
fn env_value(raw: &str) -> toml::Value {
    match raw.parse::<bool>() {
        Ok(b) => toml::Value::Boolean(b),
        Err(_) => toml::Value::String(raw.to_string()),
    }
}

fn read_toml(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file '{}'", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid TOML in '{}'", path.display()))
}

fn overlay(base: &mut toml::Value, top: &toml::Value) {
    match (base, top) {
        (toml::Value::Table(base), toml::Value::Table(top)) => {
            for (key, value) in top {
                match base.get_mut(key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, top) => *base = top.clone(),
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Agent REST API section
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Base URL of the agent's admin API
    pub admin_url: String,

    /// Sent as `X-API-Key` when set
    pub api_key: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            admin_url: "http://127.0.0.1:8031".to_string(),
            api_key: None,
        }
    }
}

impl Configurable for AgentConfig {
    const PREFIX: &'static str = "agent";
}

/// Webhook relay section
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// WebSocket URL of the relay
    pub url: String,

    /// Shared secret sent in the handshake frame
    pub api_key: String,

    /// Ask the relay to skip buffered history
    pub fast_forward: bool,

    /// Capacity of the transport -> relay queue
    pub channel_capacity: usize,

    pub reconnect: ReconnectPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/ws".to_string(),
            api_key: String::new(),
            fast_forward: false,
            channel_capacity: 100,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl Configurable for RelayConfig {
    const PREFIX: &'static str = "relay";
}

/// Reconnect behaviour of the relay transport
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// When false the transport stops after the first disconnect
    pub enabled: bool,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Random spread applied to each delay, as a fraction (0.0 - 1.0)
    pub jitter: f64,
    /// 0 means unlimited
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            jitter: 0.2,
            max_attempts: 0,
        }
    }
}

impl ReconnectPolicy {
    /// No reconnect at all
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Whether another connection attempt is allowed after `attempt` failures
    pub fn allows(&self, attempt: u32) -> bool {
        self.enabled && (self.max_attempts == 0 || attempt < self.max_attempts)
    }

    /// Un-jittered exponential delay before retry number `attempt` (0-based)
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
        let delay = self.initial_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Delay before retry number `attempt`, spread by `jitter`
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt).as_millis() as f64;
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return Duration::from_millis(base as u64);
        }

        let spread = rand::Rng::gen_range(&mut rand::thread_rng(), -jitter..=jitter);
        Duration::from_millis((base * (1.0 + spread)).max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize, Default, PartialEq)]
    struct TestConfig {
        #[serde(default)]
        value: String,
        #[serde(default)]
        number: i32,
    }

    impl Configurable for TestConfig {
        const PREFIX: &'static str = "test";
    }

    #[test]
    fn test_empty_config() {
        let store = ConfigStore::empty();
        let relay: RelayConfig = store.get().unwrap();
        assert_eq!(relay.channel_capacity, 100);
        assert!(!relay.fast_forward);
        assert!(relay.reconnect.enabled);
    }

    #[test]
    fn test_parse_sections() {
        let toml = r#"
            [agent]
            admin_url = "http://agent:8031"
            api_key = "admin"

            [relay]
            url = "ws://relay:8080/ws"
            api_key = "secret"
            fast_forward = true

            [relay.reconnect]
            enabled = false
        "#;

        let store = ConfigStore::parse(toml).unwrap();
        let agent: AgentConfig = store.get().unwrap();
        assert_eq!(agent.admin_url, "http://agent:8031");
        assert_eq!(agent.api_key.as_deref(), Some("admin"));

        let relay: RelayConfig = store.get().unwrap();
        assert_eq!(relay.url, "ws://relay:8080/ws");
        assert_eq!(relay.api_key, "secret");
        assert!(relay.fast_forward);
        assert!(!relay.reconnect.enabled);
        assert_eq!(relay.reconnect.max_delay_ms, 60_000);
    }

    #[test]
    fn test_missing_section() {
        let store = ConfigStore::parse("[other]\nvalue = \"world\"").unwrap();
        let config: TestConfig = store.get().unwrap();
        assert_eq!(config, TestConfig::default());
        assert!(store.has_section("other"));
        assert!(!store.has_section("test"));
    }

    #[test]
    fn test_merge() {
        let mut store1 = ConfigStore::parse("[test]\nvalue = \"original\"\nnumber = 1").unwrap();
        let store2 = ConfigStore::parse("[test]\nvalue = \"overridden\"").unwrap();

        store1.merge(&store2);

        let config: TestConfig = store1.get().unwrap();
        assert_eq!(config.value, "overridden");
        assert_eq!(config.number, 1);
    }

    #[test]
    fn test_env_overrides() {
        let mut store = ConfigStore::parse("[relay]\nurl = \"ws://file\"").unwrap();
        store
            .apply_vars(ENV_OVERRIDES, |name| match name {
                "ACAFLOW_RELAY_URL" => Some("ws://env".to_string()),
                "ACAFLOW_FAST_FORWARD" => Some("true".to_string()),
                "ACAFLOW_ADMIN_URL" => Some("http://env-agent".to_string()),
                _ => None,
            })
            .unwrap();

        let relay: RelayConfig = store.get().unwrap();
        assert_eq!(relay.url, "ws://env");
        assert!(relay.fast_forward);
        assert_eq!(
            store.get_raw("agent.admin_url").and_then(|v| v.as_str()),
            Some("http://env-agent")
        );
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = ReconnectPolicy {
            jitter: 0.0,
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            ..ReconnectPolicy::default()
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(3), Duration::from_millis(800));
        assert_eq!(policy.delay(4), Duration::from_millis(1_000));
        assert_eq!(policy.delay(40), Duration::from_millis(1_000));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = ReconnectPolicy {
            jitter: 0.5,
            initial_delay_ms: 1_000,
            ..ReconnectPolicy::default()
        };
        for _ in 0..50 {
            let delay = policy.delay(0).as_millis();
            assert!((500..=1_500).contains(&delay), "delay {delay} out of range");
        }
    }

    #[test]
    fn test_attempt_limits() {
        assert!(!ReconnectPolicy::disabled().allows(0));
        let limited = ReconnectPolicy {
            max_attempts: 2,
            ..ReconnectPolicy::default()
        };
        assert!(limited.allows(1));
        assert!(!limited.allows(2));
        assert!(ReconnectPolicy::default().allows(1_000));
    }

    #[test]
    fn test_file_reload() {
        let path = std::env::temp_dir().join(format!("acaflow-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[relay]\nurl = \"ws://one\"").unwrap();
        let mut store = ConfigStore::from_file(&path).unwrap();

        std::fs::write(&path, "[relay]\nurl = \"ws://two\"").unwrap();
        store.reload().unwrap();
        std::fs::remove_file(&path).unwrap();

        let relay: RelayConfig = store.get().unwrap();
        assert_eq!(relay.url, "ws://two");
        assert_eq!(store.path(), Some(path.as_path()));
        assert!(ConfigStore::empty().reload().is_err());
    }
}
