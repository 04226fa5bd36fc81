//! Application builder: configuration, plugins and the relay wired together.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::{error, info};

use crate::agent::AgentApi;
use crate::controller;
use crate::core::{
    bus::Bus,
    config::{ConfigStore, RelayConfig},
    observability::MetricsSink,
    plugin::Plugin,
};
use crate::driver::WsDriver;
use crate::relay::WebhookRelay;

/// Registration slot, kept in call order
enum Slot {
    Plugin(Arc<dyn Plugin>),
    Controllers,
}

/// Builder for an acaflow application
///
/// # Example
///
/// ```ignore
/// use acaflow::prelude::*;
///
/// AcaFlow::new()
///     .config_file("config.toml")?
///     .controllers()
///     .plugin(EventDispatcher::connections(AutoAccept))?
///     .run()
///     .await?;
/// ```
pub struct AcaFlow {
    config: ConfigStore,
    agent: Option<Arc<dyn AgentApi>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    slots: Vec<Slot>,
    plugin_names: HashSet<String>,
}

impl Default for AcaFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl AcaFlow {
    pub fn new() -> Self {
        Self {
            config: ConfigStore::empty(),
            agent: None,
            metrics: None,
            slots: Vec::new(),
            plugin_names: HashSet::new(),
        }
    }

    /// Load configuration from a file
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config = ConfigStore::from_file(path)?;
        Ok(self)
    }

    /// Set configuration store directly
    pub fn config_store(mut self, config: ConfigStore) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Agent used by the controllers. Defaults to an HTTP client built from
    /// the `[agent]` section.
    pub fn agent(mut self, agent: Arc<dyn AgentApi>) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Register a plugin
    pub fn plugin<P: Plugin>(mut self, plugin: P) -> Result<Self> {
        let name = plugin.meta().name;
        if !self.plugin_names.insert(name.clone()) {
            return Err(anyhow!("Plugin '{}' is already registered", name));
        }
        self.slots.push(Slot::Plugin(Arc::new(plugin)));
        Ok(self)
    }

    /// Register every controller group bound to the configured agent
    pub fn controllers(mut self) -> Self {
        if !self.slots.iter().any(|s| matches!(s, Slot::Controllers)) {
            self.slots.push(Slot::Controllers);
        }
        self
    }

    fn resolve_agent(&self) -> Result<Arc<dyn AgentApi>> {
        if let Some(agent) = &self.agent {
            return Ok(agent.clone());
        }

        #[cfg(feature = "http")]
        {
            let config = self.config.get::<crate::core::config::AgentConfig>()?;
            info!("Using agent admin API at {}", config.admin_url);
            Ok(Arc::new(crate::agent::HttpAgent::new(&config)?))
        }

        #[cfg(not(feature = "http"))]
        {
            Err(anyhow!(
                "No agent configured; call .agent() or enable the `http` feature"
            ))
        }
    }

    /// Freeze registration and initialize every plugin
    pub async fn build(&self) -> Result<Bus> {
        let mut builder = Bus::builder();
        if let Some(metrics) = &self.metrics {
            builder = builder.metrics(metrics.clone());
        }

        for slot in &self.slots {
            match slot {
                Slot::Plugin(plugin) => {
                    builder.register_arc(plugin.clone())?;
                }
                Slot::Controllers => {
                    for plugin in controller::all(self.resolve_agent()?) {
                        builder.register_arc(plugin)?;
                    }
                }
            }
        }

        let bus = builder.build().await?;
        info!("Loaded {} plugins", bus.plugins().len());
        Ok(bus)
    }

    /// Build, start the relay and run until Ctrl+C or the relay stops
    pub async fn run(self) -> Result<()> {
        let relay_config: RelayConfig = self.config.get()?;
        let bus = self.build().await?;

        let driver = WsDriver::new(&relay_config.url, relay_config.reconnect.clone())?;
        let relay = WebhookRelay::new(bus, &relay_config);

        info!(
            "acaflow is relaying {}, press Ctrl+C to exit.",
            relay_config.url
        );
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        let result = relay.run_until(driver, shutdown).await;
        info!("acaflow is shutting down.");
        result
    }
}
