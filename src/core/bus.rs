//! The plugin bus: an ordered, immutable list of plugins that every message
//! is offered to.

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Instant;

use acaflow_protocol::{CommandMessage, ResponseEnvelope};
use tracing::{debug, info, warn};

use crate::core::{
    command::Command,
    error::{BusError, CommandError},
    message::Message,
    observability::{MetricsSink, NoopMetrics, elapsed_ms, names},
    plugin::{Outcome, Plugin, PluginMetadata},
    reply::Reply,
};

type PluginList = Arc<[Arc<dyn Plugin>]>;

// ============================================================================
// Builder
// ============================================================================

/// Collects plugins during start-up. Registration is closed by [`BusBuilder::build`].
pub struct BusBuilder {
    pending: Vec<Arc<dyn Plugin>>,
    names: HashSet<String>,
    metrics: Arc<dyn MetricsSink>,
}

impl Default for BusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BusBuilder {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            names: HashSet::new(),
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Use a metrics sink for dispatch counters
    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Register a plugin
    ///
    /// # Errors
    ///
    /// Returns an error if a plugin with the same name is already registered.
    pub fn register<P: Plugin>(&mut self, plugin: P) -> Result<&mut Self, BusError> {
        self.register_arc(Arc::new(plugin))
    }

    /// Register a shared plugin
    pub fn register_arc(&mut self, plugin: Arc<dyn Plugin>) -> Result<&mut Self, BusError> {
        let meta = plugin.meta();
        if !self.names.insert(meta.name.clone()) {
            return Err(BusError::DuplicatePlugin(meta.name));
        }

        info!(
            "Registering plugin: {} v{} - {}",
            meta.name, meta.version, meta.description
        );
        self.pending.push(plugin);
        Ok(self)
    }

    /// Get plugin count
    pub fn count(&self) -> usize {
        self.pending.len()
    }

    /// Check if plugin exists by name
    pub fn has(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Freeze the plugin list and initialize every plugin once, in order
    pub async fn build(self) -> Result<Bus, BusError> {
        let plugins: PluginList = self.pending.into();
        let inner = Arc::new(BusInner {
            plugins,
            metrics: self.metrics,
        });

        let handle = BusHandle {
            inner: Arc::downgrade(&inner),
        };

        for plugin in inner.plugins.iter() {
            let name = plugin.meta().name;
            debug!("Initializing plugin: {}", name);
            plugin
                .initialize(&handle)
                .await
                .map_err(|source| BusError::Initialize {
                    plugin: name,
                    source,
                })?;
        }

        info!("Plugin bus ready with {} plugins", inner.plugins.len());
        Ok(Bus { inner })
    }
}

// ============================================================================
// Dispatch report
// ============================================================================

/// Per-plugin outcomes of one publish, in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    entries: Vec<(String, Outcome)>,
}

impl DispatchReport {
    pub fn entries(&self) -> &[(String, Outcome)] {
        &self.entries
    }

    /// Names of the plugins that claimed the message
    pub fn claimed_by(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, outcome)| outcome.is_claimed())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_claimed(&self) -> bool {
        self.entries.iter().any(|(_, outcome)| outcome.is_claimed())
    }

    pub fn has_error(&self) -> bool {
        self.entries.iter().any(|(_, outcome)| *outcome == Outcome::Error)
    }

    pub fn outcome_of(&self, plugin: &str) -> Option<Outcome> {
        self.entries
            .iter()
            .find(|(name, _)| name == plugin)
            .map(|(_, outcome)| *outcome)
    }
}

// ============================================================================
// Bus
// ============================================================================

struct BusInner {
    plugins: PluginList,
    metrics: Arc<dyn MetricsSink>,
}

impl BusInner {
    async fn publish(&self, message: Message, reply: Reply) -> DispatchReport {
        let mut report = DispatchReport::default();

        for plugin in self.plugins.iter() {
            let name = plugin.meta().name;
            let start = Instant::now();
            let outcome = plugin.handle_event(&message, reply.clone()).await;

            if outcome.is_claimed() {
                debug!("Plugin '{}' handled '{}': {}", name, message.kind(), outcome);
            }

            let labels = [("plugin", name.as_str()), ("outcome", outcome.as_str())];
            self.metrics.incr_counter(names::BUS_DISPATCH_TOTAL, 1, &labels);
            self.metrics.observe_duration_ms(
                names::BUS_DISPATCH_DURATION_MS,
                elapsed_ms(start),
                &labels[..1],
            );

            report.entries.push((name, outcome));
        }

        if !report.is_claimed() {
            warn!("No plugin claimed message '{}'", message.kind());
            self.metrics
                .incr_counter(names::BUS_UNCLAIMED_TOTAL, 1, &[("type", message.kind())]);
        } else if message.is_command() && report.claimed_by().len() > 1 {
            warn!(
                "Command '{}' was claimed by several plugins: {:?}",
                message.kind(),
                report.claimed_by()
            );
        }

        report
    }

    async fn request(&self, command: CommandMessage) -> Result<ResponseEnvelope, BusError> {
        let kind = command.kind.clone();
        let (reply, rx) = Reply::channel();

        let report = self.publish(Message::Command(command), reply).await;
        if !report.is_claimed() {
            return Err(BusError::Unclaimed(kind));
        }

        rx.await.map_err(|_| BusError::NoResponse(kind))
    }

    async fn execute<C: Command>(&self, command: &C) -> Result<C::Output, CommandError> {
        let body = serde_json::to_value(command)?;
        let envelope = self.request(CommandMessage::new(C::TYPE, body)).await?;

        if !envelope.is_success() {
            return Err(CommandError::Failed(envelope));
        }
        Ok(envelope.decode()?)
    }
}

/// The running plugin bus. Cheap to clone.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl Bus {
    /// Start registering plugins
    pub fn builder() -> BusBuilder {
        BusBuilder::new()
    }

    /// Offer a message to every plugin, in registration order
    pub async fn publish(&self, message: impl Into<Message>, reply: Reply) -> DispatchReport {
        self.inner.publish(message.into(), reply).await
    }

    /// Publish a command and wait for its single response envelope
    pub async fn request(&self, command: CommandMessage) -> Result<ResponseEnvelope, BusError> {
        self.inner.request(command).await
    }

    /// Publish a typed command and decode its success body
    pub async fn execute<C: Command>(&self, command: &C) -> Result<C::Output, CommandError> {
        self.inner.execute(command).await
    }

    /// Weak handle for plugins that issue commands
    pub fn handle(&self) -> BusHandle {
        BusHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Get all plugin metadata, in registration order
    pub fn plugins(&self) -> Vec<PluginMetadata> {
        self.inner.plugins.iter().map(|p| p.meta()).collect()
    }

    pub fn metrics(&self) -> Arc<dyn MetricsSink> {
        self.inner.metrics.clone()
    }
}

/// Weak reference to the bus held by plugins, so the bus and its plugins do
/// not keep each other alive.
#[derive(Clone)]
pub struct BusHandle {
    inner: Weak<BusInner>,
}

impl BusHandle {
    /// A handle bound to no bus; every call fails with `Closed`
    pub fn detached() -> Self {
        Self { inner: Weak::new() }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.strong_count() == 0
    }

    fn upgrade(&self) -> Result<Arc<BusInner>, BusError> {
        self.inner.upgrade().ok_or(BusError::Closed)
    }

    pub async fn publish(
        &self,
        message: impl Into<Message>,
        reply: Reply,
    ) -> Result<DispatchReport, BusError> {
        Ok(self.upgrade()?.publish(message.into(), reply).await)
    }

    pub async fn request(&self, command: CommandMessage) -> Result<ResponseEnvelope, BusError> {
        self.upgrade()?.request(command).await
    }

    pub async fn execute<C: Command>(&self, command: &C) -> Result<C::Output, CommandError> {
        self.upgrade()?.execute(command).await
    }
}
