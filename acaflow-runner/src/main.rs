//! acaflow runner
//!
//! This binary:
//! - Loads configuration from `config.toml` plus `ACAFLOW_*` overrides
//! - Serves every controller group against the agent admin API
//! - Answers connection, credential and proof events automatically
//! - Relays webhooks until Ctrl+C

mod auto;

use std::sync::Arc;
use std::time::Duration;

use acaflow::core::observability::{InMemoryMetrics, spawn_metrics_log_reporter};
use acaflow::prelude::*;
use anyhow::Result;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::auto::{AutoAcceptConfig, Autopilot};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MetricsConfig {
    /// 0 disables the periodic dump
    report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

impl Configurable for MetricsConfig {
    const PREFIX: &'static str = "metrics";
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting acaflow...");

    let mut config = if std::path::Path::new("config.toml").exists() {
        info!("Loading config.toml");
        ConfigStore::from_file("config.toml")?
    } else {
        ConfigStore::empty()
    };
    config.apply_env()?;

    let auto_accept: AutoAcceptConfig = config.get()?;
    let metrics_config: MetricsConfig = config.get()?;

    let metrics = Arc::new(InMemoryMetrics::new());
    if metrics_config.report_interval_secs > 0 {
        spawn_metrics_log_reporter(
            metrics.clone(),
            Duration::from_secs(metrics_config.report_interval_secs),
        );
    }

    let autopilot = Autopilot::new(auto_accept);
    AcaFlow::new()
        .config_store(config)
        .metrics(metrics)
        .controllers()
        .plugin(EventDispatcher::connections(autopilot.clone()))?
        .plugin(EventDispatcher::credentials(autopilot.clone()))?
        .plugin(EventDispatcher::proofs(autopilot.clone()))?
        .plugin(EventDispatcher::basic_messages(autopilot))?
        .run()
        .await
}
