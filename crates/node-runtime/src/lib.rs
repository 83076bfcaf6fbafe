//! # Beeline Node Runtime
//!
//! The entry point wiring the whole platform into one process.
//!
//! ## Architecture
//!
//! ```text
//! HTTP ──→ api-gateway ──call_rpc──→ ┌───────────────┐
//!                ▲                   │ beeline-topic │
//!                │                   └───────┬───────┘
//!                │                      fan-out
//!                │               ┌──────────┴──────────┐
//!                │               ▼                     ▼
//!                │         users-queue          statistics-queue
//!                │               │                     │
//!                │          users worker        statistics worker
//!                │               └──────────┬──────────┘
//!                │                          ▼
//!                └──── ResponseDispatcher ← beeline-response-queue
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults + `BEELINE_*` environment overrides)
//! 2. Build the broker topology (topic, queues, subscriptions)
//! 3. Construct repositories and dispatchers (dependency injection)
//! 4. Spawn worker loops, the response dispatcher, and the pending sweep
//! 5. Serve HTTP until ctrl-c, then flip the shutdown watch channel

pub mod wiring;

use crate::wiring::Topology;
use anyhow::{Context, Result};
use api_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use shared_bus::BusConfig;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Interval between sweeps of abandoned pending RPC calls.
const PENDING_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// How long shutdown waits for background tasks before giving up.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Full node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// HTTP gateway settings.
    pub gateway: GatewayConfig,
    /// Bus channel names and tuning.
    pub bus: BusConfig,
    /// Queue feeding the users worker.
    pub users_queue: String,
    /// Queue feeding the statistics worker.
    pub statistics_queue: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            bus: BusConfig::default(),
            users_queue: "users-queue".to_string(),
            statistics_queue: "statistics-queue".to_string(),
        }
    }
}

/// Load configuration from defaults plus environment overrides.
#[must_use]
pub fn load_config() -> NodeConfig {
    let mut config = NodeConfig::default();

    if let Ok(port) = std::env::var("BEELINE_HTTP_PORT") {
        match port.parse() {
            Ok(p) => config.gateway.port = p,
            Err(_) => warn!(value = %port, "ignoring invalid BEELINE_HTTP_PORT"),
        }
    }
    if let Ok(timeout) = std::env::var("BEELINE_RPC_TIMEOUT_MS") {
        match timeout.parse() {
            Ok(ms) => config.bus.rpc_timeout_ms = ms,
            Err(_) => warn!(value = %timeout, "ignoring invalid BEELINE_RPC_TIMEOUT_MS"),
        }
    }
    if let Ok(wait) = std::env::var("BEELINE_POLL_WAIT_MS") {
        match wait.parse() {
            Ok(ms) => config.bus.poll_wait_ms = ms,
            Err(_) => warn!(value = %wait, "ignoring invalid BEELINE_POLL_WAIT_MS"),
        }
    }
    if let Ok(batch) = std::env::var("BEELINE_BATCH_SIZE") {
        match batch.parse() {
            Ok(n) => config.bus.max_messages = n,
            Err(_) => warn!(value = %batch, "ignoring invalid BEELINE_BATCH_SIZE"),
        }
    }
    // Escape hatch: run without a response queue (RPC calls fail fast).
    if std::env::var("BEELINE_DISABLE_RESPONSES").is_ok() {
        config.bus.response_queue = None;
    }

    config
}

/// The running node: broker topology, worker tasks, and the HTTP server.
pub struct NodeRuntime {
    config: NodeConfig,
    topology: Option<Topology>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl NodeRuntime {
    /// Build the node and its broker topology.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or the topology cannot be
    /// built.
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.bus.validate().context("invalid bus configuration")?;

        let topology = wiring::build(&config).context("failed to build bus topology")?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            topology: Some(topology),
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
        })
    }

    /// Spawn the worker loops and serve HTTP.
    ///
    /// Returns once the server socket is bound; the node then runs until
    /// [`NodeRuntime::shutdown`].
    ///
    /// # Errors
    ///
    /// Fails when the HTTP listener cannot bind.
    pub async fn start(&mut self) -> Result<()> {
        info!("===========================================");
        info!("  Beeline Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let topology = self.topology.take().context("node was already started")?;

        // Backend workers.
        let users = topology.users;
        let users_shutdown = self.shutdown_rx.clone();
        self.tasks.push(tokio::spawn(async move {
            users.consumer.run(&users.registry, users_shutdown).await;
        }));

        let statistics = topology.statistics;
        let statistics_shutdown = self.shutdown_rx.clone();
        self.tasks.push(tokio::spawn(async move {
            statistics
                .consumer
                .run(&statistics.registry, statistics_shutdown)
                .await;
        }));

        // Reply routing for RPC callers, when responses are enabled.
        if let Some(dispatcher) = topology.response_dispatcher {
            self.tasks
                .push(tokio::spawn(dispatcher.run(self.shutdown_rx.clone())));
            self.tasks.push(tokio::spawn(shared_bus::pending::sweep_expired(
                topology.publisher.pending(),
                PENDING_SWEEP_INTERVAL,
                self.shutdown_rx.clone(),
            )));
        } else {
            warn!("response queue disabled, RPC-style calls will fail fast");
        }

        // HTTP gateway.
        let app = api_gateway::build_router(api_gateway::AppState::new(topology.publisher));
        let addr = self.config.gateway.addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!(addr = %addr, "HTTP gateway listening");

        let mut server_shutdown = self.shutdown_rx.clone();
        self.tasks.push(tokio::spawn(async move {
            let shutdown = async move {
                let _ = server_shutdown.changed().await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                warn!(error = %e, "HTTP server exited with error");
            }
        }));

        info!(
            topic = %self.config.bus.topic,
            users_queue = %self.config.users_queue,
            statistics_queue = %self.config.statistics_queue,
            "all workers running"
        );
        Ok(())
    }

    /// Signal every task to stop and wait briefly for them to drain.
    pub async fn shutdown(self) {
        info!("initiating graceful shutdown");
        let _ = self.shutdown_tx.send(true);

        for task in self.tasks {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                warn!("task did not stop within the grace period");
            }
        }
        info!("shutdown complete");
    }
}
