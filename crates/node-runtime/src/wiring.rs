//! Broker topology and service wiring.
//!
//! Builds every collaborator with its dependencies injected: repositories
//! into dispatchers, dispatchers into registries, queues into consumers.
//! Tests reuse [`build`] with their own configuration to get an isolated
//! platform instance.

use crate::NodeConfig;
use api_gateway::{AppState, GatewayConfig};
use shared_bus::{
    BrokerError, BusConfig, Consumer, HandlerRegistry, InMemoryBroker, Publisher,
    ResponseDispatcher,
};
use std::sync::Arc;
use users_service::{LogMailer, UserRepository};

/// One backend worker: its consumer loop and handler registry.
pub struct ServiceWiring {
    /// The worker's consumer loop.
    pub consumer: Consumer,
    /// The worker's handlers, built at startup.
    pub registry: HandlerRegistry,
}

/// Everything [`build`] produces.
pub struct Topology {
    /// The broker owning the topic and queues.
    pub broker: Arc<InMemoryBroker>,
    /// Publisher used by the gateway.
    pub publisher: Arc<Publisher>,
    /// Reply routing, present when a response queue is configured.
    pub response_dispatcher: Option<ResponseDispatcher>,
    /// Users worker.
    pub users: ServiceWiring,
    /// Statistics worker.
    pub statistics: ServiceWiring,
    /// Users store, exposed for inspection in tests.
    pub users_repository: Arc<UserRepository>,
    /// Statistics store, exposed for inspection in tests.
    pub statistics_repository: Arc<statistics_service::StatisticsRepository>,
}

/// Build the full platform topology from a configuration.
///
/// # Errors
///
/// Returns a [`BrokerError`] when a subscription references a channel that
/// was not created; with a fresh broker this cannot happen.
pub fn build(config: &NodeConfig) -> Result<Topology, BrokerError> {
    let bus = &config.bus;
    let broker = Arc::new(InMemoryBroker::new());

    // Channels.
    broker.create_topic(&bus.topic);
    let users_queue = broker.create_queue(&config.users_queue);
    let statistics_queue = broker.create_queue(&config.statistics_queue);
    broker.subscribe(&bus.topic, &config.users_queue)?;
    broker.subscribe(&bus.topic, &config.statistics_queue)?;
    let response_queue = bus
        .response_queue
        .as_ref()
        .map(|name| broker.create_queue(name));

    // Producing side.
    let publisher = Arc::new(Publisher::new(Arc::clone(&broker), bus));
    let response_dispatcher = response_queue
        .as_ref()
        .map(|queue| ResponseDispatcher::new(Arc::clone(queue), publisher.pending(), bus));

    // Users worker.
    let users_repository = Arc::new(UserRepository::new());
    let users_dispatcher = Arc::new(users_service::EventDispatcher::new(
        Arc::clone(&users_repository),
        Arc::new(LogMailer),
    ));
    let users = ServiceWiring {
        consumer: Consumer::new(users_queue, response_queue.clone(), bus),
        registry: users_dispatcher.registry(),
    };

    // Statistics worker.
    let statistics_repository = Arc::new(statistics_service::StatisticsRepository::new());
    let statistics_dispatcher = Arc::new(statistics_service::EventDispatcher::new(Arc::clone(
        &statistics_repository,
    )));
    let statistics = ServiceWiring {
        consumer: Consumer::new(statistics_queue, response_queue, bus),
        registry: statistics_dispatcher.registry(),
    };

    Ok(Topology {
        broker,
        publisher,
        response_dispatcher,
        users,
        statistics,
        users_repository,
        statistics_repository,
    })
}

/// Convenience for tests: gateway router plus the topology behind it.
#[must_use]
pub fn gateway_app(topology: &Topology) -> axum::Router {
    api_gateway::build_router(AppState::new(Arc::clone(&topology.publisher)))
}

/// A [`NodeConfig`] tuned for fast tests: ephemeral port, short waits.
#[must_use]
pub fn test_config() -> NodeConfig {
    NodeConfig {
        gateway: GatewayConfig {
            port: 0,
            ..GatewayConfig::default()
        },
        bus: BusConfig {
            poll_wait_ms: 20,
            rpc_timeout_ms: 1_000,
            ..BusConfig::default()
        },
        ..NodeConfig::default()
    }
}
