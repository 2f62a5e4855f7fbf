//! Outbound proxy coordinator
//!
//! Ties the pieces together for one request: foreign REGISTER handling, the routing
//! decision, then the dispatcher. Requests are independent of each other; the only
//! shared state is the configuration snapshot, swapped atomically on reload.

use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, Instrument};

use crate::common::errors::Result;
use crate::common::types::RoutingOutcome;
use crate::config::ProxyConfig;
use crate::dispatch::{DispatchAction, Dispatcher};
use crate::registration::{handle_foreign_register, is_foreign_register, ForeignRegisterOutcome};
use crate::routing::RoutingEngine;
use crate::sip::{Origin, Request};

pub struct OutboundProxy {
    config: ArcSwap<ProxyConfig>,
    engine: RoutingEngine,
    dispatcher: Dispatcher,
}

impl OutboundProxy {
    pub fn new(config: ProxyConfig, engine: RoutingEngine, dispatcher: Dispatcher) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: ArcSwap::from_pointee(config),
            engine,
            dispatcher,
        })
    }

    /// Current configuration snapshot
    pub fn config(&self) -> Arc<ProxyConfig> {
        self.config.load_full()
    }

    /// Replace the configuration; requests already in flight keep their snapshot
    pub fn reload_config(&self, config: ProxyConfig) -> Result<()> {
        config.validate()?;
        info!("Reloading configuration for node {}", config.node_id);
        self.config.store(Arc::new(config));
        Ok(())
    }

    pub fn engine(&self) -> &RoutingEngine {
        &self.engine
    }

    /// Route and dispatch one request. Every request ends in exactly one action.
    pub async fn process_request(&self, request: Request, origin: Origin) -> DispatchAction {
        let span = tracing::info_span!("request", method = %request.method, uri = %request.uri, origin = %origin);
        self.process(request, origin).instrument(span).await
    }

    /// Process a request on its own task
    pub fn spawn_request(self: &Arc<Self>, request: Request, origin: Origin) -> JoinHandle<DispatchAction> {
        let proxy = Arc::clone(self);
        tokio::spawn(async move { proxy.process_request(request, origin).await })
    }

    async fn process(&self, request: Request, origin: Origin) -> DispatchAction {
        let config = self.config();

        let request = if is_foreign_register(&request, &config) {
            match handle_foreign_register(&request, &origin, &config) {
                ForeignRegisterOutcome::ReRouted(rewritten) => rewritten,
                ForeignRegisterOutcome::Respond(response) => {
                    return match self.dispatcher.respond(&request, response).await {
                        Ok(action) => action,
                        Err(e) => {
                            error!("Failed to answer foreign REGISTER: {}", e);
                            DispatchAction::Failed(e.to_string())
                        }
                    };
                }
            }
        } else {
            request
        };

        let outcome = match self.engine.decide(&request, &config).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Routing {} {} failed: {}", request.method, request.uri, e);
                RoutingOutcome::direct(500, "Server Internal Error")
            }
        };

        match self.dispatcher.dispatch(request, &origin, outcome, &config).await {
            Ok(action) => action,
            Err(e) => {
                error!("Dispatching failed: {}", e);
                DispatchAction::Failed(e.to_string())
            }
        }
    }
}
