//! Builder for assembling an outbound proxy from its collaborators

use std::sync::Arc;

use crate::auth::Authenticator;
use crate::common::errors::{OutboundError, Result};
use crate::config::ProxyConfig;
use crate::dispatch::{DestinationResolver, Dispatcher, ForwardingPipe, TransactionLayer};
use crate::flow::FlowRegistry;
use crate::location::LocationStore;
use crate::policy::{AlwaysChallenge, ChallengePolicy, TrustedNetworks};
use crate::proxy::OutboundProxy;
use crate::routing::RoutingEngine;

/// Outbound proxy builder.
///
/// Every external collaborator except the challenge policy is required. Without an
/// explicit policy, origins in `trusted_networks` relay freely and everyone else is
/// challenged; with no trusted networks configured that is [`AlwaysChallenge`].
pub struct OutboundProxyBuilder {
    config: ProxyConfig,
    location: Option<Arc<dyn LocationStore>>,
    flows: Option<Arc<dyn FlowRegistry>>,
    authenticator: Option<Arc<dyn Authenticator>>,
    policy: Option<Arc<dyn ChallengePolicy>>,
    transactions: Option<Arc<dyn TransactionLayer>>,
    pipe: Option<Arc<dyn ForwardingPipe>>,
    resolver: Option<Arc<dyn DestinationResolver>>,
}

fn missing(what: &str) -> OutboundError {
    OutboundError::Config(format!("Outbound proxy needs a {}", what))
}

impl OutboundProxyBuilder {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            location: None,
            flows: None,
            authenticator: None,
            policy: None,
            transactions: None,
            pipe: None,
            resolver: None,
        }
    }

    pub fn location_store(mut self, store: Arc<dyn LocationStore>) -> Self {
        self.location = Some(store);
        self
    }

    pub fn flow_registry(mut self, registry: Arc<dyn FlowRegistry>) -> Self {
        self.flows = Some(registry);
        self
    }

    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn challenge_policy(mut self, policy: Arc<dyn ChallengePolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn transaction_layer(mut self, transactions: Arc<dyn TransactionLayer>) -> Self {
        self.transactions = Some(transactions);
        self
    }

    pub fn forwarding_pipe(mut self, pipe: Arc<dyn ForwardingPipe>) -> Self {
        self.pipe = Some(pipe);
        self
    }

    pub fn destination_resolver(mut self, resolver: Arc<dyn DestinationResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Result<OutboundProxy> {
        let policy: Arc<dyn ChallengePolicy> = match self.policy {
            Some(policy) => policy,
            None if self.config.trusted_networks.is_empty() => Arc::new(AlwaysChallenge),
            None => Arc::new(TrustedNetworks::new(&self.config.trusted_networks)?),
        };

        let engine = RoutingEngine::new(
            self.location.ok_or_else(|| missing("location store"))?,
            self.flows.ok_or_else(|| missing("flow registry"))?,
        );
        let dispatcher = Dispatcher::new(
            self.transactions.ok_or_else(|| missing("transaction layer"))?,
            self.pipe.ok_or_else(|| missing("forwarding pipe"))?,
            self.resolver.ok_or_else(|| missing("destination resolver"))?,
            self.authenticator.ok_or_else(|| missing("authenticator"))?,
            policy,
        );

        OutboundProxy::new(self.config, engine, dispatcher)
    }
}
