//! Executing routing outcomes
//!
//! The dispatcher owns no policy of its own beyond mapping each [`RoutingOutcome`] to
//! calls on the transaction layer, the destination resolver and the forwarding pipe.
//! Retrying across destinations and timing out belong to the pipe.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::{authorize_relay, AuthResult, Authenticator, RelayDecision};
use crate::common::errors::Result;
use crate::common::types::{Destination, DestinationDescriptor, DirectResponse, RoutingOutcome};
use crate::config::ProxyConfig;
use crate::policy::ChallengePolicy;
use crate::sip::{Method, Origin, Request, SipUri};

/// Why a URI could not be turned into destinations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Domain does not exist: {0}")]
    NxDomain(String),

    #[error("Resolution failed: {0}")]
    Failed(String),
}

/// Response generation and stateless forwarding
#[async_trait]
pub trait TransactionLayer: Send + Sync {
    async fn send_response(&self, request: &Request, response: DirectResponse) -> Result<()>;

    /// Answer 407 Proxy Authentication Required
    async fn send_proxy_challenge(&self, request: &Request, stale: bool) -> Result<()>;

    async fn stateless_forward(&self, request: &Request, destination: &Destination) -> Result<()>;
}

/// Stateful forwarding with fail-over across destinations
#[async_trait]
pub trait ForwardingPipe: Send + Sync {
    async fn forward(&self, request: Request, destination: Destination, timeout: Duration) -> Result<()>;
}

/// DNS and address resolution of a URI (RFC 3263)
#[async_trait]
pub trait DestinationResolver: Send + Sync {
    /// `approx_size` lets the resolver prefer a reliable transport for large requests
    async fn resolve(
        &self,
        uri: &SipUri,
        approx_size: usize,
    ) -> std::result::Result<Vec<DestinationDescriptor>, ResolveError>;
}

/// What the dispatcher did with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchAction {
    Responded { status: u16 },
    Challenged { stale: bool },
    Forwarded(Destination),
    StatelessForwarded(Destination),
    /// Nothing was sent (ACK that could not be routed)
    Dropped,
    /// A collaborator failed while executing the outcome
    Failed(String),
}

pub struct Dispatcher {
    transactions: Arc<dyn TransactionLayer>,
    pipe: Arc<dyn ForwardingPipe>,
    resolver: Arc<dyn DestinationResolver>,
    authenticator: Arc<dyn Authenticator>,
    policy: Arc<dyn ChallengePolicy>,
}

impl Dispatcher {
    pub fn new(
        transactions: Arc<dyn TransactionLayer>,
        pipe: Arc<dyn ForwardingPipe>,
        resolver: Arc<dyn DestinationResolver>,
        authenticator: Arc<dyn Authenticator>,
        policy: Arc<dyn ChallengePolicy>,
    ) -> Self {
        Self {
            transactions,
            pipe,
            resolver,
            authenticator,
            policy,
        }
    }

    pub async fn dispatch(
        &self,
        request: Request,
        origin: &Origin,
        outcome: RoutingOutcome,
        config: &ProxyConfig,
    ) -> Result<DispatchAction> {
        if request.method == Method::Ack {
            return self.dispatch_ack(request, outcome).await;
        }

        match outcome {
            RoutingOutcome::None => self.respond(&request, DirectResponse::new(403, "Forbidden")).await,
            RoutingOutcome::DirectResponse { status, reason } => {
                self.respond(&request, DirectResponse::new(status, reason)).await
            }
            RoutingOutcome::RespondAsSelf => {
                let response = if request.method == Method::Options {
                    DirectResponse::new(200, "OK")
                } else {
                    DirectResponse::new(481, "Call/Transaction Does Not Exist")
                };
                self.respond(&request, response).await
            }
            RoutingOutcome::ForwardViaNewTarget(uri) => {
                let request = request.with_uri(uri.clone());
                self.pipe_to(request, Destination::Uri(uri), config).await
            }
            RoutingOutcome::ForwardUnauthenticated(destination) => {
                self.pipe_to(request, destination, config).await
            }
            RoutingOutcome::RelayAuthenticated(destination) => {
                self.relay(request, origin, destination, config).await
            }
        }
    }

    async fn relay(
        &self,
        request: Request,
        origin: &Origin,
        destination: Destination,
        config: &ProxyConfig,
    ) -> Result<DispatchAction> {
        let auth_result = match self.authenticator.verify(&request.headers, &request.method).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Credential check failed, treating request as unauthenticated: {}", e);
                AuthResult::Unauthenticated
            }
        };

        match authorize_relay(&request, origin, &destination, &auth_result, self.policy.as_ref()).await {
            RelayDecision::Forward => self.pipe_to(request, destination, config).await,
            RelayDecision::Challenge { stale } => {
                debug!("Challenging {} from {} (stale: {})", request.method, origin, stale);
                self.transactions.send_proxy_challenge(&request, stale).await?;
                Ok(DispatchAction::Challenged { stale })
            }
        }
    }

    async fn dispatch_ack(&self, request: Request, outcome: RoutingOutcome) -> Result<DispatchAction> {
        let (request, destination) = match outcome {
            RoutingOutcome::ForwardUnauthenticated(destination)
            | RoutingOutcome::RelayAuthenticated(destination) => (request, destination),
            RoutingOutcome::ForwardViaNewTarget(uri) => (request.with_uri(uri.clone()), Destination::Uri(uri)),
            other => {
                debug!("Dropping ACK for {}, routing gave '{}'", request.uri, other.label());
                return Ok(DispatchAction::Dropped);
            }
        };

        match self.resolve(&request, destination).await {
            Ok(destination) => {
                self.transactions.stateless_forward(&request, &destination).await?;
                Ok(DispatchAction::StatelessForwarded(destination))
            }
            Err(response) => {
                debug!("Dropping ACK for {}: {} {}", request.uri, response.status, response.reason);
                Ok(DispatchAction::Dropped)
            }
        }
    }

    async fn pipe_to(
        &self,
        request: Request,
        destination: Destination,
        config: &ProxyConfig,
    ) -> Result<DispatchAction> {
        let destination = match self.resolve(&request, destination).await {
            Ok(destination) => destination,
            Err(response) => return self.respond(&request, response).await,
        };
        self.pipe
            .forward(request, destination.clone(), config.pipe_timeout())
            .await?;
        Ok(DispatchAction::Forwarded(destination))
    }

    /// Resolve a bare URI into descriptors; anything else is passed to the pipe as is
    async fn resolve(
        &self,
        request: &Request,
        destination: Destination,
    ) -> std::result::Result<Destination, DirectResponse> {
        let Destination::Uri(uri) = destination else {
            return Ok(destination);
        };

        match self.resolver.resolve(&uri, request.approx_size).await {
            Ok(descriptors) if !descriptors.is_empty() => Ok(Destination::Descriptors(descriptors)),
            Ok(_) => {
                warn!("{} resolved to no destinations", uri);
                Err(DirectResponse::new(500, "Could not resolve destination"))
            }
            Err(ResolveError::NxDomain(domain)) => {
                debug!("{} does not exist ({})", uri, domain);
                Err(DirectResponse::new(604, "Does Not Exist Anywhere"))
            }
            Err(e) => {
                warn!("Failed resolving {}: {}", uri, e);
                Err(DirectResponse::new(500, "Could not resolve destination"))
            }
        }
    }

    pub(crate) async fn respond(&self, request: &Request, response: DirectResponse) -> Result<DispatchAction> {
        let status = response.status;
        debug!("Answering {} {} with {} {}", request.method, request.uri, status, response.reason);
        self.transactions.send_response(request, response).await?;
        Ok(DispatchAction::Responded { status })
    }
}
