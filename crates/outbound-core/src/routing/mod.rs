//! Routing decision engine
//!
//! Turns one request into exactly one [`RoutingOutcome`]. The checks run in a fixed
//! order and the first one that applies decides:
//!
//! 1. GRUU Request-URI: resolve through the location store.
//! 2. Route header present: proxy to a registered contact when either the
//!    Request-URI or the last Route entry is one, let BYE follow the Route header
//!    unchallenged, relay everything else.
//! 3. No Route header: requests addressed to this proxy get the legacy "me" handling;
//!    anything else goes to the registered contacts of the Request-URI, then to the
//!    default upstream, and otherwise nowhere.
//!
//! Whenever a set of contacts is the target, Outbound flow selection picks the contact.
//! The engine only reads the location store and flow registry and keeps no state of its
//! own, so the same request against the same store always gets the same outcome.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::common::errors::Result;
use crate::common::types::{Destination, DestinationDescriptor, RoutingOutcome};
use crate::config::ProxyConfig;
use crate::flow::{select_best_local, FlowRegistry, FlowSelectionResult};
use crate::location::{ContactEntry, GruuResolution, LocationStore};
use crate::sip::{Method, Request};

pub const GONE_USED_OUTBOUND: &str = "Gone (used Outbound)";

pub struct RoutingEngine {
    location: Arc<dyn LocationStore>,
    flows: Arc<dyn FlowRegistry>,
}

impl RoutingEngine {
    pub fn new(location: Arc<dyn LocationStore>, flows: Arc<dyn FlowRegistry>) -> Self {
        Self { location, flows }
    }

    /// Decide what to do with `request`
    pub async fn decide(&self, request: &Request, config: &ProxyConfig) -> Result<RoutingOutcome> {
        let outcome = if request.uri.is_gruu() {
            self.resolve_gruu(request).await?
        } else if request.has_route() {
            self.decide_with_route(request, config).await?
        } else {
            self.decide_by_host(request, config).await?
        };

        debug!("{} {} -> {} ({:?})", request.method, request.uri, outcome.label(), outcome);
        Ok(outcome)
    }

    async fn resolve_gruu(&self, request: &Request) -> Result<RoutingOutcome> {
        let outcome = match self.location.lookup_by_gruu(&request.uri).await? {
            GruuResolution::WithPath { target, path } => {
                RoutingOutcome::ForwardUnauthenticated(Destination::WithPath { target, path })
            }
            GruuResolution::Contact(target) => {
                RoutingOutcome::ForwardUnauthenticated(Destination::Uri(target))
            }
            GruuResolution::Response { status, reason } => {
                debug!("GRUU {} resolved to {} {}", request.uri, status, reason);
                RoutingOutcome::DirectResponse { status, reason }
            }
        };
        Ok(outcome)
    }

    async fn decide_with_route(&self, request: &Request, config: &ProxyConfig) -> Result<RoutingOutcome> {
        let owner = self.location.lookup_owner_of_contact(&request.uri).await?;
        if !owner.is_empty() {
            debug!("Request-URI {} is a registered contact of {}", request.uri, owner[0].user);
            return Ok(self.best_contact(&owner, config).await);
        }

        if request.method == Method::Bye {
            return Ok(RoutingOutcome::ForwardUnauthenticated(Destination::RouteHeader));
        }

        let last_route = match request.last_route_uri() {
            Ok(Some(uri)) => uri,
            Ok(None) => return Ok(RoutingOutcome::RelayAuthenticated(Destination::RouteHeader)),
            Err(e) => {
                warn!("Unparsable last Route entry, relaying as is: {}", e);
                return Ok(RoutingOutcome::RelayAuthenticated(Destination::RouteHeader));
            }
        };

        let owner = self.location.lookup_owner_of_contact(&last_route).await?;
        if owner.is_empty() {
            Ok(RoutingOutcome::RelayAuthenticated(Destination::RouteHeader))
        } else {
            debug!("Last Route {} is a registered contact of {}", last_route, owner[0].user);
            Ok(self.best_contact(&owner, config).await)
        }
    }

    async fn decide_by_host(&self, request: &Request, config: &ProxyConfig) -> Result<RoutingOutcome> {
        if config.is_self_addressed(&request.uri) {
            return self.resolve_self_addressed(request).await;
        }

        let entries = self.location.lookup_by_uri(&request.uri).await?;
        if !entries.is_empty() {
            return Ok(self.best_contact(&entries, config).await);
        }

        Ok(match &config.default_upstream_uri {
            Some(upstream) => RoutingOutcome::ForwardViaNewTarget(upstream.clone()),
            None => RoutingOutcome::None,
        })
    }

    /// Legacy handling of requests sent to the proxy itself, from before Path support:
    /// an `addr` parameter carries the real target.
    async fn resolve_self_addressed(&self, request: &Request) -> Result<RoutingOutcome> {
        let Some(target) = request.uri.addr_param_uri()? else {
            return Ok(RoutingOutcome::RespondAsSelf);
        };

        if self.location.lookup_by_uri(&target).await?.is_empty() {
            warn!(
                "Request to {} carries addr {} which matches no registered user, possible relay attempt",
                request.uri, target
            );
        } else {
            info!("Decoded addr parameter of {} into {}", request.uri, target);
        }
        Ok(RoutingOutcome::ForwardUnauthenticated(Destination::Uri(target)))
    }

    /// Pick the target among one user's contacts, honouring Outbound flows
    async fn best_contact(&self, entries: &[ContactEntry], config: &ProxyConfig) -> RoutingOutcome {
        match select_best_local(&config.node(), entries, self.flows.as_ref()).await {
            FlowSelectionResult::UseLocal { entry, handle, binding } => {
                RoutingOutcome::ForwardUnauthenticated(Destination::Descriptors(vec![
                    DestinationDescriptor::pinned(entry.contact, &binding, handle),
                ]))
            }
            FlowSelectionResult::NoFlowRecorded => match entries.first() {
                Some(newest) => RoutingOutcome::ForwardUnauthenticated(Destination::Uri(newest.contact.clone())),
                None => RoutingOutcome::None,
            },
            FlowSelectionResult::FlowDeadOrRemote => {
                let user = entries.first().map(|e| e.user.as_str()).unwrap_or_default();
                info!("No usable Outbound flow for {}, answering 410", user);
                RoutingOutcome::direct(410, GONE_USED_OUTBOUND)
            }
        }
    }
}
