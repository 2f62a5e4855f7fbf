//! Common types used throughout the outbound-core library

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use crate::flow::ConnectionHandle;
use crate::location::FlowBinding;
use crate::sip::{SipUri, Transport};

/// Identifier of one proxy node in a cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an Outbound flow, recorded at registration time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId(pub String);

impl FlowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One concrete place to send a request, optionally pinned to an open connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationDescriptor {
    pub uri: SipUri,
    pub transport: Transport,
    pub addr: IpAddr,
    pub port: u16,
    /// When set, the request must go out over this connection and nothing else
    pub connection: Option<ConnectionHandle>,
}

impl DestinationDescriptor {
    /// Descriptor pinned to the connection behind an Outbound flow
    pub fn pinned(uri: SipUri, binding: &FlowBinding, handle: ConnectionHandle) -> Self {
        Self {
            uri,
            transport: binding.transport,
            addr: binding.addr,
            port: binding.port,
            connection: Some(handle),
        }
    }
}

/// Where a request should be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A URI still to be resolved into concrete destinations
    Uri(SipUri),
    /// Already resolved destinations, tried in order
    Descriptors(Vec<DestinationDescriptor>),
    /// A GRUU target reached through the Path recorded at registration
    WithPath { target: SipUri, path: Vec<SipUri> },
    /// Follow the Route header of the request itself
    RouteHeader,
}

/// The single decision made for every request.
///
/// The dispatcher has no decision left to make beyond executing this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOutcome {
    /// No route; answered with 403
    None,
    /// Answer directly with a status line
    DirectResponse { status: u16, reason: String },
    /// Proxy without a credential check ("proxy")
    ForwardUnauthenticated(Destination),
    /// Rewrite the Request-URI and proxy ("forward")
    ForwardViaNewTarget(SipUri),
    /// Proxy only after authentication or a policy exemption ("relay")
    RelayAuthenticated(Destination),
    /// The request is for this proxy ("me")
    RespondAsSelf,
}

impl RoutingOutcome {
    pub fn direct(status: u16, reason: impl Into<String>) -> Self {
        Self::DirectResponse {
            status,
            reason: reason.into(),
        }
    }

    /// Short label used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::DirectResponse { .. } => "response",
            Self::ForwardUnauthenticated(_) => "proxy",
            Self::ForwardViaNewTarget(_) => "forward",
            Self::RelayAuthenticated(_) => "relay",
            Self::RespondAsSelf => "me",
        }
    }
}

/// A response produced without consulting the routing engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
}

impl DirectResponse {
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}
