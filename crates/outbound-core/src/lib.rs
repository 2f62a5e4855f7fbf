//! # RVoIP Outbound Core
//!
//! Routing-decision core for a SIP edge proxy that keeps client connections open through
//! NATs and firewalls and routes requests back over them (RFC 5626 "Outbound").
//!
//! For every request the core decides one of: answer directly, proxy to a registered
//! contact (pinned to its Outbound flow when there is one), relay after authentication,
//! forward to a default upstream, or reject. REGISTERs for foreign domains get an
//! RFC 3327 Path header pointing back at this proxy before they are routed.
//!
//! ## Architecture
//!
//! - `sip`: the request, URI and header value types the decision inspects
//! - `location`: read access to registered contacts ([`LocationStore`])
//! - `flow`: open-connection lookup ([`FlowRegistry`]) and Outbound flow selection
//! - `routing`: the [`RoutingEngine`] producing a [`RoutingOutcome`]
//! - `auth` / `policy`: credential check adapter, relay authorization and challenge policy
//! - `registration`: Path insertion for foreign REGISTERs
//! - `dispatch`: executes an outcome against the transaction layer and forwarding pipe
//! - `proxy`: the [`OutboundProxy`] coordinator
//! - `api`: [`OutboundProxyBuilder`]
//!
//! Transactions, transports, DNS resolution and the registration database are external
//! collaborators reached through traits.

pub mod common;
pub mod sip;
pub mod config;
pub mod logging;
pub mod location;
pub mod flow;
pub mod auth;
pub mod policy;
pub mod routing;
pub mod registration;
pub mod dispatch;
pub mod proxy;
pub mod api;

// Re-export key types
pub use common::errors::{OutboundError, Result};
pub use common::types::*;
pub use config::ProxyConfig;
pub use location::{ContactEntry, FlowBinding, GruuResolution, LocationStore};
pub use flow::{FlowRegistry, FlowSelectionResult};
pub use routing::RoutingEngine;
pub use proxy::OutboundProxy;
pub use api::OutboundProxyBuilder;
