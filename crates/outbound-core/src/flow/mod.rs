//! Outbound flows (RFC 5626)
//!
//! A flow is a persistent client connection recorded at registration time. The socket
//! registry that owns the connections is external; the core asks it, through
//! [`FlowRegistry`], whether the connection behind a flow is still open on this node.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use tracing::debug;

use crate::common::errors::Result;
use crate::common::types::FlowId;
use crate::sip::Transport;

pub mod selector;

pub use selector::{select_best_local, FlowSelectionResult};

/// An open connection on this node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionHandle {
    pub id: String,
    pub transport: Transport,
    pub remote_addr: IpAddr,
    pub remote_port: u16,
}

#[async_trait]
pub trait FlowRegistry: Send + Sync {
    /// The open connection behind `flow_id`, or `None` when it is closed or unknown
    async fn get_open_connection(&self, flow_id: &FlowId) -> Result<Option<ConnectionHandle>>;
}

/// Flow registry backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryFlowRegistry {
    connections: DashMap<FlowId, ConnectionHandle>,
}

impl InMemoryFlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an open connection for a flow and return its handle
    pub fn open(
        &self,
        flow_id: FlowId,
        transport: Transport,
        remote_addr: IpAddr,
        remote_port: u16,
    ) -> ConnectionHandle {
        let handle = ConnectionHandle {
            id: uuid::Uuid::new_v4().to_string(),
            transport,
            remote_addr,
            remote_port,
        };
        debug!("Flow {} opened as connection {}", flow_id, handle.id);
        self.connections.insert(flow_id, handle.clone());
        handle
    }

    /// Forget a flow whose connection went away
    pub fn close(&self, flow_id: &FlowId) -> Option<ConnectionHandle> {
        let closed = self.connections.remove(flow_id).map(|(_, handle)| handle);
        if closed.is_some() {
            debug!("Flow {} closed", flow_id);
        }
        closed
    }
}

#[async_trait]
impl FlowRegistry for InMemoryFlowRegistry {
    async fn get_open_connection(&self, flow_id: &FlowId) -> Result<Option<ConnectionHandle>> {
        Ok(self
            .connections
            .get(flow_id)
            .map(|handle| handle.value().clone()))
    }
}
