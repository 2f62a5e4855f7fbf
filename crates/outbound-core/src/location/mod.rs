//! Location store adapter
//!
//! The registered-location database is owned elsewhere; the routing core only reads it
//! through [`LocationStore`]. Every lookup that returns contacts returns them
//! most-recently-registered first, with `rank` 0 for the newest entry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::common::errors::Result;
use crate::common::types::{FlowId, NodeId};
use crate::sip::{SipUri, Transport};

pub mod memory;

pub use memory::InMemoryLocationStore;

/// The Outbound flow a contact was registered over.
///
/// Fixed for the lifetime of the contact entry; a re-registration replaces the entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowBinding {
    /// Proxy node holding the connection
    pub node: NodeId,
    pub flow_id: FlowId,
    pub transport: Transport,
    pub addr: IpAddr,
    pub port: u16,
}

/// One registered location of a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEntry {
    pub user: String,
    pub contact: SipUri,
    /// Registration recency, 0 is the most recent
    pub rank: u32,
    pub flow: Option<FlowBinding>,
}

/// Result of resolving a GRUU
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GruuResolution {
    /// Registered device reachable through the Path it registered with
    WithPath { target: SipUri, path: Vec<SipUri> },
    /// Registered device without a Path
    Contact(SipUri),
    /// The GRUU cannot be used; answer with this status (404 unknown, 480 not registered)
    Response { status: u16, reason: String },
}

#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Contacts registered for the address-of-record `uri`
    async fn lookup_by_uri(&self, uri: &SipUri) -> Result<Vec<ContactEntry>>;

    /// Resolve a GRUU-form URI
    async fn lookup_by_gruu(&self, uri: &SipUri) -> Result<GruuResolution>;

    /// All contacts of the user owning the registered contact `uri`; empty when `uri`
    /// is nobody's contact
    async fn lookup_owner_of_contact(&self, uri: &SipUri) -> Result<Vec<ContactEntry>>;
}
