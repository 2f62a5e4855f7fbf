//! Outbound flow selection
//!
//! Picks, among a user's contacts, the most recently registered one whose flow is held
//! by this node and is still open. Contacts bound to flows that are dead or held by
//! another node are never replaced by an unrelated contact: the caller has to report
//! the flow as gone instead.

use tracing::{debug, warn};

use super::{ConnectionHandle, FlowRegistry};
use crate::common::types::NodeId;
use crate::location::{ContactEntry, FlowBinding};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowSelectionResult {
    /// Contact reachable over a connection open on this node
    UseLocal {
        entry: ContactEntry,
        handle: ConnectionHandle,
        binding: FlowBinding,
    },
    /// At least one flow was recorded but none is usable from this node
    FlowDeadOrRemote,
    /// None of the contacts registered over a flow
    NoFlowRecorded,
}

/// Scan `entries` (most recent first) for a live local flow; first match wins
pub async fn select_best_local(
    node_id: &NodeId,
    entries: &[ContactEntry],
    registry: &dyn FlowRegistry,
) -> FlowSelectionResult {
    let mut flow_seen = false;

    for entry in entries {
        let Some(binding) = &entry.flow else {
            continue;
        };
        flow_seen = true;

        if &binding.node != node_id {
            debug!(
                "Contact {} is bound to flow {} on node {}, not ours",
                entry.contact, binding.flow_id, binding.node
            );
            continue;
        }

        match registry.get_open_connection(&binding.flow_id).await {
            Ok(Some(handle)) => {
                debug!(
                    "Using flow {} (connection {}) for contact {}",
                    binding.flow_id, handle.id, entry.contact
                );
                return FlowSelectionResult::UseLocal {
                    entry: entry.clone(),
                    handle,
                    binding: binding.clone(),
                };
            }
            Ok(None) => {
                debug!("Flow {} of contact {} is closed", binding.flow_id, entry.contact);
            }
            Err(e) => {
                warn!("Flow registry lookup for {} failed, treating as closed: {}", binding.flow_id, e);
            }
        }
    }

    if flow_seen {
        FlowSelectionResult::FlowDeadOrRemote
    } else {
        FlowSelectionResult::NoFlowRecorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::{OutboundError, Result};
    use crate::common::types::FlowId;
    use crate::flow::InMemoryFlowRegistry;
    use crate::sip::Transport;
    use async_trait::async_trait;
    use std::net::{IpAddr, Ipv4Addr};

    const LOCAL: &str = "edge-1";

    fn binding(node: &str, flow: &str) -> FlowBinding {
        FlowBinding {
            node: NodeId::new(node),
            flow_id: FlowId::new(flow),
            transport: Transport::Tcp,
            addr: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            port: 40000,
        }
    }

    fn entry(rank: u32, flow: Option<FlowBinding>) -> ContactEntry {
        ContactEntry {
            user: "alice".to_string(),
            contact: format!("sip:alice@192.0.2.{}", rank + 1).parse().unwrap(),
            rank,
            flow,
        }
    }

    fn registry_with(flows: &[&str]) -> InMemoryFlowRegistry {
        let registry = InMemoryFlowRegistry::new();
        for flow in flows {
            registry.open(
                FlowId::new(*flow),
                Transport::Tcp,
                IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
                40000,
            );
        }
        registry
    }

    #[tokio::test]
    async fn test_local_live_flow_wins_by_scan_order() {
        let registry = registry_with(&["f-live"]);
        let entries = vec![
            entry(0, Some(binding(LOCAL, "f-live"))),
            entry(1, Some(binding("edge-2", "f-remote"))),
            entry(2, None),
        ];

        match select_best_local(&NodeId::new(LOCAL), &entries, &registry).await {
            FlowSelectionResult::UseLocal { entry, binding, .. } => {
                assert_eq!(entry.rank, 0);
                assert_eq!(binding.flow_id, FlowId::new("f-live"));
            }
            other => panic!("Expected UseLocal, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_skips_remote_and_dead_flows_to_reach_later_local_one() {
        let registry = registry_with(&["f-second"]);
        let entries = vec![
            entry(0, Some(binding("edge-2", "f-remote"))),
            entry(1, Some(binding(LOCAL, "f-dead"))),
            entry(2, None),
            entry(3, Some(binding(LOCAL, "f-second"))),
        ];

        match select_best_local(&NodeId::new(LOCAL), &entries, &registry).await {
            FlowSelectionResult::UseLocal { entry, .. } => assert_eq!(entry.rank, 3),
            other => panic!("Expected UseLocal, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_and_dead_flows_are_reported() {
        let registry = registry_with(&[]);
        let entries = vec![
            entry(0, Some(binding("edge-2", "f-remote"))),
            entry(1, Some(binding(LOCAL, "f-dead"))),
        ];
        assert_eq!(
            select_best_local(&NodeId::new(LOCAL), &entries, &registry).await,
            FlowSelectionResult::FlowDeadOrRemote
        );
    }

    #[tokio::test]
    async fn test_flowless_contacts_and_empty_list() {
        let registry = registry_with(&[]);
        let entries = vec![entry(0, None), entry(1, None)];
        assert_eq!(
            select_best_local(&NodeId::new(LOCAL), &entries, &registry).await,
            FlowSelectionResult::NoFlowRecorded
        );
        assert_eq!(
            select_best_local(&NodeId::new(LOCAL), &[], &registry).await,
            FlowSelectionResult::NoFlowRecorded
        );
    }

    struct BrokenRegistry;

    #[async_trait]
    impl FlowRegistry for BrokenRegistry {
        async fn get_open_connection(&self, _flow_id: &FlowId) -> Result<Option<ConnectionHandle>> {
            Err(OutboundError::FlowRegistry("socket table unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_registry_error_counts_as_dead_flow() {
        let entries = vec![entry(0, Some(binding(LOCAL, "f-1"))), entry(1, None)];
        assert_eq!(
            select_best_local(&NodeId::new(LOCAL), &entries, &BrokenRegistry).await,
            FlowSelectionResult::FlowDeadOrRemote
        );
    }
}
