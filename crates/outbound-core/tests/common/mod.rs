//! Test doubles and fixtures shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use rvoip_outbound_core::auth::{AuthResult, Authenticator};
use rvoip_outbound_core::dispatch::{DestinationResolver, ForwardingPipe, ResolveError, TransactionLayer};
use rvoip_outbound_core::flow::InMemoryFlowRegistry;
use rvoip_outbound_core::location::InMemoryLocationStore;
use rvoip_outbound_core::sip::{Headers, Method, Origin, Request, SipUri, Transport};
use rvoip_outbound_core::{
    Destination, DestinationDescriptor, DirectResponse, FlowBinding, FlowId, NodeId, OutboundProxy,
    OutboundProxyBuilder, ProxyConfig, Result,
};

pub const LOCAL_NODE: &str = "edge-1";
pub const REMOTE_NODE: &str = "edge-2";

pub fn uri(s: &str) -> SipUri {
    s.parse().expect("test URI must parse")
}

pub fn test_config() -> ProxyConfig {
    ProxyConfig {
        node_id: LOCAL_NODE.to_string(),
        home_domains: vec!["example.com".to_string()],
        self_hosts: vec!["edge.example.com".to_string(), "192.0.2.53".to_string()],
        record_route_host: "edge.example.com".to_string(),
        ..Default::default()
    }
}

pub fn client_origin() -> Origin {
    Origin::new(Transport::Tcp, IpAddr::V4(Ipv4Addr::new(198, 51, 100, 20)), 49152)
}

pub fn binding(node: &str, flow: &str) -> FlowBinding {
    FlowBinding {
        node: NodeId::new(node),
        flow_id: FlowId::new(flow),
        transport: Transport::Tcp,
        addr: IpAddr::V4(Ipv4Addr::new(198, 51, 100, 20)),
        port: 49152,
    }
}

pub fn request(method: Method, target: &str) -> Request {
    Request::new(method, uri(target))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Response(DirectResponse),
    Challenge { stale: bool },
    Stateless { request: Request, destination: Destination },
}

#[derive(Default)]
pub struct RecordingTransactionLayer {
    pub sent: Mutex<Vec<Sent>>,
}

impl RecordingTransactionLayer {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl TransactionLayer for RecordingTransactionLayer {
    async fn send_response(&self, _request: &Request, response: DirectResponse) -> Result<()> {
        self.sent.lock().push(Sent::Response(response));
        Ok(())
    }

    async fn send_proxy_challenge(&self, _request: &Request, stale: bool) -> Result<()> {
        self.sent.lock().push(Sent::Challenge { stale });
        Ok(())
    }

    async fn stateless_forward(&self, request: &Request, destination: &Destination) -> Result<()> {
        self.sent.lock().push(Sent::Stateless {
            request: request.clone(),
            destination: destination.clone(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPipe {
    pub forwarded: Mutex<Vec<(Request, Destination, Duration)>>,
}

impl RecordingPipe {
    pub fn forwarded(&self) -> Vec<(Request, Destination, Duration)> {
        self.forwarded.lock().clone()
    }
}

#[async_trait]
impl ForwardingPipe for RecordingPipe {
    async fn forward(&self, request: Request, destination: Destination, timeout: Duration) -> Result<()> {
        self.forwarded.lock().push((request, destination, timeout));
        Ok(())
    }
}

/// Resolves every host to 192.0.2.200 over UDP unless told otherwise
#[derive(Default)]
pub struct StaticResolver {
    overrides: HashMap<String, std::result::Result<Vec<DestinationDescriptor>, ResolveError>>,
}

impl StaticResolver {
    pub fn with(mut self, host: &str, result: std::result::Result<Vec<DestinationDescriptor>, ResolveError>) -> Self {
        self.overrides.insert(host.to_string(), result);
        self
    }

    pub fn default_descriptor(uri: &SipUri) -> DestinationDescriptor {
        DestinationDescriptor {
            uri: uri.clone(),
            transport: Transport::Udp,
            addr: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 200)),
            port: uri.port.unwrap_or(5060),
            connection: None,
        }
    }
}

#[async_trait]
impl DestinationResolver for StaticResolver {
    async fn resolve(
        &self,
        uri: &SipUri,
        _approx_size: usize,
    ) -> std::result::Result<Vec<DestinationDescriptor>, ResolveError> {
        match self.overrides.get(&uri.host) {
            Some(result) => result.clone(),
            None => Ok(vec![Self::default_descriptor(uri)]),
        }
    }
}

pub struct StaticAuthenticator(pub AuthResult);

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn verify(&self, _headers: &Headers, _method: &Method) -> Result<AuthResult> {
        Ok(self.0.clone())
    }
}

pub struct Harness {
    pub proxy: Arc<OutboundProxy>,
    pub store: Arc<InMemoryLocationStore>,
    pub flows: Arc<InMemoryFlowRegistry>,
    pub transactions: Arc<RecordingTransactionLayer>,
    pub pipe: Arc<RecordingPipe>,
}

pub struct HarnessBuilder {
    config: ProxyConfig,
    auth: AuthResult,
    resolver: StaticResolver,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: test_config(),
            auth: AuthResult::Unauthenticated,
            resolver: StaticResolver::default(),
        }
    }

    pub fn config(mut self, config: ProxyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn auth(mut self, auth: AuthResult) -> Self {
        self.auth = auth;
        self
    }

    pub fn resolver(mut self, resolver: StaticResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn build(self) -> Harness {
        let store = Arc::new(InMemoryLocationStore::new());
        let flows = Arc::new(InMemoryFlowRegistry::new());
        let transactions = Arc::new(RecordingTransactionLayer::default());
        let pipe = Arc::new(RecordingPipe::default());

        let proxy = OutboundProxyBuilder::new(self.config)
            .location_store(store.clone())
            .flow_registry(flows.clone())
            .authenticator(Arc::new(StaticAuthenticator(self.auth)))
            .transaction_layer(transactions.clone())
            .forwarding_pipe(pipe.clone())
            .destination_resolver(Arc::new(self.resolver))
            .build()
            .expect("harness proxy must build");

        Harness {
            proxy: Arc::new(proxy),
            store,
            flows,
            transactions,
            pipe,
        }
    }
}
