//! Configuration for the outbound proxy
//!
//! Configuration is an explicit value handed to the routing engine on every call; the
//! engine never reads process-wide state.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::common::errors::{OutboundError, Result};
use crate::common::types::NodeId;
use crate::sip::{SipUri, Transport};

/// Main configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Identity of this node in the proxy cluster
    pub node_id: String,
    /// Domains this proxy is authoritative for
    pub home_domains: Vec<String>,
    /// Host names and addresses that address this proxy itself
    pub self_hosts: Vec<String>,
    /// Host put in the Path URIs this proxy inserts
    pub record_route_host: String,
    pub listen_port: u16,
    pub tls_port: u16,
    /// WebSocket listener (RFC 7118)
    pub ws_port: u16,
    pub wss_port: u16,
    pub allow_foreign_registers: bool,
    pub always_do_path_for_foreign_registers: bool,
    /// Where requests for unregistered targets go, if anywhere
    pub default_upstream_uri: Option<SipUri>,
    /// Upper bound for one proxied or relayed attempt
    pub pipe_timeout_secs: u64,
    /// Origins allowed to relay without credentials, as addresses or CIDR prefixes
    pub trusted_networks: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            node_id: "outbound-1".to_string(),
            home_domains: Vec::new(),
            self_hosts: Vec::new(),
            record_route_host: "localhost".to_string(),
            listen_port: 5060,
            tls_port: 5061,
            ws_port: 5066,
            wss_port: 7443,
            allow_foreign_registers: false,
            always_do_path_for_foreign_registers: false,
            default_upstream_uri: None,
            pipe_timeout_secs: 900,
            trusted_networks: Vec::new(),
        }
    }
}

impl ProxyConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)
            .map_err(|e| OutboundError::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| {
            OutboundError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            return Err(OutboundError::Config("node_id must not be empty".to_string()));
        }
        if self.record_route_host.trim().is_empty() {
            return Err(OutboundError::Config(
                "record_route_host must not be empty".to_string(),
            ));
        }
        if self.pipe_timeout_secs == 0 {
            return Err(OutboundError::Config(
                "pipe_timeout_secs must be positive".to_string(),
            ));
        }
        if self.always_do_path_for_foreign_registers && !self.allow_foreign_registers {
            tracing::warn!(
                "always_do_path_for_foreign_registers has no effect while allow_foreign_registers is off"
            );
        }
        Ok(())
    }

    pub fn node(&self) -> NodeId {
        NodeId::new(self.node_id.clone())
    }

    pub fn pipe_timeout(&self) -> Duration {
        Duration::from_secs(self.pipe_timeout_secs)
    }

    pub fn is_home_domain(&self, host: &str) -> bool {
        self.home_domains.iter().any(|d| d.eq_ignore_ascii_case(host))
    }

    /// Whether `uri` addresses this proxy: one of our host names, and no port or one of ours
    pub fn is_self_addressed(&self, uri: &SipUri) -> bool {
        let host_is_ours = self.self_hosts.iter().any(|h| uri.host_matches(h));
        let port_is_ours = match uri.port {
            None => true,
            Some(port) => [self.listen_port, self.tls_port, self.ws_port, self.wss_port].contains(&port),
        };
        host_is_ours && port_is_ours
    }

    /// Port this proxy listens on for `transport`
    pub fn port_for(&self, transport: Transport) -> u16 {
        match transport {
            Transport::Udp | Transport::Tcp => self.listen_port,
            Transport::Tls => self.tls_port,
            Transport::Ws => self.ws_port,
            Transport::Wss => self.wss_port,
        }
    }

    /// This proxy's routable URI for requests that arrived over `transport`
    pub fn path_uri(&self, transport: Transport) -> SipUri {
        let base = if transport.is_secure() {
            SipUri::sips(self.record_route_host.clone())
        } else {
            SipUri::sip(self.record_route_host.clone())
        };
        base.with_port(self.port_for(transport))
            .with_param("transport", Some(transport.as_str()))
            .with_param("lr", None)
    }
}
