//! Transport protocols and request origin

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Transport a request arrived on or a flow is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Udp,
    Tcp,
    Tls,
    Ws,
    Wss,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Udp => "udp",
            Transport::Tcp => "tcp",
            Transport::Tls => "tls",
            Transport::Ws => "ws",
            Transport::Wss => "wss",
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, Transport::Tls | Transport::Wss)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub transport: Transport,
    pub remote_addr: IpAddr,
    pub remote_port: u16,
}

impl Origin {
    pub fn new(transport: Transport, remote_addr: IpAddr, remote_port: u16) -> Self {
        Self {
            transport,
            remote_addr,
            remote_port,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remote_addr {
            IpAddr::V6(addr) => write!(f, "{}:[{}]:{}", self.transport, addr, self.remote_port),
            IpAddr::V4(addr) => write!(f, "{}:{}:{}", self.transport, addr, self.remote_port),
        }
    }
}
