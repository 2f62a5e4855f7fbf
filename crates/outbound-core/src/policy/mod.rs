//! Site-local challenge policy for relayed requests

use async_trait::async_trait;
use std::net::IpAddr;

use crate::common::errors::{OutboundError, Result};
use crate::common::types::Destination;
use crate::sip::{Origin, Request};

/// Decides whether an unauthenticated relay attempt must be challenged
#[async_trait]
pub trait ChallengePolicy: Send + Sync {
    async fn should_challenge(
        &self,
        origin: &Origin,
        request: &Request,
        destination: &Destination,
    ) -> bool;
}

/// Challenge every unauthenticated relay attempt
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysChallenge;

#[async_trait]
impl ChallengePolicy for AlwaysChallenge {
    async fn should_challenge(&self, _origin: &Origin, _request: &Request, _destination: &Destination) -> bool {
        true
    }
}

/// A network prefix such as `10.0.0.0/8`; a bare address is a full-length prefix
#[derive(Debug, Clone, PartialEq, Eq)]
struct Network {
    addr: IpAddr,
    prefix_len: u8,
}

impl Network {
    fn parse(s: &str) -> Result<Self> {
        let invalid = || OutboundError::Config(format!("Invalid trusted network '{}'", s));
        let (addr, prefix) = match s.trim().split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s.trim(), None),
        };
        let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        let prefix_len = match prefix {
            Some(p) => p.parse::<u8>().map_err(|_| invalid())?,
            None => max,
        };
        if prefix_len > max {
            return Err(invalid());
        }
        Ok(Self { addr, prefix_len })
    }

    fn contains(&self, ip: &IpAddr) -> bool {
        let (net, candidate, bits) = match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => (u32::from(net) as u128, u32::from(*ip) as u128, 32),
            (IpAddr::V6(net), IpAddr::V6(ip)) => (u128::from(net), u128::from(*ip), 128),
            _ => return false,
        };
        if self.prefix_len == 0 {
            return true;
        }
        let shift = bits - u32::from(self.prefix_len);
        (net >> shift) == (candidate >> shift)
    }
}

/// Let origins on trusted networks relay without credentials, challenge everyone else
#[derive(Debug, Clone, Default)]
pub struct TrustedNetworks {
    networks: Vec<Network>,
}

impl TrustedNetworks {
    pub fn new(networks: &[String]) -> Result<Self> {
        Ok(Self {
            networks: networks.iter().map(|n| Network::parse(n)).collect::<Result<_>>()?,
        })
    }

    pub fn is_trusted(&self, addr: &IpAddr) -> bool {
        self.networks.iter().any(|n| n.contains(addr))
    }
}

#[async_trait]
impl ChallengePolicy for TrustedNetworks {
    async fn should_challenge(&self, origin: &Origin, _request: &Request, _destination: &Destination) -> bool {
        !self.is_trusted(&origin.remote_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trusted(nets: &[&str]) -> TrustedNetworks {
        TrustedNetworks::new(&nets.iter().map(|s| s.to_string()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_prefix_matching() {
        let t = trusted(&["10.0.0.0/8", "192.0.2.7", "2001:db8::/32"]);
        assert!(t.is_trusted(&"10.200.1.1".parse().unwrap()));
        assert!(t.is_trusted(&"192.0.2.7".parse().unwrap()));
        assert!(!t.is_trusted(&"192.0.2.8".parse().unwrap()));
        assert!(t.is_trusted(&"2001:db8:1::5".parse().unwrap()));
        assert!(!t.is_trusted(&"2001:db9::5".parse().unwrap()));
    }

    #[test]
    fn test_zero_prefix_trusts_family() {
        let t = trusted(&["0.0.0.0/0"]);
        assert!(t.is_trusted(&"203.0.113.9".parse().unwrap()));
        assert!(!t.is_trusted(&"::1".parse().unwrap()));
    }

    #[test]
    fn test_invalid_networks() {
        assert!(TrustedNetworks::new(&["10.0.0.0/33".to_string()]).is_err());
        assert!(TrustedNetworks::new(&["not-an-ip".to_string()]).is_err());
        assert!(TrustedNetworks::new(&["10.0.0.0/x".to_string()]).is_err());
    }
}
