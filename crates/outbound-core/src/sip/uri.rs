//! # SIP URI
//!
//! A deliberately small SIP/SIPS URI value type. The routing core only inspects the
//! user, host, port and URI parameters, so that is all this type models:
//!
//! ```text
//! sip:user:password@host:port;uri-parameters?headers
//! ```
//!
//! URI headers (`?...`) are accepted and dropped. Escapes in the user part are
//! normalized while parsing, so `sip:%61lice@host` and `sip:alice@host` are the same
//! address.
//!
//! ```rust
//! use rvoip_outbound_core::sip::SipUri;
//!
//! let uri: SipUri = "sip:alice@example.com:5060;transport=tcp".parse().unwrap();
//! assert_eq!(uri.user.as_deref(), Some("alice"));
//! assert_eq!(uri.port, Some(5060));
//! assert_eq!(uri.param("transport"), Some("tcp"));
//! assert_eq!(uri.to_string(), "sip:alice@example.com:5060;transport=tcp");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::parser;
use crate::common::errors::{OutboundError, Result};

/// URI scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    Sip,
    Sips,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Sip => "sip",
            Scheme::Sips => "sips",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A SIP or SIPS URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SipUri {
    pub scheme: Scheme,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Host name or address; IPv6 references keep their brackets
    pub host: String,
    pub port: Option<u16>,
    /// URI parameters in the order they appeared
    pub params: Vec<(String, Option<String>)>,
}

impl SipUri {
    /// Create a `sip:` URI for a host
    pub fn sip(host: impl Into<String>) -> Self {
        Self {
            scheme: Scheme::Sip,
            user: None,
            password: None,
            host: host.into(),
            port: None,
            params: Vec::new(),
        }
    }

    /// Create a `sips:` URI for a host
    pub fn sips(host: impl Into<String>) -> Self {
        Self {
            scheme: Scheme::Sips,
            ..Self::sip(host)
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Append a parameter; `None` makes it a flag parameter such as `lr`
    pub fn with_param(mut self, name: impl Into<String>, value: Option<&str>) -> Self {
        self.params.push((name.into(), value.map(str::to_string)));
        self
    }

    /// Value of a `name=value` parameter. Parameter names are case-insensitive.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn transport(&self) -> Option<&str> {
        self.param("transport")
    }

    /// RFC 5627: a GRUU carries the `gr` parameter
    pub fn is_gruu(&self) -> bool {
        self.has_param("gr")
    }

    pub fn host_matches(&self, host: &str) -> bool {
        self.host.eq_ignore_ascii_case(host)
    }

    /// Same user, host and port; parameters are ignored. User parts were
    /// escape-normalized at parse time, so a plain comparison is enough.
    pub fn same_address(&self, other: &SipUri) -> bool {
        self.scheme == other.scheme
            && self.user == other.user
            && self.host_matches(&other.host)
            && self.port == other.port
    }

    /// Decode the legacy `addr` parameter, which carries a percent-encoded URI
    pub fn addr_param_uri(&self) -> Result<Option<SipUri>> {
        let Some(encoded) = self.param("addr") else {
            return Ok(None);
        };
        let decoded = urlencoding::decode(encoded)
            .map_err(|e| OutboundError::invalid_uri(encoded, format!("bad addr encoding: {}", e)))?;
        decoded.parse().map(Some)
    }
}

impl fmt::Display for SipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(user) = &self.user {
            f.write_str(user)?;
            if let Some(password) = &self.password {
                write!(f, ":{}", password)?;
            }
            f.write_str("@")?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        for (name, value) in &self.params {
            match value {
                Some(v) => write!(f, ";{}={}", name, v)?,
                None => write!(f, ";{}", name)?,
            }
        }
        Ok(())
    }
}

impl FromStr for SipUri {
    type Err = OutboundError;

    fn from_str(s: &str) -> Result<Self> {
        parser::parse_uri(s)
    }
}

impl TryFrom<String> for SipUri {
    type Error = OutboundError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SipUri> for String {
    fn from(uri: SipUri) -> Self {
        uri.to_string()
    }
}
