//! SIP request as seen by the routing core
//!
//! The request is an immutable input. Anything that changes headers (Path and Require
//! insertion) works on a clone and hands back a new value.

use crate::common::errors::Result;
use crate::sip::headers::{self, Headers};
use crate::sip::method::Method;
use crate::sip::uri::SipUri;

/// Size assumed when the transport layer did not report one
const DEFAULT_APPROX_SIZE: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub uri: SipUri,
    pub headers: Headers,
    /// Approximate encoded size, used when picking a transport for the next hop
    pub approx_size: usize,
}

impl Request {
    pub fn new(method: Method, uri: SipUri) -> Self {
        Self {
            method,
            uri,
            headers: Headers::new(),
            approx_size: DEFAULT_APPROX_SIZE,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(name, value);
        self
    }

    pub fn with_uri(mut self, uri: SipUri) -> Self {
        self.uri = uri;
        self
    }

    pub fn has_route(&self) -> bool {
        !self.headers.list_values(headers::ROUTE).is_empty()
    }

    /// The last Route entry, i.e. the hop closest to the final target
    pub fn last_route_uri(&self) -> Result<Option<SipUri>> {
        self.headers
            .list_values(headers::ROUTE)
            .last()
            .map(|value| headers::parse_name_addr(value))
            .transpose()
    }
}
