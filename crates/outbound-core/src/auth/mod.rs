//! Credential verification adapter and relay authorization

use async_trait::async_trait;

use crate::common::errors::Result;
use crate::sip::{Headers, Method};

pub mod relay;

pub use relay::{authorize_relay, RelayDecision};

/// Outcome of checking the Proxy-Authorization credentials of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Authenticated(String),
    /// Credentials were valid but the nonce has expired
    Stale(String),
    Unauthenticated,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify(&self, headers: &Headers, method: &Method) -> Result<AuthResult>;
}
