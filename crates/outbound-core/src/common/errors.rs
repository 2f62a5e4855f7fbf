//! Error types for the outbound-core library

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutboundError {
    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Invalid {name} header: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Location store error: {0}")]
    Location(String),

    #[error("Flow registry error: {0}")]
    FlowRegistry(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid method token '{0}'")]
    InvalidMethod(String),
}

impl OutboundError {
    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_header(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OutboundError>;
