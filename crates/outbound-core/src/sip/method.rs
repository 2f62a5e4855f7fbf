//! SIP request methods

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::errors::{OutboundError, Result};

/// SIP request method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Invite,
    Ack,
    Bye,
    Cancel,
    Register,
    Options,
    Subscribe,
    Notify,
    Message,
    Refer,
    Info,
    Update,
    Prack,
    Publish,
    /// Any other method token
    Extension(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Register => "REGISTER",
            Method::Options => "OPTIONS",
            Method::Subscribe => "SUBSCRIBE",
            Method::Notify => "NOTIFY",
            Method::Message => "MESSAGE",
            Method::Refer => "REFER",
            Method::Info => "INFO",
            Method::Update => "UPDATE",
            Method::Prack => "PRACK",
            Method::Publish => "PUBLISH",
            Method::Extension(token) => token,
        }
    }

    /// Methods a UA cannot resubmit with credentials, so they are never challenged
    pub fn is_non_retryable(&self) -> bool {
        matches!(self, Method::Bye | Method::Cancel)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = OutboundError;

    /// Method tokens are case-sensitive (RFC 3261 section 7.1)
    fn from_str(s: &str) -> Result<Self> {
        let method = match s {
            "INVITE" => Method::Invite,
            "ACK" => Method::Ack,
            "BYE" => Method::Bye,
            "CANCEL" => Method::Cancel,
            "REGISTER" => Method::Register,
            "OPTIONS" => Method::Options,
            "SUBSCRIBE" => Method::Subscribe,
            "NOTIFY" => Method::Notify,
            "MESSAGE" => Method::Message,
            "REFER" => Method::Refer,
            "INFO" => Method::Info,
            "UPDATE" => Method::Update,
            "PRACK" => Method::Prack,
            "PUBLISH" => Method::Publish,
            "" => return Err(OutboundError::InvalidMethod(String::new())),
            other if other.chars().any(|c| c.is_whitespace()) => {
                return Err(OutboundError::InvalidMethod(other.to_string()));
            }
            other => Method::Extension(other.to_string()),
        };
        Ok(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_extension_methods() {
        assert_eq!("BYE".parse::<Method>().unwrap(), Method::Bye);
        assert_eq!(
            "FOO".parse::<Method>().unwrap(),
            Method::Extension("FOO".to_string())
        );
        assert_eq!(Method::Extension("FOO".to_string()).to_string(), "FOO");
    }

    #[test]
    fn test_malformed_tokens_are_invalid_method() {
        assert_eq!("".parse::<Method>(), Err(OutboundError::InvalidMethod(String::new())));
        assert_eq!(
            "IN VITE".parse::<Method>(),
            Err(OutboundError::InvalidMethod("IN VITE".to_string()))
        );
    }

    #[test]
    fn test_non_retryable() {
        assert!(Method::Bye.is_non_retryable());
        assert!(Method::Cancel.is_non_retryable());
        assert!(!Method::Invite.is_non_retryable());
        assert!(!Method::Ack.is_non_retryable());
    }
}
