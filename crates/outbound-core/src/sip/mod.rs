//! SIP value types the routing core inspects
//!
//! This is not a message parser. Requests arrive already parsed; these types only carry
//! the parts the routing decision looks at: method, Request-URI, headers and origin.
//! [`parser`] holds the grammar for the URIs and header lists inside them.

pub mod headers;
pub mod method;
pub mod origin;
pub mod parser;
pub mod request;
pub mod uri;

pub use headers::Headers;
pub use method::Method;
pub use origin::{Origin, Transport};
pub use request::Request;
pub use uri::{Scheme, SipUri};
