//! High-level API

pub mod simple;

pub use simple::OutboundProxyBuilder;
