//! REGISTER requests for domains this proxy is not authoritative for
//!
//! Such registrations are passed on towards the foreign registrar, but only with an
//! RFC 3327 Path header pointing back at this proxy; without it the proxy could not
//! guarantee that requests for the UA come back over the UA's connection.

use tracing::{debug, info};

use crate::common::types::DirectResponse;
use crate::config::ProxyConfig;
use crate::sip::headers::{PATH, REQUIRE, SUPPORTED};
use crate::sip::{Method, Origin, Request};

const PATH_OPTION_TAG: &str = "path";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignRegisterOutcome {
    /// Route this (possibly rewritten) request like any other
    ReRouted(Request),
    Respond(DirectResponse),
}

/// A REGISTER whose Request-URI is outside our home domains
pub fn is_foreign_register(request: &Request, config: &ProxyConfig) -> bool {
    request.method == Method::Register && !config.is_home_domain(&request.uri.host)
}

pub fn handle_foreign_register(
    request: &Request,
    origin: &Origin,
    config: &ProxyConfig,
) -> ForeignRegisterOutcome {
    if !config.allow_foreign_registers {
        debug!("Foreign REGISTER for {} refused", request.uri.host);
        return ForeignRegisterOutcome::Respond(DirectResponse::new(403, "Domain not handled by this proxy"));
    }

    if !request.headers.has_token(SUPPORTED, PATH_OPTION_TAG) {
        if !config.always_do_path_for_foreign_registers {
            debug!("UA at {} does not support Path, requiring it", origin);
            return ForeignRegisterOutcome::Respond(
                DirectResponse::new(421, "Extension Required").with_header(REQUIRE, PATH_OPTION_TAG),
            );
        }
        info!(
            "Adding Path to REGISTER for {} although the UA at {} did not say it supports it",
            request.uri, origin
        );
    }

    let path = format!("<{}>", config.path_uri(origin.transport));
    ForeignRegisterOutcome::ReRouted(insert_path(request, path))
}

/// Prepend `path` to the Path header and make sure Path is required
pub fn insert_path(request: &Request, path: String) -> Request {
    let mut rewritten = request.clone();
    rewritten.headers.prepend_value(PATH, path);
    if !rewritten.headers.has_token(REQUIRE, PATH_OPTION_TAG) {
        rewritten.headers.append_value(REQUIRE, PATH_OPTION_TAG);
    }
    rewritten
}
