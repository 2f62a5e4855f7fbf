//! Relay authorization
//!
//! Decides whether a request that needs relaying may go out, or has to be answered with
//! a 407 challenge first.

use tracing::debug;

use super::AuthResult;
use crate::common::types::Destination;
use crate::policy::ChallengePolicy;
use crate::sip::{Origin, Request};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayDecision {
    Forward,
    /// Answer 407, marking the nonce stale when the credentials were otherwise fine
    Challenge { stale: bool },
}

pub async fn authorize_relay(
    request: &Request,
    origin: &Origin,
    destination: &Destination,
    auth_result: &AuthResult,
    policy: &dyn ChallengePolicy,
) -> RelayDecision {
    if request.method.is_non_retryable() {
        debug!("Relaying {} without authentication, it cannot be resubmitted", request.method);
        return RelayDecision::Forward;
    }

    let stale = match auth_result {
        AuthResult::Authenticated(user) => {
            debug!("Relaying {} for authenticated user {}", request.method, user);
            return RelayDecision::Forward;
        }
        AuthResult::Stale(user) => {
            debug!("Credentials of {} are stale", user);
            true
        }
        AuthResult::Unauthenticated => false,
    };

    if policy.should_challenge(origin, request, destination).await {
        RelayDecision::Challenge { stale }
    } else {
        debug!("Challenge policy lets {} from {} through unauthenticated", request.method, origin);
        RelayDecision::Forward
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AlwaysChallenge, TrustedNetworks};
    use crate::sip::{Method, Transport};
    use std::net::{IpAddr, Ipv4Addr};

    fn request(method: Method) -> Request {
        Request::new(method, "sip:bob@example.org".parse().unwrap())
            .with_header("Route", "<sip:core.example.org;lr>")
    }

    fn origin(a: u8) -> Origin {
        Origin::new(Transport::Tcp, IpAddr::V4(Ipv4Addr::new(10, 1, 2, a)), 40000)
    }

    fn all_auth_results() -> Vec<AuthResult> {
        vec![
            AuthResult::Authenticated("alice".to_string()),
            AuthResult::Stale("alice".to_string()),
            AuthResult::Unauthenticated,
        ]
    }

    #[tokio::test]
    async fn test_bye_and_cancel_always_forward() {
        for method in [Method::Bye, Method::Cancel] {
            for auth in all_auth_results() {
                let decision = authorize_relay(
                    &request(method.clone()),
                    &origin(1),
                    &Destination::RouteHeader,
                    &auth,
                    &AlwaysChallenge,
                )
                .await;
                assert_eq!(decision, RelayDecision::Forward, "{} with {:?}", method, auth);
            }
        }
    }

    #[tokio::test]
    async fn test_authenticated_forwards() {
        let decision = authorize_relay(
            &request(Method::Invite),
            &origin(1),
            &Destination::RouteHeader,
            &AuthResult::Authenticated("alice".to_string()),
            &AlwaysChallenge,
        )
        .await;
        assert_eq!(decision, RelayDecision::Forward);
    }

    #[tokio::test]
    async fn test_stale_and_missing_credentials_are_challenged() {
        let stale = authorize_relay(
            &request(Method::Invite),
            &origin(1),
            &Destination::RouteHeader,
            &AuthResult::Stale("alice".to_string()),
            &AlwaysChallenge,
        )
        .await;
        assert_eq!(stale, RelayDecision::Challenge { stale: true });

        let missing = authorize_relay(
            &request(Method::Message),
            &origin(1),
            &Destination::RouteHeader,
            &AuthResult::Unauthenticated,
            &AlwaysChallenge,
        )
        .await;
        assert_eq!(missing, RelayDecision::Challenge { stale: false });
    }

    #[tokio::test]
    async fn test_policy_exemption_skips_challenge() {
        let trusted = TrustedNetworks::new(&["10.1.2.0/24".to_string()]).unwrap();
        for auth in [AuthResult::Stale("alice".to_string()), AuthResult::Unauthenticated] {
            let decision = authorize_relay(
                &request(Method::Invite),
                &origin(9),
                &Destination::RouteHeader,
                &auth,
                &trusted,
            )
            .await;
            assert_eq!(decision, RelayDecision::Forward);
        }
    }
}
