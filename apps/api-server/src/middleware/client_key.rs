//! Client key resolution for inbound requests.

use std::net::{IpAddr, SocketAddr};

use actix_web::{HttpMessage, HttpRequest};
use faultgate_core::domain::ClientKey;

use super::auth::Identity;

/// Resolve the tracking key for a request.
///
/// The subject comes from an [`Identity`] attached by authentication. The address is the
/// TCP peer, or the first `Forwarded` / `X-Forwarded-For` hop when `trust_forwarded` is set.
pub fn resolve_client_key(req: &HttpRequest, trust_forwarded: bool) -> ClientKey {
    let subject = req
        .extensions()
        .get::<Identity>()
        .map(|identity| identity.subject.clone());

    let address = if trust_forwarded {
        req.connection_info()
            .realip_remote_addr()
            .map(strip_port)
    } else {
        req.peer_addr().map(|addr| addr.ip().to_string())
    };

    ClientKey::resolve(subject.as_deref(), address.as_deref())
}

/// Normalize a forwarded address to the same form as the peer address.
fn strip_port(addr: &str) -> String {
    if let Ok(socket) = addr.parse::<SocketAddr>() {
        return socket.ip().to_string();
    }

    let unbracketed = addr.trim_start_matches('[').trim_end_matches(']');
    unbracketed
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|_| addr.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_anonymous_peer_address() {
        let req = TestRequest::default()
            .peer_addr("10.0.0.5:51000".parse().unwrap())
            .to_http_request();

        assert_eq!(resolve_client_key(&req, false).as_str(), "ip_10.0.0.5");
    }

    #[test]
    fn test_identity_wins_over_address() {
        let a = TestRequest::default()
            .peer_addr("10.0.0.5:51000".parse().unwrap())
            .to_http_request();
        let b = TestRequest::default()
            .peer_addr("172.16.0.9:40000".parse().unwrap())
            .to_http_request();

        for req in [&a, &b] {
            req.extensions_mut().insert(Identity {
                subject: "42".to_string(),
                roles: vec![],
            });
        }

        assert_eq!(resolve_client_key(&a, false), resolve_client_key(&b, false));
        assert_eq!(resolve_client_key(&a, false).as_str(), "user_42");
    }

    #[test]
    fn test_forwarded_address_when_trusted() {
        let req = TestRequest::default()
            .peer_addr("127.0.0.1:8000".parse().unwrap())
            .insert_header(("x-forwarded-for", "203.0.113.7"))
            .to_http_request();

        assert_eq!(resolve_client_key(&req, true).as_str(), "ip_203.0.113.7");
        assert_eq!(resolve_client_key(&req, false).as_str(), "ip_127.0.0.1");
    }

    #[test]
    fn test_unknown_address() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(resolve_client_key(&req, false).as_str(), "ip_unknown");
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("10.0.0.5:51000"), "10.0.0.5");
        assert_eq!(strip_port("[::1]:8080"), "::1");
        assert_eq!(strip_port("10.0.0.5"), "10.0.0.5");
        assert_eq!(strip_port("[::1]"), "::1");
    }

    #[test]
    fn test_bracketed_ipv6_matches_peer_key() {
        let forwarded = TestRequest::default()
            .peer_addr("127.0.0.1:8000".parse().unwrap())
            .insert_header(("x-forwarded-for", "[2001:db8::7]"))
            .to_http_request();
        let direct = TestRequest::default()
            .peer_addr("[2001:db8::7]:51000".parse().unwrap())
            .to_http_request();

        assert_eq!(
            resolve_client_key(&forwarded, true),
            resolve_client_key(&direct, false)
        );
        assert_eq!(resolve_client_key(&direct, false).as_str(), "ip_2001:db8::7");
    }
}
