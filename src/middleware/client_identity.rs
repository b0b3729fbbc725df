// middleware/client_identity.rs - Derive the governor key for a login attempt
use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

use crate::config::KeyStrategy;
use crate::governor::ClientIdentity;
use crate::state::KeyPolicy;

/// Pick the identity a login attempt is counted against.
///
/// With [`KeyStrategy::Account`] the submitted identifier is the key. Otherwise
/// the peer address is used, or the last `X-Forwarded-For` hop when the policy
/// trusts the proxy in front of us. Earlier hops are client-supplied and never
/// used. Unknown peers share a single bucket.
pub fn client_identity(
    policy: KeyPolicy,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    identifier: &str,
) -> ClientIdentity {
    if policy.strategy == KeyStrategy::Account {
        return ClientIdentity::from_account(identifier);
    }

    if policy.trust_forwarded_for {
        if let Some(ip) = forwarded_for(headers) {
            return ClientIdentity::from_ip(ip);
        }
    }

    match peer {
        Some(addr) => ClientIdentity::from_ip(addr.ip()),
        None => ClientIdentity::unknown(),
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .rsplit(',')
        .next()?
        .trim()
        .parse()
        .ok()
}
