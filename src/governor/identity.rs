use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::net::IpAddr;

/// Key used to bucket login attempts (source address or account identifier)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Identity derived from the network address of the caller
    pub fn from_ip(ip: IpAddr) -> Self {
        Self(format!("ip:{}", ip))
    }

    /// Identity derived from the account identifier being logged into.
    /// Identifiers are compared case-insensitively.
    pub fn from_account(identifier: &str) -> Self {
        Self(format!("account:{}", identifier.trim().to_lowercase()))
    }

    /// Fallback bucket when no source address can be determined
    pub fn unknown() -> Self {
        Self("ip:unknown".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 fingerprint used in logs in place of the raw key
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let hex = format!("{:x}", digest);
        hex[..12].to_string()
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientIdentity {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_identity_uses_prefix() {
        let identity = ClientIdentity::from_ip("1.2.3.4".parse().unwrap());
        assert_eq!(identity.as_str(), "ip:1.2.3.4");
    }

    #[test]
    fn account_identity_is_case_insensitive() {
        assert_eq!(
            ClientIdentity::from_account(" Dr.House@Example.com "),
            ClientIdentity::from_account("dr.house@example.com")
        );
    }

    #[test]
    fn fingerprint_hides_raw_key() {
        let identity = ClientIdentity::new("ip:10.0.0.7");
        let fingerprint = identity.fingerprint();
        assert_eq!(fingerprint.len(), 12);
        assert!(!fingerprint.contains("10.0.0.7"));
        assert_eq!(fingerprint, ClientIdentity::new("ip:10.0.0.7").fingerprint());
    }
}
