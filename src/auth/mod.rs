use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::{Principal, PrincipalId, RoleKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub identifier: String,
    pub role: RoleKind,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(principal: &Principal, expiry_hours: u64) -> Result<Self, JwtError> {
        let now = Utc::now();
        let exp = i64::try_from(expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| JwtError::TokenGeneration(format!("expiry of {} hours is out of range", expiry_hours)))?
            .timestamp();

        Ok(Self {
            sub: principal.id.0,
            identifier: principal.identifier.clone(),
            role: principal.role.kind(),
            exp,
            iat: now.timestamp(),
        })
    }

    pub fn principal_id(&self) -> PrincipalId {
        PrincipalId(self.sub)
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidToken(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidToken(msg) => write!(f, "Invalid JWT token: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

/// A freshly signed session token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
}

/// Signs and checks HS256 session tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: u64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("expiry_hours", &self.expiry_hours)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, expiry_hours: u64) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        })
    }

    pub fn issue(&self, principal: &Principal) -> Result<IssuedToken, JwtError> {
        let claims = Claims::new(principal, self.expiry_hours)?;
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_in: (claims.exp - claims.iat).unsigned_abs(),
        })
    }

    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;

    fn supervisor() -> Principal {
        Principal {
            id: PrincipalId(Uuid::from_u128(1)),
            identifier: "head@clinic.example".to_string(),
            role: Role::Supervisor,
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let issuer = TokenIssuer::new("test-secret", 2).unwrap();
        let issued = issuer.issue(&supervisor()).unwrap();
        assert_eq!(issued.expires_in, 7200);

        let claims = issuer.validate(&issued.token).unwrap();
        assert_eq!(claims.principal_id(), supervisor().id);
        assert_eq!(claims.role, RoleKind::Supervisor);
        assert_eq!(claims.exp - claims.iat, 7200);
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        assert!(matches!(TokenIssuer::new("", 1), Err(JwtError::InvalidSecret)));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let issued = TokenIssuer::new("one", 1).unwrap().issue(&supervisor()).unwrap();
        let other = TokenIssuer::new("two", 1).unwrap();

        assert!(matches!(other.validate(&issued.token), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn test_out_of_range_expiry_is_an_error() {
        let issuer = TokenIssuer::new("test-secret", u64::MAX / 2).unwrap();
        assert!(matches!(issuer.issue(&supervisor()), Err(JwtError::TokenGeneration(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = TokenIssuer::new("test-secret", 1).unwrap();
        let mut claims = Claims::new(&supervisor(), 1).unwrap();
        claims.iat -= 7200;
        claims.exp -= 7200;
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap();

        assert!(matches!(issuer.validate(&token), Err(JwtError::InvalidToken(_))));
    }
}
