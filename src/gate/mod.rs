//! Login gate: attempt governor in front of credential verification,
//! identity graph behind it.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::governor::{AttemptGovernor, ClientIdentity, RateLimited};
use crate::identity::{GraphError, IdentityGraph, Principal, Scope};
use crate::store::{CredentialVerifier, StoreError, VerificationError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error(transparent)]
    RateLimited(#[from] RateLimited),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("scope resolution failed: {0}")]
    Scope(#[from] GraphError),

    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

impl From<VerificationError> for GateError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::InvalidCredentials => GateError::InvalidCredentials,
            VerificationError::Store(StoreError::Unavailable(msg)) => GateError::Unavailable(msg),
            VerificationError::Store(other) => GateError::Scope(other.into()),
        }
    }
}

/// A principal that passed the gate, with its resolved scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub principal: Principal,
    pub scope: Scope,
}

pub struct LoginGate {
    governor: Arc<AttemptGovernor>,
    verifier: Arc<dyn CredentialVerifier>,
    graph: IdentityGraph,
    reset_on_success: bool,
}

impl LoginGate {
    pub fn new(
        governor: Arc<AttemptGovernor>,
        verifier: Arc<dyn CredentialVerifier>,
        graph: IdentityGraph,
    ) -> Self {
        Self {
            governor,
            verifier,
            graph,
            reset_on_success: false,
        }
    }

    /// Clear the client's attempt window after a successful login
    pub fn reset_on_success(mut self, enabled: bool) -> Self {
        self.reset_on_success = enabled;
        self
    }

    pub fn governor(&self) -> &Arc<AttemptGovernor> {
        &self.governor
    }

    pub fn graph(&self) -> &IdentityGraph {
        &self.graph
    }

    /// Run one login attempt from `client` through the gate.
    ///
    /// The governor is consulted before the verifier is called, so a denied
    /// attempt never touches the credential store.
    pub async fn authenticate(
        &self,
        client: &ClientIdentity,
        identifier: &str,
        secret: &str,
    ) -> Result<Authenticated, GateError> {
        self.governor.record_attempt(client).into_result()?;

        let principal = match self.verifier.verify(identifier, secret).await {
            Ok(principal) => principal,
            Err(err) => {
                if matches!(err, VerificationError::InvalidCredentials) {
                    info!(client = %client.fingerprint(), "Login rejected: invalid credentials");
                } else {
                    warn!(client = %client.fingerprint(), "Credential verification failed: {}", err);
                }
                return Err(err.into());
            }
        };

        let scope = self.graph.scope_of(&principal).await?;

        if self.reset_on_success {
            self.governor.reset(client);
        }

        info!(
            client = %client.fingerprint(),
            principal = %principal.id,
            role = %principal.role.kind(),
            "Login successful"
        );

        Ok(Authenticated { principal, scope })
    }
}
