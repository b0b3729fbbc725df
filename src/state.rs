// state.rs - Shared handler state
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::{AppConfig, ConfigError, KeyStrategy};
use crate::gate::LoginGate;
use crate::governor::{AttemptGovernor, Clock, SystemClock};
use crate::identity::IdentityGraph;
use crate::store::{CredentialVerifier, PrincipalStore};

/// How the client identity is derived for a login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPolicy {
    pub strategy: KeyStrategy,
    pub trust_forwarded_for: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<LoginGate>,
    pub governor: Arc<AttemptGovernor>,
    pub graph: IdentityGraph,
    pub store: Arc<dyn PrincipalStore>,
    pub tokens: TokenIssuer,
    pub key_policy: KeyPolicy,
    pub cors_origins: Vec<String>,
    pub enable_cors: bool,
}

impl AppState {
    pub fn new<S>(config: &AppConfig, store: Arc<S>) -> Result<Self, ConfigError>
    where
        S: PrincipalStore + CredentialVerifier + 'static,
    {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Build state around an explicit clock, for tests that step time
    pub fn with_clock<S>(config: &AppConfig, store: Arc<S>, clock: Arc<dyn Clock>) -> Result<Self, ConfigError>
    where
        S: PrincipalStore + CredentialVerifier + 'static,
    {
        let governor = Arc::new(AttemptGovernor::with_clock(
            config.governor.governor_config()?,
            clock,
        ));
        let tokens = TokenIssuer::new(&config.security.jwt_secret, config.security.jwt_expiry_hours)
            .map_err(|_| ConfigError::MissingJwtSecret)?;

        let principals: Arc<dyn PrincipalStore> = store.clone();
        let verifier: Arc<dyn CredentialVerifier> = store;
        let graph = IdentityGraph::new(principals.clone());
        let gate = LoginGate::new(governor.clone(), verifier, graph.clone())
            .reset_on_success(config.governor.reset_on_success);

        Ok(Self {
            gate: Arc::new(gate),
            governor,
            graph,
            store: principals,
            tokens,
            key_policy: KeyPolicy {
                strategy: config.governor.key_strategy,
                trust_forwarded_for: config.server.trust_forwarded_for,
            },
            cors_origins: config.security.cors_origins.clone(),
            enable_cors: config.security.enable_cors,
        })
    }
}
