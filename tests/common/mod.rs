#![allow(dead_code)]

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use caregate::config::AppConfig;
use caregate::governor::{Clock, ManualClock};
use caregate::identity::PrincipalRecord;
use caregate::store::MemoryStore;
use caregate::{app, AppState};

pub const SUPERVISOR: Uuid = Uuid::from_u128(1);
pub const PROFESSIONAL: Uuid = Uuid::from_u128(2);
pub const PATIENT: Uuid = Uuid::from_u128(3);
pub const UNASSIGNED_PATIENT: Uuid = Uuid::from_u128(4);
pub const OTHER_SUPERVISOR: Uuid = Uuid::from_u128(10);
pub const OTHER_PROFESSIONAL: Uuid = Uuid::from_u128(11);

pub const SECRET: &str = "correct horse battery staple";

pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub state: AppState,
}

/// Two clinics: supervisor 1 with a professional, an assigned and an
/// unassigned patient; supervisor 10 with one professional
pub fn clinic_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(PrincipalRecord::supervisor(SUPERVISOR, "head@clinic.example"), Some(SECRET));
    store.insert(
        PrincipalRecord::professional(PROFESSIONAL, "pro@clinic.example", SUPERVISOR),
        Some(SECRET),
    );
    store.insert(
        PrincipalRecord::patient(PATIENT, "patient@clinic.example", SUPERVISOR, Some(PROFESSIONAL)),
        Some(SECRET),
    );
    store.insert(
        PrincipalRecord::patient(UNASSIGNED_PATIENT, "waiting@clinic.example", SUPERVISOR, None),
        Some(SECRET),
    );
    store.insert(PrincipalRecord::supervisor(OTHER_SUPERVISOR, "head@other.example"), Some(SECRET));
    store.insert(
        PrincipalRecord::professional(OTHER_PROFESSIONAL, "pro@other.example", OTHER_SUPERVISOR),
        Some(SECRET),
    );
    store
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(AppConfig::development(), clinic_store())
}

pub fn spawn_app_with(config: AppConfig, store: MemoryStore) -> TestApp {
    let clock = Arc::new(ManualClock::new());
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let state = AppState::with_clock(&config, Arc::new(store), dyn_clock).expect("test config is valid");

    TestApp {
        router: app(state.clone()),
        clock,
        state,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await.context("router call failed")?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response body is not JSON")?
        };

        Ok(TestResponse { status, headers, body })
    }

    /// POST /auth/login from peer address `client_ip`
    pub async fn login(&self, identifier: &str, secret: &str, client_ip: &str) -> Result<TestResponse> {
        self.login_via(identifier, secret, client_ip, None).await
    }

    /// POST /auth/login from `peer_ip`, optionally carrying an `X-Forwarded-For` header
    pub async fn login_via(
        &self,
        identifier: &str,
        secret: &str,
        peer_ip: &str,
        forwarded_for: Option<&str>,
    ) -> Result<TestResponse> {
        let peer = SocketAddr::new(peer_ip.parse::<IpAddr>()?, 50_000);

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(value) = forwarded_for {
            builder = builder.header("x-forwarded-for", value);
        }

        let mut request =
            builder.body(Body::from(json!({ "identifier": identifier, "secret": secret }).to_string()))?;
        request.extensions_mut().insert(ConnectInfo(peer));
        self.send(request).await
    }

    /// Log in and return the bearer token
    pub async fn token_for(&self, identifier: &str) -> Result<String> {
        let response = self.login(identifier, SECRET, "198.51.100.1").await?;
        anyhow::ensure!(response.status == StatusCode::OK, "login failed: {}", response.body);
        response.body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("no token in login response")
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        self.call(Method::GET, uri, token).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        self.call(Method::DELETE, uri, token).await
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty())?).await
    }
}

/// Member ids of a serialized scope
pub fn scope_members(scope: &Value) -> Vec<String> {
    scope["members"]
        .as_array()
        .map(|members| members.iter().filter_map(|m| m.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}
