mod common;

use std::time::Duration;

use anyhow::Result;
use axum::http::{header, StatusCode};
use caregate::config::{AppConfig, KeyStrategy};
use common::*;

#[tokio::test]
async fn test_login_returns_token_principal_and_scope() -> Result<()> {
    let app = spawn_app();

    let response = app.login("head@clinic.example", SECRET, "198.51.100.7").await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);

    let data = &response.body["data"];
    assert!(data["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(data["principal"]["role"], "SUPERVISOR");
    assert_eq!(data["principal"]["id"], SUPERVISOR.to_string());

    let members = scope_members(&data["scope"]);
    assert!(members.contains(&SUPERVISOR.to_string()));
    assert!(members.contains(&PROFESSIONAL.to_string()));
    assert!(members.contains(&PATIENT.to_string()));
    assert!(!members.contains(&OTHER_PROFESSIONAL.to_string()));
    Ok(())
}

#[tokio::test]
async fn test_unknown_account_and_wrong_secret_look_the_same() -> Result<()> {
    let app = spawn_app();

    let unknown = app.login("nobody@clinic.example", SECRET, "198.51.100.8").await?;
    let wrong = app.login("head@clinic.example", "not it", "198.51.100.8").await?;

    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.body, wrong.body);
    Ok(())
}

#[tokio::test]
async fn test_eleventh_attempt_is_rate_limited() -> Result<()> {
    let app = spawn_app();

    for _ in 0..10 {
        let response = app.login("head@clinic.example", "guess", "203.0.113.50").await?;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    // Correct secret no longer helps once the window is full
    let denied = app.login("head@clinic.example", SECRET, "203.0.113.50").await?;
    assert_eq!(denied.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(denied.body["code"], "TOO_MANY_REQUESTS");
    assert_eq!(denied.body["error"], "Too many login attempts");
    assert_eq!(denied.headers[header::RETRY_AFTER], "900");

    // A different client is unaffected
    let other = app.login("head@clinic.example", SECRET, "203.0.113.51").await?;
    assert_eq!(other.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_window_reopens_after_window_length() -> Result<()> {
    let app = spawn_app();

    // Ten failures spread over four and a half minutes
    for _ in 0..10 {
        app.login("pro@clinic.example", "guess", "203.0.113.60").await?;
        app.advance(Duration::from_secs(30));
    }

    // At six minutes the window is still closed, with nine minutes to go
    app.advance(Duration::from_secs(60));
    let denied = app.login("pro@clinic.example", SECRET, "203.0.113.60").await?;
    assert_eq!(denied.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(denied.headers[header::RETRY_AFTER], "540");

    // Sixteen minutes after the first attempt
    app.advance(Duration::from_secs(10 * 60));
    let admitted = app.login("pro@clinic.example", SECRET, "203.0.113.60").await?;
    assert_eq!(admitted.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_rotating_forwarded_for_cannot_escape_the_window() -> Result<()> {
    let app = spawn_app();

    let mut admitted = 0;
    for i in 0..30 {
        let spoofed = format!("192.0.2.{}", i);
        let response = app
            .login_via("head@clinic.example", "guess", "203.0.113.65", Some(&spoofed))
            .await?;
        if response.status != StatusCode::TOO_MANY_REQUESTS {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 10);
    assert_eq!(app.state.governor.tracked_identities(), 1);
    Ok(())
}

#[tokio::test]
async fn test_trusted_proxy_keys_on_the_hop_it_appended() -> Result<()> {
    let mut config = AppConfig::development();
    config.server.trust_forwarded_for = true;
    config.governor.max_attempts = 3;
    let app = spawn_app_with(config, clinic_store());

    // Client forges leading hops; the proxy at 10.0.0.1 appends the real address
    let mut admitted = 0;
    for i in 0..10 {
        let chain = format!("192.0.2.{}, 198.51.100.66", i);
        let response = app
            .login_via("head@clinic.example", "guess", "10.0.0.1", Some(&chain))
            .await?;
        if response.status != StatusCode::TOO_MANY_REQUESTS {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 3);

    // A different client behind the same proxy has its own window
    let other = app
        .login_via("head@clinic.example", SECRET, "10.0.0.1", Some("198.51.100.67"))
        .await?;
    assert_eq!(other.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_account_strategy_limits_across_addresses() -> Result<()> {
    let mut config = AppConfig::development();
    config.governor.key_strategy = KeyStrategy::Account;
    config.governor.max_attempts = 3;
    let app = spawn_app_with(config, clinic_store());

    for i in 0..3 {
        let ip = format!("203.0.113.{}", 70 + i);
        let response = app.login("head@clinic.example", "guess", &ip).await?;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    let denied = app.login("HEAD@clinic.example", SECRET, "203.0.113.99").await?;
    assert_eq!(denied.status, StatusCode::TOO_MANY_REQUESTS);

    // Another account is counted separately
    let other = app.login("pro@clinic.example", SECRET, "203.0.113.99").await?;
    assert_eq!(other.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_reset_on_success_clears_failures() -> Result<()> {
    let mut config = AppConfig::development();
    config.governor.max_attempts = 3;
    config.governor.reset_on_success = true;
    let app = spawn_app_with(config, clinic_store());

    for _ in 0..2 {
        app.login("head@clinic.example", "guess", "203.0.113.80").await?;
    }
    let ok = app.login("head@clinic.example", SECRET, "203.0.113.80").await?;
    assert_eq!(ok.status, StatusCode::OK);

    // Fresh window: two more failures are still admitted
    for _ in 0..2 {
        let response = app.login("head@clinic.example", "guess", "203.0.113.80").await?;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_is_rejected_before_governor() -> Result<()> {
    let app = spawn_app();

    let response = app.login("", "", "203.0.113.90").await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert_eq!(app.state.governor.tracked_identities(), 0);
    Ok(())
}

#[tokio::test]
async fn test_broken_ownership_fails_closed() -> Result<()> {
    let store = clinic_store();
    // Professional supervised by another professional: depth three
    store.insert(
        caregate::identity::PrincipalRecord::professional(
            uuid::Uuid::from_u128(20),
            "deep@clinic.example",
            PROFESSIONAL,
        ),
        Some(SECRET),
    );
    let app = spawn_app_with(AppConfig::development(), store);

    let response = app.login("deep@clinic.example", SECRET, "203.0.113.95").await?;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["error"], "Access denied");
    assert!(response.body.get("data").is_none());
    Ok(())
}
