mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::*;

#[tokio::test]
async fn test_protected_routes_require_bearer_token() -> Result<()> {
    let app = spawn_app();

    let missing = app.get("/api/auth/whoami", None).await?;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["code"], "UNAUTHORIZED");

    let garbage = app.get("/api/scope", Some("not.a.jwt")).await?;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_whoami_reports_current_principal() -> Result<()> {
    let app = spawn_app();
    let token = app.token_for("pro@clinic.example").await?;

    let response = app.get("/api/auth/whoami", Some(&token)).await?;
    assert_eq!(response.status, StatusCode::OK);

    let data = &response.body["data"];
    assert_eq!(data["principal"]["identifier"], "pro@clinic.example");
    assert_eq!(data["principal"]["role"], "PROFESSIONAL");
    assert_eq!(data["principal"]["supervisor"], SUPERVISOR.to_string());

    // Itself and its assigned patient only
    let mut members = scope_members(&data["scope"]);
    members.sort();
    let mut expected = vec![PROFESSIONAL.to_string(), PATIENT.to_string()];
    expected.sort();
    assert_eq!(members, expected);
    Ok(())
}

#[tokio::test]
async fn test_patient_scope_is_only_itself() -> Result<()> {
    let app = spawn_app();
    let token = app.token_for("patient@clinic.example").await?;

    let response = app.get("/api/scope", Some(&token)).await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(scope_members(&response.body["data"]), vec![PATIENT.to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_principal_read_inside_scope() -> Result<()> {
    let app = spawn_app();
    let token = app.token_for("head@clinic.example").await?;

    let response = app.get(&format!("/api/principals/{}", PATIENT), Some(&token)).await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["identifier"], "patient@clinic.example");
    assert_eq!(response.body["data"]["professional"], PROFESSIONAL.to_string());
    Ok(())
}

#[tokio::test]
async fn test_principal_read_outside_scope_is_forbidden() -> Result<()> {
    let app = spawn_app();
    let token = app.token_for("pro@clinic.example").await?;

    // Same clinic but not assigned to this professional
    let unassigned = app
        .get(&format!("/api/principals/{}", UNASSIGNED_PATIENT), Some(&token))
        .await?;
    assert_eq!(unassigned.status, StatusCode::FORBIDDEN);

    // Other clinic, and a principal that does not exist, answer identically
    let foreign = app
        .get(&format!("/api/principals/{}", OTHER_PROFESSIONAL), Some(&token))
        .await?;
    let missing = app
        .get(&format!("/api/principals/{}", uuid::Uuid::from_u128(999)), Some(&token))
        .await?;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);
    assert_eq!(foreign.body, missing.body);
    Ok(())
}

#[tokio::test]
async fn test_removed_principal_loses_access() -> Result<()> {
    let app = spawn_app();
    let token = app.token_for("head@other.example").await?;

    let store = clinic_store();
    store.remove(caregate::identity::PrincipalId(OTHER_SUPERVISOR));
    let rebuilt = spawn_app_with(caregate::config::AppConfig::development(), store);

    // Same secret, so the token is still valid, but the principal is gone
    let response = rebuilt.get("/api/auth/whoami", Some(&token)).await?;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_supervisor_inspects_and_resets_window() -> Result<()> {
    let app = spawn_app();
    for _ in 0..4 {
        app.login("pro@clinic.example", "guess", "203.0.113.200").await?;
    }
    let token = app.token_for("head@clinic.example").await?;

    let window = app.get("/api/governor/ip:203.0.113.200", Some(&token)).await?;
    assert_eq!(window.status, StatusCode::OK);
    assert_eq!(window.body["data"]["count"], 4);
    assert_eq!(window.body["data"]["remaining"], 6);

    let reset = app.delete("/api/governor/ip:203.0.113.200", Some(&token)).await?;
    assert_eq!(reset.status, StatusCode::OK);
    assert_eq!(reset.body["data"]["cleared"], true);

    let gone = app.get("/api/governor/ip:203.0.113.200", Some(&token)).await?;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_governor_admin_refused_for_professional() -> Result<()> {
    let app = spawn_app();
    let token = app.token_for("pro@clinic.example").await?;

    let response = app.delete("/api/governor/ip:203.0.113.200", Some(&token)).await?;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    Ok(())
}
