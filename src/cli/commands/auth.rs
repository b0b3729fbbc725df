use chrono::{Duration, Utc};
use reqwest::header::RETRY_AFTER;
use serde_json::{json, Value};
use std::io::{BufRead, Write};

use crate::cli::output::{output_error, output_success};
use crate::cli::session::{load_session, save_session, Session};
use crate::cli::OutputFormat;

const REQUEST_TIMEOUT_SECS: u64 = 10;

pub async fn login(
    server: &str,
    identifier: String,
    secret: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let secret = match secret {
        Some(secret) => secret,
        None => read_secret()?,
    };

    let url = format!("{}/auth/login", server.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({ "identifier": identifier, "secret": secret }))
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .send()
        .await?;

    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body: Value = response.json().await?;

    if !status.is_success() {
        let message = body["error"].as_str().unwrap_or("Login failed");
        let message = match retry_after {
            Some(secs) => format!("{} (retry after {} seconds)", message, secs),
            None => message.to_string(),
        };
        return fail(output_format, &message, body["code"].as_str());
    }

    let data = &body["data"];
    let token = data["token"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Server response did not include a token"))?;
    let expires_in = data["expires_in"].as_i64().unwrap_or(0);

    save_session(&Session {
        server: server.to_string(),
        identifier: identifier.clone(),
        token: token.to_string(),
        expires_at: Utc::now() + Duration::seconds(expires_in),
    })?;

    output_success(
        output_format,
        &format!("Logged in as {}", identifier),
        Some(json!({
            "principal": data["principal"],
            "scope": data["scope"],
            "expires_in": expires_in
        })),
    )
}

pub async fn whoami(server: &str, token: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let token = match token {
        Some(token) => token,
        None => saved_token()?,
    };

    let url = format!("{}/api/auth/whoami", server.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .get(&url)
        .bearer_auth(&token)
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .send()
        .await?;

    let status = response.status();
    let body: Value = response.json().await?;

    if !status.is_success() {
        let message = body["error"].as_str().unwrap_or("Request failed");
        return fail(output_format, message, body["code"].as_str());
    }

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&body["data"])?),
        OutputFormat::Text => print_whoami(&body["data"]),
    }
    Ok(())
}

fn print_whoami(data: &Value) {
    let principal = &data["principal"];
    println!(
        "Principal: {} ({})",
        principal["identifier"].as_str().unwrap_or("?"),
        principal["id"].as_str().unwrap_or("?")
    );
    println!("Role: {}", principal["role"].as_str().unwrap_or("?"));

    let members = data["scope"]["members"].as_array().cloned().unwrap_or_default();
    println!("Scope: {} principal(s)", members.len());
    for member in members {
        if let Some(id) = member.as_str() {
            println!("  - {}", id);
        }
    }
}

fn saved_token() -> anyhow::Result<String> {
    let session = load_session()?.ok_or_else(|| anyhow::anyhow!("No saved session, run 'caregate login' first"))?;
    if session.is_expired() {
        anyhow::bail!("Saved session for {} has expired, log in again", session.identifier);
    }
    Ok(session.token)
}

fn read_secret() -> anyhow::Result<String> {
    eprint!("Secret: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let secret = line.trim_end_matches(['\r', '\n']).to_string();

    if secret.is_empty() {
        anyhow::bail!("A secret is required");
    }
    Ok(secret)
}

fn fail(output_format: OutputFormat, message: &str, code: Option<&str>) -> anyhow::Result<()> {
    if output_format == OutputFormat::Json {
        output_error(output_format, message, code)?;
    }
    Err(anyhow::anyhow!(message.to_string()))
}
