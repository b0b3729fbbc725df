use clap::Subcommand;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::output::output_success;
use crate::cli::OutputFormat;
use crate::identity::{IdentityGraph, Principal};
use crate::store::Fixture;

#[derive(Subcommand)]
pub enum FixtureCommands {
    #[command(about = "Validate every principal in a fixture against the ownership rules")]
    Check {
        #[arg(help = "Path to a YAML principal fixture")]
        path: PathBuf,
    },
}

pub async fn handle(cmd: FixtureCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        FixtureCommands::Check { path } => handle_check(path, output_format).await,
    }
}

/// Outcome of checking one fixture entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub identifier: String,
    pub role: String,
    pub scope_size: Option<usize>,
    pub violation: Option<String>,
}

/// Resolve every entry of `fixture` through the identity graph
pub async fn check_fixture(fixture: Fixture) -> Vec<EntryReport> {
    let entries = fixture.principals.clone();
    let graph = IdentityGraph::new(Arc::new(fixture.into_store()));

    let mut reports = Vec::with_capacity(entries.len());
    for entry in entries {
        let (scope_size, violation) = match Principal::try_from(entry.record()) {
            Err(err) => (None, Some(err.to_string())),
            Ok(principal) => match graph.scope_of(&principal).await {
                Ok(scope) => (Some(scope.members.len()), None),
                Err(err) => (None, Some(err.to_string())),
            },
        };

        reports.push(EntryReport {
            identifier: entry.identifier,
            role: entry.role,
            scope_size,
            violation,
        });
    }
    reports
}

async fn handle_check(path: PathBuf, output_format: OutputFormat) -> anyhow::Result<()> {
    let fixture = Fixture::load(&path)?;
    let reports = check_fixture(fixture).await;
    let violations = reports.iter().filter(|r| r.violation.is_some()).count();

    if output_format == OutputFormat::Text {
        for report in &reports {
            match (&report.violation, report.scope_size) {
                (Some(violation), _) => println!("✗ {} ({}): {}", report.identifier, report.role, violation),
                (None, Some(size)) => println!("✓ {} ({}): scope of {}", report.identifier, report.role, size),
                (None, None) => {}
            }
        }
    }

    if violations > 0 {
        if output_format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&json!({
                "success": false,
                "error": format!("{} principal(s) violate the ownership rules", violations),
                "principals": reports
            }))?);
        }
        anyhow::bail!("{} of {} principal(s) in {} violate the ownership rules", violations, reports.len(), path.display());
    }

    output_success(
        output_format,
        &format!("{} principal(s) in {} are valid", reports.len(), path.display()),
        Some(json!({ "principals": reports })),
    )
}
