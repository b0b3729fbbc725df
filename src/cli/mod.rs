pub mod commands;
pub mod output;
pub mod session;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "caregate")]
#[command(about = "caregate CLI - login, session and fixture tooling for the caregate gate")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        env = "CAREGATE_SERVER",
        default_value = "http://localhost:3000",
        help = "Base URL of the caregate server"
    )]
    pub server: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Login to the server and save the session token")]
    Login {
        #[arg(help = "Account identifier")]
        identifier: String,
        #[arg(long, env = "CAREGATE_SECRET", help = "Secret (read from stdin if not provided)")]
        secret: Option<String>,
    },

    #[command(about = "Show the authenticated principal and its scope")]
    Whoami {
        #[arg(long, help = "Bearer token (defaults to the saved session)")]
        token: Option<String>,
    },

    #[command(about = "Principal fixture tooling")]
    Fixture {
        #[command(subcommand)]
        cmd: commands::fixture::FixtureCommands,
    },

    #[command(about = "Server configuration")]
    Config {
        #[command(subcommand)]
        cmd: commands::config::ConfigCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Login { identifier, secret } => {
            commands::auth::login(&cli.server, identifier, secret, output_format).await
        }
        Commands::Whoami { token } => commands::auth::whoami(&cli.server, token, output_format).await,
        Commands::Fixture { cmd } => commands::fixture::handle(cmd, output_format).await,
        Commands::Config { cmd } => commands::config::handle(cmd, output_format),
    }
}
