use clap::Subcommand;

use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Print the effective server configuration (secrets omitted)")]
    Show,
}

pub fn handle(cmd: ConfigCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let config = AppConfig::from_env();

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                OutputFormat::Text => print!("{}", serde_yaml::to_string(&config)?),
            }

            if let Err(e) = config.validate() {
                eprintln!("Warning: {}", e);
            }
            Ok(())
        }
    }
}
