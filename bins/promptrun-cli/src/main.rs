mod commands;

use clap::{Parser, Subcommand};
use anyhow::Result;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "promptrun-cli")]
#[command(about = "promptrun CLI - Generate and run code, inspect language profiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a running promptrun API to generate code and execute it
    Generate {
        /// What the program should do
        #[arg(short, long)]
        prompt: String,

        /// Target language (e.g., python, java, c++, javascript)
        #[arg(short, long, default_value = "python")]
        language: String,

        /// Base URL of the promptrun API
        #[arg(short, long, env = "PROMPTRUN_SERVER", default_value = "http://localhost:5000")]
        server: String,
    },

    /// Print the language profile table
    Languages {
        /// languages.json to read (built-in profiles when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check that a languages.json file loads cleanly
    Validate {
        /// languages.json to check
        #[arg(short, long, default_value = "config/languages.json")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            prompt,
            language,
            server,
        } => {
            commands::generate(&server, &prompt, &language).await?;
        }
        Commands::Languages { config } => {
            commands::list_languages(config.as_deref())?;
        }
        Commands::Validate { config } => {
            commands::validate_config(&config)?;
        }
    }

    Ok(())
}
