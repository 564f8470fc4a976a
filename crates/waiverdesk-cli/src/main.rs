mod prefs;
mod tin;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use waiverdesk_core::{FilePreferenceStore, Preferences};

use crate::prefs::PrefsCommands;
use crate::tin::TinCommands;

#[derive(Debug, Parser)]
#[command(name = "waiverdesk-cli")]
#[command(about = "Duty waiver and AEO dashboard command line interface")]
struct Cli {
    /// Preferences file holding the active module and bearer token
    #[arg(long, env = "WAIVERDESK_PREFS_PATH", default_value = ".waiverdesk/prefs.json")]
    prefs: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate TINs through the proxy
    Tin {
        #[command(subcommand)]
        command: TinCommands,
    },
    /// Show or change stored dashboard preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = waiverdesk_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let preferences = Preferences::new(FilePreferenceStore::new(cli.prefs.clone()));

    match cli.command {
        Commands::Tin {
            command: TinCommands::Validate { tins, concurrency, json },
        } => tin::run_tin_validate(&config, &preferences, &tins, concurrency, json).await,
        Commands::Prefs { command } => prefs::run_prefs(&preferences, command),
    }
}
