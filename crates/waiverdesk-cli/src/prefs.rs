//! `prefs` command handlers: the active dashboard module and the bearer token
//! the CLI sends to the proxy.

use clap::Subcommand;
use waiverdesk_core::{DashboardModule, PreferenceStore, Preferences};

#[derive(Debug, Subcommand)]
pub enum PrefsCommands {
    /// Show the active module, or switch to `duty-waiver` / `aeo`
    Module {
        module: Option<String>,
    },
    /// Manage the stored bearer token
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum TokenCommands {
    Set { token: String },
    Clear,
    /// Report whether a token is stored (the value is never printed)
    Show,
}

pub(crate) fn run_prefs<S: PreferenceStore>(
    preferences: &Preferences<S>,
    command: PrefsCommands,
) -> anyhow::Result<()> {
    match command {
        PrefsCommands::Module { module: None } => {
            println!("{}", preferences.active_module()?);
        }
        PrefsCommands::Module {
            module: Some(raw),
        } => {
            let module = DashboardModule::parse(&raw).ok_or_else(|| {
                anyhow::anyhow!("unknown module '{raw}'; expected 'duty-waiver' or 'aeo'")
            })?;
            preferences.set_active_module(module)?;
            println!("active module set to {module}");
        }
        PrefsCommands::Token {
            command: TokenCommands::Set { token },
        } => {
            if token.trim().is_empty() {
                anyhow::bail!("token must not be empty");
            }
            preferences.set_auth_token(&token)?;
            println!("token stored");
        }
        PrefsCommands::Token {
            command: TokenCommands::Clear,
        } => {
            preferences.clear_auth_token()?;
            println!("token cleared");
        }
        PrefsCommands::Token {
            command: TokenCommands::Show,
        } => {
            let status = if preferences.auth_token()?.is_some() {
                "token stored"
            } else {
                "no token stored"
            };
            println!("{status}");
        }
    }
    Ok(())
}
