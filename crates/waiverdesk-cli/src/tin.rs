//! `tin` command handlers: validate TINs through the proxy.

use clap::Subcommand;
use futures::stream::{self, StreamExt};
use waiverdesk_core::{AppConfig, PreferenceStore, Preferences, ValidationOutcome};
use waiverdesk_tin::TinValidator;

/// Sub-commands available under `tin`.
#[derive(Debug, Subcommand)]
pub enum TinCommands {
    /// Validate one or more TINs against the tax authority via the proxy
    Validate {
        /// TINs to validate (exactly 8 digits each)
        #[arg(required = true)]
        tins: Vec<String>,
        /// Maximum number of lookups in flight at once
        #[arg(long, default_value = "4")]
        concurrency: usize,
        /// Print each outcome as a JSON line
        #[arg(long)]
        json: bool,
    },
}

/// Validate every TIN and print one line per outcome, in argument order.
///
/// Lookups share one validator; each lookup's outcome is independent of the
/// others so concurrent checks cannot mix results.
///
/// # Errors
///
/// Returns an error if the proxy client cannot be built, the stored token
/// cannot be read, or any TIN did not validate.
pub(crate) async fn run_tin_validate<S: PreferenceStore>(
    config: &AppConfig,
    preferences: &Preferences<S>,
    tins: &[String],
    concurrency: usize,
    json: bool,
) -> anyhow::Result<()> {
    let mut validator = TinValidator::new(&config.proxy_url, config.upstream_timeout_secs)?;
    if let Some(token) = preferences.auth_token()? {
        validator = validator.with_bearer_token(token);
    }

    tracing::debug!(
        endpoint = %validator.endpoint(),
        count = tins.len(),
        "validating TINs"
    );

    let validator = &validator;
    let outcomes: Vec<(&str, ValidationOutcome)> = stream::iter(tins.iter())
        .map(|tin| async move { (tin.as_str(), validator.check(tin).await) })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut failures = 0usize;
    for (tin, outcome) in &outcomes {
        if !matches!(outcome, ValidationOutcome::Found { .. }) {
            failures += 1;
        }
        if json {
            let mut line = serde_json::to_value(outcome)?;
            line["tin"] = serde_json::Value::String((*tin).to_owned());
            println!("{line}");
        } else {
            println!("{}", describe(tin, outcome));
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} TINs did not validate", outcomes.len());
    }
    Ok(())
}

fn describe(tin: &str, outcome: &ValidationOutcome) -> String {
    match outcome {
        ValidationOutcome::Found { taxpayer } => {
            let name = taxpayer.display_name().unwrap_or("(unnamed taxpayer)");
            match taxpayer.tax_office.as_deref() {
                Some(office) => format!("{tin}  valid      {name} [{office}]"),
                None => format!("{tin}  valid      {name}"),
            }
        }
        ValidationOutcome::NotFound => format!("{tin}  not found"),
        ValidationOutcome::Failed { message } => format!("{tin}  failed     {message}"),
    }
}
