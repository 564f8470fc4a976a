//! Demo data loaded into the application store at startup.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::applications::{
    AeoApplication, ApplicationStatus, DutyWaiverApplication, NewAeoApplication, NewDutyWaiver,
};
use crate::ConfigError;

#[derive(Debug, Deserialize)]
pub struct SeedWaiver {
    #[serde(flatten)]
    pub form: NewDutyWaiver,
    #[serde(default = "default_status")]
    pub status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
pub struct SeedAeo {
    #[serde(flatten)]
    pub form: NewAeoApplication,
    #[serde(default = "default_status")]
    pub status: ApplicationStatus,
}

fn default_status() -> ApplicationStatus {
    ApplicationStatus::Draft
}

#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub duty_waivers: Vec<SeedWaiver>,
    #[serde(default)]
    pub aeo_applications: Vec<SeedAeo>,
}

impl SeedFile {
    /// Builds validated application records. Seeded statuses are taken as
    /// given; they describe history, not a transition.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first invalid entry.
    pub fn into_applications(
        self,
        now: DateTime<Utc>,
    ) -> Result<(Vec<DutyWaiverApplication>, Vec<AeoApplication>), ConfigError> {
        let waivers = self
            .duty_waivers
            .into_iter()
            .enumerate()
            .map(|(idx, seed)| {
                let mut app = DutyWaiverApplication::create(&seed.form, now).map_err(|e| {
                    ConfigError::Validation(format!("duty_waivers[{idx}]: {e}"))
                })?;
                app.status = seed.status;
                Ok(app)
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let mut seen_tins = HashSet::new();
        let aeo = self
            .aeo_applications
            .into_iter()
            .enumerate()
            .map(|(idx, seed)| {
                let mut app = AeoApplication::create(&seed.form, now).map_err(|e| {
                    ConfigError::Validation(format!("aeo_applications[{idx}]: {e}"))
                })?;
                if !seen_tins.insert(app.tin.clone()) {
                    return Err(ConfigError::Validation(format!(
                        "aeo_applications[{idx}]: duplicate TIN {}",
                        app.tin
                    )));
                }
                app.status = seed.status;
                Ok(app)
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok((waivers, aeo))
    }
}

/// Load the seed YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed.
pub fn load_seed(path: &Path) -> Result<SeedFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SeedFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    Ok(seed)
}
