pub mod app_config;
pub mod applications;
pub mod config;
pub mod outcome;
pub mod preferences;
pub mod seed;
pub mod taxpayer;
pub mod tin;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use applications::{
    AeoApplication, AeoApplicationPatch, ApplicationError, ApplicationStatus,
    DutyWaiverApplication, DutyWaiverPatch, NewAeoApplication, NewDutyWaiver, OperatorCategory,
    WaiverItem,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use outcome::{OutcomeKind, ValidationOutcome, NOT_FOUND_MESSAGE};
pub use preferences::{
    DashboardModule, FilePreferenceStore, MemoryPreferenceStore, PreferenceError,
    PreferenceStore, Preferences,
};
pub use seed::{load_seed, SeedFile};
pub use taxpayer::TaxpayerRecord;
pub use tin::{is_valid_tin, Tin, TinFormatError, TIN_FORMAT_MESSAGE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read seed file {path}: {source}")]
    SeedFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed file: {0}")]
    SeedFileParse(#[from] serde_yaml::Error),

    #[error("seed validation failed: {0}")]
    Validation(String),
}
