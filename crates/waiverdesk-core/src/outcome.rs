use serde::Serialize;

use crate::taxpayer::TaxpayerRecord;

/// Message reported when the tax authority has no record for a TIN.
pub const NOT_FOUND_MESSAGE: &str = "TIN was not found";

/// Result of one TIN validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Found { taxpayer: TaxpayerRecord },
    NotFound,
    Failed { message: String },
}

/// Classification of a [`ValidationOutcome`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Found,
    NotFound,
    Failed,
}

impl ValidationOutcome {
    #[must_use]
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Found { .. } => OutcomeKind::Found,
            Self::NotFound => OutcomeKind::NotFound,
            Self::Failed { .. } => OutcomeKind::Failed,
        }
    }

    /// The message a UI shows for this outcome; `None` on success.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Found { .. } => None,
            Self::NotFound => Some(NOT_FOUND_MESSAGE),
            Self::Failed { message } => Some(message),
        }
    }

    #[must_use]
    pub fn into_taxpayer(self) -> Option<TaxpayerRecord> {
        match self {
            Self::Found { taxpayer } => Some(taxpayer),
            Self::NotFound | Self::Failed { .. } => None,
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeKind::Found => write!(f, "found"),
            OutcomeKind::NotFound => write!(f, "not_found"),
            OutcomeKind::Failed => write!(f, "failed"),
        }
    }
}
