//! Duty Waiver and AEO application records, with the form rules both
//! creation and updates must satisfy.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::tin::Tin;

const MAX_NAME_LEN: usize = 200;
const MAX_TEXT_LEN: usize = 2_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplicationError {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("cannot move application from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    #[error("unknown status '{0}'")]
    UnknownStatus(String),
}

fn invalid(field: &'static str, message: impl Into<String>) -> ApplicationError {
    ApplicationError::Validation {
        field,
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Draft,
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Allowed moves: draft → submitted → under review → approved | rejected.
    /// Staying in the same status is always allowed.
    #[must_use]
    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::{Approved, Draft, Rejected, Submitted, UnderReview};
        self == next
            || matches!(
                (self, next),
                (Draft, Submitted)
                    | (Submitted, UnderReview)
                    | (UnderReview, Approved | Rejected)
            )
    }

    /// Status after applying `next`, or an error if the move is not allowed.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::InvalidTransition`] for disallowed moves.
    pub fn transition(self, next: ApplicationStatus) -> Result<Self, ApplicationError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ApplicationError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ApplicationError::UnknownStatus(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

fn required_name(field: &'static str, value: &str) -> Result<String, ApplicationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LEN {
        return Err(invalid(field, "must be 1–200 characters"));
    }
    Ok(trimmed.to_owned())
}

fn required_text(field: &'static str, value: &str) -> Result<String, ApplicationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid(field, "is required"));
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(invalid(field, "must be at most 2000 characters"));
    }
    Ok(trimmed.to_owned())
}

fn required_tin(value: &str) -> Result<Tin, ApplicationError> {
    Tin::parse(value).map_err(|e| invalid("tin", e.to_string()))
}

fn required_email(field: &'static str, value: &str) -> Result<String, ApplicationError> {
    let trimmed = value.trim();
    let valid = trimmed.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !trimmed.contains(char::is_whitespace)
    });
    if valid {
        Ok(trimmed.to_owned())
    } else {
        Err(invalid(field, format!("'{trimmed}' is not a valid email address")))
    }
}

fn validate_items(items: &[WaiverItem]) -> Result<Vec<WaiverItem>, ApplicationError> {
    if items.is_empty() {
        return Err(invalid("items", "at least one item is required"));
    }
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let description = required_text("items.description", &item.description)
                .map_err(|_| invalid("items", format!("item {} needs a description", idx + 1)))?;
            let unit_of_measure = item.unit_of_measure.trim();
            if unit_of_measure.is_empty() {
                return Err(invalid(
                    "items",
                    format!("item {} needs a unit of measure", idx + 1),
                ));
            }
            if item.quantity <= Decimal::ZERO {
                return Err(invalid(
                    "items",
                    format!("item {} quantity must be positive", idx + 1),
                ));
            }
            if item.value < Decimal::ZERO {
                return Err(invalid(
                    "items",
                    format!("item {} value must not be negative", idx + 1),
                ));
            }
            Ok(WaiverItem {
                description,
                quantity: item.quantity,
                unit_of_measure: unit_of_measure.to_owned(),
                value: item.value,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Duty waiver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaiverItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_of_measure: String,
    /// Declared customs value of the line.
    pub value: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDutyWaiver {
    pub applicant_name: String,
    pub tin: String,
    pub district: String,
    pub purpose: String,
    #[serde(default)]
    pub items: Vec<WaiverItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DutyWaiverPatch {
    pub applicant_name: Option<String>,
    pub district: Option<String>,
    pub purpose: Option<String>,
    pub items: Option<Vec<WaiverItem>>,
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutyWaiverApplication {
    pub id: Uuid,
    pub applicant_name: String,
    pub tin: Tin,
    pub district: String,
    pub purpose: String,
    pub items: Vec<WaiverItem>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DutyWaiverApplication {
    /// Validates the form input and builds a draft application.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Validation`] naming the first invalid field.
    pub fn create(input: &NewDutyWaiver, now: DateTime<Utc>) -> Result<Self, ApplicationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            applicant_name: required_name("applicant_name", &input.applicant_name)?,
            tin: required_tin(&input.tin)?,
            district: required_name("district", &input.district)?,
            purpose: required_text("purpose", &input.purpose)?,
            items: validate_items(&input.items)?,
            status: ApplicationStatus::Draft,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a sparse update. Nothing is changed when any field is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError`] for invalid fields or a disallowed status move.
    pub fn apply_patch(
        &mut self,
        patch: &DutyWaiverPatch,
        now: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        let mut next = self.clone();
        if let Some(ref name) = patch.applicant_name {
            next.applicant_name = required_name("applicant_name", name)?;
        }
        if let Some(ref district) = patch.district {
            next.district = required_name("district", district)?;
        }
        if let Some(ref purpose) = patch.purpose {
            next.purpose = required_text("purpose", purpose)?;
        }
        if let Some(ref items) = patch.items {
            next.items = validate_items(items)?;
        }
        if let Some(status) = patch.status {
            next.status = self.status.transition(status)?;
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AEO
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorCategory {
    Importer,
    Exporter,
    CustomsBroker,
    FreightForwarder,
    WarehouseOperator,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAeoApplication {
    pub company_name: String,
    pub tin: String,
    pub business_registration_number: String,
    pub operator_category: OperatorCategory,
    pub contact_email: String,
    pub district: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AeoApplicationPatch {
    pub company_name: Option<String>,
    pub business_registration_number: Option<String>,
    pub operator_category: Option<OperatorCategory>,
    pub contact_email: Option<String>,
    pub district: Option<String>,
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AeoApplication {
    pub id: Uuid,
    pub company_name: String,
    pub tin: Tin,
    pub business_registration_number: String,
    pub operator_category: OperatorCategory,
    pub contact_email: String,
    pub district: String,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AeoApplication {
    /// Validates the form input and builds a draft application.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Validation`] naming the first invalid field.
    pub fn create(
        input: &NewAeoApplication,
        now: DateTime<Utc>,
    ) -> Result<Self, ApplicationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            company_name: required_name("company_name", &input.company_name)?,
            tin: required_tin(&input.tin)?,
            business_registration_number: required_name(
                "business_registration_number",
                &input.business_registration_number,
            )?,
            operator_category: input.operator_category,
            contact_email: required_email("contact_email", &input.contact_email)?,
            district: required_name("district", &input.district)?,
            status: ApplicationStatus::Draft,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a sparse update. Nothing is changed when any field is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError`] for invalid fields or a disallowed status move.
    pub fn apply_patch(
        &mut self,
        patch: &AeoApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        let mut next = self.clone();
        if let Some(ref name) = patch.company_name {
            next.company_name = required_name("company_name", name)?;
        }
        if let Some(ref brn) = patch.business_registration_number {
            next.business_registration_number =
                required_name("business_registration_number", brn)?;
        }
        if let Some(category) = patch.operator_category {
            next.operator_category = category;
        }
        if let Some(ref email) = patch.contact_email {
            next.contact_email = required_email("contact_email", email)?;
        }
        if let Some(ref district) = patch.district {
            next.district = required_name("district", district)?;
        }
        if let Some(status) = patch.status {
            next.status = self.status.transition(status)?;
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
#[path = "applications_test.rs"]
mod tests;
