//! Taxpayer Identification Number.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown whenever a candidate TIN fails the format check.
pub const TIN_FORMAT_MESSAGE: &str = "TIN must be exactly 8 digits";

const TIN_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("TIN must be exactly 8 digits")]
pub struct TinFormatError {
    pub candidate: String,
}

/// A string of exactly 8 ASCII decimal digits.
///
/// The only way to obtain a `Tin` is through [`Tin::parse`] (or `FromStr` /
/// `Deserialize`, which delegate to it), so holding one means the format
/// check has already passed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tin(String);

impl Tin {
    /// Validates `candidate` and wraps it. No trimming is applied.
    ///
    /// # Errors
    ///
    /// Returns [`TinFormatError`] unless `candidate` is exactly 8 ASCII digits.
    pub fn parse(candidate: &str) -> Result<Self, TinFormatError> {
        if is_valid_tin(candidate) {
            Ok(Self(candidate.to_owned()))
        } else {
            Err(TinFormatError {
                candidate: candidate.to_owned(),
            })
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Returns `true` when `candidate` is exactly 8 ASCII decimal digits.
#[must_use]
pub fn is_valid_tin(candidate: &str) -> bool {
    candidate.len() == TIN_LEN && candidate.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for Tin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tin {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Tin {
    type Err = TinFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Tin {
    type Error = TinFormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Tin> for String {
    fn from(tin: Tin) -> Self {
        tin.0
    }
}
