//! TIN validation as seen by a dashboard caller.
//!
//! [`TinValidator`] checks the format locally, calls the proxy's validate
//! endpoint, and turns the answer into a [`ValidationOutcome`]. Progress is
//! published as a [`ValidationState`] on a `watch` channel so a UI can show
//! a spinner and an inline error. Calls are independent: nothing is
//! de-duplicated, and whichever response arrives last wins the state.

use std::time::Duration;

use reqwest::header::CACHE_CONTROL;
use reqwest::{Client, StatusCode, Url};
use tokio::sync::watch;
use waiverdesk_core::{Tin, TaxpayerRecord, ValidationOutcome};

use crate::error::TinError;
use crate::types::ValidationState;

const VALIDATE_PATH: &str = "api/v1/tin/validate";
const NOT_FOUND_PHRASE: &str = "tin was not found";
const NETWORK_FALLBACK: &str = "Network error";

pub struct TinValidator {
    client: Client,
    endpoint: Url,
    bearer_token: Option<String>,
    state: watch::Sender<ValidationState>,
}

impl TinValidator {
    /// Creates a validator that talks to the proxy at `proxy_base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TinError::InvalidBaseUrl`] if `proxy_base_url` is not a
    /// valid URL, or [`TinError::Http`] if the client cannot be built.
    pub fn new(proxy_base_url: &str, timeout_secs: u64) -> Result<Self, TinError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("waiverdesk/0.1 (tin-validator)")
            .build()?;

        let normalised = format!("{}/", proxy_base_url.trim().trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join(VALIDATE_PATH))
            .map_err(|e| TinError::InvalidBaseUrl {
                url: proxy_base_url.to_owned(),
                reason: e.to_string(),
            })?;

        let (state, _) = watch::channel(ValidationState::default());

        Ok(Self {
            client,
            endpoint,
            bearer_token: None,
            state,
        })
    }

    /// Sends `token` as a bearer credential on every proxy call.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Snapshot of the current loading/error state.
    #[must_use]
    pub fn state(&self) -> ValidationState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ValidationState> {
        self.state.subscribe()
    }

    /// Validates `candidate`, returning the taxpayer record on success and
    /// `None` otherwise. The reason for a `None` is left in [`Self::state`].
    pub async fn validate(&self, candidate: &str) -> Option<TaxpayerRecord> {
        self.check(candidate).await.into_taxpayer()
    }

    /// Validates `candidate` and returns the classified outcome.
    ///
    /// A malformed TIN is rejected without any network call. Otherwise the
    /// loading flag is raised for the duration of exactly one proxy call and
    /// lowered again on every path.
    pub async fn check(&self, candidate: &str) -> ValidationOutcome {
        let tin = match Tin::parse(candidate) {
            Ok(tin) => tin,
            Err(e) => {
                let message = e.to_string();
                self.state.send_modify(|s| s.error = Some(message.clone()));
                return ValidationOutcome::Failed { message };
            }
        };

        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let outcome = self.call_proxy(&tin).await;

        self.state.send_modify(|s| {
            s.loading = false;
            s.error = outcome.error_message().map(str::to_owned);
        });

        outcome
    }

    async fn call_proxy(&self, tin: &Tin) -> ValidationOutcome {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(CACHE_CONTROL, "no-cache")
            .json(&serde_json::json!({ "tin": tin.as_str() }));
        if let Some(ref token) = self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(tin = %tin, error = %e, "TIN proxy call failed");
                return ValidationOutcome::Failed {
                    message: transport_message(&e),
                };
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return ValidationOutcome::Failed {
                    message: transport_message(&e),
                }
            }
        };

        interpret_response(status, &body)
    }
}

/// Classifies a proxy response.
fn interpret_response(status: StatusCode, body: &str) -> ValidationOutcome {
    if status.is_success() {
        return match serde_json::from_str::<TaxpayerRecord>(body) {
            Ok(taxpayer) => ValidationOutcome::Found { taxpayer },
            Err(e) => ValidationOutcome::Failed {
                message: format!("Malformed taxpayer payload: {e}"),
            },
        };
    }

    if status == StatusCode::NOT_FOUND && body.to_lowercase().contains(NOT_FOUND_PHRASE) {
        return ValidationOutcome::NotFound;
    }

    let message = failure_message(body)
        .unwrap_or_else(|| format!("Validation failed ({})", status.as_u16()));
    ValidationOutcome::Failed { message }
}

/// Extracts a readable message from a failure body.
///
/// The proxy's own errors use the `{"error": {"message": ...}}` envelope;
/// relayed upstream failures are usually plain text and are used as-is.
fn failure_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .or_else(|| value.get("error"))
            .or_else(|| value.get("message"))
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty());
        if let Some(message) = message {
            return Some(message.to_owned());
        }
    }

    Some(trimmed.to_owned())
}

fn transport_message(err: &reqwest::Error) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        NETWORK_FALLBACK.to_owned()
    } else {
        message
    }
}
