//! HTTP client for the tax authority's TIN lookup endpoint.
//!
//! The proxy uses this to forward a TIN upstream with the service
//! credential attached. Responses are not interpreted beyond classifying the
//! body as JSON or text; the caller relays them as they are.

use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use reqwest::{Client, Url};

use crate::error::TinError;
use crate::types::{UpstreamBody, UpstreamReply};

/// Client for the upstream tax-authority API.
///
/// Built leniently: an empty base URL yields a client that reports
/// [`TinError::NotConfigured`] on every lookup instead of failing at
/// construction, so the caller decides how strict to be.
pub struct TaxAuthorityClient {
    client: Client,
    base_url: Option<Url>,
    key_header: HeaderName,
    api_key: HeaderValue,
}

impl TaxAuthorityClient {
    /// Creates a client for `base_url`, sending `api_key` in the `key_header` header.
    ///
    /// # Errors
    ///
    /// - [`TinError::InvalidBaseUrl`] if `base_url` is non-empty but unparseable.
    /// - [`TinError::InvalidHeader`] if the header name or credential contains
    ///   characters not allowed in an HTTP header.
    /// - [`TinError::Http`] if the `reqwest::Client` cannot be constructed.
    pub fn new(
        base_url: &str,
        api_key: &str,
        key_header: &str,
        timeout_secs: u64,
    ) -> Result<Self, TinError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("waiverdesk/0.1 (tin-proxy)")
            .build()?;

        let trimmed = base_url.trim();
        let base_url = if trimmed.is_empty() {
            None
        } else {
            Some(Url::parse(trimmed).map_err(|e| TinError::InvalidBaseUrl {
                url: trimmed.to_owned(),
                reason: e.to_string(),
            })?)
        };

        let key_header = HeaderName::from_bytes(key_header.trim().as_bytes())
            .map_err(|e| TinError::InvalidHeader(format!("'{key_header}': {e}")))?;
        let mut api_key = HeaderValue::from_str(api_key)
            .map_err(|_| TinError::InvalidHeader("credential is not a valid header value".into()))?;
        api_key.set_sensitive(true);

        Ok(Self {
            client,
            base_url,
            key_header,
            api_key,
        })
    }

    /// Returns `true` when a base URL and a non-empty credential are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && !self.api_key.is_empty()
    }

    /// Builds the lookup URL for `tin`: the base URL plus a `TIN` query pair.
    ///
    /// # Errors
    ///
    /// Returns [`TinError::NotConfigured`] when no base URL was given.
    pub fn lookup_url(&self, tin: &str) -> Result<Url, TinError> {
        let mut url = self.base_url.clone().ok_or(TinError::NotConfigured)?;
        url.query_pairs_mut().append_pair("TIN", tin);
        Ok(url)
    }

    /// Forwards `tin` to the tax authority and returns its answer unchanged.
    ///
    /// Non-2xx statuses are not errors here; they come back in
    /// [`UpstreamReply::status`] for the caller to relay.
    ///
    /// # Errors
    ///
    /// - [`TinError::NotConfigured`] when no base URL was given.
    /// - [`TinError::Http`] on network failure or timeout.
    /// - [`TinError::Deserialize`] if a JSON-typed body does not parse.
    pub async fn fetch_taxpayer(&self, tin: &str) -> Result<UpstreamReply, TinError> {
        let url = self.lookup_url(tin)?;

        let response = self
            .client
            .get(url)
            .header(self.key_header.clone(), self.api_key.clone())
            .header(ACCEPT, "application/json, text/plain;q=0.9")
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
        let text = response.text().await?;

        tracing::debug!(tin, status, is_json, "tax authority responded");

        let body = if is_json && !text.trim().is_empty() {
            let value = serde_json::from_str(&text).map_err(|e| TinError::Deserialize {
                context: format!("tax authority response for TIN {tin} (status {status})"),
                source: e,
            })?;
            UpstreamBody::Json(value)
        } else {
            UpstreamBody::Text(text)
        };

        Ok(UpstreamReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> TaxAuthorityClient {
        TaxAuthorityClient::new(base_url, "test-key", "x-api-key", 5)
            .expect("client construction should not fail")
    }

    #[test]
    fn lookup_url_appends_tin_query() {
        let client = test_client("https://tax.example.gov/api/ValidateTin");
        let url = client.lookup_url("12345678").unwrap();
        assert_eq!(
            url.as_str(),
            "https://tax.example.gov/api/ValidateTin?TIN=12345678"
        );
    }

    #[test]
    fn lookup_url_keeps_existing_query() {
        let client = test_client("https://tax.example.gov/api?version=2");
        let url = client.lookup_url("12345678").unwrap();
        assert_eq!(
            url.as_str(),
            "https://tax.example.gov/api?version=2&TIN=12345678"
        );
    }

    #[test]
    fn empty_base_url_is_not_configured() {
        let client = test_client("  ");
        assert!(!client.is_configured());
        assert!(matches!(
            client.lookup_url("12345678"),
            Err(TinError::NotConfigured)
        ));
    }

    #[test]
    fn empty_credential_is_not_configured() {
        let client = TaxAuthorityClient::new("https://tax.example.gov", "", "x-api-key", 5).unwrap();
        assert!(!client.is_configured());
        assert!(client.lookup_url("12345678").is_ok());
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let result = TaxAuthorityClient::new("not a url", "k", "x-api-key", 5);
        assert!(matches!(result, Err(TinError::InvalidBaseUrl { .. })));
    }

    #[test]
    fn rejects_bad_header_name() {
        let result = TaxAuthorityClient::new("https://tax.example.gov", "k", "bad header", 5);
        assert!(matches!(result, Err(TinError::InvalidHeader(_))));
    }
}
