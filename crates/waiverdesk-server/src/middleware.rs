//! Request plumbing shared by every route: request ids, bearer-token auth and
//! per-client rate limiting.
//!
//! Auth and rate-limit rejections use the same [`ApiError`] envelope as the
//! handlers, so callers only ever parse one error shape.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

const REQUEST_ID_HEADER: &str = "x-request-id";
/// Longest caller-supplied request id that is echoed back.
const MAX_REQUEST_ID_LEN: usize = 128;
/// Window map size above which expired entries are swept.
const SWEEP_THRESHOLD: usize = 1_024;

/// Request id stored as a request extension by [`request_id`].
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    fn current(req: &Request) -> String {
        req.extensions()
            .get::<RequestId>()
            .map_or_else(|| Uuid::new_v4().to_string(), |id| id.0.clone())
    }
}

/// Accepted bearer tokens for the protected routes.
#[derive(Debug, Clone)]
pub struct AuthState {
    tokens: Arc<[String]>,
    pub enabled: bool,
}

impl AuthState {
    /// Reads `WAIVERDESK_API_KEYS` (comma-separated bearer tokens).
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var("WAIVERDESK_API_KEYS").unwrap_or_default();
        Self::from_keys(&raw, is_development)
    }

    /// An empty key list turns auth off in development and is a startup
    /// error anywhere else.
    pub fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let mut tokens: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        tokens.sort();
        tokens.dedup();

        match (tokens.is_empty(), is_development) {
            (true, true) => {
                tracing::warn!("WAIVERDESK_API_KEYS not set; bearer auth disabled in development");
                Ok(Self {
                    tokens: Arc::from(Vec::<String>::new()),
                    enabled: false,
                })
            }
            (true, false) => anyhow::bail!(
                "WAIVERDESK_API_KEYS is required outside development; provide comma-separated bearer tokens"
            ),
            (false, _) => Ok(Self {
                tokens: Arc::from(tokens),
                enabled: true,
            }),
        }
    }

    /// Checks every configured token without short-circuiting.
    fn allows(&self, candidate: &str) -> bool {
        self.tokens.iter().fold(false, |matched, token| {
            matched | bool::from(token.as_bytes().ct_eq(candidate.as_bytes()))
        })
    }
}

/// Route families limited independently, so a burst of TIN lookups cannot
/// use up a client's budget for application edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateScope {
    TinLookup,
    Applications,
}

impl RateScope {
    fn for_path(path: &str) -> Self {
        if path == "/api/v1/tin" || path.starts_with("/api/v1/tin/") {
            Self::TinLookup
        } else {
            Self::Applications
        }
    }
}

#[derive(Debug)]
struct Window {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter keyed by client and [`RateScope`].
///
/// The client is identified by its bearer token, or shares the anonymous
/// bucket when it sends none.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    windows: Arc<Mutex<HashMap<(RateScope, String), Window>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one request; `false` when the client's window for `scope` is full.
    async fn admit(&self, scope: RateScope, client: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if windows.len() > SWEEP_THRESHOLD {
            let span = self.window;
            windows.retain(|_, w| now.duration_since(w.started_at) < span);
        }

        let window = windows
            .entry((scope, client.to_owned()))
            .or_insert(Window {
                started_at: now,
                count: 0,
            });
        if now.duration_since(window.started_at) >= self.window {
            window.started_at = now;
            window.count = 0;
        }
        if window.count >= self.max_requests {
            return false;
        }
        window.count += 1;
        true
    }
}

/// Uses the caller's `x-request-id` when it is short printable ASCII,
/// otherwise a fresh UUIDv4; stores it as [`RequestId`] and echoes it.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .filter(|v| v.bytes().all(|b| b.is_ascii_graphic()))
        .map_or_else(|| Uuid::new_v4().to_string(), ToOwned::to_owned);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let token = bearer_token(req.headers().get(AUTHORIZATION));
    match token {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => {
            let rid = RequestId::current(&req);
            tracing::warn!(request_id = %rid, path = %req.uri().path(), "rejected bearer token");
            ApiError::new(rid, "unauthorized", "missing or invalid bearer token").into_response()
        }
    }
}

pub async fn enforce_rate_limit(
    State(limiter): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let scope = RateScope::for_path(req.uri().path());
    let client = bearer_token(req.headers().get(AUTHORIZATION)).unwrap_or("anonymous");

    if limiter.admit(scope, client).await {
        return next.run(req).await;
    }

    let rid = RequestId::current(&req);
    tracing::warn!(request_id = %rid, ?scope, "rate limit exceeded");
    ApiError::new(rid, "rate_limited", "rate limit exceeded").into_response()
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
