use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// API key auth settings used by middleware.
///
/// Only salted SHA-256 digests of the configured tokens are kept in memory.
#[derive(Clone)]
pub struct AuthState {
    key_digests: Arc<Vec<[u8; 32]>>,
    salt: Arc<str>,
    pub enabled: bool,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("keys", &self.key_digests.len())
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl AuthState {
    /// Builds auth config from `DVDSCOUT_API_KEYS` (comma-separated bearer
    /// tokens).
    ///
    /// In development, empty/missing keys disable auth for local iteration.
    /// In non-development envs, empty/missing keys fail startup.
    ///
    /// # Errors
    ///
    /// Returns an error outside development when no keys are configured.
    pub fn from_env(is_development: bool, salt: Option<&str>) -> anyhow::Result<Self> {
        let raw = std::env::var("DVDSCOUT_API_KEYS").unwrap_or_default();
        let state = Self::from_keys(raw.split(','), salt);

        if !state.enabled {
            if is_development {
                tracing::warn!(
                    "DVDSCOUT_API_KEYS not set; bearer auth disabled in development environment"
                );
                return Ok(state);
            }

            anyhow::bail!(
                "DVDSCOUT_API_KEYS is required outside development; provide comma-separated bearer tokens"
            );
        }

        Ok(state)
    }

    /// Builds auth from explicit tokens. Auth is enabled iff at least one
    /// non-blank token is given.
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a str>, salt: Option<&str>) -> Self {
        let salt: Arc<str> = Arc::from(salt.unwrap_or_default());
        let key_digests: Vec<[u8; 32]> = keys
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|key| digest(&salt, key))
            .collect();

        Self {
            enabled: !key_digests.is_empty(),
            key_digests: Arc::new(key_digests),
            salt,
        }
    }

    /// Auth turned off; every request passes.
    #[must_use]
    pub fn disabled() -> Self {
        Self::from_keys(std::iter::empty(), None)
    }

    /// Compares against every stored digest so timing does not reveal which
    /// key (if any) matched.
    fn allows(&self, token: &str) -> bool {
        let candidate = digest(&self.salt, token);
        self.key_digests
            .iter()
            .fold(subtle::Choice::from(0), |matched, known| {
                matched | known.as_slice().ct_eq(candidate.as_slice())
            })
            .into()
    }
}

fn digest(salt: &str, token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter for simple API protection.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing Bearer token auth when enabled.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let token = extract_bearer_token(req.headers().get(AUTHORIZATION));

    match token {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(MiddlewareErrorBody {
                error: MiddlewareError {
                    code: "unauthorized",
                    message: "missing or invalid bearer token",
                },
            }),
        )
            .into_response(),
    }
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(MiddlewareErrorBody {
                error: MiddlewareError {
                    code: "rate_limited",
                    message: "rate limit exceeded",
                },
            }),
        )
            .into_response();
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn extract_bearer_token_rejects_blank_token() {
        let header = HeaderValue::from_static("Bearer    ");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn auth_state_matches_configured_keys_only() {
        let state = AuthState::from_keys(["alpha", " beta ", ""], Some("pepper"));
        assert!(state.enabled);
        assert!(state.allows("alpha"));
        assert!(state.allows("beta"));
        assert!(!state.allows("gamma"));
        assert!(!state.allows(""));
    }

    #[test]
    fn auth_state_digest_depends_on_salt() {
        assert_ne!(digest("one", "token"), digest("two", "token"));
        let salted = AuthState::from_keys(["token"], Some("one"));
        assert!(salted.allows("token"));
    }

    #[test]
    fn auth_state_with_no_keys_is_disabled() {
        let state = AuthState::from_keys(["", "  "], None);
        assert!(!state.enabled);
        assert!(!AuthState::disabled().enabled);
    }

    #[test]
    fn auth_state_debug_hides_keys() {
        let state = AuthState::from_keys(["super-secret"], None);
        assert!(!format!("{state:?}").contains("super-secret"));
    }
}
