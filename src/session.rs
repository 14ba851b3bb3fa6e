//! Authenticated session context handed to every repository call.

use chrono::{DateTime, Duration, Utc};

use crate::error::{ConsoleError, Result};

/// Bearer token plus its validity window.
///
/// The context is passed explicitly to the collaborator instead of living in
/// process-wide state; an expired session surfaces as
/// [`ConsoleError::SessionExpired`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    token: String,
    issued_at: DateTime<Utc>,
    ttl: Duration,
}

impl SessionContext {
    /// A session issued at `issued_at` that stays valid for `ttl`
    #[must_use]
    pub fn new(token: &str, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            token: token.to_string(),
            issued_at,
            ttl,
        }
    }

    /// A session issued now
    #[must_use]
    pub fn issue(token: &str, ttl_minutes: i64) -> Self {
        Self::new(token, Utc::now(), Duration::minutes(ttl_minutes))
    }

    /// Instant after which the session is no longer accepted
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + self.ttl
    }

    /// True if the session is expired at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.token.is_empty() || now >= self.expires_at()
    }

    /// The bearer token if the session is still valid at `now`
    pub fn ensure_active(&self, now: DateTime<Utc>) -> Result<&str> {
        if self.is_expired_at(now) {
            tracing::warn!(expired_at = %self.expires_at(), "Session expired");
            return Err(ConsoleError::SessionExpired);
        }
        Ok(&self.token)
    }
}
