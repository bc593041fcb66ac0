use std::fmt;

use chrono::{Duration, Utc};

use crate::models::{Role, User};

/// Safety margin subtracted from the token expiry.
/// A request started just before expiry should not race the server clock.
pub const EXPIRY_BUFFER_MINUTES: i64 = 5;

/// In-memory view of the signed-in user and their bearer token.
///
/// The user is only ever present alongside a token, and the expiry is only
/// ever the one decoded from that token.
#[derive(Clone, Default, PartialEq)]
pub struct Session {
    access_token: Option<String>,
    user: Option<User>,
    token_expiry: Option<i64>,
}

impl Session {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn authenticated(access_token: String, user: Option<User>, token_expiry: Option<i64>) -> Self {
        Self {
            access_token: Some(access_token),
            user,
            token_expiry,
        }
    }

    /// Same user, new token
    pub fn with_token(&self, access_token: String, token_expiry: Option<i64>) -> Self {
        Self {
            access_token: Some(access_token),
            user: self.user.clone(),
            token_expiry,
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Expiry as epoch milliseconds, when known
    pub fn token_expiry(&self) -> Option<i64> {
        self.token_expiry
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }

    /// True without a token, without a known expiry, or once `now_ms` is
    /// inside the buffer window before expiry.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        if self.access_token.is_none() {
            return true;
        }
        match self.token_expiry {
            Some(expiry) => {
                now_ms >= expiry.saturating_sub(Duration::minutes(EXPIRY_BUFFER_MINUTES).num_milliseconds())
            }
            None => true,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().map(|u| u.role == Role::Admin).unwrap_or(false)
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        let expiry = self.token_expiry?;
        let remaining = expiry.saturating_sub(Utc::now().timestamp_millis()).max(0);
        Some(Duration::milliseconds(remaining).num_minutes())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .field("token_expiry", &self.token_expiry)
            .finish()
    }
}
