//! Expiry extraction from raw bearer tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

/// Derives a token's expiry (epoch milliseconds) from the token itself.
/// `None` means the expiry is unknown, which callers treat as expired.
pub trait ExpiryExtractor: Send + Sync {
    fn expiry_millis(&self, token: &str) -> Option<i64>;
}

/// Reads the `exp` claim (seconds) from a JWT payload.
///
/// Only the middle segment is decoded. The header and signature are ignored;
/// the client has no key and only needs the expiry hint. Any decode failure
/// yields `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtExpiryExtractor;

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: Option<f64>,
}

impl ExpiryExtractor for JwtExpiryExtractor {
    fn expiry_millis(&self, token: &str) -> Option<i64> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next()) {
            (Some(_), Some(payload)) if !payload.is_empty() => payload,
            _ => {
                debug!("Token is not a three-part JWT");
                return None;
            }
        };

        let raw = match URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(error = %e, "Token payload is not base64url");
                return None;
            }
        };
        let claims: ExpiryClaim = match serde_json::from_slice(&raw) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Token payload is not a JSON claim set");
                return None;
            }
        };

        let exp = claims.exp?;
        if !exp.is_finite() || exp < 0.0 {
            return None;
        }
        Some((exp * 1000.0) as i64)
    }
}
