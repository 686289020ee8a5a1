//! Compact-JWT payload inspection
//!
//! Only the `exp` claim is read; signatures are never verified on the
//! client. Anything that cannot be decoded is reported as *not expired* so a
//! decode edge case can never lock a player out of the login flow.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use serde_json::Value;

/// Decode the claims segment of a compact JWT.
///
/// Returns `None` when the token has fewer than two segments or the payload
/// is not base64url-encoded JSON.
#[must_use]
pub fn decode_claims(token: &str) -> Option<Value> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;

    let mut standard: String =
        payload.chars().map(|c| match c { '-' => '+', '_' => '/', other => other }).collect();
    while standard.len() % 4 != 0 {
        standard.push('=');
    }

    let bytes = STANDARD.decode(standard.as_bytes()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// `exp` claim in seconds since the epoch, if present and numeric.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn expires_at(token: &str) -> Option<i64> {
    let claims = decode_claims(token)?;
    let exp = claims.get("exp")?;
    exp.as_i64().or_else(|| exp.as_f64().map(|secs| secs.floor() as i64))
}

/// Whether `token` expires within `skew_secs` of now.
#[must_use]
pub fn is_expired(token: &str, skew_secs: i64) -> bool {
    is_expired_at(token, skew_secs, Utc::now().timestamp())
}

/// [`is_expired`] against an explicit clock.
#[must_use]
pub fn is_expired_at(token: &str, skew_secs: i64, now: i64) -> bool {
    expires_at(token).is_some_and(|exp| exp <= now.saturating_add(skew_secs))
}
