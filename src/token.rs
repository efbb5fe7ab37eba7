//! JWT claim inspection
//!
//! Tokens are decoded without signature verification; the issuer is trusted
//! and only the payload's `exp` claim drives client behavior.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use serde_json::{Map, Value};

/// Source of the current wall-clock time in Unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Decoded token payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Expiry as Unix seconds, if the token carries one.
    pub fn exp(&self) -> Option<i64> {
        match self.0.get("exp")? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            _ => None,
        }
    }

    /// Raw claim lookup.
    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Decode the payload segment of a token.
///
/// Returns `None` for a missing segment, invalid base64url or a payload that
/// is not a JSON object.
pub fn decode(token: &str) -> Option<Claims> {
    let payload = token.split('.').nth(1).filter(|p| !p.is_empty())?;

    // Some issuers pad, some use the standard alphabet; accept both
    let normalized = payload.trim_end_matches('=').replace('+', "-").replace('/', "_");
    let bytes = URL_SAFE_NO_PAD.decode(normalized).ok()?;

    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(map) => Some(Claims(map)),
        _ => None,
    }
}

/// Whether the token expires within `skew_seconds` of `now`.
///
/// Tokens that cannot be decoded or have no `exp` are never expired.
pub fn is_expired_at(token: Option<&str>, skew_seconds: i64, now: i64) -> bool {
    match token.and_then(decode).and_then(|c| c.exp()) {
        Some(exp) => exp <= now + skew_seconds,
        None => false,
    }
}

/// Seconds remaining until expiry, or `None` when no expiry is known.
pub fn seconds_until_expiry_at(token: Option<&str>, now: i64) -> Option<i64> {
    token.and_then(decode).and_then(|c| c.exp()).map(|exp| exp - now)
}

/// [`is_expired_at`] against the system clock.
pub fn is_expired(token: Option<&str>, skew_seconds: i64) -> bool {
    is_expired_at(token, skew_seconds, SystemClock.now())
}

/// [`seconds_until_expiry_at`] against the system clock.
pub fn seconds_until_expiry(token: Option<&str>) -> Option<i64> {
    seconds_until_expiry_at(token, SystemClock.now())
}

#[cfg(test)]
pub(crate) mod test_support {
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::{Value, json};

    /// Build an unsigned token around the given payload.
    pub fn token_with_payload(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "HS256", "typ": "JWT" }).to_string());
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.sig", header, body)
    }

    /// Token expiring `offset` seconds from the system clock.
    pub fn token_expiring_in(offset: i64) -> String {
        token_with_payload(&json!({ "exp": chrono::Utc::now().timestamp() + offset }))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_reads_exp() {
        let token = token_with_payload(&json!({ "exp": 1_900_000_000, "sub": "usertest01" }));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.exp(), Some(1_900_000_000));
        assert_eq!(claims.get("sub"), Some(&json!("usertest01")));
    }

    #[test]
    fn test_decode_accepts_padded_payload() {
        use base64::engine::general_purpose::URL_SAFE;
        let payload = URL_SAFE.encode(json!({ "exp": 42 }).to_string());
        let token = format!("h.{}.s", payload);
        assert_eq!(decode(&token).and_then(|c| c.exp()), Some(42));
    }

    #[test]
    fn test_decode_malformed_inputs() {
        assert!(decode("").is_none());
        assert!(decode("only-one-segment").is_none());
        assert!(decode("a..c").is_none());
        assert!(decode("a.!!!not-base64!!!.c").is_none());

        let not_json = URL_SAFE_NO_PAD.encode("not json");
        assert!(decode(&format!("a.{}.c", not_json)).is_none());

        let array = URL_SAFE_NO_PAD.encode("[1,2,3]");
        assert!(decode(&format!("a.{}.c", array)).is_none());
    }

    #[test]
    fn test_no_exp_never_expires() {
        let token = token_with_payload(&json!({ "sub": "someone" }));
        for skew in [0, 5, 3600, i64::from(i32::MAX)] {
            assert!(!is_expired(Some(&token), skew));
        }
        assert!(seconds_until_expiry(Some(&token)).is_none());
    }

    #[test]
    fn test_absent_or_garbage_token_is_not_expired() {
        assert!(!is_expired(None, 0));
        assert!(!is_expired(Some("dummy.jwt.token"), 0));
        assert!(seconds_until_expiry(None).is_none());
    }

    #[test]
    fn test_future_token() {
        let token = token_expiring_in(60);
        assert!(!is_expired(Some(&token), 0));

        let secs = seconds_until_expiry(Some(&token)).unwrap();
        assert!(secs > 0);
        assert!(secs <= 60);
    }

    #[test]
    fn test_past_token_is_expired() {
        let token = token_expiring_in(-10);
        assert!(is_expired(Some(&token), 0));
    }

    #[test]
    fn test_skew_boundary() {
        let token = token_with_payload(&json!({ "exp": 1_000 }));
        assert!(!is_expired_at(Some(&token), 5, 994));
        assert!(is_expired_at(Some(&token), 5, 995));
        assert!(is_expired_at(Some(&token), 0, 1_000));
        assert!(!is_expired_at(Some(&token), 0, 999));
        assert_eq!(seconds_until_expiry_at(Some(&token), 990), Some(10));
    }

    #[test]
    fn test_fractional_exp() {
        let token = token_with_payload(&json!({ "exp": 1_000.9 }));
        assert_eq!(decode(&token).and_then(|c| c.exp()), Some(1_000));
    }
}
