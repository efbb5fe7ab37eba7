//! Field aliases for loosely typed backend payloads
//!
//! The backend is inconsistent about field names. Each list below is tried in
//! order and the first non-null value wins.

use serde_json::Value;

/// Access token in login responses
pub const TOKEN_FIELDS: &[&str] = &["token", "access_token", "accessToken"];

/// Refresh token in login responses
pub const REFRESH_TOKEN_FIELDS: &[&str] = &["refresh_token", "refreshToken"];

/// Record timestamp
pub const DATE_FIELDS: &[&str] = &["Date", "created_at", "createdAt", "date", "tanggal"];

/// Record amount
pub const AMOUNT_FIELDS: &[&str] = &["Amount", "amount", "nominal"];

/// Record category
pub const CATEGORY_FIELDS: &[&str] = &["kategori", "category"];

/// First non-null value among `fields`.
pub fn pick<'a>(obj: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|field| obj.get(*field))
        .find(|value| !value.is_null())
}

/// First non-null value as a string; numbers are rendered.
pub fn pick_string(obj: &Value, fields: &[&str]) -> Option<String> {
    match pick(obj, fields)? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-null value as a number; numeric strings are parsed.
pub fn pick_number(obj: &Value, fields: &[&str]) -> Option<f64> {
    match pick(obj, fields)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pick_respects_priority() {
        let obj = json!({ "nominal": 5, "Amount": 7, "amount": 9 });
        assert_eq!(pick_number(&obj, AMOUNT_FIELDS), Some(7.0));
    }

    #[test]
    fn test_pick_skips_null() {
        let obj = json!({ "Amount": null, "amount": "12500" });
        assert_eq!(pick_number(&obj, AMOUNT_FIELDS), Some(12_500.0));
    }

    #[test]
    fn test_pick_string() {
        let obj = json!({ "created_at": "2025-08-30T10:00:00", "tanggal": "ignored" });
        assert_eq!(
            pick_string(&obj, DATE_FIELDS).as_deref(),
            Some("2025-08-30T10:00:00")
        );
        assert!(pick_string(&json!({ "token": "" }), TOKEN_FIELDS).is_none());
        assert_eq!(
            pick_string(&json!({ "accessToken": "abc" }), TOKEN_FIELDS).as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_pick_missing() {
        assert!(pick(&json!({}), DATE_FIELDS).is_none());
        assert!(pick_number(&json!({ "amount": true }), AMOUNT_FIELDS).is_none());
        assert!(pick(&json!([1, 2]), AMOUNT_FIELDS).is_none());
    }
}
