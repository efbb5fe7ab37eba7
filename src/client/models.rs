//! Backend API models

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::aliases::{
    self, AMOUNT_FIELDS, CATEGORY_FIELDS, DATE_FIELDS, REFRESH_TOKEN_FIELDS, TOKEN_FIELDS,
};
use crate::error::ApiError;
use crate::session::UserProfile;

/// Credentials sent to `POST /login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Login result with the token field normalized
#[derive(Debug, Clone, PartialEq)]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: Option<String>,
    pub message: Option<String>,
    /// Profile, when the backend returns one
    pub user: Option<UserProfile>,
}

impl LoginResponse {
    /// Read a login payload, whichever token alias it uses.
    pub fn from_value(raw: &Value) -> Result<Self, ApiError> {
        let token = aliases::pick_string(raw, TOKEN_FIELDS)
            .ok_or_else(|| ApiError::invalid_response("login response carried no token"))?;

        let user = raw
            .get("user")
            .filter(|u| u.is_object())
            .and_then(|u| serde_json::from_value::<UserProfile>(u.clone()).ok());

        Ok(Self {
            token,
            refresh_token: aliases::pick_string(raw, REFRESH_TOKEN_FIELDS),
            message: aliases::pick_string(raw, &["message"]),
            user,
        })
    }
}

/// One income record (catatan keuangan)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catatan {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDateTime>,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Catatan {
    /// Read a record through the alias lists.
    pub fn from_value(raw: &Value) -> Self {
        Self {
            id: aliases::pick_string(raw, &["id", "ID"]).unwrap_or_else(|| "-".to_string()),
            date: aliases::pick_string(raw, DATE_FIELDS)
                .as_deref()
                .and_then(parse_record_date),
            amount: aliases::pick_number(raw, AMOUNT_FIELDS).unwrap_or(0.0),
            category: aliases::pick_string(raw, CATEGORY_FIELDS),
        }
    }

    /// Date as `dd-mm-yyyy`, or `-` when unknown
    #[cfg(test)]
    pub fn display_date(&self) -> String {
        self.date
            .map(|d| d.format("%d-%m-%Y").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

impl<'de> Deserialize<'de> for Catatan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|raw| Catatan::from_value(&raw))
    }
}

/// Parse the timestamp formats the backend is known to send.
///
/// Offsets are converted to local time; naive timestamps are taken as local.
pub fn parse_record_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Sort newest first; undated records go last.
pub fn sort_most_recent_first(records: &mut [Catatan]) {
    records.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Narrowing applied to a record list
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// `YYYY-MM`; takes precedence over the date range
    pub month: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn matches(&self, record: &Catatan) -> bool {
        if let Some(month) = &self.month {
            return record
                .date
                .map(|d| d.format("%Y-%m").to_string() == *month)
                .unwrap_or(false);
        }

        // Undated records are kept when only a range is given
        let Some(date) = record.date.map(|d| d.date()) else {
            return true;
        };
        if self.from.is_some_and(|from| date < from) {
            return false;
        }
        if self.to.is_some_and(|to| date > to) {
            return false;
        }
        true
    }

    /// Filter and sort for display.
    pub fn apply(&self, records: Vec<Catatan>) -> Vec<Catatan> {
        let mut kept: Vec<Catatan> = records.into_iter().filter(|r| self.matches(r)).collect();
        sort_most_recent_first(&mut kept);
        kept
    }
}

/// Sum of record amounts
pub fn total_amount(records: &[Catatan]) -> f64 {
    records.iter().map(|r| r.amount).sum()
}

/// Monthly revenue bucket from `GET /catatan/revenue`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenuePerMonth {
    pub month: String,
    #[serde(deserialize_with = "number_or_string")]
    pub total: f64,
}

/// Response from `POST /uploads`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub ocr_found: bool,
    #[serde(default)]
    pub ocr_amount: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("number out of range")),
        Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Value::Null => Ok(0.0),
        other => Err(serde::de::Error::custom(format!(
            "expected number, got {}",
            other
        ))),
    }
}
