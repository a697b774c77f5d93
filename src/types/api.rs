use chrono::{SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::models::Paste;

/// Body of `POST /pastes`. Fields are loosely typed so that validation
/// failures map to our own error codes rather than a generic JSON rejection.
#[derive(Deserialize, Debug, Default)]
pub struct CreatePaste {
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub ttl_seconds: Option<Value>,
    #[serde(default)]
    pub max_views: Option<Value>,
}

/// A validated `CreatePaste`.
#[derive(Debug, PartialEq, Eq)]
pub struct NewPaste {
    pub content: String,
    pub ttl_seconds: Option<i64>,
    pub max_views: Option<i64>,
}

impl CreatePaste {
    pub fn validate(self) -> ApiResult<NewPaste> {
        let content = match self.content {
            Some(Value::String(content)) if !content.trim().is_empty() => content,
            _ => return Err(ApiError::ContentRequired),
        };
        let ttl_seconds = self
            .ttl_seconds
            .map(|value| positive_integer(&value).ok_or(ApiError::InvalidTtlSeconds))
            .transpose()?;
        let max_views = self
            .max_views
            .map(|value| positive_integer(&value).ok_or(ApiError::InvalidMaxViews))
            .transpose()?;

        Ok(NewPaste {
            content,
            ttl_seconds,
            max_views,
        })
    }
}

impl NewPaste {
    /// Build the stored row, rejecting TTLs that overflow the timestamp range.
    pub fn into_paste(self, id: String, created_at: i64) -> ApiResult<Paste> {
        let expires_at = self
            .ttl_seconds
            .map(|ttl| {
                ttl.checked_mul(1000)
                    .and_then(|ms| created_at.checked_add(ms))
                    .filter(|ms| Utc.timestamp_millis_opt(*ms).single().is_some())
                    .ok_or(ApiError::InvalidTtlSeconds)
            })
            .transpose()?;

        Ok(Paste {
            id,
            content: self.content,
            created_at,
            expires_at,
            remaining_views: self.max_views,
        })
    }
}

/// Accepts JSON integers, and floats with no fractional part, that are >= 1.
fn positive_integer(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    number
        .as_i64()
        .or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        })
        .filter(|n| *n >= 1)
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreatedPaste {
    pub id: String,
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PasteView {
    pub content: String,
    pub remaining_views: Option<i64>,
    pub expires_at: Option<String>,
}

impl From<Paste> for PasteView {
    fn from(paste: Paste) -> Self {
        PasteView {
            content: paste.content,
            remaining_views: paste.remaining_views,
            expires_at: paste.expires_at.map(iso8601),
        }
    }
}

/// Format epoch milliseconds as an ISO-8601 UTC timestamp, e.g.
/// `2024-01-01T00:00:00.000Z`.
pub fn iso8601(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(time) => time.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => ms.to_string(),
    }
}
