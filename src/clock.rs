use std::convert::Infallible;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use chrono::Utc;

use crate::config::Config;

/// Header carrying a fake "now" in epoch milliseconds, honored in test mode only.
pub const TEST_NOW_HEADER: &str = "x-test-now-ms";

/// The current time in epoch milliseconds, as seen by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Now(pub i64);

pub fn wall_clock_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[async_trait]
impl<S> FromRequestParts<S> for Now
where
    Config: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Config::from_ref(state);
        if config.test_mode {
            let header = parts
                .headers
                .get(TEST_NOW_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<i64>().ok());
            if let Some(now) = header {
                return Ok(Now(now));
            }
        }
        Ok(Now(wall_clock_ms()))
    }
}
