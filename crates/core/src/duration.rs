//! Time spans carried by resource properties (timeouts, token validity, cache ages).
//!
//! Properties are rendered in a single unit (seconds, minutes or days); a span
//! that is not a whole number of the requested unit is rejected instead of
//! silently rounded.

use crate::error::{GraphError, GraphResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(chrono::Duration);

const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

impl Duration {
    pub fn millis(n: i64) -> Self {
        Self(chrono::Duration::milliseconds(n))
    }

    pub fn seconds(n: i64) -> Self {
        Self(chrono::Duration::seconds(n))
    }

    pub fn minutes(n: i64) -> Self {
        Self(chrono::Duration::minutes(n))
    }

    pub fn hours(n: i64) -> Self {
        Self(chrono::Duration::hours(n))
    }

    pub fn days(n: i64) -> Self {
        Self(chrono::Duration::days(n))
    }

    /// Like [`Duration::seconds`], but out-of-range values are a validation
    /// error instead of a panic. Use for values read from configuration.
    pub fn try_seconds(n: i64) -> GraphResult<Self> {
        Self::checked(chrono::Duration::try_seconds(n), n, "seconds")
    }

    pub fn try_minutes(n: i64) -> GraphResult<Self> {
        Self::checked(chrono::Duration::try_minutes(n), n, "minutes")
    }

    pub fn try_hours(n: i64) -> GraphResult<Self> {
        Self::checked(chrono::Duration::try_hours(n), n, "hours")
    }

    pub fn try_days(n: i64) -> GraphResult<Self> {
        Self::checked(chrono::Duration::try_days(n), n, "days")
    }

    fn checked(span: Option<chrono::Duration>, n: i64, unit: &str) -> GraphResult<Self> {
        span.map(Self)
            .ok_or_else(|| GraphError::validation(format!("{n} {unit} is out of range")))
    }

    pub fn as_chrono(self) -> chrono::Duration {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < chrono::Duration::zero()
    }

    pub fn to_seconds(self) -> GraphResult<i64> {
        self.whole(SECOND_MS, "seconds")
    }

    pub fn to_minutes(self) -> GraphResult<i64> {
        self.whole(MINUTE_MS, "minutes")
    }

    pub fn to_days(self) -> GraphResult<i64> {
        self.whole(DAY_MS, "days")
    }

    fn whole(self, unit_ms: i64, unit: &str) -> GraphResult<i64> {
        let ms = self.0.num_milliseconds();
        if ms % unit_ms != 0 {
            return Err(GraphError::validation(format!(
                "duration {self} is not a whole number of {unit}"
            )));
        }
        Ok(ms / unit_ms)
    }
}

impl core::fmt::Display for Duration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let ms = self.0.num_milliseconds();
        if ms != 0 && ms % DAY_MS == 0 {
            write!(f, "{}d", ms / DAY_MS)
        } else if ms != 0 && ms % HOUR_MS == 0 {
            write!(f, "{}h", ms / HOUR_MS)
        } else if ms != 0 && ms % MINUTE_MS == 0 {
            write!(f, "{}m", ms / MINUTE_MS)
        } else if ms % SECOND_MS == 0 {
            write!(f, "{}s", ms / SECOND_MS)
        } else {
            write!(f, "{ms}ms")
        }
    }
}
