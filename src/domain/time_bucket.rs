//! Validated time-of-day bucket keys.

use std::fmt;

use super::error::DomainError;

/// A zero-padded "HH:MM" key identifying the set of quotes shown at that
/// time of day. Construction validates the hour and minute ranges, so a
/// `TimeBucket` is always a well-formed cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeBucket(String);

impl TimeBucket {
    /// Build a bucket key from an hour (0-23) and minute (0-59).
    pub fn from_parts(hour: i64, minute: i64) -> Result<Self, DomainError> {
        if !(0..=23).contains(&hour) {
            return Err(DomainError::validation("'hour' must be between 0 and 23"));
        }
        if !(0..=59).contains(&minute) {
            return Err(DomainError::validation("'minute' must be between 0 and 59"));
        }
        Ok(Self(format!("{hour:02}:{minute:02}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
